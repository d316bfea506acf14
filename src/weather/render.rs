use crate::weather::{CurrentCondition, DailyForecast, WeatherError, WeatherReport};
use chrono::NaiveDate;
use std::fmt::Write;

/// The fixed text a subscriber gets when the weather could not be fetched.
pub fn unavailable_message(city: &str) -> String {
    format!("❌ Could not retrieve weather for {}", city)
}

/// Escapes the characters that open an entity in Telegram's legacy Markdown.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn render_brief(report: &WeatherReport, city: &str) -> Result<String, WeatherError> {
    let current = report.current()?;
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "🌍 *Weather in {}*\n",
        escape_markdown(report.location_name(city))
    );
    write_current(&mut out, current);

    if let Some(today) = report.today() {
        let _ = writeln!(
            out,
            "\n📅 *Today:* {}°C ... {}°C",
            today.min_temp_c, today.max_temp_c
        );
        if let Some((sunrise, sunset)) = today.sun_times() {
            let _ = writeln!(out, "🌅 Sunrise: {}  🌇 Sunset: {}", sunrise, sunset);
        }
        if let Some(hours) = today.sun_hours {
            let _ = writeln!(out, "☀️ Sun hours: {:.1}", hours);
        }
        if let Some(snow) = today.total_snow_cm.filter(|s| *s > 0.0) {
            let _ = writeln!(out, "❄️ Snow: {:.1} cm", snow);
        }
    }

    if let Some(region) = report.region_line() {
        let _ = writeln!(out, "\n📍 {}", escape_markdown(&region));
    }
    if let Some(observed) = &current.observation_time {
        let _ = writeln!(out, "🕐 Observed at {} UTC", observed);
    }
    Ok(out.trim_end().to_string())
}

pub fn render_detailed(report: &WeatherReport, city: &str) -> Result<String, WeatherError> {
    let current = report.current()?;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "🌍 *Detailed forecast for {}*\n",
        escape_markdown(report.location_name(city))
    );
    let _ = writeln!(out, "*Now*");
    write_current(&mut out, current);

    for day in report.weather.iter().take(3) {
        out.push('\n');
        write_day(&mut out, day);
    }
    Ok(out.trim_end().to_string())
}

fn write_current(out: &mut String, current: &CurrentCondition) {
    let _ = writeln!(
        out,
        "🌡 Temperature: {}°C (feels like {}°C)",
        current.temp_c, current.feels_like_c
    );
    let _ = writeln!(out, "☁️ {}", escape_markdown(current.description()));
    let _ = writeln!(out, "💧 Humidity: {}%", current.humidity);
    let _ = writeln!(
        out,
        "💨 Wind: {} km/h {}",
        current.windspeed_kmh, current.wind_dir
    );
    let _ = writeln!(out, "🔽 Pressure: {} hPa", current.pressure);
    if let Some(precip) = current.precip_mm.filter(|p| *p > 0.0) {
        let _ = writeln!(out, "🌧 Precipitation: {:.1} mm", precip);
    }
    if let Some(cloudcover) = current.cloudcover {
        let _ = writeln!(out, "⛅ Cloud cover: {}%", cloudcover);
    }
    if let Some(visibility) = current.visibility {
        let _ = writeln!(out, "👁 Visibility: {} km", visibility);
    }
    if let Some(uv) = current.uv_index.filter(|uv| *uv > 0) {
        let _ = writeln!(out, "🔆 UV index: {}", uv);
    }
}

fn write_day(out: &mut String, day: &DailyForecast) {
    let heading = NaiveDate::parse_from_str(&day.date, "%Y-%m-%d")
        .map(|date| date.format("%A, %d %B").to_string())
        .unwrap_or_else(|_| day.date.clone());
    let _ = writeln!(out, "📅 *{}*", heading);
    let _ = writeln!(
        out,
        "🌡 {}°C ... {}°C",
        day.min_temp_c, day.max_temp_c
    );
    if let Some(avg) = day.avg_temp_c {
        let _ = writeln!(out, "Average: {}°C", avg);
    }
    if let Some(description) = day.description() {
        let _ = writeln!(out, "☁️ {}", escape_markdown(description));
    }
    if let Some(snow) = day.total_snow_cm.filter(|s| *s > 0.0) {
        let _ = writeln!(out, "❄️ Snow: {:.1} cm", snow);
    }
    if let Some(hours) = day.sun_hours {
        let _ = writeln!(out, "☀️ Sun hours: {:.1}", hours);
    }
    if let Some((sunrise, sunset)) = day.sun_times() {
        let _ = writeln!(out, "🌅 {}  🌇 {}", sunrise, sunset);
    }
}
