use crate::weather::WeatherError;
use serde_aux::field_attributes::{
    deserialize_number_from_string, deserialize_option_number_from_string,
};

/// The subset of wttr.in's `format=j1` payload the renders use.
///
/// wttr.in encodes every number as a string.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    pub current_condition: Vec<CurrentCondition>,
    #[serde(default)]
    pub nearest_area: Vec<NearestArea>,
    #[serde(default)]
    pub weather: Vec<DailyForecast>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct TextValue {
    pub value: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CurrentCondition {
    #[serde(rename = "temp_C", deserialize_with = "deserialize_number_from_string")]
    pub temp_c: i32,
    #[serde(rename = "FeelsLikeC", deserialize_with = "deserialize_number_from_string")]
    pub feels_like_c: i32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub humidity: u32,
    #[serde(rename = "windspeedKmph", deserialize_with = "deserialize_number_from_string")]
    pub windspeed_kmh: u32,
    #[serde(rename = "winddir16Point", default)]
    pub wind_dir: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub pressure: u32,
    #[serde(
        rename = "precipMM",
        default,
        deserialize_with = "deserialize_option_number_from_string"
    )]
    pub precip_mm: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub cloudcover: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub visibility: Option<u32>,
    #[serde(
        rename = "uvIndex",
        default,
        deserialize_with = "deserialize_option_number_from_string"
    )]
    pub uv_index: Option<u32>,
    #[serde(default)]
    pub observation_time: Option<String>,
    #[serde(rename = "weatherDesc", default)]
    pub weather_desc: Vec<TextValue>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct NearestArea {
    #[serde(rename = "areaName", default)]
    pub area_name: Vec<TextValue>,
    #[serde(default)]
    pub country: Vec<TextValue>,
    #[serde(default)]
    pub region: Vec<TextValue>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DailyForecast {
    pub date: String,
    #[serde(rename = "maxtempC", deserialize_with = "deserialize_number_from_string")]
    pub max_temp_c: i32,
    #[serde(rename = "mintempC", deserialize_with = "deserialize_number_from_string")]
    pub min_temp_c: i32,
    #[serde(
        rename = "avgtempC",
        default,
        deserialize_with = "deserialize_option_number_from_string"
    )]
    pub avg_temp_c: Option<i32>,
    #[serde(
        rename = "sunHour",
        default,
        deserialize_with = "deserialize_option_number_from_string"
    )]
    pub sun_hours: Option<f64>,
    #[serde(
        rename = "totalSnow_cm",
        default,
        deserialize_with = "deserialize_option_number_from_string"
    )]
    pub total_snow_cm: Option<f64>,
    #[serde(default)]
    pub astronomy: Vec<Astronomy>,
    #[serde(default)]
    pub hourly: Vec<HourlyForecast>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Astronomy {
    #[serde(default)]
    pub sunrise: Option<String>,
    #[serde(default)]
    pub sunset: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct HourlyForecast {
    #[serde(rename = "weatherDesc", default)]
    pub weather_desc: Vec<TextValue>,
}

/// Current conditions reduced to what the advisory prompt needs.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub temp_c: i32,
    pub feels_like_c: i32,
    pub description: String,
    pub humidity_pct: u32,
    pub windspeed_kmh: u32,
    pub precip_mm: f64,
    pub wind_dir: String,
}

fn first_value(values: &[TextValue]) -> Option<&str> {
    values
        .first()
        .map(|v| v.value.trim())
        .filter(|v| !v.is_empty())
}

impl WeatherReport {
    pub fn current(&self) -> Result<&CurrentCondition, WeatherError> {
        self.current_condition
            .first()
            .ok_or(WeatherError::MissingData("current conditions"))
    }

    /// The resolved area name, or what the user asked for.
    pub fn location_name<'a>(&'a self, requested: &'a str) -> &'a str {
        self.nearest_area
            .first()
            .and_then(|area| first_value(&area.area_name))
            .unwrap_or(requested)
    }

    /// "Country, Region" when the payload carries either.
    pub fn region_line(&self) -> Option<String> {
        let area = self.nearest_area.first()?;
        let parts: Vec<&str> = [first_value(&area.country), first_value(&area.region)]
            .into_iter()
            .flatten()
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    pub fn today(&self) -> Option<&DailyForecast> {
        self.weather.first()
    }

    pub fn snapshot(&self) -> Option<WeatherSnapshot> {
        let current = self.current().ok()?;
        Some(WeatherSnapshot {
            temp_c: current.temp_c,
            feels_like_c: current.feels_like_c,
            description: current.description().to_string(),
            humidity_pct: current.humidity,
            windspeed_kmh: current.windspeed_kmh,
            precip_mm: current.precip_mm.unwrap_or(0.0),
            wind_dir: current.wind_dir.clone(),
        })
    }
}

impl CurrentCondition {
    pub fn description(&self) -> &str {
        first_value(&self.weather_desc).unwrap_or("Unknown")
    }
}

impl DailyForecast {
    pub fn description(&self) -> Option<&str> {
        self.hourly.first().and_then(|h| first_value(&h.weather_desc))
    }

    pub fn sun_times(&self) -> Option<(&str, &str)> {
        let astronomy = self.astronomy.first()?;
        Some((astronomy.sunrise.as_deref()?, astronomy.sunset.as_deref()?))
    }
}
