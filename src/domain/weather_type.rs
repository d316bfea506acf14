/// Which render a subscriber gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherType {
    Brief,
    Detailed,
}

impl WeatherType {
    pub fn parse(s: &str) -> Result<WeatherType, String> {
        match s.trim().to_lowercase().as_str() {
            "brief" => Ok(Self::Brief),
            "detailed" => Ok(Self::Detailed),
            other => Err(format!(
                "{} is not a supported report type. Use either 'brief' or 'detailed'.",
                other
            )),
        }
    }

    /// Lenient variant for values read back from storage.
    pub fn from_stored(s: &str) -> WeatherType {
        Self::parse(s).unwrap_or(Self::Brief)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherType::Brief => "brief",
            WeatherType::Detailed => "detailed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeatherType::Brief => "Brief",
            WeatherType::Detailed => "Detailed",
        }
    }
}

impl Default for WeatherType {
    fn default() -> Self {
        WeatherType::Brief
    }
}
