use unicode_segmentation::UnicodeSegmentation;

/// A city name as typed by the user, passed verbatim to the weather service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct City(String);

impl City {
    pub fn parse(s: &str) -> Result<City, String> {
        let trimmed = s.trim();
        let is_empty = trimmed.is_empty();
        // The column is VARCHAR(255)
        let is_too_long = trimmed.graphemes(true).count() > 255;
        let has_control_characters = trimmed.chars().any(char::is_control);
        let looks_like_a_command = trimmed.starts_with('/');

        if is_empty || is_too_long || has_control_characters || looks_like_a_command {
            Err(format!("{:?} is not a valid city name.", s))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for City {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for City {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
