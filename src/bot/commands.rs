/// A slash command with its optional free-text argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Weather(Option<String>),
    Forecast(Option<String>),
    Subscribe,
    Unsubscribe,
    Settings,
    MyWeather,
    SetCity(Option<String>),
    SetMorning(Option<String>),
    SetEvening(Option<String>),
    SetType(Option<String>),
    ToggleMorning,
    ToggleEvening,
    TestNotification,
    Cancel,
    Unknown(String),
}

impl Command {
    /// `None` when the text is not a command at all.
    ///
    /// A `@botname` suffix on the command word is dropped, so `/help@my_bot`
    /// parses like `/help`.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        let body = text.strip_prefix('/')?;
        let (word, argument) = match body.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (body, None),
        };
        let name = word.split('@').next().unwrap_or_default().to_lowercase();
        let argument = argument.map(str::to_string);

        let command = match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "weather" => Command::Weather(argument),
            "forecast" => Command::Forecast(argument),
            "subscribe" => Command::Subscribe,
            "unsubscribe" => Command::Unsubscribe,
            "settings" => Command::Settings,
            "my_weather" => Command::MyWeather,
            "set_city" => Command::SetCity(argument),
            "set_morning" => Command::SetMorning(argument),
            "set_evening" => Command::SetEvening(argument),
            "set_type" => Command::SetType(argument),
            "toggle_morning" => Command::ToggleMorning,
            "toggle_evening" => Command::ToggleEvening,
            "test_notification" => Command::TestNotification,
            "cancel" => Command::Cancel,
            _ => Command::Unknown(name),
        };
        Some(command)
    }
}
