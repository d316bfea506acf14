use crate::helpers::{subscriber, FakeGateway, InMemoryRegistry, TestBot};
use weather_notifier::bot::{messages, SessionState};
use weather_notifier::delivery::RenderMode;
use weather_notifier::domain::{NotificationPreferences, WeatherType};

const ADA: i64 = 42;

fn bot() -> TestBot {
    TestBot::new(InMemoryRegistry::default(), FakeGateway::knowing(&["London", "Oslo"]))
}

#[tokio::test]
async fn start_suggests_setting_a_city_to_new_users() {
    let bot = bot();

    bot.say(ADA, "/start").await;

    assert!(bot.channel.last_text_to(ADA).contains("Tip"));
}

#[tokio::test]
async fn subscribing_registers_the_user_and_asks_for_a_city() {
    // arrange
    let bot = bot();

    // act
    bot.say(ADA, "/subscribe").await;

    // assert
    let record = bot.registry.record(ADA).expect("The user was not registered");
    assert_eq!(record.username.as_deref(), Some("ada"));
    assert_eq!(record.first_name.as_deref(), Some("Ada"));
    assert_eq!(bot.channel.last_text_to(ADA), messages::ASK_CITY);
    assert_eq!(bot.handler.session(ADA), SessionState::AwaitingCity);
}

#[tokio::test]
async fn the_city_sent_after_subscribing_is_saved() {
    // arrange
    let bot = bot();
    bot.say(ADA, "/subscribe").await;

    // act
    bot.say(ADA, "  Oslo ").await;

    // assert
    assert_eq!(bot.registry.record(ADA).unwrap().city.as_deref(), Some("Oslo"));
    assert_eq!(bot.handler.session(ADA), SessionState::Idle);
    let reply = bot.channel.sent().pop().unwrap();
    assert_eq!(reply.mode, RenderMode::Markdown);
    assert!(reply.text.starts_with("✅ Saved."));
    assert!(reply.text.contains("🏙 City: Oslo"));
}

#[tokio::test]
async fn subscribing_with_a_city_shows_the_settings() {
    // arrange
    let registry = InMemoryRegistry::with(vec![subscriber(
        ADA,
        Some("London"),
        NotificationPreferences::default(),
    )]);
    let bot = TestBot::new(registry, FakeGateway::default());

    // act
    bot.say(ADA, "/subscribe").await;

    // assert
    assert!(bot.channel.last_text_to(ADA).contains("Your weather settings"));
    assert_eq!(bot.handler.session(ADA), SessionState::Idle);
}

#[tokio::test]
async fn a_failed_registry_write_answers_with_the_apology() {
    // arrange
    let registry = InMemoryRegistry::default();
    registry.fail();
    let bot = TestBot::new(registry, FakeGateway::default());

    // act
    bot.say(ADA, "/subscribe").await;
    bot.say(ADA, "/set_city Oslo").await;
    bot.say(ADA, "/unsubscribe").await;

    // assert
    assert_eq!(
        bot.channel.texts_to(ADA),
        vec![messages::OPERATION_FAILED.to_string(); 3]
    );
}

#[tokio::test]
async fn setting_a_time_normalises_it_and_enables_the_slot() {
    // arrange
    let registry = InMemoryRegistry::with(vec![subscriber(
        ADA,
        Some("London"),
        NotificationPreferences::default(),
    )]);
    let bot = TestBot::new(registry, FakeGateway::default());

    // act
    bot.say(ADA, "/set_evening 7:30").await;

    // assert
    let preferences = bot.registry.record(ADA).unwrap().preferences.unwrap();
    assert_eq!(preferences.evening_time, "07:30");
    assert!(preferences.send_evening);
    assert!(bot.channel.last_text_to(ADA).contains("🌙 Evening: 07:30 (on)"));
}

#[tokio::test]
async fn an_invalid_time_keeps_the_chat_waiting_until_a_valid_one_arrives() {
    // arrange
    let registry = InMemoryRegistry::with(vec![subscriber(
        ADA,
        Some("London"),
        NotificationPreferences::default(),
    )]);
    let bot = TestBot::new(registry, FakeGateway::default());
    bot.say(ADA, "/set_morning").await;
    assert_eq!(bot.handler.session(ADA), SessionState::AwaitingMorningTime);

    for invalid in ["25:00", "8:5", "noon", "08:60"] {
        // act
        bot.say(ADA, invalid).await;

        // assert
        assert_eq!(
            bot.channel.last_text_to(ADA),
            messages::INVALID_TIME,
            "{} was accepted",
            invalid
        );
        assert_eq!(bot.handler.session(ADA), SessionState::AwaitingMorningTime);
    }

    bot.say(ADA, "6:45").await;
    assert_eq!(bot.handler.session(ADA), SessionState::Idle);
    let preferences = bot.registry.record(ADA).unwrap().preferences.unwrap();
    assert_eq!(preferences.morning_time, "06:45");
}

#[tokio::test]
async fn a_command_resets_a_waiting_chat() {
    let bot = bot();
    bot.say(ADA, "/set_city").await;
    assert_eq!(bot.handler.session(ADA), SessionState::AwaitingCity);

    bot.say(ADA, "/cancel").await;

    assert_eq!(bot.handler.session(ADA), SessionState::Idle);
    assert_eq!(bot.channel.last_text_to(ADA), messages::CANCELLED);
}

#[tokio::test]
async fn a_settings_change_registers_an_unknown_user() {
    let bot = bot();

    bot.say(ADA, "/set_city London").await;

    let record = bot.registry.record(ADA).unwrap();
    assert_eq!(record.city.as_deref(), Some("London"));
    assert!(record.is_active);
}

#[tokio::test]
async fn the_report_type_can_be_switched() {
    // arrange
    let registry = InMemoryRegistry::with(vec![subscriber(
        ADA,
        Some("London"),
        NotificationPreferences::default(),
    )]);
    let bot = TestBot::new(registry, FakeGateway::knowing(&["London"]));

    // act
    bot.say(ADA, "/set_type DETAILED").await;
    bot.say(ADA, "/my_weather").await;

    // assert
    let preferences = bot.registry.record(ADA).unwrap().preferences.unwrap();
    assert_eq!(preferences.weather_type, WeatherType::Detailed);
    assert!(bot.channel.last_text_to(ADA).contains("Detailed forecast"));
}

#[tokio::test]
async fn an_unknown_report_type_shows_the_usage() {
    let bot = bot();

    bot.say(ADA, "/set_type verbose").await;

    assert_eq!(bot.channel.last_text_to(ADA), messages::TYPE_USAGE);
}

#[tokio::test]
async fn toggles_flip_a_single_slot() {
    // arrange
    let registry = InMemoryRegistry::with(vec![subscriber(
        ADA,
        Some("London"),
        NotificationPreferences::default(),
    )]);
    let bot = TestBot::new(registry, FakeGateway::default());

    // act
    bot.say(ADA, "/toggle_morning").await;
    bot.say(ADA, "/toggle_evening").await;

    // assert
    let preferences = bot.registry.record(ADA).unwrap().preferences.unwrap();
    assert!(!preferences.send_morning);
    assert!(preferences.send_evening);
    assert_eq!(preferences.morning_time, "08:00");
}

#[tokio::test]
async fn unsubscribing_deactivates_the_user() {
    let registry = InMemoryRegistry::with(vec![subscriber(
        ADA,
        Some("London"),
        NotificationPreferences::default(),
    )]);
    let bot = TestBot::new(registry, FakeGateway::default());

    bot.say(ADA, "/unsubscribe").await;

    assert!(!bot.registry.record(ADA).unwrap().is_active);
    assert_eq!(bot.channel.last_text_to(ADA), messages::UNSUBSCRIBED);
}

#[tokio::test]
async fn settings_for_an_unknown_user_point_to_subscribe() {
    let bot = bot();

    bot.say(ADA, "/settings").await;

    assert_eq!(bot.channel.last_text_to(ADA), messages::NOT_SUBSCRIBED);
}

#[tokio::test]
async fn plain_text_is_a_brief_lookup() {
    let bot = bot();

    bot.say(ADA, "London").await;

    let reply = bot.channel.sent().pop().unwrap();
    assert_eq!(reply.mode, RenderMode::Markdown);
    assert!(reply.text.starts_with("🌍 *Weather in London*"));
    assert!(bot.registry.record(ADA).is_none());
}

#[tokio::test]
async fn my_weather_answers_in_the_chat_it_was_asked_in() {
    // arrange
    let bot = bot();
    let group = -1001;
    bot.registry
        .insert(subscriber(ADA, Some("London"), NotificationPreferences::default()));

    // act
    bot.say_in_group(group, ADA, "/my_weather").await;

    // assert
    assert_eq!(bot.channel.typing(), vec![group]);
    let recipients: Vec<_> = bot.channel.sent().into_iter().map(|m| m.chat_id).collect();
    assert_eq!(recipients, vec![group]);
    assert!(bot.channel.last_text_to(group).starts_with("🌍 *Weather in London*"));
}

#[tokio::test]
async fn weather_without_a_city_shows_the_usage() {
    let bot = bot();

    bot.say(ADA, "/weather").await;

    assert_eq!(bot.channel.last_text_to(ADA), messages::WEATHER_USAGE);
}

#[tokio::test]
async fn forecast_without_a_city_asks_for_one() {
    let bot = bot();

    bot.say(ADA, "/forecast@weather_bot").await;
    bot.say(ADA, "Oslo").await;

    assert!(bot.channel.last_text_to(ADA).contains("Detailed forecast"));
    assert_eq!(bot.handler.session(ADA), SessionState::Idle);
}

#[tokio::test]
async fn the_test_notification_needs_a_city() {
    let bot = bot();
    bot.say(ADA, "/subscribe").await;

    bot.say(ADA, "/test_notification").await;

    assert_eq!(bot.channel.last_text_to(ADA), messages::NO_CITY);
}

#[tokio::test]
async fn the_test_notification_is_announced_then_sent() {
    let registry = InMemoryRegistry::with(vec![subscriber(
        ADA,
        Some("London"),
        NotificationPreferences::default(),
    )]);
    let bot = TestBot::new(registry, FakeGateway::knowing(&["London"]));

    bot.say(ADA, "/test_notification").await;

    let texts = bot.channel.texts_to(ADA);
    assert_eq!(texts[0], messages::SENDING_TEST);
    assert!(texts[1].contains("Weather in London"));
}

#[tokio::test]
async fn unknown_commands_point_to_help() {
    let bot = bot();

    bot.say(ADA, "/frobnicate").await;

    assert_eq!(bot.channel.last_text_to(ADA), messages::UNKNOWN_COMMAND);
}
