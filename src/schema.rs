table! {
    users (user_id) {
        user_id -> Int8,
        username -> Nullable<Varchar>,
        first_name -> Nullable<Varchar>,
        last_name -> Nullable<Varchar>,
        city -> Nullable<Varchar>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    notification_settings (user_id) {
        user_id -> Int8,
        morning_time -> Varchar,
        evening_time -> Varchar,
        send_morning -> Bool,
        send_evening -> Bool,
        weather_type -> Varchar,
    }
}

joinable!(notification_settings -> users (user_id));

allow_tables_to_appear_in_same_query!(notification_settings, users);
