mod notification_settings;
mod user;

pub use notification_settings::*;
pub use user::*;
