//! Durable store of subscribers and their notification preferences.
//!
//! Every operation reports failure through its return value (`false`, `None`
//! or an empty list) after logging it; callers never see storage errors.

mod postgres;

use crate::domain::{
    City, NotificationTime, PreferenceUpdate, SubscriberProfile, SubscriberRecord, UserId,
};
use async_trait::async_trait;
pub use postgres::{PgRegistry, RegistryError};

#[async_trait]
pub trait SubscriberRegistry: Send + Sync {
    /// Creates the subscriber with default preferences, or refreshes its
    /// display fields and re-activates it. City and preferences are kept.
    async fn upsert_subscriber(&self, profile: &SubscriberProfile) -> bool;

    /// Returns whether a subscriber row existed.
    async fn set_city(&self, user_id: UserId, city: &City) -> bool;

    async fn get_subscriber(&self, user_id: UserId) -> Option<SubscriberRecord>;

    /// Applies the city and preference changes atomically. Returns `false`
    /// when nothing was written, including when the subscriber is unknown.
    async fn update_preferences(&self, user_id: UserId, update: &PreferenceUpdate) -> bool;

    /// Active subscribers with a city and an enabled slot at `now`, each at most once.
    async fn list_due_subscribers(&self, now: &NotificationTime) -> Vec<SubscriberRecord>;

    async fn list_active_with_city(&self) -> Vec<SubscriberRecord>;

    /// Returns whether a subscriber row existed.
    async fn deactivate(&self, user_id: UserId) -> bool;
}
