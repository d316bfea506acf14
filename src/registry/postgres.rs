use crate::configuration::DatabaseSettings;
use crate::domain::{
    City, NotificationTime, PreferenceUpdate, SubscriberProfile, SubscriberRecord, UserId,
};
use crate::errors::error_chain_fmt;
use crate::models::{
    NewNotificationSettings, NewUser, NotificationSettings, NotificationSettingsChangeset, User,
};
use crate::registry::SubscriberRegistry;
use crate::schema::{notification_settings, users};
use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::upsert::excluded;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use diesel::{
    BoolExpressionMethods, Connection, ExpressionMethods, OptionalExtension, PgConnection,
    QueryDsl, QueryResult, RunQueryDsl,
};
use secrecy::ExposeSecret;

embed_migrations!("migrations");

/// PostgreSQL-backed registry.
///
/// Diesel is synchronous, so every query runs on the blocking thread pool with
/// a connection checked out of a bounded r2d2 pool. Clones share the pool.
#[derive(Clone)]
pub struct PgRegistry {
    pool: Pool<ConnectionManager<PgConnection>>,
}

#[derive(thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to check a connection out of the pool.")]
    Pool(#[from] PoolError),
    #[error("The database query failed.")]
    Query(#[from] diesel::result::Error),
    #[error("Failed to run the schema migrations.")]
    Migration(#[from] diesel_migrations::RunMigrationsError),
    #[error("The blocking database task did not run to completion.")]
    Join(#[from] tokio::task::JoinError),
}

impl std::fmt::Debug for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl PgRegistry {
    /// Builds the pool. Fails when the database cannot be reached.
    pub fn connect(settings: &DatabaseSettings) -> Result<PgRegistry, RegistryError> {
        let manager =
            ConnectionManager::<PgConnection>::new(settings.connection_string().expose_secret());
        let pool = Pool::builder()
            .max_size(settings.max_connections)
            .connection_timeout(settings.connection_timeout())
            .build(manager)?;
        Ok(Self { pool })
    }

    /// Creates both tables if they are missing.
    #[tracing::instrument(name = "Running schema migrations", skip(self))]
    pub async fn run_migrations(&self) -> Result<(), RegistryError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<(), RegistryError> {
            let conn = pool.get()?;
            embedded_migrations::run(&*conn)?;
            Ok(())
        })
        .await?
    }

    async fn run<F, T>(&self, query: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&PgConnection) -> QueryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T, RegistryError> {
            let conn = pool.get()?;
            Ok(query(&conn)?)
        })
        .await?
    }
}

/// Logs a failed registry call and keeps only the value.
fn or_log<T>(result: Result<T, RegistryError>, operation: &'static str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::error!(
                error.cause_chain = ?error,
                "Registry operation '{}' failed",
                operation
            );
            None
        }
    }
}

#[async_trait]
impl SubscriberRegistry for PgRegistry {
    #[tracing::instrument(
        name = "Saving subscriber details in the database",
        skip(self, profile),
        fields(user_id = %profile.user_id)
    )]
    async fn upsert_subscriber(&self, profile: &SubscriberProfile) -> bool {
        let profile = profile.clone();
        let result = self.run(move |conn| upsert_subscriber(conn, &profile)).await;
        or_log(result, "upsert_subscriber").is_some()
    }

    #[tracing::instrument(name = "Updating subscriber city", skip(self, city))]
    async fn set_city(&self, user_id: UserId, city: &City) -> bool {
        let city = city.as_ref().to_string();
        let result = self
            .run(move |conn| {
                diesel::update(users::table.find(user_id))
                    .set((users::city.eq(city), users::updated_at.eq(Utc::now())))
                    .execute(conn)
            })
            .await;
        or_log(result, "set_city").map_or(false, |rows| rows > 0)
    }

    #[tracing::instrument(name = "Fetching a subscriber", skip(self))]
    async fn get_subscriber(&self, user_id: UserId) -> Option<SubscriberRecord> {
        let result = self
            .run(move |conn| {
                users::table
                    .left_join(notification_settings::table)
                    .filter(users::user_id.eq(user_id))
                    .first::<(User, Option<NotificationSettings>)>(conn)
                    .optional()
            })
            .await;
        or_log(result, "get_subscriber")
            .flatten()
            .map(SubscriberRecord::from)
    }

    #[tracing::instrument(name = "Updating notification preferences", skip(self, update))]
    async fn update_preferences(&self, user_id: UserId, update: &PreferenceUpdate) -> bool {
        let update = update.clone();
        let result = self
            .run(move |conn| update_preferences(conn, user_id, &update))
            .await;
        or_log(result, "update_preferences").unwrap_or(false)
    }

    #[tracing::instrument(
        name = "Listing subscribers due a notification",
        skip(self, now),
        fields(now = %now)
    )]
    async fn list_due_subscribers(&self, now: &NotificationTime) -> Vec<SubscriberRecord> {
        let now = now.as_ref().to_string();
        let result = self.run(move |conn| due_subscribers(conn, &now)).await;
        or_log(result, "list_due_subscribers")
            .unwrap_or_default()
            .into_iter()
            .map(|(user, settings)| SubscriberRecord::from((user, Some(settings))))
            .collect()
    }

    #[tracing::instrument(name = "Listing active subscribers with a city", skip(self))]
    async fn list_active_with_city(&self) -> Vec<SubscriberRecord> {
        let result = self
            .run(|conn| {
                users::table
                    .left_join(notification_settings::table)
                    .filter(users::is_active.eq(true))
                    .filter(users::city.is_not_null())
                    .order(users::user_id)
                    .load::<(User, Option<NotificationSettings>)>(conn)
            })
            .await;
        or_log(result, "list_active_with_city")
            .unwrap_or_default()
            .into_iter()
            .map(SubscriberRecord::from)
            .collect()
    }

    #[tracing::instrument(name = "Deactivating a subscriber", skip(self))]
    async fn deactivate(&self, user_id: UserId) -> bool {
        let result = self
            .run(move |conn| {
                diesel::update(users::table.find(user_id))
                    .set((users::is_active.eq(false), users::updated_at.eq(Utc::now())))
                    .execute(conn)
            })
            .await;
        or_log(result, "deactivate").map_or(false, |rows| rows > 0)
    }
}

fn upsert_subscriber(conn: &PgConnection, profile: &SubscriberProfile) -> QueryResult<()> {
    let now = Utc::now();
    conn.transaction(|| {
        diesel::insert_into(users::table)
            .values(&NewUser {
                user_id: profile.user_id,
                username: profile.username.as_deref(),
                first_name: profile.first_name.as_deref(),
                last_name: profile.last_name.as_deref(),
                is_active: true,
                updated_at: &now,
            })
            .on_conflict(users::user_id)
            .do_update()
            .set((
                users::username.eq(excluded(users::username)),
                users::first_name.eq(excluded(users::first_name)),
                users::last_name.eq(excluded(users::last_name)),
                users::is_active.eq(true),
                users::updated_at.eq(now),
            ))
            .execute(conn)?;
        ensure_notification_settings(conn, profile.user_id)?;
        Ok(())
    })
}

fn ensure_notification_settings(conn: &PgConnection, user_id: UserId) -> QueryResult<usize> {
    diesel::insert_into(notification_settings::table)
        .values(&NewNotificationSettings { user_id })
        .on_conflict_do_nothing()
        .execute(conn)
}

fn update_preferences(
    conn: &PgConnection,
    user_id: UserId,
    update: &PreferenceUpdate,
) -> QueryResult<bool> {
    let now = Utc::now();
    conn.transaction(|| {
        let target = users::table.find(user_id);
        let touched = match &update.city {
            Some(city) => diesel::update(target)
                .set((users::city.eq(city.as_ref()), users::updated_at.eq(now)))
                .execute(conn)?,
            None => diesel::update(target)
                .set(users::updated_at.eq(now))
                .execute(conn)?,
        };
        if touched == 0 {
            return Ok(false);
        }

        let changeset = NotificationSettingsChangeset {
            morning_time: update.morning_time.as_ref().map(|t| t.as_ref()),
            evening_time: update.evening_time.as_ref().map(|t| t.as_ref()),
            send_morning: update.send_morning,
            send_evening: update.send_evening,
            weather_type: update.weather_type.map(|t| t.as_str()),
        };
        if !changeset.is_empty() {
            ensure_notification_settings(conn, user_id)?;
            diesel::update(notification_settings::table.find(user_id))
                .set(&changeset)
                .execute(conn)?;
        }
        Ok(true)
    })
}

fn due_subscribers(
    conn: &PgConnection,
    now: &str,
) -> QueryResult<Vec<(User, NotificationSettings)>> {
    use crate::schema::notification_settings as ns;

    // One row per user: both tables are keyed on user_id.
    users::table
        .inner_join(ns::table)
        .filter(users::is_active.eq(true))
        .filter(users::city.is_not_null())
        .filter(
            ns::send_morning
                .eq(true)
                .and(ns::morning_time.eq(now))
                .or(ns::send_evening.eq(true).and(ns::evening_time.eq(now))),
        )
        .order(users::user_id)
        .load::<(User, NotificationSettings)>(conn)
}
