// Preference Store: durable per-user settings, quota counters, last analysis and favorites.

mod sqlite;
pub use sqlite::SqliteStore;

use crate::caption::{PreferencesPatch, UserPreferences, VibeAnalysis};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored analysis could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

/// Daily request counters for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaRecord {
    pub day: NaiveDate,
    pub requests_used: u32,
    pub last_request_at: Option<DateTime<Utc>>,
    pub lifetime_requests_used: u64,
}

impl QuotaRecord {
    pub fn fresh(day: NaiveDate) -> Self {
        Self {
            day,
            requests_used: 0,
            last_request_at: None,
            lifetime_requests_used: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteCaption {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Every write is a single statement, so it is atomic per user key.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_or_create_preferences(&self, user_id: i64) -> Result<UserPreferences, StoreError>;

    async fn update_preferences(
        &self,
        user_id: i64,
        patch: &PreferencesPatch,
    ) -> Result<UserPreferences, StoreError>;

    /// The user's quota record, created for `day` if the user has none yet.
    ///
    /// The returned record may belong to an earlier day; rollover is the quota tracker's job.
    async fn get_quota(&self, user_id: i64, day: NaiveDate) -> Result<QuotaRecord, StoreError>;

    async fn update_quota(&self, user_id: i64, record: &QuotaRecord) -> Result<(), StoreError>;

    async fn save_last_analysis(&self, user_id: i64, analysis: &VibeAnalysis) -> Result<(), StoreError>;

    async fn load_last_analysis(&self, user_id: i64) -> Result<Option<VibeAnalysis>, StoreError>;

    async fn clear_last_analysis(&self, user_id: i64) -> Result<(), StoreError>;

    async fn add_favorite(&self, user_id: i64, text: &str) -> Result<FavoriteCaption, StoreError>;

    /// Most recent first.
    async fn list_favorites(&self, user_id: i64, limit: u32) -> Result<Vec<FavoriteCaption>, StoreError>;

    async fn count_favorites(&self, user_id: i64) -> Result<i64, StoreError>;
}
