// SQLite implementation of the Preference Store on top of sqlx.

use super::{FavoriteCaption, PreferenceStore, QuotaRecord, StoreError};
use crate::caption::{PreferencesPatch, UserPreferences, VibeAnalysis};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    Row,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
};
use std::str::FromStr;
use tracing::{info, warn};

const DAY_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY,
        gender TEXT NOT NULL DEFAULT 'universal',
        length TEXT NOT NULL DEFAULT 'medium',
        mode TEXT NOT NULL DEFAULT 'clean',
        adult_ok INTEGER NOT NULL DEFAULT 0,
        tone TEXT NOT NULL DEFAULT 'instagram',
        lang TEXT NOT NULL DEFAULT 'en',
        super_mode INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quota (
        user_id INTEGER PRIMARY KEY,
        day TEXT NOT NULL,
        used INTEGER NOT NULL DEFAULT 0,
        last_ts INTEGER,
        total_used INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS last_analysis (
        user_id INTEGER PRIMARY KEY,
        analysis_json TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS favorites (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        caption TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS favorites_user_idx ON favorites (user_id, id DESC)",
];

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `database_url` (e.g. `sqlite://data.db`), creating the file and schema if needed.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        info!("Preference store ready ({database_url})");
        Ok(store)
    }

    // A private in-memory database; one connection so every query sees the same data.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn from_ms(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| StoreError::Corrupt(format!("timestamp {ms}")))
}

// Unknown enum values (e.g. from an older release) degrade to the default.
fn parse_or_default<T: FromStr + Default>(raw: &str, column: &str) -> T {
    raw.parse().unwrap_or_else(|_| {
        warn!("Unknown value {raw:?} in users.{column}, using default");
        T::default()
    })
}

fn row_to_preferences(row: &SqliteRow) -> Result<UserPreferences, StoreError> {
    Ok(UserPreferences {
        gender_style: parse_or_default(&row.try_get::<String, _>("gender")?, "gender"),
        length: parse_or_default(&row.try_get::<String, _>("length")?, "length"),
        content_mode: parse_or_default(&row.try_get::<String, _>("mode")?, "mode"),
        adult_confirmed: row.try_get("adult_ok")?,
        tone: parse_or_default(&row.try_get::<String, _>("tone")?, "tone"),
        language: parse_or_default(&row.try_get::<String, _>("lang")?, "lang"),
        rerank_enabled: row.try_get("super_mode")?,
    })
}

fn row_to_quota(row: &SqliteRow) -> Result<QuotaRecord, StoreError> {
    let day_raw: String = row.try_get("day")?;
    let day = NaiveDate::parse_from_str(&day_raw, DAY_FORMAT)
        .map_err(|_| StoreError::Corrupt(format!("quota day {day_raw:?}")))?;
    let last_ts: Option<i64> = row.try_get("last_ts")?;
    let used: i64 = row.try_get("used")?;
    let total: i64 = row.try_get("total_used")?;
    Ok(QuotaRecord {
        day,
        requests_used: u32::try_from(used).unwrap_or_default(),
        last_request_at: last_ts.map(from_ms).transpose()?,
        lifetime_requests_used: u64::try_from(total).unwrap_or_default(),
    })
}

fn row_to_favorite(row: &SqliteRow) -> Result<FavoriteCaption, StoreError> {
    Ok(FavoriteCaption {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        text: row.try_get("caption")?,
        created_at: from_ms(row.try_get("created_at")?)?,
    })
}

#[async_trait]
impl PreferenceStore for SqliteStore {
    async fn get_or_create_preferences(&self, user_id: i64) -> Result<UserPreferences, StoreError> {
        let ts = now_ms();
        sqlx::query("INSERT OR IGNORE INTO users (user_id, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(ts)
            .bind(ts)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        row_to_preferences(&row)
    }

    async fn update_preferences(
        &self,
        user_id: i64,
        patch: &PreferencesPatch,
    ) -> Result<UserPreferences, StoreError> {
        self.get_or_create_preferences(user_id).await?;

        // One statement: untouched columns keep their value via COALESCE.
        sqlx::query(
            r#"
            UPDATE users SET
                gender = COALESCE(?, gender),
                length = COALESCE(?, length),
                mode = COALESCE(?, mode),
                adult_ok = COALESCE(?, adult_ok),
                tone = COALESCE(?, tone),
                lang = COALESCE(?, lang),
                super_mode = COALESCE(?, super_mode),
                updated_at = ?
            WHERE user_id = ?
            "#,
        )
        .bind(patch.gender_style.map(|v| v.as_ref().to_string()))
        .bind(patch.length.map(|v| v.as_ref().to_string()))
        .bind(patch.content_mode.map(|v| v.as_ref().to_string()))
        .bind(patch.adult_confirmed)
        .bind(patch.tone.map(|v| v.as_ref().to_string()))
        .bind(patch.language.map(|v| v.as_ref().to_string()))
        .bind(patch.rerank_enabled)
        .bind(now_ms())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        self.get_or_create_preferences(user_id).await
    }

    async fn get_quota(&self, user_id: i64, day: NaiveDate) -> Result<QuotaRecord, StoreError> {
        sqlx::query("INSERT OR IGNORE INTO quota (user_id, day, used, last_ts, total_used) VALUES (?, ?, 0, NULL, 0)")
            .bind(user_id)
            .bind(day.format(DAY_FORMAT).to_string())
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT * FROM quota WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        row_to_quota(&row)
    }

    async fn update_quota(&self, user_id: i64, record: &QuotaRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO quota (user_id, day, used, last_ts, total_used)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                day = excluded.day,
                used = excluded.used,
                last_ts = excluded.last_ts,
                total_used = excluded.total_used
            "#,
        )
        .bind(user_id)
        .bind(record.day.format(DAY_FORMAT).to_string())
        .bind(i64::from(record.requests_used))
        .bind(record.last_request_at.map(|t| t.timestamp_millis()))
        .bind(i64::try_from(record.lifetime_requests_used).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_last_analysis(&self, user_id: i64, analysis: &VibeAnalysis) -> Result<(), StoreError> {
        let json = serde_json::to_string(analysis)?;
        sqlx::query(
            r#"
            INSERT INTO last_analysis (user_id, analysis_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                analysis_json = excluded.analysis_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(json)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_last_analysis(&self, user_id: i64) -> Result<Option<VibeAnalysis>, StoreError> {
        let row = sqlx::query("SELECT analysis_json FROM last_analysis WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("analysis_json")?;
        match serde_json::from_str(&raw) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                // Treat an unreadable row like no analysis at all.
                warn!("Discarding unreadable analysis for user {user_id}: {e}");
                Ok(None)
            }
        }
    }

    async fn clear_last_analysis(&self, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM last_analysis WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_favorite(&self, user_id: i64, text: &str) -> Result<FavoriteCaption, StoreError> {
        let row = sqlx::query(
            "INSERT INTO favorites (user_id, caption, created_at) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(user_id)
        .bind(text)
        .bind(now_ms())
        .fetch_one(&self.pool)
        .await?;
        row_to_favorite(&row)
    }

    async fn list_favorites(&self, user_id: i64, limit: u32) -> Result<Vec<FavoriteCaption>, StoreError> {
        let rows = sqlx::query("SELECT * FROM favorites WHERE user_id = ? ORDER BY id DESC LIMIT ?")
            .bind(user_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_favorite).collect()
    }

    async fn count_favorites(&self, user_id: i64) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM favorites WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::{ContentMode, Tone};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DAY_FORMAT).unwrap()
    }

    #[tokio::test]
    async fn preferences_are_created_with_defaults() {
        let store = SqliteStore::in_memory().await.unwrap();
        let prefs = store.get_or_create_preferences(1).await.unwrap();
        assert_eq!(prefs, UserPreferences::default());
    }

    #[tokio::test]
    async fn partial_update_touches_only_given_fields() {
        let store = SqliteStore::in_memory().await.unwrap();
        let patch = PreferencesPatch {
            tone: Some(Tone::Poetic),
            rerank_enabled: Some(true),
            ..Default::default()
        };
        let prefs = store.update_preferences(5, &patch).await.unwrap();
        assert_eq!(prefs.tone, Tone::Poetic);
        assert!(prefs.rerank_enabled);
        assert_eq!(prefs.content_mode, ContentMode::Clean);

        let prefs = store
            .update_preferences(5, &PreferencesPatch::content(ContentMode::Adult))
            .await
            .unwrap();
        assert_eq!(prefs.tone, Tone::Poetic);
        assert_eq!(prefs.content_mode, ContentMode::Adult);
        assert!(prefs.adult_confirmed);
    }

    #[tokio::test]
    async fn quota_is_created_lazily_and_round_trips() {
        let store = SqliteStore::in_memory().await.unwrap();
        let rec = store.get_quota(9, day("2026-03-01")).await.unwrap();
        assert_eq!(rec, QuotaRecord::fresh(day("2026-03-01")));

        let updated = QuotaRecord {
            day: day("2026-03-01"),
            requests_used: 4,
            last_request_at: DateTime::from_timestamp_millis(1_772_000_000_123),
            lifetime_requests_used: 57,
        };
        store.update_quota(9, &updated).await.unwrap();

        // Asking with a later day returns the stored record untouched.
        let back = store.get_quota(9, day("2026-03-02")).await.unwrap();
        assert_eq!(back, updated);
    }

    #[tokio::test]
    async fn analysis_is_last_write_wins() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert_eq!(store.load_last_analysis(3).await.unwrap(), None);

        let mut a = VibeAnalysis::neutral();
        store.save_last_analysis(3, &a).await.unwrap();
        a.mood = "drive".into();
        store.save_last_analysis(3, &a).await.unwrap();
        assert_eq!(store.load_last_analysis(3).await.unwrap(), Some(a));

        store.clear_last_analysis(3).await.unwrap();
        assert_eq!(store.load_last_analysis(3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn favorites_list_newest_first_and_bounded() {
        let store = SqliteStore::in_memory().await.unwrap();
        for i in 0..12 {
            store.add_favorite(2, &format!("caption {i}")).await.unwrap();
        }
        store.add_favorite(99, "someone else").await.unwrap();

        let favs = store.list_favorites(2, 10).await.unwrap();
        assert_eq!(favs.len(), 10);
        assert_eq!(favs[0].text, "caption 11");
        assert_eq!(favs[9].text, "caption 2");
        assert!(favs.iter().all(|f| f.user_id == 2));
        assert_eq!(store.count_favorites(2).await.unwrap(), 12);
        assert_eq!(store.count_favorites(1).await.unwrap(), 0);
    }
}
