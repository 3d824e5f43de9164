// Rate limiter and daily quota tracker.

use crate::store::{PreferenceStore, QuotaRecord, StoreError};
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Cooldown { retry_after_secs: u64 },
    DailyLimit { limit: u32 },
}

impl Denial {
    pub fn message(&self) -> String {
        match self {
            Denial::Cooldown { retry_after_secs } => {
                format!("⏳ Wait {retry_after_secs} s and try again.")
            }
            Denial::DailyLimit { limit } => format!(
                "You've used all {limit} generations for today 😅\nCome back tomorrow: the limit resets at midnight."
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied(Denial),
}

#[derive(Debug, Clone, Copy)]
pub struct QuotaPolicy {
    pub daily_limit: u32,
    pub cooldown: Duration,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            daily_limit: 20,
            cooldown: Duration::from_secs(3),
        }
    }
}

/// Calendar day of `now` in the server's local time.
pub fn local_day(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

/// Bring a record to `today`: a stale day resets `requests_used`, never the lifetime total.
///
/// The single place where rollover happens. Returns true when the record changed.
pub fn normalize_for_day(record: &mut QuotaRecord, today: NaiveDate) -> bool {
    if record.day == today {
        return false;
    }
    record.day = today;
    record.requests_used = 0;
    true
}

impl QuotaPolicy {
    /// Cooldown is checked first, then the daily ceiling. Expects a normalized record.
    pub fn check(&self, record: &QuotaRecord, now: DateTime<Utc>) -> Admission {
        if let Some(last) = record.last_request_at {
            let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
            if elapsed < self.cooldown {
                let remaining = self.cooldown - elapsed;
                let retry_after_secs = remaining.as_secs_f64().ceil().max(1.0) as u64;
                return Admission::Denied(Denial::Cooldown { retry_after_secs });
            }
        }

        if record.requests_used >= self.daily_limit {
            return Admission::Denied(Denial::DailyLimit {
                limit: self.daily_limit,
            });
        }

        Admission::Allowed
    }
}

pub fn apply_request(record: &mut QuotaRecord, now: DateTime<Utc>) {
    record.requests_used = record.requests_used.saturating_add(1);
    record.lifetime_requests_used = record.lifetime_requests_used.saturating_add(1);
    record.last_request_at = Some(now);
}

/// Quota operations against the store, serialized per user.
pub struct QuotaTracker {
    store: Arc<dyn PreferenceStore>,
    policy: QuotaPolicy,
    user_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn PreferenceStore>, policy: QuotaPolicy) -> Self {
        Self {
            store,
            policy,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> QuotaPolicy {
        self.policy
    }

    fn lock_for(&self, user_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.user_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(user_id).or_default().clone()
    }

    // Clones are only made under the map lock, so a count of one means nobody else holds it.
    fn release(&self, user_id: i64, lock: Arc<tokio::sync::Mutex<()>>) {
        drop(lock);
        let mut locks = self.user_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = locks.get(&user_id)
            && Arc::strong_count(entry) == 1
        {
            locks.remove(&user_id);
        }
    }

    // Load the record and apply rollover, persisting the reset if one happened.
    async fn load_normalized(&self, user_id: i64, now: DateTime<Utc>) -> Result<QuotaRecord, StoreError> {
        let today = local_day(now);
        let mut record = self.store.get_quota(user_id, today).await?;
        if normalize_for_day(&mut record, today) {
            debug!("Quota day rolled over for user {user_id}");
            self.store.update_quota(user_id, &record).await?;
        }
        Ok(record)
    }

    /// Current (normalized) counters, for display.
    pub async fn status(&self, user_id: i64, now: DateTime<Utc>) -> Result<QuotaRecord, StoreError> {
        let lock = self.lock_for(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.load_normalized(user_id, now).await
        };
        self.release(user_id, lock);
        result
    }

    pub async fn remaining(&self, user_id: i64, now: DateTime<Utc>) -> Result<u32, StoreError> {
        let record = self.status(user_id, now).await?;
        Ok(self.policy.daily_limit.saturating_sub(record.requests_used))
    }

    pub async fn admit(&self, user_id: i64, now: DateTime<Utc>) -> Result<Admission, StoreError> {
        let lock = self.lock_for(user_id);
        let result = {
            let _guard = lock.lock().await;
            self.load_normalized(user_id, now).await
        };
        self.release(user_id, lock);
        Ok(self.policy.check(&result?, now))
    }

    /// Count one accepted generation. Call exactly once per admitted request, before the model call.
    pub async fn record(&self, user_id: i64, now: DateTime<Utc>) -> Result<QuotaRecord, StoreError> {
        let lock = self.lock_for(user_id);
        let result = async {
            let _guard = lock.lock().await;
            let mut record = self.load_normalized(user_id, now).await?;
            apply_request(&mut record, now);
            self.store.update_quota(user_id, &record).await?;
            Ok::<_, StoreError>(record)
        }
        .await;
        self.release(user_id, lock);
        result
    }

    /// `admit` and `record` under one lock, so concurrent taps cannot both slip through.
    pub async fn try_acquire(&self, user_id: i64, now: DateTime<Utc>) -> Result<Admission, StoreError> {
        let lock = self.lock_for(user_id);
        let result = async {
            let _guard = lock.lock().await;
            let mut record = self.load_normalized(user_id, now).await?;
            let admission = self.policy.check(&record, now);
            if admission == Admission::Allowed {
                apply_request(&mut record, now);
                self.store.update_quota(user_id, &record).await?;
            }
            Ok::<_, StoreError>(admission)
        }
        .await;
        self.release(user_id, lock);
        result
    }
}
