// Orchestration of the caption workflow: photo -> candidates -> pick -> refine/save.
//
// Channel-agnostic: handlers turn these outcomes into Telegram messages.

use crate::caption::{
    FallbackPicker, PreferencesPatch, RefineDirection, UserPreferences, VibeAnalysis, generator,
    refine, rerank, vibe,
};
use crate::model::{GenerativeModel, ModelError, with_timeout};
use crate::quota::{Admission, Denial, QuotaPolicy, QuotaTracker};
use crate::session::{SessionRegistry, SessionState, StaleAction};
use crate::store::{FavoriteCaption, PreferenceStore, QuotaRecord, StoreError};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub const SHOWN_VARIANTS: usize = rerank::TOP_N;
pub const FAVORITES_PAGE: u32 = 10;

/// A fresh batch ready to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub batch_id: String,
    pub variants: Vec<String>,
    pub quota_left: u32,
    pub rerank_enabled: bool,
    /// True when the variants came from the static pool after a backend failure.
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Presented(Presentation),
    Unsafe,
    Denied(Denial),
    NeedsPhoto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Selected(String),
    Stale(StaleAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefineOutcome {
    Refined(String),
    Denied(Denial),
    NothingSelected,
    /// The model call failed; the previous caption is still selected.
    Failed { kept: String },
    /// A newer batch replaced the one being refined.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteOutcome {
    Saved { text: String, total: i64 },
    NothingSelected,
}

pub struct CaptionService {
    store: Arc<dyn PreferenceStore>,
    model: Arc<dyn GenerativeModel>,
    quota: QuotaTracker,
    sessions: SessionRegistry,
    fallback: FallbackPicker,
    fetch_timeout: Duration,
    clock: Clock,
}

impl CaptionService {
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        model: Arc<dyn GenerativeModel>,
        policy: QuotaPolicy,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            quota: QuotaTracker::new(store.clone(), policy),
            store,
            model,
            sessions: SessionRegistry::new(),
            fallback: FallbackPicker::new(),
            fetch_timeout,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn session_state(&self, user_id: i64) -> SessionState {
        self.sessions.with(user_id, |s| s.state())
    }

    pub fn selected_caption(&self, user_id: i64) -> Option<String> {
        self.sessions.with(user_id, |s| s.selected().map(str::to_string))
    }

    pub fn fallback_caption(&self, user_id: i64) -> String {
        self.fallback.pick(user_id)
    }

    pub async fn preferences(&self, user_id: i64) -> Result<UserPreferences, StoreError> {
        self.store.get_or_create_preferences(user_id).await
    }

    /// `/start`: make sure preferences exist and forget the previous photo and batch.
    pub async fn start(&self, user_id: i64) -> Result<UserPreferences, StoreError> {
        let prefs = self.store.get_or_create_preferences(user_id).await?;
        self.store.clear_last_analysis(user_id).await?;
        self.sessions.with(user_id, |s| s.reset());
        Ok(prefs)
    }

    /// Settings wizard finished; the next expected input is a photo.
    pub fn finish_settings(&self, user_id: i64) {
        self.sessions.with(user_id, |s| s.await_photo());
    }

    /// Persist a settings change. Style changes drop candidates made under the old style.
    pub async fn apply_setting(
        &self,
        user_id: i64,
        patch: &PreferencesPatch,
    ) -> Result<UserPreferences, StoreError> {
        let prefs = self.store.update_preferences(user_id, patch).await?;
        if patch.changes_style() {
            self.sessions.with(user_id, |s| s.invalidate_candidates());
        }
        Ok(prefs)
    }

    pub async fn has_analysis(&self, user_id: i64) -> Result<bool, StoreError> {
        Ok(self.store.load_last_analysis(user_id).await?.is_some())
    }

    pub async fn quota_status(&self, user_id: i64) -> Result<(QuotaRecord, u32), StoreError> {
        let record = self.quota.status(user_id, self.now()).await?;
        Ok((record, self.quota.policy().daily_limit))
    }

    pub async fn quota_left(&self, user_id: i64) -> Result<u32, StoreError> {
        self.quota.remaining(user_id, self.now()).await
    }

    /// Photo received: admit, fetch, analyze, then generate unless the photo is unsafe.
    ///
    /// The request is counted as soon as it is admitted, before any model call.
    pub async fn process_photo<F, E>(&self, user_id: i64, fetch: F) -> Result<GenerationOutcome, StoreError>
    where
        F: Future<Output = Result<Vec<u8>, E>>,
        E: Display,
    {
        let prefs = self.store.get_or_create_preferences(user_id).await?;

        if let Admission::Denied(denial) = self.quota.try_acquire(user_id, self.now()).await? {
            debug!("Photo from user {user_id} denied: {denial:?}");
            return Ok(GenerationOutcome::Denied(denial));
        }

        let fetched = with_timeout(self.fetch_timeout, async {
            fetch.await.map_err(|e| ModelError::Transport(e.to_string()))
        })
        .await;
        let bytes = match fetched {
            Ok(b) => b,
            Err(e) => {
                error!("Photo download failed for user {user_id}: {e}");
                // The stored analysis belongs to an earlier photo; "more" must not reuse it.
                self.store.clear_last_analysis(user_id).await?;
                return self.present_fallback(user_id, &prefs).await.map(GenerationOutcome::Presented);
            }
        };

        let analysis = vibe::analyze(self.model.as_ref(), &bytes).await;

        if !analysis.is_safe() {
            info!("Photo from user {user_id} rejected as unsafe");
            self.store.clear_last_analysis(user_id).await?;
            self.sessions.with(user_id, |s| {
                s.reset();
                s.await_photo();
            });
            return Ok(GenerationOutcome::Unsafe);
        }

        self.store.save_last_analysis(user_id, &analysis).await?;
        self.generate_and_present(user_id, &analysis, &prefs)
            .await
            .map(GenerationOutcome::Presented)
    }

    /// "More variants": new candidates for the stored analysis, no new photo needed.
    pub async fn more_variants(&self, user_id: i64) -> Result<GenerationOutcome, StoreError> {
        let Some(analysis) = self.store.load_last_analysis(user_id).await? else {
            return Ok(GenerationOutcome::NeedsPhoto);
        };

        if let Admission::Denied(denial) = self.quota.try_acquire(user_id, self.now()).await? {
            debug!("More variants for user {user_id} denied: {denial:?}");
            return Ok(GenerationOutcome::Denied(denial));
        }

        let prefs = self.store.get_or_create_preferences(user_id).await?;

        // Spare candidates from the previous generation are served first.
        let queued = self.sessions.with(user_id, |s| s.serve_reserve(SHOWN_VARIANTS));
        if let Some(batch) = queued {
            debug!("Serving queued candidates to user {user_id}");
            return Ok(GenerationOutcome::Presented(Presentation {
                batch_id: batch.id,
                variants: batch.variants,
                quota_left: self.quota_left(user_id).await?,
                rerank_enabled: prefs.rerank_enabled,
                degraded: false,
            }));
        }

        self.generate_and_present(user_id, &analysis, &prefs)
            .await
            .map(GenerationOutcome::Presented)
    }

    async fn generate_and_present(
        &self,
        user_id: i64,
        analysis: &VibeAnalysis,
        prefs: &UserPreferences,
    ) -> Result<Presentation, StoreError> {
        let candidates = generator::generate(
            self.model.as_ref(),
            analysis,
            prefs,
            generator::DEFAULT_CANDIDATES,
        )
        .await;
        let degraded = candidates.is_empty();
        if degraded {
            warn!("No usable candidates for user {user_id}, using fallback pool");
        }

        let shown = if prefs.rerank_enabled && candidates.len() >= SHOWN_VARIANTS {
            rerank::rerank(self.model.as_ref(), &candidates, analysis, &self.fallback, user_id).await
        } else {
            rerank::first_three(&candidates, &self.fallback, user_id)
        };

        let shown_keys: HashSet<String> = shown.iter().map(|c| c.to_lowercase()).collect();
        let reserve = candidates
            .into_iter()
            .filter(|c| !shown_keys.contains(&c.to_lowercase()))
            .collect();

        let batch = self.sessions.with(user_id, |s| s.install_batch(shown, reserve));
        Ok(Presentation {
            batch_id: batch.id,
            variants: batch.variants,
            quota_left: self.quota_left(user_id).await?,
            rerank_enabled: prefs.rerank_enabled,
            degraded,
        })
    }

    async fn present_fallback(
        &self,
        user_id: i64,
        prefs: &UserPreferences,
    ) -> Result<Presentation, StoreError> {
        let mut variants = Vec::with_capacity(SHOWN_VARIANTS);
        self.fallback.pad(user_id, &mut variants, SHOWN_VARIANTS);
        let batch = self.sessions.with(user_id, |s| s.install_batch(variants, Vec::new()));
        Ok(Presentation {
            batch_id: batch.id,
            variants: batch.variants,
            quota_left: self.quota_left(user_id).await?,
            rerank_enabled: prefs.rerank_enabled,
            degraded: true,
        })
    }

    pub fn pick(&self, user_id: i64, batch_id: &str, index: usize) -> PickOutcome {
        match self.sessions.with(user_id, |s| s.pick(batch_id, index)) {
            Ok(caption) => PickOutcome::Selected(caption),
            Err(stale) => {
                debug!("Stale pick from user {user_id}: {stale:?}");
                PickOutcome::Stale(stale)
            }
        }
    }

    pub async fn refine(&self, user_id: i64, direction: RefineDirection) -> Result<RefineOutcome, StoreError> {
        if self.selected_caption(user_id).is_none() {
            return Ok(RefineOutcome::NothingSelected);
        }

        if let Admission::Denied(denial) = self.quota.try_acquire(user_id, self.now()).await? {
            return Ok(RefineOutcome::Denied(denial));
        }

        // Loaded before entering Refining so a store error cannot leave the session stuck there.
        let prefs = self.store.get_or_create_preferences(user_id).await?;

        let Ok((batch_id, caption)) = self.sessions.with(user_id, |s| s.begin_refine()) else {
            return Ok(RefineOutcome::NothingSelected);
        };
        match refine::rewrite(self.model.as_ref(), &caption, direction, &prefs).await {
            Ok(text) => {
                let applied = self
                    .sessions
                    .with(user_id, |s| s.finish_refine(&batch_id, Some(text.clone())));
                Ok(match applied {
                    Ok(()) => RefineOutcome::Refined(text),
                    Err(_) => RefineOutcome::Superseded,
                })
            }
            Err(e) => {
                warn!("Refine failed for user {user_id}: {e}");
                let _ = self.sessions.with(user_id, |s| s.finish_refine(&batch_id, None));
                Ok(RefineOutcome::Failed { kept: caption })
            }
        }
    }

    pub async fn save_favorite(&self, user_id: i64) -> Result<FavoriteOutcome, StoreError> {
        let Some(text) = self.selected_caption(user_id) else {
            return Ok(FavoriteOutcome::NothingSelected);
        };
        self.store.add_favorite(user_id, &text).await?;
        let total = self.store.count_favorites(user_id).await?;
        Ok(FavoriteOutcome::Saved { text, total })
    }

    pub async fn favorites(&self, user_id: i64) -> Result<(Vec<FavoriteCaption>, i64), StoreError> {
        let list = self.store.list_favorites(user_id, FAVORITES_PAGE).await?;
        let total = self.store.count_favorites(user_id).await?;
        Ok((list, total))
    }
}
