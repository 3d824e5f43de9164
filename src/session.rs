// Per-user selection state: live candidate batch, picked caption, queued spares.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

const MAX_SESSIONS: usize = 10_000;
const BATCH_ID_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingPhoto,
    Presenting,
    Selected,
    Refining,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateBatch {
    pub id: String,
    pub variants: Vec<String>,
    pub selected_caption: Option<String>,
}

/// Why a user action could not be applied to the live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleAction {
    NoBatch,
    BatchMismatch,
    IndexOutOfRange,
    NothingSelected,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    batch: Option<CandidateBatch>,
    // Generated but not yet shown, served by "more variants" before a new model call.
    reserve: Vec<String>,
    // Registry tick of the last access, for eviction.
    touched: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            batch: None,
            reserve: Vec::new(),
            touched: 0,
        }
    }
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn batch(&self) -> Option<&CandidateBatch> {
        self.batch.as_ref()
    }

    pub fn reserve_len(&self) -> usize {
        self.reserve.len()
    }

    pub fn selected(&self) -> Option<&str> {
        self.batch.as_ref()?.selected_caption.as_deref()
    }

    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.batch = None;
        self.reserve.clear();
    }

    pub fn await_photo(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::AwaitingPhoto;
        }
    }

    /// Replace whatever batch was live. The previous one is discarded unconditionally.
    pub fn install_batch(&mut self, variants: Vec<String>, reserve: Vec<String>) -> CandidateBatch {
        let batch = CandidateBatch {
            id: nanoid::nanoid!(BATCH_ID_LEN),
            variants,
            selected_caption: None,
        };
        self.batch = Some(batch.clone());
        self.reserve = reserve;
        self.state = SessionState::Presenting;
        batch
    }

    /// Show the next `n` queued candidates as a new batch, if that many are waiting.
    pub fn serve_reserve(&mut self, n: usize) -> Option<CandidateBatch> {
        if self.reserve.len() < n {
            return None;
        }
        let shown: Vec<String> = self.reserve.drain(..n).collect();
        let rest = std::mem::take(&mut self.reserve);
        Some(self.install_batch(shown, rest))
    }

    pub fn pick(&mut self, batch_id: &str, index: usize) -> Result<String, StaleAction> {
        let batch = self.batch.as_mut().ok_or(StaleAction::NoBatch)?;
        if batch.id != batch_id {
            return Err(StaleAction::BatchMismatch);
        }
        let caption = batch
            .variants
            .get(index)
            .cloned()
            .ok_or(StaleAction::IndexOutOfRange)?;
        batch.selected_caption = Some(caption.clone());
        self.state = SessionState::Selected;
        Ok(caption)
    }

    /// Mark the selection as being rewritten; returns (batch id, caption) to refine.
    pub fn begin_refine(&mut self) -> Result<(String, String), StaleAction> {
        let batch = self.batch.as_ref().ok_or(StaleAction::NothingSelected)?;
        let caption = batch
            .selected_caption
            .clone()
            .ok_or(StaleAction::NothingSelected)?;
        let id = batch.id.clone();
        self.state = SessionState::Refining;
        Ok((id, caption))
    }

    /// Finish a refine. A rewrite for a batch that has since been replaced is dropped.
    pub fn finish_refine(&mut self, batch_id: &str, rewritten: Option<String>) -> Result<(), StaleAction> {
        let batch = match self.batch.as_mut() {
            Some(b) if b.id == batch_id && b.selected_caption.is_some() => b,
            _ => return Err(StaleAction::BatchMismatch),
        };
        if let Some(text) = rewritten {
            batch.selected_caption = Some(text);
        }
        self.state = SessionState::Selected;
        Ok(())
    }

    /// Style changed: nothing generated under the old settings may surface again.
    ///
    /// An unpicked batch is dropped. An existing selection survives, but its
    /// remaining variants can no longer be picked.
    pub fn invalidate_candidates(&mut self) {
        self.reserve.clear();
        match self.state {
            SessionState::Presenting => {
                self.batch = None;
                self.state = SessionState::AwaitingPhoto;
            }
            SessionState::Selected | SessionState::Refining => {
                if let Some(batch) = self.batch.as_mut() {
                    batch.variants.clear();
                }
            }
            SessionState::Idle | SessionState::AwaitingPhoto => {}
        }
    }
}

/// In-process sessions keyed by user id; lost on restart.
pub struct SessionRegistry {
    inner: Mutex<Sessions>,
    capacity: usize,
}

#[derive(Default)]
struct Sessions {
    by_user: HashMap<i64, Session>,
    tick: u64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Sessions::default()),
            capacity: capacity.max(1),
        }
    }

    /// Run `f` on the user's session atomically. Never hold this across an await.
    pub fn with<R>(&self, user_id: i64, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let inner = &mut *guard;

        if !inner.by_user.contains_key(&user_id) && inner.by_user.len() >= self.capacity {
            // Evict the least recently touched session.
            if let Some(oldest) = inner
                .by_user
                .iter()
                .min_by_key(|(_, s)| s.touched)
                .map(|(id, _)| *id)
            {
                inner.by_user.remove(&oldest);
            }
        }

        inner.tick += 1;
        let session = inner.by_user.entry(user_id).or_default();
        session.touched = inner.tick;
        f(session)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_user
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_batch_replaces_old_and_gets_fresh_id() {
        let mut s = Session::default();
        let b1 = s.install_batch(caps(&["a", "b", "c"]), vec![]);
        let b2 = s.install_batch(caps(&["d", "e", "f"]), vec![]);
        assert_ne!(b1.id, b2.id);
        assert_eq!(b1.id.len(), BATCH_ID_LEN);
        assert_eq!(s.batch().unwrap().variants, caps(&["d", "e", "f"]));
        assert_eq!(s.state(), SessionState::Presenting);
    }

    #[test]
    fn pick_on_stale_batch_leaves_selection_untouched() {
        let mut s = Session::default();
        let b1 = s.install_batch(caps(&["a", "b", "c"]), vec![]);
        assert_eq!(s.pick(&b1.id, 1), Ok("b".to_string()));

        let b2 = s.install_batch(caps(&["d", "e", "f"]), vec![]);
        assert_eq!(s.pick(&b2.id, 0), Ok("d".to_string()));
        assert_eq!(s.pick(&b1.id, 2), Err(StaleAction::BatchMismatch));
        assert_eq!(s.selected(), Some("d"));
        assert_eq!(s.pick(&b2.id, 3), Err(StaleAction::IndexOutOfRange));
        assert_eq!(s.selected(), Some("d"));
    }

    #[test]
    fn pick_without_batch_is_stale() {
        let mut s = Session::default();
        assert_eq!(s.pick("whatever", 0), Err(StaleAction::NoBatch));
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn refine_requires_a_selection_and_applies_to_same_batch_only() {
        let mut s = Session::default();
        let b1 = s.install_batch(caps(&["a", "b", "c"]), vec![]);
        assert_eq!(s.begin_refine(), Err(StaleAction::NothingSelected));

        s.pick(&b1.id, 0).unwrap();
        let (id, cap) = s.begin_refine().unwrap();
        assert_eq!(cap, "a");
        assert_eq!(s.state(), SessionState::Refining);
        s.finish_refine(&id, Some("A!".into())).unwrap();
        assert_eq!(s.selected(), Some("A!"));
        assert_eq!(s.state(), SessionState::Selected);

        // A newer batch wins over a late rewrite.
        let (old_id, _) = s.begin_refine().unwrap();
        s.install_batch(caps(&["x", "y", "z"]), vec![]);
        assert_eq!(s.finish_refine(&old_id, Some("late".into())), Err(StaleAction::BatchMismatch));
        assert_eq!(s.selected(), None);
    }

    #[test]
    fn failed_refine_keeps_previous_caption() {
        let mut s = Session::default();
        let b = s.install_batch(caps(&["a", "b", "c"]), vec![]);
        s.pick(&b.id, 2).unwrap();
        let (id, _) = s.begin_refine().unwrap();
        s.finish_refine(&id, None).unwrap();
        assert_eq!(s.selected(), Some("c"));
    }

    #[test]
    fn invalidation_drops_unpicked_batch_and_reserve() {
        let mut s = Session::default();
        let b = s.install_batch(caps(&["a", "b", "c"]), caps(&["d", "e", "f"]));
        s.invalidate_candidates();
        assert!(s.batch().is_none());
        assert_eq!(s.reserve_len(), 0);
        assert_eq!(s.state(), SessionState::AwaitingPhoto);
        assert_eq!(s.pick(&b.id, 0), Err(StaleAction::NoBatch));
    }

    #[test]
    fn invalidation_keeps_existing_selection() {
        let mut s = Session::default();
        let b = s.install_batch(caps(&["a", "b", "c"]), vec![]);
        s.pick(&b.id, 1).unwrap();
        s.invalidate_candidates();
        assert_eq!(s.selected(), Some("b"));
        assert_eq!(s.pick(&b.id, 0), Err(StaleAction::IndexOutOfRange));
    }

    #[test]
    fn reserve_is_served_in_order_as_a_new_batch() {
        let mut s = Session::default();
        let first = s.install_batch(caps(&["a", "b", "c"]), caps(&["d", "e", "f", "g"]));
        let next = s.serve_reserve(3).unwrap();
        assert_eq!(next.variants, caps(&["d", "e", "f"]));
        assert_ne!(next.id, first.id);
        assert_eq!(s.reserve_len(), 1);
        assert!(s.serve_reserve(3).is_none());
        assert_eq!(s.batch().unwrap().id, next.id);
    }

    #[test]
    fn registry_evicts_least_recently_used() {
        let reg = SessionRegistry::with_capacity(2);
        reg.with(1, |s| s.await_photo());
        reg.with(2, |s| s.await_photo());
        reg.with(1, |_| ());
        reg.with(3, |_| ());
        assert_eq!(reg.len(), 2);
        // User 2 was the oldest and starts over.
        assert_eq!(reg.with(2, |s| s.state()), SessionState::Idle);
    }
}
