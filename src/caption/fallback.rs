// Static pool of pre-written captions used when generation yields nothing usable.

use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

pub const FALLBACK_CAPTIONS: &[&str] = &[
    "Beauty is a state of mind.",
    "Saving this moment for later.",
    "Same me, better light.",
    "Quiet days say the most.",
    "Collecting moments, not things.",
    "Here, now, and unbothered.",
    "A little light goes a long way.",
    "This is the mood.",
    "Less noise, more this.",
    "Some days just click.",
    "Caught somewhere between plans.",
    "The view was worth the detour.",
];

// Beyond this many users, an arbitrary history is dropped to make room.
const MAX_TRACKED_USERS: usize = 4096;

/// Random picks from the pool that avoid repeats per user until the pool is used up.
#[derive(Default)]
pub struct FallbackPicker {
    used: Mutex<HashMap<i64, HashSet<&'static str>>>,
}

impl FallbackPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pick(&self, user_id: i64) -> String {
        let mut used = self.used.lock().unwrap_or_else(PoisonError::into_inner);
        if !used.contains_key(&user_id)
            && used.len() >= MAX_TRACKED_USERS
            && let Some(evicted) = used.keys().next().copied()
        {
            used.remove(&evicted);
        }
        let seen = used.entry(user_id).or_default();

        let mut available: Vec<&'static str> = FALLBACK_CAPTIONS
            .iter()
            .copied()
            .filter(|c| !seen.contains(c))
            .collect();
        if available.is_empty() {
            seen.clear();
            available = FALLBACK_CAPTIONS.to_vec();
        }

        let choice = available
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(FALLBACK_CAPTIONS[0]);
        seen.insert(choice);
        choice.to_string()
    }

    /// Pad `captions` with pool entries (never duplicating one already present) up to `target`.
    pub fn pad(&self, user_id: i64, captions: &mut Vec<String>, target: usize) {
        // Bounded: the pool is larger than any target we use.
        let mut attempts = 0;
        while captions.len() < target && attempts < FALLBACK_CAPTIONS.len() * 2 {
            attempts += 1;
            let next = self.pick(user_id);
            if !captions.iter().any(|c| c.eq_ignore_ascii_case(&next)) {
                captions.push(next);
            }
        }
    }
}
