//! Debounce buffer keyed by `(kind, path)`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

use crate::backend::{RawEvent, RawKind};

#[derive(Debug)]
pub(crate) struct Debouncer {
    window: Duration,
    pending: HashMap<(RawKind, PathBuf), Instant>,
}

impl Debouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Record a raw event. A repeat of a pending pair moves its deadline
    /// instead of adding an entry. Returns `true` for a new entry.
    pub(crate) fn push(&mut self, event: RawEvent, now: Instant) -> bool {
        #[allow(clippy::arithmetic_side_effects)]
        // Instant + Duration cannot overflow in practice
        let deadline = now + self.window;
        self.pending
            .insert((event.kind, event.path), deadline)
            .is_none()
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().copied().min()
    }

    /// Remove and return every entry due at `now`, oldest deadline first.
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<(RawKind, PathBuf)> {
        let mut due: Vec<((RawKind, PathBuf), Instant)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (key.clone(), *deadline))
            .collect();
        due.sort_by(|(ka, da), (kb, db)| da.cmp(db).then_with(|| ka.cmp(kb)));
        for (key, _) in &due {
            self.pending.remove(key);
        }
        due.into_iter().map(|(key, _)| key).collect()
    }

    /// Discard everything pending; returns how many entries were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
