//! Caller-owned table of live watch sessions.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;
use uuid::Uuid;

use crate::session::WatchControl;

/// Tracks sessions by id so they can be stopped from elsewhere.
///
/// The registry holds control handles only; the caller still owns each
/// [`WatchSession`](crate::WatchSession) and its event stream.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    sessions: Mutex<HashMap<Uuid, WatchControl>>,
}

impl WatchRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a session. Returns its id.
    pub fn insert(&self, control: WatchControl) -> Uuid {
        let id = control.id();
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, control);
        id
    }

    /// Track a session until the returned guard is dropped.
    #[must_use = "the session is untracked as soon as the guard is dropped"]
    pub fn track(&self, control: WatchControl) -> Tracked<'_> {
        let id = self.insert(control);
        Tracked { registry: self, id }
    }

    /// Look up a session.
    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<WatchControl> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Stop tracking a session without stopping it.
    pub fn remove(&self, id: &Uuid) -> Option<WatchControl> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Stop and forget a session. Returns `false` for an unknown id.
    pub async fn stop(&self, id: &Uuid) -> bool {
        let Some(control) = self.remove(id) else {
            return false;
        };
        control.stop().await;
        debug!(session = %id, "Stopped registered watch session");
        true
    }

    /// Stop and forget every session. Returns how many were stopped.
    pub async fn stop_all(&self) -> usize {
        let drained: Vec<WatchControl> = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, control)| control)
            .collect();
        for control in &drained {
            control.stop().await;
        }
        drained.len()
    }

    /// Ids of tracked sessions.
    #[must_use]
    pub fn ids(&self) -> Vec<Uuid> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    /// Number of tracked sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no sessions are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scoped registry entry from [`WatchRegistry::track`]. Removes the entry
/// when dropped, including when the owning future is cancelled.
#[derive(Debug)]
pub struct Tracked<'a> {
    registry: &'a WatchRegistry,
    id: Uuid,
}

impl Tracked<'_> {
    /// Id of the tracked session.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for Tracked<'_> {
    fn drop(&mut self) {
        if self.registry.remove(&self.id).is_some() {
            debug!(session = %self.id, "Untracked watch session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, raw_channel};
    use crate::session::{WatchOptions, WatchSession, WatchState};
    use bastion_core::PlatformProfile;
    use bastion_workspace::{GuardConfig, PathGuard, ResolveOptions};
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> (WatchSession, MemoryBackend) {
        let root = dir.path().canonicalize().unwrap();
        let guard = PathGuard::with_profile(GuardConfig::new(&root), PlatformProfile::linux());
        let resolved = guard.resolve(".", &ResolveOptions::default()).unwrap();
        let backend = MemoryBackend::new();
        let (_tx, rx) = raw_channel(8);
        let session = WatchSession::start_with_backend(
            &resolved,
            WatchOptions::default(),
            &PlatformProfile::linux(),
            Box::new(backend.clone()),
            rx,
        )
        .unwrap();
        (session, backend)
    }

    #[tokio::test]
    async fn test_stop_by_id() {
        let dir = TempDir::new().unwrap();
        let (session, backend) = session(&dir);
        let registry = WatchRegistry::new();
        let id = registry.insert(session.control());
        assert_eq!(registry.ids(), vec![id]);

        assert!(registry.stop(&id).await);
        assert!(registry.is_empty());
        assert_eq!(session.state(), WatchState::Stopped);
        assert!(backend.registered().is_empty());

        assert!(!registry.stop(&id).await);
    }

    #[tokio::test]
    async fn test_stop_all() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let (first, _) = session(&a);
        let (second, _) = session(&b);
        let registry = WatchRegistry::new();
        registry.insert(first.control());
        registry.insert(second.control());
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.stop_all().await, 2);
        assert!(registry.is_empty());
        assert_eq!(first.state(), WatchState::Stopped);
        assert_eq!(second.state(), WatchState::Stopped);
    }

    #[tokio::test]
    async fn test_remove_does_not_stop() {
        let dir = TempDir::new().unwrap();
        let (session, _) = session(&dir);
        let registry = WatchRegistry::new();
        let id = registry.insert(session.control());
        assert!(registry.remove(&id).is_some());
        assert!(registry.get(&id).is_none());
        assert_eq!(session.state(), WatchState::Active);
    }

    #[tokio::test]
    async fn test_tracked_entry_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let (session, _) = session(&dir);
        let registry = WatchRegistry::new();
        {
            let tracked = registry.track(session.control());
            assert_eq!(registry.ids(), vec![tracked.id()]);
        }
        assert!(registry.is_empty());
        assert_eq!(session.state(), WatchState::Active);
    }

    #[tokio::test]
    async fn test_tracked_entry_removed_when_future_cancelled() {
        let dir = TempDir::new().unwrap();
        let (session, _) = session(&dir);
        let registry = WatchRegistry::new();
        let pending = async {
            let _tracked = registry.track(session.control());
            std::future::pending::<()>().await;
        };
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), pending).await;
        assert!(timed_out.is_err());
        assert!(registry.is_empty());
    }
}
