//! Notification backends and the raw event channel.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::error::{WatchError, WatchResult};

/// Kind of a raw, undebounced notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RawKind {
    /// Something was created.
    Create,
    /// Something was modified.
    Modify,
    /// Something was removed.
    Remove,
    /// Rename-class event; resolved by existence at flush time.
    Rename,
}

/// A raw notification for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Notification kind.
    pub kind: RawKind,
    /// Affected path.
    pub path: PathBuf,
}

impl RawEvent {
    /// Create a raw event.
    #[must_use]
    pub fn new(kind: RawKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Translate a `notify` event into raw events (one per path).
    ///
    /// Access and unclassified events are ignored.
    #[must_use]
    pub fn from_notify(event: &Event) -> Vec<Self> {
        let kind = match event.kind {
            EventKind::Create(_) => RawKind::Create,
            EventKind::Modify(ModifyKind::Name(_)) => RawKind::Rename,
            EventKind::Modify(_) => RawKind::Modify,
            EventKind::Remove(_) => RawKind::Remove,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => return Vec::new(),
        };
        event
            .paths
            .iter()
            .map(|p| Self::new(kind, p.clone()))
            .collect()
    }
}

/// Producer side of the bounded raw event channel.
///
/// Never blocks: when the channel is full the event is dropped and counted.
#[derive(Debug, Clone)]
pub struct RawSender {
    tx: mpsc::Sender<RawEvent>,
    dropped: Arc<AtomicU64>,
}

impl RawSender {
    /// Offer an event to the consumer. Returns `false` if it was dropped.
    pub fn send(&self, event: RawEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(ev)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(path = %ev.path.display(), "Raw event channel full, dropping event");
                false
            },
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Consumer side of the raw event channel.
#[derive(Debug)]
pub struct RawReceiver {
    pub(crate) rx: mpsc::Receiver<RawEvent>,
    pub(crate) dropped: Arc<AtomicU64>,
}

/// Create a bounded raw event channel.
#[must_use]
pub fn raw_channel(capacity: usize) -> (RawSender, RawReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        RawSender {
            tx,
            dropped: Arc::clone(&dropped),
        },
        RawReceiver { rx, dropped },
    )
}

/// How a directory is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchMode {
    /// The directory and its whole subtree.
    Recursive,
    /// The directory's direct entries only.
    NonRecursive,
}

/// Registers and releases OS watch handles.
pub trait WatchBackend: Send + std::fmt::Debug {
    /// Register a handle on `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Registration`] if the OS refuses.
    fn watch(&mut self, path: &Path, mode: WatchMode) -> WatchResult<()>;

    /// Release the handle on `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Registration`] if the OS refuses.
    fn unwatch(&mut self, path: &Path) -> WatchResult<()>;
}

/// Backend over the platform's native notification API via `notify`.
pub struct NotifyBackend {
    watcher: RecommendedWatcher,
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend").finish_non_exhaustive()
    }
}

impl NotifyBackend {
    /// Create a backend whose callback feeds `sender`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Backend`] if the OS watcher cannot be created.
    pub fn new(sender: RawSender) -> WatchResult<Self> {
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for raw in RawEvent::from_notify(&event) {
                        sender.send(raw);
                    }
                },
                Err(e) => warn!(error = %e, "Filesystem watcher error"),
            },
            notify::Config::default(),
        )
        .map_err(|e| WatchError::Backend(e.to_string()))?;
        Ok(Self { watcher })
    }
}

impl WatchBackend for NotifyBackend {
    fn watch(&mut self, path: &Path, mode: WatchMode) -> WatchResult<()> {
        let recursive = match mode {
            WatchMode::Recursive => RecursiveMode::Recursive,
            WatchMode::NonRecursive => RecursiveMode::NonRecursive,
        };
        self.watcher
            .watch(path, recursive)
            .map_err(|e| WatchError::Registration {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    fn unwatch(&mut self, path: &Path) -> WatchResult<()> {
        self.watcher
            .unwatch(path)
            .map_err(|e| WatchError::Registration {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

/// In-memory backend that only records registrations.
///
/// Events are injected through the paired [`RawSender`]. Paths listed with
/// [`fail_on`](Self::fail_on) refuse registration.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    registered: Arc<Mutex<BTreeMap<PathBuf, WatchMode>>>,
    failing: Arc<Mutex<Vec<PathBuf>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make registration of `path` fail.
    #[must_use]
    pub fn fail_on(self, path: impl Into<PathBuf>) -> Self {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.into());
        self
    }

    /// Currently registered paths. Clones share state, so keep a clone
    /// before handing the backend to a session.
    #[must_use]
    pub fn registered(&self) -> BTreeMap<PathBuf, WatchMode> {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl WatchBackend for MemoryBackend {
    fn watch(&mut self, path: &Path, mode: WatchMode) -> WatchResult<()> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|p| p == path);
        if failing {
            return Err(WatchError::Registration {
                path: path.to_path_buf(),
                message: "registration refused".to_string(),
            });
        }
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), mode);
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> WatchResult<()> {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
        Ok(())
    }
}
