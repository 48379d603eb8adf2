//! Watch sessions: startup, debounced dispatch and teardown.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bastion_core::PlatformProfile;
use bastion_workspace::ResolvedPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::backend::{NotifyBackend, RawEvent, RawKind, RawReceiver, WatchBackend, WatchMode, raw_channel};
use crate::debounce::Debouncer;
use crate::error::{WatchError, WatchResult};
use crate::event::{ChangeEvent, ChangeKind};

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;
/// Longest accepted debounce window in milliseconds.
pub const MAX_DEBOUNCE_MS: u64 = 60_000;
/// Default depth for manual recursive emulation.
pub const DEFAULT_MAX_DEPTH: usize = 8;
/// Default capacity of the raw and change event channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Options for a watch session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Watch the whole subtree rather than the root's direct entries.
    pub recursive: bool,
    /// Deepest directory level armed in manual mode (the root is depth 0).
    pub max_depth: usize,
    /// Debounce window in milliseconds.
    pub debounce_ms: u64,
    /// Record failed registrations and keep starting instead of aborting.
    pub resilient: bool,
    /// Capacity of the raw and change event channels.
    pub channel_capacity: usize,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: DEFAULT_MAX_DEPTH,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            resilient: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl WatchOptions {
    /// Set recursion.
    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set the manual emulation depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the debounce window.
    #[must_use]
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Keep starting when a registration fails.
    #[must_use]
    pub fn resilient(mut self) -> Self {
        self.resilient = true;
        self
    }

    /// Validate option ranges.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidOption`] for a debounce window outside
    /// `1..=60000` ms or a zero channel capacity.
    pub fn validate(&self) -> WatchResult<()> {
        if self.debounce_ms == 0 || self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(WatchError::InvalidOption(format!(
                "debounce_ms must be between 1 and {MAX_DEBOUNCE_MS}, got {}",
                self.debounce_ms
            )));
        }
        if self.channel_capacity == 0 {
            return Err(WatchError::InvalidOption(
                "channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchState {
    /// Created, nothing registered.
    Idle,
    /// Registering handles.
    Starting,
    /// Dispatching events.
    Active,
    /// Tearing down.
    Stopping,
    /// All handles released; no further events.
    Stopped,
}

/// How the session covers the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleStrategy {
    /// One native recursive handle on the root.
    Native,
    /// One non-recursive handle per directory.
    Manual,
}

/// A handle registration that failed in resilient mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRegistration {
    /// Directory that could not be watched.
    pub path: PathBuf,
    /// Backend error.
    pub error: String,
}

/// Session counters.
#[derive(Debug, Clone, Serialize)]
pub struct WatchStats {
    /// Handle strategy in use.
    pub strategy: HandleStrategy,
    /// When startup began.
    pub started_at: DateTime<Utc>,
    /// Live handles.
    pub handle_count: usize,
    /// Raw notifications received.
    pub raw_events: u64,
    /// Raw notifications dropped on a full channel.
    pub dropped_raw_events: u64,
    /// Change events delivered.
    pub events_dispatched: u64,
    /// Debounce entries discarded at teardown.
    pub discarded_pending: u64,
    /// Failed registrations (resilient mode and re-arming).
    pub failed_registrations: Vec<FailedRegistration>,
}

impl WatchStats {
    fn new(strategy: HandleStrategy) -> Self {
        Self {
            strategy,
            started_at: Utc::now(),
            handle_count: 0,
            raw_events: 0,
            dropped_raw_events: 0,
            events_dispatched: 0,
            discarded_pending: 0,
            failed_registrations: Vec::new(),
        }
    }
}

/// Everything the consumer task and the session handle share.
#[derive(Debug)]
struct Shared {
    state: WatchState,
    backend: Box<dyn WatchBackend>,
    handles: BTreeMap<PathBuf, WatchMode>,
    stats: WatchStats,
}

impl Shared {
    fn register(&mut self, path: &Path, mode: WatchMode) -> WatchResult<()> {
        self.backend.watch(path, mode)?;
        self.handles.insert(path.to_path_buf(), mode);
        self.stats.handle_count = self.handles.len();
        debug!(path = %path.display(), ?mode, "Registered watch handle");
        Ok(())
    }

    /// Release every handle at or below `path`.
    fn release_under(&mut self, path: &Path) -> usize {
        let doomed: Vec<PathBuf> = self
            .handles
            .keys()
            .filter(|p| p.starts_with(path))
            .cloned()
            .collect();
        for p in &doomed {
            if let Err(e) = self.backend.unwatch(p) {
                // Already gone with the directory; the table entry still goes.
                debug!(path = %p.display(), error = %e, "Unwatch failed");
            }
            self.handles.remove(p);
        }
        self.stats.handle_count = self.handles.len();
        doomed.len()
    }

    fn release_all(&mut self) -> usize {
        let all: Vec<PathBuf> = self.handles.keys().cloned().collect();
        for p in &all {
            if let Err(e) = self.backend.unwatch(p) {
                debug!(path = %p.display(), error = %e, "Unwatch failed");
            }
        }
        self.handles.clear();
        self.stats.handle_count = 0;
        all.len()
    }

    fn record_failure(&mut self, path: &Path, error: &WatchError) {
        warn!(path = %path.display(), error = %error, "Skipping directory that could not be watched");
        self.stats.failed_registrations.push(FailedRegistration {
            path: path.to_path_buf(),
            error: error.to_string(),
        });
    }
}

/// Directories under `dir` down to `max_depth` levels below it, plus the
/// walk failures. Symlinked directories are not followed.
fn scan_dirs(dir: &Path, max_depth: usize) -> (Vec<PathBuf>, Vec<(PathBuf, WatchError)>) {
    let mut dirs = Vec::new();
    let mut failures = Vec::new();
    for item in WalkDir::new(dir).follow_links(false).max_depth(max_depth) {
        match item {
            Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
            Ok(_) => {},
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                let message = e.to_string();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other(message));
                failures.push((path.clone(), WatchError::Walk { path, source }));
            },
        }
    }
    (dirs, failures)
}

/// Register one non-recursive handle per directory under `dir`, down to
/// `max_depth` levels below it.
fn arm_tree(shared: &mut Shared, dir: &Path, max_depth: usize, resilient: bool) -> WatchResult<()> {
    let (dirs, failures) = scan_dirs(dir, max_depth);
    for (path, err) in failures {
        if !resilient {
            return Err(err);
        }
        shared.record_failure(&path, &err);
    }
    for dir in &dirs {
        if shared.handles.contains_key(dir) {
            continue;
        }
        match shared.register(dir, WatchMode::NonRecursive) {
            Ok(()) => {},
            Err(e) if resilient => shared.record_failure(dir, &e),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable control handle for a session: inspect and stop it from
/// elsewhere (for example a [`WatchRegistry`](crate::WatchRegistry)).
#[derive(Debug, Clone)]
pub struct WatchControl {
    id: Uuid,
    root: PathBuf,
    shared: Arc<Mutex<Shared>>,
    dropped: Arc<AtomicU64>,
    cancel: CancellationToken,
    task: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl WatchControl {
    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Watched root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WatchState {
        lock(&self.shared).state
    }

    /// Snapshot of the session counters.
    #[must_use]
    pub fn stats(&self) -> WatchStats {
        let mut stats = lock(&self.shared).stats.clone();
        stats.dropped_raw_events = self.dropped.load(Ordering::Relaxed);
        stats
    }

    /// Directories with a live handle.
    #[must_use]
    pub fn active_handles(&self) -> Vec<PathBuf> {
        lock(&self.shared).handles.keys().cloned().collect()
    }

    /// Stop the session: close every handle, discard pending debounce
    /// entries, and wait for the consumer task to exit. Idempotent.
    pub async fn stop(&self) {
        {
            let mut shared = lock(&self.shared);
            if shared.state == WatchState::Stopped {
                return;
            }
            shared.state = WatchState::Stopping;
        }
        self.cancel.cancel();

        let task = self.task.lock().await.take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!(session = %self.id, error = %e, "Watch consumer task failed");
        }
        self.finish();
    }

    fn finish(&self) {
        let mut shared = lock(&self.shared);
        if shared.state == WatchState::Stopped {
            return;
        }
        let released = shared.release_all();
        shared.state = WatchState::Stopped;
        info!(
            session = %self.id,
            root = %self.root.display(),
            released,
            events = shared.stats.events_dispatched,
            "Watch session stopped"
        );
    }
}

/// Result of [`WatchSession::run_for`].
#[derive(Debug, Clone, Serialize)]
pub struct WatchReport {
    /// Session identifier.
    pub session_id: Uuid,
    /// Watched root.
    pub root: PathBuf,
    /// Events delivered during the run, in order.
    pub events: Vec<ChangeEvent>,
    /// Final counters.
    pub stats: WatchStats,
    /// Wall-clock run time in milliseconds.
    pub elapsed_ms: u64,
    /// State after the run (always `stopped`).
    pub final_state: WatchState,
}

/// A live watch owned by one caller invocation.
///
/// Dropping the session tears it down as well; it never outlives its owner.
#[derive(Debug)]
pub struct WatchSession {
    control: WatchControl,
    events: mpsc::Receiver<ChangeEvent>,
}

impl WatchSession {
    /// Start watching `root` with the OS notification backend.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a [`WatchError`] for bad options, a missing or non-directory
    /// root, or a failed registration outside resilient mode.
    pub fn start(
        root: &ResolvedPath,
        options: WatchOptions,
        profile: &PlatformProfile,
    ) -> WatchResult<Self> {
        options.validate()?;
        let (sender, receiver) = raw_channel(options.channel_capacity);
        let backend = NotifyBackend::new(sender)?;
        Self::start_with_backend(root, options, profile, Box::new(backend), receiver)
    }

    /// Start watching `root` with an explicit backend and raw event source.
    ///
    /// # Errors
    ///
    /// As [`start`](Self::start).
    pub fn start_with_backend(
        root: &ResolvedPath,
        options: WatchOptions,
        profile: &PlatformProfile,
        backend: Box<dyn WatchBackend>,
        raw: RawReceiver,
    ) -> WatchResult<Self> {
        options.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;

        let root_path = root.absolute_path().to_path_buf();
        let meta = std::fs::metadata(&root_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WatchError::NotFound(root_path.clone())
            } else {
                WatchError::Walk {
                    path: root_path.clone(),
                    source: e,
                }
            }
        })?;
        if !meta.is_dir() {
            return Err(WatchError::NotADirectory(root_path));
        }

        let strategy = if options.recursive && profile.supports_native_recursive_watch {
            HandleStrategy::Native
        } else {
            HandleStrategy::Manual
        };

        let mut shared = Shared {
            state: WatchState::Idle,
            backend,
            handles: BTreeMap::new(),
            stats: WatchStats::new(strategy),
        };
        shared.state = WatchState::Starting;

        let armed = match strategy {
            HandleStrategy::Native => shared.register(&root_path, WatchMode::Recursive),
            HandleStrategy::Manual => {
                let depth = if options.recursive { options.max_depth } else { 0 };
                arm_tree(&mut shared, &root_path, depth, options.resilient)
            },
        };
        if let Err(e) = armed {
            shared.release_all();
            shared.state = WatchState::Stopped;
            warn!(root = %root_path.display(), error = %e, "Watch startup failed");
            return Err(e);
        }
        shared.state = WatchState::Active;

        let id = Uuid::new_v4();
        info!(
            session = %id,
            root = %root_path.display(),
            ?strategy,
            handles = shared.handles.len(),
            failed = shared.stats.failed_registrations.len(),
            "Watch session active"
        );

        let shared = Arc::new(Mutex::new(shared));
        let (event_tx, event_rx) = mpsc::channel(options.channel_capacity);
        let cancel = CancellationToken::new();

        let consumer = Consumer {
            root: root_path.clone(),
            options,
            strategy,
            shared: Arc::clone(&shared),
            events: event_tx,
            cancel: cancel.clone(),
        };
        let task = runtime.spawn(consumer.run(raw.rx));

        Ok(Self {
            control: WatchControl {
                id,
                root: root_path,
                shared,
                dropped: raw.dropped,
                cancel,
                task: Arc::new(tokio::sync::Mutex::new(Some(task))),
            },
            events: event_rx,
        })
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.control.id
    }

    /// A cloneable control handle.
    #[must_use]
    pub fn control(&self) -> WatchControl {
        self.control.clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WatchState {
        self.control.state()
    }

    /// Snapshot of the session counters.
    #[must_use]
    pub fn stats(&self) -> WatchStats {
        self.control.stats()
    }

    /// Directories with a live handle.
    #[must_use]
    pub fn active_handles(&self) -> Vec<PathBuf> {
        self.control.active_handles()
    }

    /// Wait for the next change. `None` once the session has stopped.
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Stop the session and discard undelivered events.
    pub async fn stop(&mut self) {
        self.control.stop().await;
        self.events.close();
        while self.events.try_recv().is_ok() {}
    }

    /// Collect events until `duration` elapses, then stop.
    ///
    /// The duration is the only timer; it is never extended by activity.
    pub async fn run_for(mut self, duration: Duration) -> WatchReport {
        let started = Instant::now();
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        let mut events = Vec::new();
        loop {
            tokio::select! {
                () = &mut sleep => break,
                event = self.events.recv() => match event {
                    Some(event) => events.push(event),
                    None => break,
                },
            }
        }
        self.stop().await;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(session = %self.control.id, events = events.len(), elapsed_ms, "Watch run complete");
        WatchReport {
            session_id: self.control.id,
            root: self.control.root.clone(),
            events,
            stats: self.control.stats(),
            elapsed_ms,
            final_state: self.control.state(),
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.control.cancel.cancel();
        self.control.finish();
    }
}

/// The single task that owns debouncing for a session.
struct Consumer {
    root: PathBuf,
    options: WatchOptions,
    strategy: HandleStrategy,
    shared: Arc<Mutex<Shared>>,
    events: mpsc::Sender<ChangeEvent>,
    cancel: CancellationToken,
}

impl Consumer {
    async fn run(self, mut raw: mpsc::Receiver<RawEvent>) {
        let mut debouncer = Debouncer::new(Duration::from_millis(self.options.debounce_ms));

        loop {
            let next_deadline = debouncer.next_deadline();

            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,

                () = async {
                    match next_deadline {
                        Some(deadline) => tokio::time::sleep_until(deadline).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    let due = debouncer.take_due(Instant::now());
                    if !self.flush(due).await {
                        break;
                    }
                }

                event = raw.recv() => {
                    match event {
                        Some(event) => {
                            {
                                let mut shared = lock(&self.shared);
                                shared.stats.raw_events = shared.stats.raw_events.saturating_add(1);
                            }
                            debouncer.push(event, Instant::now());
                        },
                        None => {
                            debug!("Raw event channel closed");
                            break;
                        },
                    }
                }
            }
        }

        let discarded = debouncer.clear();
        let mut shared = lock(&self.shared);
        shared.stats.discarded_pending = shared
            .stats
            .discarded_pending
            .saturating_add(u64::try_from(discarded).unwrap_or(u64::MAX));
    }

    /// Deliver due entries. Returns `false` when the session should end.
    async fn flush(&self, due: Vec<(RawKind, PathBuf)>) -> bool {
        for (kind, path) in due {
            let change = match kind {
                RawKind::Create => ChangeKind::Create,
                RawKind::Modify => ChangeKind::Modify,
                RawKind::Remove => ChangeKind::Delete,
                RawKind::Rename => {
                    if std::fs::symlink_metadata(&path).is_ok() {
                        ChangeKind::Create
                    } else {
                        ChangeKind::Delete
                    }
                },
            };

            let arm_depth = {
                let mut shared = lock(&self.shared);
                if shared.state != WatchState::Active {
                    return false;
                }
                if self.strategy == HandleStrategy::Manual {
                    self.maintain_handles(&mut shared, change, &path)
                } else {
                    None
                }
            };
            if let Some(remaining) = arm_depth {
                self.arm_new_directory(&path, remaining).await;
            }

            let event = ChangeEvent::now(change, path);
            debug!(kind = %event.kind, path = %event.path.display(), "Dispatching change");
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return false,
                sent = self.events.send(event) => {
                    if sent.is_err() {
                        debug!("Change receiver dropped");
                        return false;
                    }
                }
            }

            let mut shared = lock(&self.shared);
            shared.stats.events_dispatched = shared.stats.events_dispatched.saturating_add(1);
        }
        true
    }

    /// Release handles of deleted directories. For a new directory within
    /// `max_depth`, returns how many levels below it still get handles.
    fn maintain_handles(&self, shared: &mut Shared, change: ChangeKind, path: &Path) -> Option<usize> {
        match change {
            ChangeKind::Create => {
                if !self.options.recursive || shared.handles.contains_key(path) {
                    return None;
                }
                let is_dir = std::fs::symlink_metadata(path).is_ok_and(|m| m.is_dir());
                let depth = path
                    .strip_prefix(&self.root)
                    .ok()
                    .map(|rel| rel.components().count())?;
                if !is_dir || depth > self.options.max_depth {
                    return None;
                }
                Some(self.options.max_depth.saturating_sub(depth))
            },
            ChangeKind::Delete => {
                let released = shared.release_under(path);
                if released > 0 {
                    debug!(path = %path.display(), released, "Released handles of deleted directory");
                }
                None
            },
            ChangeKind::Modify => None,
        }
    }

    /// Walk a new directory off the runtime, then register its handles.
    /// Failures are recorded; re-arming never aborts an active session.
    async fn arm_new_directory(&self, path: &Path, remaining: usize) {
        let dir = path.to_path_buf();
        let (dirs, failures) =
            match tokio::task::spawn_blocking(move || scan_dirs(&dir, remaining)).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Directory scan task failed");
                    return;
                },
            };

        let mut shared = lock(&self.shared);
        if shared.state != WatchState::Active {
            return;
        }
        for (failed, err) in &failures {
            shared.record_failure(failed, err);
        }
        for dir in &dirs {
            if shared.handles.contains_key(dir) {
                continue;
            }
            if let Err(e) = shared.register(dir, WatchMode::NonRecursive) {
                shared.record_failure(dir, &e);
            }
        }
        info!(path = %path.display(), handles = shared.handles.len(), "Armed new directory");
    }
}
