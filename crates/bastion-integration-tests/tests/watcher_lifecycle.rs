//! Watch sessions against the real OS notification backend.

#![cfg(target_os = "linux")]

mod common;

use std::path::Path;
use std::time::Duration;

use bastion_core::PlatformProfile;
use bastion_watcher::{ChangeKind, HandleStrategy, WatchOptions, WatchRegistry, WatchSession, WatchState};
use bastion_workspace::{ResolveOptions, ResolvedPath};
use common::ToolHarness;
use serde_json::json;

fn options() -> WatchOptions {
    WatchOptions::default().with_debounce_ms(50)
}

fn root_of(h: &ToolHarness) -> ResolvedPath {
    h.ctx
        .guard
        .resolve_existing(".", &ResolveOptions::default())
        .unwrap()
}

/// Poll until `check` holds or two seconds pass.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..40 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}

#[tokio::test]
async fn test_file_creation_is_reported() {
    let h = ToolHarness::new();
    let session = WatchSession::start(&root_of(&h), options(), &PlatformProfile::linux()).unwrap();
    assert_eq!(session.state(), WatchState::Active);

    let target = h.path("fresh.txt");
    let writer = {
        let target = target.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            std::fs::write(&target, "hello").unwrap();
        })
    };

    let report = session.run_for(Duration::from_millis(1_200)).await;
    writer.await.unwrap();

    assert_eq!(report.final_state, WatchState::Stopped);
    assert!(
        report
            .events
            .iter()
            .any(|e| e.path == target && matches!(e.kind, ChangeKind::Create | ChangeKind::Modify)),
        "no event for {}: {:?}",
        target.display(),
        report.events
    );
}

#[tokio::test]
async fn test_stop_releases_every_handle() {
    let h = ToolHarness::new();
    std::fs::create_dir_all(h.path("a/b")).unwrap();
    let mut session =
        WatchSession::start(&root_of(&h), options(), &PlatformProfile::linux()).unwrap();
    assert_eq!(session.stats().strategy, HandleStrategy::Manual);
    assert_eq!(session.active_handles().len(), 3);

    let control = session.control();
    session.stop().await;

    assert!(control.active_handles().is_empty());
    assert_eq!(control.state(), WatchState::Stopped);
    std::fs::write(h.path("a/late.txt"), "x").unwrap();
    assert!(session.next_event().await.is_none());

    // A second stop is a no-op.
    control.stop().await;
    assert_eq!(control.state(), WatchState::Stopped);
}

#[tokio::test]
async fn test_new_directory_is_armed_in_manual_mode() {
    let h = ToolHarness::new();
    let session = WatchSession::start(&root_of(&h), options(), &PlatformProfile::linux()).unwrap();
    let control = session.control();
    assert_eq!(control.active_handles(), vec![h.root.clone()]);

    std::fs::create_dir(h.path("later")).unwrap();
    let later = h.path("later");
    assert!(eventually(|| control.active_handles().contains(&later)).await);

    std::fs::remove_dir(&later).unwrap();
    assert!(eventually(|| !control.active_handles().contains(&later)).await);

    let report = session.run_for(Duration::from_millis(100)).await;
    assert_eq!(report.final_state, WatchState::Stopped);
    assert!(control.active_handles().is_empty());
}

#[tokio::test]
async fn test_max_depth_zero_watches_only_the_root() {
    let h = ToolHarness::new();
    std::fs::create_dir(h.path("existing")).unwrap();
    let session = WatchSession::start(
        &root_of(&h),
        options().with_max_depth(0),
        &PlatformProfile::linux(),
    )
    .unwrap();
    let control = session.control();
    assert_eq!(control.active_handles(), vec![h.root.clone()]);

    std::fs::create_dir(h.path("newer")).unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(control.active_handles(), vec![h.root.clone()]);

    drop(session);
    assert!(control.active_handles().is_empty());
}

#[tokio::test]
async fn test_registry_stops_sessions_it_holds() {
    let h = ToolHarness::new();
    let registry = WatchRegistry::new();
    let first = WatchSession::start(&root_of(&h), options(), &PlatformProfile::linux()).unwrap();
    let second = WatchSession::start(&root_of(&h), options(), &PlatformProfile::linux()).unwrap();
    let id = registry.insert(first.control());
    registry.insert(second.control());
    assert_eq!(registry.len(), 2);

    assert!(registry.stop(&id).await);
    assert_eq!(first.state(), WatchState::Stopped);
    assert_eq!(second.state(), WatchState::Active);

    assert_eq!(registry.stop_all().await, 1);
    assert_eq!(second.state(), WatchState::Stopped);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_watch_tool_cleans_up_its_session() {
    let h = ToolHarness::new();
    let outcome = h
        .call("watch_directory", json!({"duration_ms": 100, "debounce_ms": 20}))
        .await;
    let report = outcome.output().unwrap();
    assert_eq!(report["final_state"], "stopped");
    assert!(h.ctx.watches.is_empty());
    assert!(Path::new(report["root"].as_str().unwrap()).is_dir());
}
