//! End-to-end slot behaviour against real child processes

#![cfg(unix)]

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mwatch_supervisor::{Orchestrator, Slot, SlotSpec, SlotStatus, WatchSpec, GRACE_PERIOD};
use tempfile::TempDir;

async fn eventually<F: Fn() -> bool>(what: &str, timeout: Duration, check: F) {
    let deadline = Instant::now() + timeout;
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

async fn stop(slot: &Slot) {
    slot.kill();
    slot.join().await;
    slot.wait_finished().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn terminate_stops_cooperative_process() {
    let slot = Slot::new(SlotSpec::new(["sleep", "3600"]));
    slot.start();
    eventually("running", Duration::from_secs(5), || slot.status() == SlotStatus::Running).await;
    let pid = slot.pid().expect("live pid");

    let started = Instant::now();
    slot.terminate();
    eventually("stopped", Duration::from_secs(5), || slot.status() == SlotStatus::Stopped).await;
    assert!(started.elapsed() < GRACE_PERIOD);
    assert!(slot.pid().is_none());
    assert!(!slot.restart_enabled());

    // the old pid is gone from its group
    let gone = nix::sys::signal::killpg(
        nix::unistd::Pid::from_raw(pid as i32),
        None::<nix::sys::signal::Signal>,
    )
    .is_err();
    assert!(gone);

    stop(&slot).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn term_ignoring_process_is_killed_after_grace() {
    let slot = Slot::new(SlotSpec::new(["sh", "-c", "trap '' TERM; while true; do sleep 1; done"]));
    slot.start();
    eventually("running", Duration::from_secs(5), || slot.status() == SlotStatus::Running).await;
    // give the shell time to install its trap
    tokio::time::sleep(Duration::from_millis(300)).await;

    let started = Instant::now();
    slot.terminate();
    eventually("terminating", Duration::from_secs(2), || {
        slot.status() == SlotStatus::Terminating
    })
    .await;
    eventually("killing", GRACE_PERIOD + Duration::from_secs(2), || {
        slot.status() == SlotStatus::Killing
    })
    .await;
    assert!(started.elapsed() >= GRACE_PERIOD - Duration::from_millis(100));

    eventually("stopped", Duration::from_secs(5), || slot.status() == SlotStatus::Stopped).await;
    assert!(slot.pid().is_none());

    stop(&slot).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn restart_wait_paces_relaunches() {
    let slot = Slot::new(SlotSpec::new(["true"]).restart_wait(Duration::from_secs(2)));
    slot.start();

    eventually("first run", Duration::from_secs(5), || slot.spawn_count() >= 1).await;
    let first = Instant::now();
    eventually("second run", Duration::from_secs(5), || slot.spawn_count() >= 2).await;
    assert!(first.elapsed() >= Duration::from_millis(1800));

    slot.terminate();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let count = slot.spawn_count();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(slot.spawn_count(), count);

    stop(&slot).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn file_change_restarts_once() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.py"), "print(1)").unwrap();

    let slot = Slot::new(SlotSpec::new(["sleep", "3600"]).watch(WatchSpec::new(dir.path())));
    slot.start();
    eventually("running", Duration::from_secs(5), || slot.status() == SlotStatus::Running).await;
    // let the watcher record its baseline
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(slot.spawn_count(), 1);

    fs::write(dir.path().join("app.py"), "print(2)").unwrap();
    eventually("relaunch", Duration::from_secs(5), || slot.spawn_count() == 2).await;
    eventually("running again", Duration::from_secs(5), || {
        slot.status() == SlotStatus::Running
    })
    .await;

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(slot.spawn_count(), 2);
    assert!(slot.restart_enabled());

    stop(&slot).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn terminate_then_restart_relaunches() {
    let slot = Slot::new(SlotSpec::new(["sleep", "3600"]));
    slot.start();
    eventually("running", Duration::from_secs(5), || slot.status() == SlotStatus::Running).await;

    slot.terminate();
    eventually("stopped", Duration::from_secs(5), || slot.status() == SlotStatus::Stopped).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(slot.spawn_count(), 1);
    assert_eq!(slot.status(), SlotStatus::Stopped);

    slot.restart();
    eventually("relaunch", Duration::from_secs(5), || slot.spawn_count() == 2).await;
    eventually("running", Duration::from_secs(5), || slot.status() == SlotStatus::Running).await;

    stop(&slot).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn kill_and_join_prevents_further_spawns() {
    let slot = Slot::new(SlotSpec::new(["sleep", "3600"]));
    slot.start();
    eventually("running", Duration::from_secs(5), || slot.status() == SlotStatus::Running).await;

    slot.kill();
    slot.join().await;
    slot.wait_finished().await;
    assert!(slot.quit_requested());
    assert_eq!(slot.status(), SlotStatus::Stopped);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(slot.spawn_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn extract_runs_callback_once_after_exit() {
    let slot = Slot::new(SlotSpec::new(["sleep", "3600"]));
    slot.start();
    eventually("running", Duration::from_secs(5), || slot.status() == SlotStatus::Running).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    slot.extract(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    eventually("callback", Duration::from_secs(5), || calls.load(Ordering::SeqCst) == 1).await;
    assert_eq!(slot.status(), SlotStatus::Stopped);
    assert!(slot.pid().is_none());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(slot.spawn_count(), 1);

    stop(&slot).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn extract_on_idle_slot_runs_callback_immediately() {
    let slot = Slot::new(SlotSpec::new(["true"]));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    slot.extract(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    eventually("callback", Duration::from_secs(2), || calls.load(Ordering::SeqCst) == 1).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn log_keeps_latest_lines() {
    let slot = Slot::new(SlotSpec::new(["sh", "-c", "for i in $(seq 1 150); do echo line $i; done; sleep 3600"]));
    slot.start();

    eventually("all output", Duration::from_secs(5), || {
        slot.drain_log(1) == vec!["line 150".to_string()]
    })
    .await;
    let lines = slot.drain_log(usize::MAX);
    assert_eq!(lines.len(), 100);
    assert_eq!(lines[0], "line 51");
    assert_eq!(slot.drain_log(2), vec!["line 149", "line 150"]);

    stop(&slot).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn orchestrator_shutdown_stops_everything() {
    let orchestrator = Orchestrator::new([
        SlotSpec::new(["sleep", "3600"]).name("a"),
        SlotSpec::new(["sh", "-c", "trap '' TERM; sleep 3600"]).name("b"),
    ]);
    orchestrator.start_all();
    eventually("all running", Duration::from_secs(5), || {
        orchestrator.slots().iter().all(|s| s.status() == SlotStatus::Running)
    })
    .await;

    let started = Instant::now();
    orchestrator.shutdown().await;
    assert!(started.elapsed() < GRACE_PERIOD);
    for slot in orchestrator.slots() {
        assert_eq!(slot.status(), SlotStatus::Stopped);
        assert!(slot.pid().is_none());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn kill_during_startup_never_leaves_a_child() {
    for i in 0..200u64 {
        let slot = Slot::new(SlotSpec::new(["sleep", "3600"]));
        slot.start();
        // land the kill at varying points around the spawn
        std::thread::sleep(Duration::from_micros((i * 7) % 1500));
        slot.kill();

        let finished = tokio::time::timeout(Duration::from_secs(5), async {
            slot.join().await;
            slot.wait_finished().await;
        })
        .await;
        assert!(finished.is_ok(), "iteration {} did not finish", i);
        assert!(slot.pid().is_none());
        assert_eq!(slot.status(), SlotStatus::Stopped);
        assert!(slot.spawn_count() <= 1);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn terminate_during_startup_stops_without_respawn() {
    for i in 0..50u64 {
        let slot = Slot::new(SlotSpec::new(["sleep", "3600"]));
        slot.start();
        std::thread::sleep(Duration::from_micros((i * 31) % 1500));
        slot.terminate();

        eventually("stopped", Duration::from_secs(5), || {
            slot.status() == SlotStatus::Stopped && slot.pid().is_none()
        })
        .await;
        let count = slot.spawn_count();
        assert!(count <= 1);
        assert!(!slot.restart_enabled());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(slot.spawn_count(), count);
        stop(&slot).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn orchestrator_shutdown_right_after_start() {
    for _ in 0..20 {
        let orchestrator = Orchestrator::new([
            SlotSpec::new(["sleep", "3600"]).name("a"),
            SlotSpec::new(["sh", "-c", "trap '' TERM; sleep 3600"]).name("b"),
            SlotSpec::new(["true"]).name("c"),
        ]);
        orchestrator.start_all();

        let finished =
            tokio::time::timeout(Duration::from_secs(5), orchestrator.shutdown()).await;
        assert!(finished.is_ok());
        for slot in orchestrator.slots() {
            assert_eq!(slot.status(), SlotStatus::Stopped);
            assert!(slot.pid().is_none());
        }
    }
}
