//! Integration tests for SessionStateMachine with change events
//!
//! These tests verify that the state machine:
//! - Emits one change event per actual transition
//! - Drops model requests outside Idle/Running without side effects
//! - Reaches Running exactly once whichever Running source arrives first

use tokio::time::{Duration, timeout};
use tryon::state::{LoadDecision, SessionEvent};
use tryon::{SessionState, SessionStateMachine, StateChange};

fn idle_machine() -> SessionStateMachine {
    let mut machine = SessionStateMachine::new();
    machine.begin_start().unwrap();
    machine.tracker_ready().unwrap();
    machine.occlusion_resolved().unwrap();
    machine
}

async fn next_change(rx: &mut tokio::sync::broadcast::Receiver<StateChange>) -> StateChange {
    timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed")
}

#[tokio::test]
async fn test_startup_events_emitted() {
    let mut machine = SessionStateMachine::new();
    let mut rx = machine.subscribe();

    machine.begin_start().unwrap();
    machine.tracker_ready().unwrap();
    machine.occlusion_resolved().unwrap();

    let first = next_change(&mut rx).await;
    assert_eq!(
        first,
        StateChange {
            from: SessionState::NotLoaded,
            to: SessionState::Loading,
            event: SessionEvent::StartRequested,
        }
    );

    // Tracker readiness keeps the session Loading: no event for it
    let second = next_change(&mut rx).await;
    assert_eq!(second.from, SessionState::Loading);
    assert_eq!(second.to, SessionState::Idle);
    assert_eq!(second.event, SessionEvent::OcclusionResolved);

    assert!(rx.try_recv().is_err());
}

#[test]
fn test_requests_dropped_before_idle() {
    let mut machine = SessionStateMachine::new();
    let mut rx = machine.subscribe();

    assert_eq!(
        machine.request_model_load("wristDemo"),
        LoadDecision::NotReady(SessionState::NotLoaded)
    );

    machine.begin_start().unwrap();
    let _ = rx.try_recv();

    assert_eq!(
        machine.request_model_load("wristDemo"),
        LoadDecision::NotReady(SessionState::Loading)
    );
    assert_eq!(machine.state(), SessionState::Loading);
    assert_eq!(machine.pending_model(), None);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_requests_dropped_while_busy() {
    let mut machine = idle_machine();
    assert!(machine.request_model_load("wristDemo").is_accepted());

    let mut rx = machine.subscribe();
    for model in ["wristDemo", "braceletDemo", "ringDemo"] {
        assert_eq!(
            machine.request_model_load(model),
            LoadDecision::NotReady(SessionState::Busy)
        );
    }

    assert_eq!(machine.state(), SessionState::Busy);
    assert_eq!(machine.pending_model(), Some("wristDemo"));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_requests_dropped_while_running_with_pending_load() {
    let mut machine = idle_machine();
    assert!(machine.request_model_load("wristDemo").is_accepted());
    // Engine signal lands before the wearable attaches
    machine.all_assets_loaded();
    assert_eq!(machine.state(), SessionState::Running);

    let mut rx = machine.subscribe();
    assert_eq!(
        machine.request_model_load("braceletDemo"),
        LoadDecision::Pending("wristDemo".to_string())
    );
    assert_eq!(
        machine.check_model_load("braceletDemo"),
        LoadDecision::Pending("wristDemo".to_string())
    );
    assert_eq!(machine.pending_model(), Some("wristDemo"));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_check_does_not_transition() {
    let mut machine = idle_machine();
    let mut rx = machine.subscribe();

    assert_eq!(machine.check_model_load("wristDemo"), LoadDecision::Accepted);
    assert_eq!(machine.state(), SessionState::Idle);
    assert_eq!(machine.pending_model(), None);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_attach_then_all_loaded() {
    let mut machine = idle_machine();
    machine.request_model_load("wristDemo");
    let mut rx = machine.subscribe();

    assert!(machine.model_attached("wristDemo").unwrap().is_some());
    assert!(machine.all_assets_loaded().is_none());

    let change = next_change(&mut rx).await;
    assert_eq!(change.to, SessionState::Running);
    assert_eq!(change.event, SessionEvent::ModelAttached);
    assert!(rx.try_recv().is_err());
    assert_eq!(machine.attached_model(), Some("wristDemo"));
}

#[tokio::test]
async fn test_all_loaded_then_attach() {
    let mut machine = idle_machine();
    machine.request_model_load("wristDemo");
    let mut rx = machine.subscribe();

    assert!(machine.all_assets_loaded().is_some());
    // Running already, the attach only records the model
    assert!(machine.model_attached("wristDemo").unwrap().is_none());

    let change = next_change(&mut rx).await;
    assert_eq!(change.from, SessionState::Busy);
    assert_eq!(change.to, SessionState::Running);
    assert_eq!(change.event, SessionEvent::AllAssetsLoaded);
    assert!(rx.try_recv().is_err());

    assert_eq!(machine.state(), SessionState::Running);
    assert_eq!(machine.attached_model(), Some("wristDemo"));
    assert_eq!(machine.pending_model(), None);
}

#[test]
fn test_swap_cycle() {
    let mut machine = idle_machine();
    machine.request_model_load("wristDemo");
    machine.model_attached("wristDemo").unwrap();

    assert_eq!(
        machine.request_model_load("wristDemo"),
        LoadDecision::AlreadyAttached
    );
    assert_eq!(machine.state(), SessionState::Running);

    assert!(machine.request_model_load("braceletDemo").is_accepted());
    assert_eq!(machine.state(), SessionState::Busy);
    assert_eq!(machine.attached_model(), None);

    machine.model_attached("braceletDemo").unwrap();
    assert_eq!(machine.state(), SessionState::Running);
    assert_eq!(machine.attached_model(), Some("braceletDemo"));
}

#[test]
fn test_failed_swap_leaves_nothing_attached() {
    let mut machine = idle_machine();
    machine.request_model_load("wristDemo");
    machine.model_attached("wristDemo").unwrap();

    machine.request_model_load("braceletDemo");
    let change = machine.model_load_failed("braceletDemo").unwrap();
    assert_eq!(change.to, SessionState::Idle);
    assert_eq!(machine.attached_model(), None);

    // The previous wearable can be requested again
    assert!(machine.request_model_load("wristDemo").is_accepted());
}

#[test]
fn test_watch_follows_transitions() {
    let mut machine = SessionStateMachine::new();
    let watch = machine.watch();
    assert_eq!(*watch.borrow(), SessionState::NotLoaded);

    machine.begin_start().unwrap();
    assert_eq!(*watch.borrow(), SessionState::Loading);

    machine.abort_start();
    assert_eq!(*watch.borrow(), SessionState::NotLoaded);
}

#[tokio::test]
async fn test_multiple_subscribers() {
    let mut machine = SessionStateMachine::new();
    let mut rx1 = machine.subscribe();
    let mut rx2 = machine.subscribe();

    machine.begin_start().unwrap();

    assert_eq!(next_change(&mut rx1).await.to, SessionState::Loading);
    assert_eq!(next_change(&mut rx2).await.to, SessionState::Loading);
}
