// Session state machine
//
// Owns the SessionState value and the identity of the attached/pending wearable,
// applies the lifecycle transition table, and emits change events so the UI
// layer never has to poll.

use crate::models::SessionState;
use thiserror::Error;
use tokio::sync::{broadcast, watch};

/// The event that drove a transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    StartRequested,
    TrackerReady,
    OcclusionResolved,
    ModelLoadRequested,
    ModelAttached,
    AllAssetsLoaded,
    ModelLoadFailed,
    StartAborted,
}

/// Change event emitted whenever the session state actually changes
///
/// Re-applying the current state (e.g. a second `Running` signal) does not
/// emit anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateChange {
    pub from: SessionState,
    pub to: SessionState,
    pub event: SessionEvent,
}

/// An event arrived in a state with no edge for it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot apply {event:?} while session is {from}")]
pub struct TransitionError {
    pub from: SessionState,
    pub event: SessionEvent,
}

/// Outcome of the model-load guard
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadDecision {
    /// State moved to `Busy`; the caller owns the load
    Accepted,

    /// The requested model is the one already attached
    AlreadyAttached,

    /// The session is not `Idle` or `Running`
    NotReady(SessionState),

    /// Another load is still in flight (its id is carried)
    Pending(String),
}

impl LoadDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, LoadDecision::Accepted)
    }
}

/// Lifecycle state machine of a try-on session
///
/// | From | Event | To |
/// |---|---|---|
/// | NotLoaded | start requested | Loading |
/// | Loading | tracker ready | Loading |
/// | Loading | occlusion resolved | Idle |
/// | Idle / Running | model load accepted by the guard | Busy |
/// | Busy / Running | requested model attached | Running |
/// | Loading / Busy / Running | all engine assets loaded | Running |
/// | Busy / Running | requested model failed to load | Idle |
/// | Loading | startup failure | NotLoaded |
///
/// Setting `Running` while already `Running` is a no-op, so the engine-wide
/// signal and the per-model attach can arrive in either order.
///
/// The machine is owned by a single [`Session`](crate::session::Session) and
/// mutated through `&mut self` only; observers use [`subscribe`](Self::subscribe)
/// for change events or [`watch`](Self::watch) for the current value.
pub struct SessionStateMachine {
    state: SessionState,

    /// Wearable currently attached to the scene
    attached_model: Option<String>,

    /// Wearable whose load is in flight
    pending_model: Option<String>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,

    /// Latest state, readable without subscribing to every change
    current_tx: watch::Sender<SessionState>,
}

impl SessionStateMachine {
    /// Create a machine in `NotLoaded` with a change buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        let (current_tx, _) = watch::channel(SessionState::NotLoaded);
        Self {
            state: SessionState::NotLoaded,
            attached_model: None,
            pending_model: None,
            state_tx,
            current_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn attached_model(&self) -> Option<&str> {
        self.attached_model.as_deref()
    }

    pub fn pending_model(&self) -> Option<&str> {
        self.pending_model.as_deref()
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Sender half of the change channel, for handles that subscribe later
    pub fn change_sender(&self) -> broadcast::Sender<StateChange> {
        self.state_tx.clone()
    }

    /// Receiver tracking the latest state value
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.current_tx.subscribe()
    }

    /// `NotLoaded` → `Loading`
    pub fn begin_start(&mut self) -> Result<StateChange, TransitionError> {
        self.require(SessionState::NotLoaded, SessionEvent::StartRequested)?;
        Ok(self.apply(SessionState::Loading, SessionEvent::StartRequested))
    }

    /// Tracker initialization succeeded; the session keeps loading
    pub fn tracker_ready(&mut self) -> Result<(), TransitionError> {
        self.require(SessionState::Loading, SessionEvent::TrackerReady)?;
        tracing::info!("Tracker ready, configuring lighting and occlusion");
        Ok(())
    }

    /// `Loading` → `Idle`
    pub fn occlusion_resolved(&mut self) -> Result<StateChange, TransitionError> {
        self.require(SessionState::Loading, SessionEvent::OcclusionResolved)?;
        Ok(self.apply(SessionState::Idle, SessionEvent::OcclusionResolved))
    }

    /// Abort a failed startup, returning to `NotLoaded`
    ///
    /// Does nothing once startup has completed.
    pub fn abort_start(&mut self) -> Option<StateChange> {
        if self.state != SessionState::Loading {
            tracing::debug!("Ignoring start abort while {}", self.state);
            return None;
        }
        Some(self.apply(SessionState::NotLoaded, SessionEvent::StartAborted))
    }

    /// Guard for model-load requests
    ///
    /// A request is refused without any side effect when the session is not
    /// `Idle`/`Running`, when `model_id` is already attached, or while another
    /// load is pending. On acceptance the state moves to `Busy` and the
    /// previously attached wearable is considered removed.
    ///
    /// Checks run in order: state, pending load, attached model. While `Busy`
    /// the state check answers first; `Pending` is only seen when the engine
    /// signal moved the session to `Running` before the pending model attached.
    pub fn request_model_load(&mut self, model_id: &str) -> LoadDecision {
        let decision = self.check_model_load(model_id);
        if !decision.is_accepted() {
            return decision;
        }

        self.attached_model = None;
        self.pending_model = Some(model_id.to_string());
        self.apply(SessionState::Busy, SessionEvent::ModelLoadRequested);
        LoadDecision::Accepted
    }

    /// What [`request_model_load`](Self::request_model_load) would decide, without applying it
    pub fn check_model_load(&self, model_id: &str) -> LoadDecision {
        if !self.state.accepts_model_requests() {
            return LoadDecision::NotReady(self.state);
        }
        if let Some(pending) = &self.pending_model {
            return LoadDecision::Pending(pending.clone());
        }
        if self.attached_model.as_deref() == Some(model_id) {
            return LoadDecision::AlreadyAttached;
        }
        LoadDecision::Accepted
    }

    /// The pending model is attached to the scene
    ///
    /// Returns `None` if the engine-wide signal already moved the session to
    /// `Running`.
    pub fn model_attached(&mut self, model_id: &str) -> Result<Option<StateChange>, TransitionError> {
        if self.pending_model.as_deref() != Some(model_id) {
            return Err(TransitionError {
                from: self.state,
                event: SessionEvent::ModelAttached,
            });
        }

        self.pending_model = None;
        self.attached_model = Some(model_id.to_string());
        Ok(self.set_running(SessionEvent::ModelAttached))
    }

    /// The pending model failed to load; nothing is attached any more
    pub fn model_load_failed(&mut self, model_id: &str) -> Option<StateChange> {
        if self.pending_model.as_deref() != Some(model_id) {
            tracing::debug!("Ignoring load failure for {}, not pending", model_id);
            return None;
        }

        self.pending_model = None;
        self.attached_model = None;
        Some(self.apply(SessionState::Idle, SessionEvent::ModelLoadFailed))
    }

    /// Engine-wide "all pending loads complete" signal
    pub fn all_assets_loaded(&mut self) -> Option<StateChange> {
        match self.state {
            SessionState::Loading | SessionState::Busy | SessionState::Running => {
                self.set_running(SessionEvent::AllAssetsLoaded)
            }
            SessionState::NotLoaded | SessionState::Idle => {
                tracing::debug!("Ignoring all-assets-loaded signal while {}", self.state);
                None
            }
        }
    }

    /// Idempotent setter shared by both `Running` sources
    fn set_running(&mut self, event: SessionEvent) -> Option<StateChange> {
        if self.state == SessionState::Running {
            tracing::debug!("Already running, {:?} causes no transition", event);
            return None;
        }
        Some(self.apply(SessionState::Running, event))
    }

    fn require(&self, state: SessionState, event: SessionEvent) -> Result<(), TransitionError> {
        if self.state == state {
            Ok(())
        } else {
            Err(TransitionError {
                from: self.state,
                event,
            })
        }
    }

    fn apply(&mut self, to: SessionState, event: SessionEvent) -> StateChange {
        let change = StateChange {
            from: self.state,
            to,
            event,
        };
        self.state = to;
        self.current_tx.send_replace(to);

        tracing::info!("Session {} -> {} ({:?})", change.from, change.to, event);

        // Ignore send errors - it's OK if no one is listening
        let _ = self.state_tx.send(change.clone());
        change
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_machine() -> SessionStateMachine {
        let mut machine = SessionStateMachine::new();
        machine.begin_start().unwrap();
        machine.tracker_ready().unwrap();
        machine.occlusion_resolved().unwrap();
        machine
    }

    #[test]
    fn test_new_machine() {
        let machine = SessionStateMachine::new();
        assert_eq!(machine.state(), SessionState::NotLoaded);
        assert_eq!(machine.attached_model(), None);
        assert_eq!(machine.pending_model(), None);
    }

    #[test]
    fn test_startup_sequence() {
        let mut machine = SessionStateMachine::new();

        let change = machine.begin_start().unwrap();
        assert_eq!(change.from, SessionState::NotLoaded);
        assert_eq!(change.to, SessionState::Loading);

        machine.tracker_ready().unwrap();
        assert_eq!(machine.state(), SessionState::Loading);

        let change = machine.occlusion_resolved().unwrap();
        assert_eq!(change.to, SessionState::Idle);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut machine = SessionStateMachine::new();
        machine.begin_start().unwrap();

        let err = machine.begin_start().unwrap_err();
        assert_eq!(err.from, SessionState::Loading);
        assert_eq!(err.event, SessionEvent::StartRequested);
    }

    #[test]
    fn test_occlusion_before_start_is_rejected() {
        let mut machine = SessionStateMachine::new();
        assert!(machine.occlusion_resolved().is_err());
        assert!(machine.tracker_ready().is_err());
        assert_eq!(machine.state(), SessionState::NotLoaded);
    }

    #[test]
    fn test_abort_start() {
        let mut machine = SessionStateMachine::new();
        machine.begin_start().unwrap();

        let change = machine.abort_start().unwrap();
        assert_eq!(change.to, SessionState::NotLoaded);

        // Nothing to abort once idle
        let mut machine = idle_machine();
        assert!(machine.abort_start().is_none());
        assert_eq!(machine.state(), SessionState::Idle);
    }

    #[test]
    fn test_load_accepted_from_idle() {
        let mut machine = idle_machine();

        assert_eq!(machine.request_model_load("watch"), LoadDecision::Accepted);
        assert_eq!(machine.state(), SessionState::Busy);
        assert_eq!(machine.pending_model(), Some("watch"));
    }

    #[test]
    fn test_guard_rejects_before_idle() {
        let mut machine = SessionStateMachine::new();
        assert_eq!(
            machine.request_model_load("watch"),
            LoadDecision::NotReady(SessionState::NotLoaded)
        );

        machine.begin_start().unwrap();
        assert_eq!(
            machine.request_model_load("watch"),
            LoadDecision::NotReady(SessionState::Loading)
        );
        assert_eq!(machine.pending_model(), None);
    }

    #[test]
    fn test_guard_rejects_while_busy() {
        let mut machine = idle_machine();
        machine.request_model_load("watch");

        assert_eq!(
            machine.request_model_load("bracelet"),
            LoadDecision::NotReady(SessionState::Busy)
        );
        assert_eq!(machine.pending_model(), Some("watch"));
    }

    #[test]
    fn test_guard_rejects_same_model() {
        let mut machine = idle_machine();
        machine.request_model_load("watch");
        machine.model_attached("watch").unwrap();

        let mut rx = machine.subscribe();
        assert_eq!(machine.request_model_load("watch"), LoadDecision::AlreadyAttached);
        assert_eq!(machine.state(), SessionState::Running);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_swap_from_running() {
        let mut machine = idle_machine();
        machine.request_model_load("watch");
        machine.model_attached("watch").unwrap();

        assert!(machine.request_model_load("bracelet").is_accepted());
        assert_eq!(machine.state(), SessionState::Busy);
        assert_eq!(machine.attached_model(), None);

        machine.model_attached("bracelet").unwrap();
        assert_eq!(machine.attached_model(), Some("bracelet"));
        assert_eq!(machine.state(), SessionState::Running);
    }

    #[test]
    fn test_all_loaded_then_attached() {
        let mut machine = idle_machine();
        machine.request_model_load("watch");

        let change = machine.all_assets_loaded().unwrap();
        assert_eq!(change.from, SessionState::Busy);
        assert_eq!(change.to, SessionState::Running);

        // Load still pending: no overlapping request
        assert_eq!(
            machine.request_model_load("bracelet"),
            LoadDecision::Pending("watch".to_string())
        );

        assert_eq!(machine.model_attached("watch").unwrap(), None);
        assert_eq!(machine.state(), SessionState::Running);
    }

    #[test]
    fn test_attached_then_all_loaded() {
        let mut machine = idle_machine();
        machine.request_model_load("watch");

        assert!(machine.model_attached("watch").unwrap().is_some());
        assert!(machine.all_assets_loaded().is_none());
        assert_eq!(machine.state(), SessionState::Running);
    }

    #[test]
    fn test_all_loaded_ignored_while_idle() {
        let mut machine = idle_machine();
        assert!(machine.all_assets_loaded().is_none());
        assert_eq!(machine.state(), SessionState::Idle);
    }

    #[test]
    fn test_attach_without_pending_is_rejected() {
        let mut machine = idle_machine();
        assert!(machine.model_attached("watch").is_err());
    }

    #[test]
    fn test_load_failure_returns_to_idle() {
        let mut machine = idle_machine();
        machine.request_model_load("watch");

        let change = machine.model_load_failed("watch").unwrap();
        assert_eq!(change.to, SessionState::Idle);
        assert_eq!(machine.pending_model(), None);
        assert_eq!(machine.attached_model(), None);

        // The same model can be requested again
        assert!(machine.request_model_load("watch").is_accepted());
    }

    #[test]
    fn test_subscribe_to_changes() {
        let mut machine = SessionStateMachine::new();
        let mut rx = machine.subscribe();

        machine.begin_start().unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.to, SessionState::Loading);
        assert_eq!(event.event, SessionEvent::StartRequested);
    }

    #[test]
    fn test_watch_tracks_current_state() {
        let mut machine = idle_machine();
        let rx = machine.watch();
        assert_eq!(*rx.borrow(), SessionState::Idle);

        machine.request_model_load("watch");
        assert_eq!(*rx.borrow(), SessionState::Busy);
    }
}
