use std::fmt;

/// Lifecycle state of a try-on session.
///
/// Exactly one value exists per [`crate::session::Session`], owned by its
/// [`SessionStateMachine`](crate::state::SessionStateMachine). Other parties only
/// ever see copies of it (through the session handle or change events).
///
/// # Transitions
///
/// ```text
/// NotLoaded ──start──▶ Loading ──occlusion resolved──▶ Idle
///                         │                             │
///                         └──all assets loaded──┐       │ load requested
///                                               ▼       ▼
///                      Running ◀──model attached── Busy
///                         │                             ▲
///                         └──────── load requested ─────┘
/// ```
///
/// See [`crate::state::SessionStateMachine`] for the full transition table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Process start, nothing initialized yet
    #[default]
    NotLoaded,

    /// Tracker or environment initialization in flight
    Loading,

    /// Tracker ready; no wearable attached, or a swap may be requested
    Idle,

    /// A wearable asset is attached and live
    Running,

    /// A model load is in flight
    Busy,
}

impl SessionState {
    /// Whether a model-load request may be accepted in this state.
    pub fn accepts_model_requests(self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Running)
    }

    /// Whether the session has finished startup (tracker and occlusion ready).
    pub fn is_started(self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Running | SessionState::Busy
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::NotLoaded => "not-loaded",
            SessionState::Loading => "loading",
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Busy => "busy",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        assert_eq!(SessionState::default(), SessionState::NotLoaded);
    }

    #[test]
    fn test_accepts_model_requests() {
        assert!(SessionState::Idle.accepts_model_requests());
        assert!(SessionState::Running.accepts_model_requests());

        assert!(!SessionState::NotLoaded.accepts_model_requests());
        assert!(!SessionState::Loading.accepts_model_requests());
        assert!(!SessionState::Busy.accepts_model_requests());
    }

    #[test]
    fn test_is_started() {
        assert!(!SessionState::NotLoaded.is_started());
        assert!(!SessionState::Loading.is_started());
        assert!(SessionState::Busy.is_started());
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::NotLoaded.to_string(), "not-loaded");
        assert_eq!(SessionState::Busy.to_string(), "busy");
    }
}
