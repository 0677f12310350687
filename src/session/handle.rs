// Session handle
//
// The cloneable front door of a running session. Requests go through a bounded
// command queue into the session's single loop, so every state mutation still
// happens in one place.

use super::SessionError;
use crate::models::SessionState;
use crate::state::StateChange;
use tokio::sync::{broadcast, mpsc, watch};

/// Capacity of the command queue
pub const COMMAND_QUEUE_CAPACITY: usize = 32;

/// Requests accepted by the session loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Swap the wearable; dropped by the load guard when not applicable
    LoadModel(String),

    /// Stop the loop once the current load (if any) completes
    Shutdown,
}

/// Cloneable handle to a [`Session`](super::Session)
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    state_rx: watch::Receiver<SessionState>,
    changes: broadcast::Sender<StateChange>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<SessionCommand>,
        state_rx: watch::Receiver<SessionState>,
        changes: broadcast::Sender<StateChange>,
    ) -> Self {
        Self {
            commands,
            state_rx,
            changes,
        }
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    /// Queue a model swap
    ///
    /// Queuing always succeeds while the session is alive; whether the load
    /// happens is decided by the session's guard.
    pub async fn request_model(&self, model_id: impl Into<String>) -> Result<(), SessionError> {
        self.send(SessionCommand::LoadModel(model_id.into())).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown).await
    }

    /// Wait until the session reaches `target`
    pub async fn wait_for_state(&self, target: SessionState) -> Result<(), SessionError> {
        let mut rx = self.state_rx.clone();
        rx.wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| SessionError::Closed)
    }

    async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}
