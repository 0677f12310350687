//! Session orchestration.
//!
//! [`Session`] runs a try-on session end to end: tracker initialization,
//! lighting, occlusion, then wearable loads on request. [`SessionHandle`] is how
//! the rest of the application talks to a running session.
//!
//! # Error taxonomy
//!
//! - Startup failures ([`SessionError::TrackerInit`], [`SessionError::OcclusionSetup`])
//!   are fatal: the session returns to `NotLoaded` and the error reaches the caller.
//! - Dropped load requests are not errors: [`LoadOutcome::Rejected`].
//! - Wearable fetch failures ([`SessionError::ModelLoad`]) leave the session
//!   `Idle`; the run loop logs them and keeps serving.
//!
//! Nothing is retried automatically.

pub mod controller;
pub mod handle;
pub mod overlay;

pub use controller::{LoadOutcome, Session};
pub use handle::{SessionCommand, SessionHandle};
pub use overlay::{LogOverlay, Overlay};

use crate::models::SettingsError;
use crate::services::{AssetError, TrackerError};
use crate::state::TransitionError;
use thiserror::Error;

/// Errors surfaced by a session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Tracker failed to start: {0}")]
    TrackerInit(#[source] TrackerError),

    #[error("Occluder setup failed: {0}")]
    OcclusionSetup(#[source] AssetError),

    #[error("Model {model} failed to load: {source}")]
    ModelLoad {
        model: String,
        #[source]
        source: AssetError,
    },

    #[error("Model {0} is not configured")]
    UnknownModel(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Session is no longer running")]
    Closed,
}
