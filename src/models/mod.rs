//! Data models for the try-on session.
//!
//! - [`Settings`]: Tracking modes, loadable models and debug flags loaded from `tryon.yaml`
//! - [`ModeSettings`] / [`ModelSettings`]: Immutable per-mode and per-asset configuration
//! - [`SessionState`]: The lifecycle value owned by the session state machine
//! - [`SceneNode`], [`Transform`], [`SoftOccluder`]: Render-scene values exchanged with the engine
//!
//! Settings are read-only once loaded. The session state and the attached
//! wearable are the only mutable entities, and both belong to the session.

pub mod config;
pub mod scene;
pub mod session_state;

pub use config::{
    DebugFlags, FacingMode, ModeSettings, ModelSettings, OccluderSettings, Settings,
    SettingsError, StabilizerOptions,
};
pub use scene::{Material, SceneNode, SoftOccluder, Transform};
pub use session_state::SessionState;
