// tryon - Session orchestration for hand/wrist tracked virtual try-on
//
// This is the library crate: settings, the session state machine, the asset
// frame adapter, and the session that drives the tracker and the render engine.
// The binary crate (main.rs) runs a headless session.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod session;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{ModeSettings, ModelSettings, SessionState, Settings};
pub use session::{LoadOutcome, Session, SessionError, SessionHandle};
pub use state::{SessionStateMachine, StateChange};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
