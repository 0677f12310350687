// Overlay hooks
//
// The loading spinner and the "show your wrist" instructions belong to the host
// UI. The session only tells it when to hide them.

/// Display toggles owned by the host UI
pub trait Overlay: Send + Sync {
    /// The engine finished its first round of loads
    fn hide_loading(&self);

    /// The tracked limb was detected for the first time
    fn hide_instructions(&self);
}

/// Overlay for headless runs: logs the toggles and does nothing else
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOverlay;

impl Overlay for LogOverlay {
    fn hide_loading(&self) {
        tracing::info!("Overlay: hiding loading indicator");
    }

    fn hide_instructions(&self) {
        tracing::info!("Overlay: hiding instructions");
    }
}
