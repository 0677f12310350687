use super::BoxFuture;
use crate::models::{SceneNode, SoftOccluder};
use thiserror::Error;
use tokio::sync::broadcast;

/// Engine-wide notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Every load tracked by the engine's loading manager has finished
    AllAssetsLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneMapping {
    AcesFilmic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEncoding {
    Srgb,
}

/// Errors from asset and environment loads
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to parse {url}: {reason}")]
    Parse { url: String, reason: String },

    #[error("Asset {url} contains no mesh")]
    EmptyScene { url: String },
}

impl AssetError {
    pub fn url(&self) -> &str {
        match self {
            AssetError::Fetch { url, .. }
            | AssetError::Parse { url, .. }
            | AssetError::EmptyScene { url } => url,
        }
    }
}

/// 3D rendering engine driven by the session
///
/// Attach calls transfer node ownership to the engine's scene. Wearables and
/// occluders live in separate groups so a model swap only clears wearables.
#[cfg_attr(test, mockall::automock)]
pub trait RenderEngine: Send + Sync {
    /// Receiver for engine-wide events
    fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent>;

    fn configure_output(&self, tone_mapping: ToneMapping, encoding: OutputEncoding);

    /// Fetch an equirectangular map and install it as scene environment
    fn load_environment(&self, url: &str) -> BoxFuture<'static, Result<(), AssetError>>;

    /// Fetch a 3D asset and resolve with its first mesh
    fn load_asset(&self, url: &str) -> BoxFuture<'static, Result<SceneNode, AssetError>>;

    fn attach_wearable(&self, node: SceneNode);

    fn attach_occluder(&self, node: SceneNode);

    fn attach_soft_occluder(&self, occluder: SoftOccluder);

    /// Remove every wearable, keeping occluders
    fn clear_wearables(&self);
}
