//! Services module - the collaborators a session drives, and the pure logic it applies.
//!
//! # Components
//!
//! - [`HandTracker`]: External hand/wrist detector. Initialized once per session with
//!   [`TrackerInit`], then reports every processed frame through a callback.
//! - [`RenderEngine`]: External 3D engine. Loads assets, owns the scene graph, and
//!   broadcasts [`EngineEvent::AllAssetsLoaded`] when its loading queue drains.
//! - [`FrameAdapter`]: Converts authored asset transforms into the engine frame.
//! - [`setup_occlusion`]: Attaches the occluder a tracking mode asks for.
//! - [`headless`]: In-memory implementations of both collaborators.
//!
//! Collaborator methods that complete later return a boxed `Send` future, so
//! implementations can be mocked and the session can race them against its
//! other event sources.

pub mod engine;
pub mod frame_adapter;
pub mod headless;
pub mod occlusion;
pub mod tracker;

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by collaborator calls
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use engine::{AssetError, EngineEvent, OutputEncoding, RenderEngine, ToneMapping};
pub use frame_adapter::{AuthoredTransform, FrameAdapter, TransformOp};
pub use headless::{HeadlessEngine, HeadlessScene, LoadGate, ScriptedTracker};
pub use occlusion::{OcclusionOutcome, build_soft_occluder, setup_occlusion};
pub use tracker::{CanvasSize, DetectState, DetectionCallback, HandTracker, TrackerError, TrackerInit};
