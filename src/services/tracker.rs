use super::BoxFuture;
use crate::models::{FacingMode, ModeSettings, Settings, StabilizerOptions};
use glam::Vec3;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Per-frame detection record produced by the tracker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectState {
    pub is_detected: bool,
}

/// Callback invoked by the tracker once per processed frame
pub type DetectionCallback = Arc<dyn Fn(&DetectState) + Send + Sync>;

/// Canvas dimensions in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    /// Size a full-height canvas, at most 3:4 wide, for the given window.
    ///
    /// Fractional device pixels are truncated.
    pub fn fit_portrait(window_width: f32, window_height: f32, pixel_ratio: f32) -> Self {
        let width = window_width.min(window_height * 3.0 / 4.0);
        Self {
            width: (pixel_ratio * width) as u32,
            height: (pixel_ratio * window_height) as u32,
        }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::fit_portrait(720.0, 1280.0, 1.0)
    }
}

/// Parameters of the tracker initialization call
#[derive(Clone)]
pub struct TrackerInit {
    pub nn_paths: Vec<String>,
    pub threshold: f32,
    pub landmark_labels: Vec<String>,
    pub pose_filter: bool,
    pub stabilizer: StabilizerOptions,
    pub object_points_position_factors: Vec3,
    pub facing_mode: FacingMode,
    pub canvas: CanvasSize,
    pub debug_display_landmarks: bool,
    pub on_detect: DetectionCallback,
}

impl TrackerInit {
    pub fn from_mode(
        mode: &ModeSettings,
        settings: &Settings,
        canvas: CanvasSize,
        on_detect: DetectionCallback,
    ) -> Self {
        Self {
            nn_paths: mode.nn_paths.clone(),
            threshold: mode.threshold,
            landmark_labels: mode.landmark_labels.clone(),
            pose_filter: mode.pose_filter,
            stabilizer: mode.stabilizer.clone(),
            object_points_position_factors: mode.object_points_position_factors,
            facing_mode: settings.facing_mode,
            canvas,
            debug_display_landmarks: settings.debug.display_landmarks,
            on_detect,
        }
    }
}

impl fmt::Debug for TrackerInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerInit")
            .field("nn_paths", &self.nn_paths)
            .field("threshold", &self.threshold)
            .field("landmark_labels", &self.landmark_labels)
            .field("pose_filter", &self.pose_filter)
            .field("stabilizer", &self.stabilizer)
            .field(
                "object_points_position_factors",
                &self.object_points_position_factors,
            )
            .field("facing_mode", &self.facing_mode)
            .field("canvas", &self.canvas)
            .field("debug_display_landmarks", &self.debug_display_landmarks)
            .finish_non_exhaustive()
    }
}

/// Errors reported by the tracker initialization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Neural network {path} failed to load: {reason}")]
    NetworkLoad { path: String, reason: String },

    #[error("Camera unavailable: {0}")]
    Camera(String),

    #[error("Tracker initialization failed: {0}")]
    Init(String),
}

/// Hand/wrist tracking detector
///
/// The detector owns pose estimation entirely. The session only initializes it
/// and reacts to the per-frame callback.
#[cfg_attr(test, mockall::automock)]
pub trait HandTracker: Send + Sync {
    /// Start the detector; resolves once it is ready to process frames
    fn init(&self, params: TrackerInit) -> BoxFuture<'static, Result<(), TrackerError>>;
}
