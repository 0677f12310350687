use glam::{Quat, Vec3};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory the bundled tracking networks are loaded from.
pub const NN_PATH: &str = "neuralNets/";

/// Top-level try-on configuration, usually loaded from `tryon.yaml`.
///
/// Contains the tracking modes, the loadable models, and debug switches.
/// Every field has a default reproducing the bundled wrist demo, so a partial
/// (or missing) file still yields a usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_modes")]
    pub modes: IndexMap<String, ModeSettings>,

    #[serde(default = "default_models")]
    pub models: IndexMap<String, ModelSettings>,

    #[serde(default = "default_initial_model")]
    pub initial_model: String,

    /// Equirectangular HDR map used for image-based lighting
    #[serde(default = "default_environment_map")]
    pub environment_map: String,

    #[serde(default)]
    pub facing_mode: FacingMode,

    #[serde(default)]
    pub debug: DebugFlags,
}

/// Tracking-mode configuration shared by every model that uses the mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeSettings {
    pub nn_paths: Vec<String>,

    /// Detection sensitivity, between 0 and 1
    pub threshold: f32,

    /// Ordered pose landmark labels handed to the tracker
    pub landmark_labels: Vec<String>,

    #[serde(default = "default_true")]
    pub pose_filter: bool,

    pub stabilizer: StabilizerOptions,

    /// Factors applied to object point positions to lower pose angles
    #[serde(default = "default_position_factors")]
    pub object_points_position_factors: Vec3,

    #[serde(default)]
    pub occluder: OccluderSettings,
}

/// Pose stabilizer filter parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilizerOptions {
    pub min_cutoff: f32,
    pub beta: f32,
    pub freq_range: [f32; 2],
    pub force_filter_nn_input_px_range: [f32; 2],
}

/// Occluder strategy for a tracking mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OccluderSettings {
    /// No occluding geometry
    #[default]
    None,

    /// Procedural fading cylinder shell, in engine frame
    SoftCylinder {
        /// Interior radius (full transparency) and exterior radius (full opacity)
        radius_range: [f32; 2],
        height: f32,
        #[serde(default)]
        offset: Vec3,
        #[serde(default = "default_identity")]
        quaternion: Quat,
        /// 1 keeps a cylinder, 0.5 flattens it by 50%
        #[serde(default = "default_flatten")]
        flatten_coeff: f32,
    },

    /// Rigid occluder loaded from a 3D asset, authored like a model
    Model {
        url: String,
        #[serde(default = "default_scale")]
        scale: f32,
        #[serde(default)]
        offset: Option<Vec3>,
        #[serde(default)]
        quaternion: Option<Quat>,
    },
}

/// A loadable wearable model.
///
/// `offset` and `quaternion` are expressed in the authoring convention
/// (quaternion order X, Y, Z, W); see [`crate::services::frame_adapter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub mode: String,
    pub url: String,

    #[serde(default)]
    pub scale: Option<f32>,

    #[serde(default)]
    pub offset: Option<Vec3>,

    #[serde(default)]
    pub quaternion: Option<Quat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DebugFlags {
    #[serde(default)]
    pub display_landmarks: bool,

    /// Replace wearable materials with a diagnostic normal material
    #[serde(default)]
    pub mesh_material: bool,

    /// Divert occluders to diagnostic rendering
    #[serde(default)]
    pub occluder: bool,
}

impl DebugFlags {
    pub fn any(&self) -> bool {
        self.display_landmarks || self.mesh_material || self.occluder
    }
}

/// Reasons a [`Settings`] value is rejected by [`Settings::validate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("Initial model {0} is not defined")]
    UnknownInitialModel(String),

    #[error("Model {model} references unknown mode {mode}")]
    UnknownMode { model: String, mode: String },

    #[error("Mode {mode} has threshold {value} outside [0, 1]")]
    ThresholdOutOfRange { mode: String, value: f32 },

    #[error("Mode {mode} has occluder radius range [{inner}, {outer}] with inner > outer")]
    InvertedRadiusRange { mode: String, inner: f32, outer: f32 },

    #[error("{0} must have a finite, positive scale")]
    NonPositiveScale(String),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            modes: default_modes(),
            models: default_models(),
            initial_model: default_initial_model(),
            environment_map: default_environment_map(),
            facing_mode: FacingMode::default(),
            debug: DebugFlags::default(),
        }
    }
}

impl Settings {
    pub fn model(&self, model_id: &str) -> Option<&ModelSettings> {
        self.models.get(model_id)
    }

    /// Get the tracking mode a model runs under
    pub fn mode_for_model(&self, model_id: &str) -> Option<&ModeSettings> {
        self.model(model_id)
            .and_then(|model| self.modes.get(&model.mode))
    }

    /// Get the tracking mode selected by the initial model
    pub fn initial_mode(&self) -> Result<&ModeSettings, SettingsError> {
        self.mode_for_model(&self.initial_model)
            .ok_or_else(|| SettingsError::UnknownInitialModel(self.initial_model.clone()))
    }

    /// Check cross references and numeric ranges.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.models.contains_key(&self.initial_model) {
            return Err(SettingsError::UnknownInitialModel(
                self.initial_model.clone(),
            ));
        }

        for (mode_id, mode) in &self.modes {
            if !(0.0..=1.0).contains(&mode.threshold) {
                return Err(SettingsError::ThresholdOutOfRange {
                    mode: mode_id.clone(),
                    value: mode.threshold,
                });
            }

            match &mode.occluder {
                OccluderSettings::SoftCylinder { radius_range, .. }
                    if radius_range[0] > radius_range[1] =>
                {
                    return Err(SettingsError::InvertedRadiusRange {
                        mode: mode_id.clone(),
                        inner: radius_range[0],
                        outer: radius_range[1],
                    });
                }
                OccluderSettings::Model { scale, .. } if !is_valid_scale(*scale) => {
                    return Err(SettingsError::NonPositiveScale(format!(
                        "Occluder of mode {}",
                        mode_id
                    )));
                }
                _ => {}
            }
        }

        for (model_id, model) in &self.models {
            if !self.modes.contains_key(&model.mode) {
                return Err(SettingsError::UnknownMode {
                    model: model_id.clone(),
                    mode: model.mode.clone(),
                });
            }
            if model.scale.is_some_and(|scale| !is_valid_scale(scale)) {
                return Err(SettingsError::NonPositiveScale(format!("Model {}", model_id)));
            }
        }

        Ok(())
    }
}

/// Scales must be finite and strictly positive; NaN fails both
fn is_valid_scale(scale: f32) -> bool {
    scale.is_finite() && scale > 0.0
}

fn default_true() -> bool {
    true
}

fn default_scale() -> f32 {
    1.0
}

fn default_flatten() -> f32 {
    1.0
}

fn default_identity() -> Quat {
    Quat::IDENTITY
}

fn default_position_factors() -> Vec3 {
    Vec3::ONE
}

fn default_initial_model() -> String {
    "wristDemo".to_string()
}

fn default_environment_map() -> String {
    "assets/hotel_room_1k.hdr".to_string()
}

fn default_modes() -> IndexMap<String, ModeSettings> {
    let wrist = ModeSettings {
        nn_paths: vec![format!("{}NN_WRISTBACK_21.json", NN_PATH)],
        threshold: 0.8,
        // wristRightBottom does not track reliably, this set is the stable one
        landmark_labels: [
            "wristBack",
            "wristRight",
            "wristPalm",
            "wristPalmTop",
            "wristBackTop",
            "wristLeft",
        ]
        .iter()
        .map(|label| label.to_string())
        .collect(),
        pose_filter: true,
        stabilizer: StabilizerOptions {
            min_cutoff: 0.001,
            beta: 3.0,
            freq_range: [2.0, 144.0],
            force_filter_nn_input_px_range: [2.5, 6.0],
        },
        object_points_position_factors: Vec3::new(1.0, 1.3, 1.0),
        occluder: OccluderSettings::SoftCylinder {
            radius_range: [4.0, 4.7],
            height: 48.0,
            offset: Vec3::ZERO,
            // PI/2 around X
            quaternion: Quat::from_xyzw(0.707, 0.0, 0.0, 0.707),
            flatten_coeff: 0.6,
        },
    };

    let mut modes = IndexMap::new();
    modes.insert("wrist".to_string(), wrist);
    modes
}

fn default_models() -> IndexMap<String, ModelSettings> {
    let mut models = IndexMap::new();
    models.insert(
        "wristDemo".to_string(),
        ModelSettings {
            mode: "wrist".to_string(),
            url: "assets/watchCasio.glb".to_string(),
            scale: Some(1.3 * 1.462),
            offset: Some(Vec3::new(0.076, -0.916, -0.504)),
            quaternion: Some(Quat::from_xyzw(0.0, 0.0, 0.0, 1.0)),
        },
    );
    models
}
