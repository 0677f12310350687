//! Occluder setup for a tracking mode.
//!
//! Three strategies, selected by [`OccluderSettings`]:
//! - `none`: nothing to attach
//! - `soft_cylinder`: procedural fading shell built directly in engine frame
//! - `model`: rigid asset fetched from a URL and run through the frame adapter

use super::engine::{AssetError, RenderEngine};
use super::frame_adapter::{AuthoredTransform, FrameAdapter, TransformOp};
use crate::models::{Material, OccluderSettings, SoftOccluder, Transform};
use glam::{Quat, Vec3};

/// Radial resolution of the soft occluder shell
pub const SHROUD_RADIAL_SEGMENTS: u32 = 32;

/// What the occlusion step ended up attaching
#[derive(Debug, Clone, PartialEq)]
pub enum OcclusionOutcome {
    None,
    Soft,
    Hard { ops: Vec<TransformOp> },
    /// Debug mode: the rigid occluder was loaded but not attached
    HardDiverted { ops: Vec<TransformOp> },
}

/// Build the soft occluder shell from engine-frame configuration.
///
/// The shell uses the exterior radius; the fade spans the radius range.
/// No frame conversion is applied.
pub fn build_soft_occluder(
    radius_range: [f32; 2],
    height: f32,
    offset: Vec3,
    quaternion: Quat,
    flatten_coeff: f32,
    debug: bool,
) -> SoftOccluder {
    let [inner, outer] = radius_range;
    SoftOccluder {
        radius: outer,
        fade_width: outer - inner,
        height,
        radial_segments: SHROUD_RADIAL_SEGMENTS,
        open_ended: true,
        transform: Transform {
            position: offset,
            rotation: quaternion,
            scale: Vec3::new(1.0, 1.0, flatten_coeff),
        },
        debug,
    }
}

/// Attach the occluder configured for a mode.
///
/// Resolves once the occluder is attached. A fetch failure of the rigid
/// occluder is returned to the caller, which treats it as fatal.
///
/// In debug mode a rigid occluder gets the diagnostic material and is not
/// attached; the step still resolves so startup can complete.
pub async fn setup_occlusion<E>(
    engine: &E,
    occluder: &OccluderSettings,
    debug: bool,
) -> Result<OcclusionOutcome, AssetError>
where
    E: RenderEngine + ?Sized,
{
    match occluder {
        OccluderSettings::None => {
            tracing::info!("No occluder configured");
            Ok(OcclusionOutcome::None)
        }

        OccluderSettings::SoftCylinder {
            radius_range,
            height,
            offset,
            quaternion,
            flatten_coeff,
        } => {
            let shroud = build_soft_occluder(
                *radius_range,
                *height,
                *offset,
                *quaternion,
                *flatten_coeff,
                debug,
            );
            tracing::info!(
                "Attaching soft occluder: radius={}, fade={}, height={}",
                shroud.radius,
                shroud.fade_width,
                shroud.height
            );
            engine.attach_soft_occluder(shroud);
            Ok(OcclusionOutcome::Soft)
        }

        OccluderSettings::Model { url, .. } => {
            let mut node = engine.load_asset(url).await?;

            let authored = AuthoredTransform::for_occluder(occluder).unwrap_or_default();
            let ops = FrameAdapter::apply(&authored, &mut node.transform);

            if debug {
                node.material = Material::Normal;
                tracing::warn!(
                    "Debug occluder mode: {} diverted to diagnostic material and not attached",
                    url
                );
                return Ok(OcclusionOutcome::HardDiverted { ops });
            }

            tracing::info!("Attaching rigid occluder from {}", url);
            engine.attach_occluder(node);
            Ok(OcclusionOutcome::Hard { ops })
        }
    }
}
