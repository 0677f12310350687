//! Asset frame adapter - authored transforms to the tracking/render frame.
//!
//! Wearables and rigid occluders are authored in a Z-up convention, while the
//! tracking pipeline works Y-up. Converting swaps the vertical and depth axes
//! and negates the new depth:
//!
//! - position `(x, y, z)` becomes `(x, z, -y)`
//! - quaternion `(qx, qy, qz, qw)` becomes `(qx, qz, -qy, qw)`
//!
//! Both mappings are exact (a permutation plus a sign flip, no arithmetic).

use crate::models::{ModelSettings, OccluderSettings, Transform};
use glam::{Quat, Vec3};

/// Map an authored position into the engine frame
pub fn authored_to_engine_position(offset: Vec3) -> Vec3 {
    Vec3::new(offset.x, offset.z, -offset.y)
}

/// Map an authored rotation into the engine frame
pub fn authored_to_engine_rotation(rotation: Quat) -> Quat {
    Quat::from_xyzw(rotation.x, rotation.z, -rotation.y, rotation.w)
}

/// Inverse of [`authored_to_engine_position`]
pub fn engine_to_authored_position(position: Vec3) -> Vec3 {
    Vec3::new(position.x, -position.z, position.y)
}

/// Inverse of [`authored_to_engine_rotation`]
pub fn engine_to_authored_rotation(rotation: Quat) -> Quat {
    Quat::from_xyzw(rotation.x, -rotation.z, rotation.y, rotation.w)
}

/// Transform of an asset as written in its configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AuthoredTransform {
    pub scale: Option<f32>,
    pub offset: Option<Vec3>,
    pub quaternion: Option<Quat>,
}

impl From<&ModelSettings> for AuthoredTransform {
    fn from(model: &ModelSettings) -> Self {
        Self {
            scale: model.scale,
            offset: model.offset,
            quaternion: model.quaternion,
        }
    }
}

impl AuthoredTransform {
    /// Authored transform of a rigid occluder, `None` for other occluder kinds
    pub fn for_occluder(occluder: &OccluderSettings) -> Option<Self> {
        match occluder {
            OccluderSettings::Model {
                scale,
                offset,
                quaternion,
                ..
            } => Some(Self {
                scale: Some(*scale),
                offset: *offset,
                quaternion: *quaternion,
            }),
            _ => None,
        }
    }
}

/// A single mutation applied to a node's transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOp {
    /// Multiply the existing scale by a uniform factor
    MultiplyScale(f32),

    /// Add a displacement to the existing position
    Translate(Vec3),

    /// Replace the rotation
    SetRotation(Quat),
}

impl TransformOp {
    pub fn apply_to(&self, transform: &mut Transform) {
        match *self {
            TransformOp::MultiplyScale(factor) => transform.scale *= factor,
            TransformOp::Translate(displacement) => transform.position += displacement,
            TransformOp::SetRotation(rotation) => transform.rotation = rotation,
        }
    }
}

/// Stateless converter from [`AuthoredTransform`] to engine-frame mutations
pub struct FrameAdapter;

impl FrameAdapter {
    /// Mutations for an authored transform, in application order:
    /// scale, then displacement, then rotation.
    ///
    /// Missing channels produce no operation.
    pub fn plan(authored: &AuthoredTransform) -> Vec<TransformOp> {
        let mut ops = Vec::with_capacity(3);

        if let Some(scale) = authored.scale {
            ops.push(TransformOp::MultiplyScale(scale));
        }
        if let Some(offset) = authored.offset {
            ops.push(TransformOp::Translate(authored_to_engine_position(offset)));
        }
        if let Some(quaternion) = authored.quaternion {
            ops.push(TransformOp::SetRotation(authored_to_engine_rotation(
                quaternion,
            )));
        }

        ops
    }

    /// Apply an authored transform to a node, returning the applied mutations
    pub fn apply(authored: &AuthoredTransform, transform: &mut Transform) -> Vec<TransformOp> {
        let ops = Self::plan(authored);
        for op in &ops {
            op.apply_to(transform);
        }

        tracing::debug!(
            "Frame adapter applied {} ops -> position {:?}, rotation {:?}, scale {:?}",
            ops.len(),
            transform.position,
            transform.rotation,
            transform.scale
        );

        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_mapping() {
        let applied = authored_to_engine_position(Vec3::new(0.076, -0.916, -0.504));
        assert_eq!(applied, Vec3::new(0.076, -0.504, 0.916));
    }

    #[test]
    fn test_rotation_mapping() {
        assert_eq!(authored_to_engine_rotation(Quat::IDENTITY), Quat::IDENTITY);

        let rotation = Quat::from_xyzw(0.707, 0.0, 0.0, 0.707);
        assert_eq!(authored_to_engine_rotation(rotation), rotation);

        let rotation = Quat::from_xyzw(0.1, 0.2, 0.3, 0.9);
        assert_eq!(
            authored_to_engine_rotation(rotation),
            Quat::from_xyzw(0.1, 0.3, -0.2, 0.9)
        );
    }

    #[test]
    fn test_plan_order() {
        let authored = AuthoredTransform {
            scale: Some(2.0),
            offset: Some(Vec3::new(1.0, 2.0, 3.0)),
            quaternion: Some(Quat::IDENTITY),
        };

        let ops = FrameAdapter::plan(&authored);
        assert_eq!(
            ops,
            vec![
                TransformOp::MultiplyScale(2.0),
                TransformOp::Translate(Vec3::new(1.0, 3.0, -2.0)),
                TransformOp::SetRotation(Quat::IDENTITY),
            ]
        );
    }

    #[test]
    fn test_plan_skips_missing_channels() {
        let authored = AuthoredTransform {
            scale: Some(1.5),
            ..AuthoredTransform::default()
        };
        assert_eq!(FrameAdapter::plan(&authored), vec![TransformOp::MultiplyScale(1.5)]);
        assert!(FrameAdapter::plan(&AuthoredTransform::default()).is_empty());
    }

    #[test]
    fn test_scale_composes_with_existing() {
        let mut transform = Transform {
            scale: Vec3::new(0.5, 0.5, 0.5),
            ..Transform::IDENTITY
        };
        let authored = AuthoredTransform {
            scale: Some(4.0),
            ..AuthoredTransform::default()
        };

        FrameAdapter::apply(&authored, &mut transform);
        assert_eq!(transform.scale, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_displacement_is_additive() {
        let mut transform = Transform {
            position: Vec3::new(1.0, 1.0, 1.0),
            ..Transform::IDENTITY
        };
        let authored = AuthoredTransform {
            offset: Some(Vec3::new(1.0, 2.0, 3.0)),
            ..AuthoredTransform::default()
        };

        FrameAdapter::apply(&authored, &mut transform);
        assert_eq!(transform.position, Vec3::new(2.0, 4.0, -1.0));
    }

    #[test]
    fn test_rotation_is_absolute() {
        let mut transform = Transform {
            rotation: Quat::from_xyzw(0.0, 1.0, 0.0, 0.0),
            ..Transform::IDENTITY
        };
        let authored = AuthoredTransform {
            quaternion: Some(Quat::IDENTITY),
            ..AuthoredTransform::default()
        };

        FrameAdapter::apply(&authored, &mut transform);
        assert_eq!(transform.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_occluder_transform() {
        let occluder = OccluderSettings::Model {
            url: "assets/occluder.glb".to_string(),
            scale: 1.2,
            offset: None,
            quaternion: None,
        };
        let authored = AuthoredTransform::for_occluder(&occluder).unwrap();
        assert_eq!(authored.scale, Some(1.2));

        assert!(AuthoredTransform::for_occluder(&OccluderSettings::None).is_none());
    }
}
