use glam::{Quat, Vec3};

/// Position, rotation and scale channels of a render-scene node, engine frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Material assignment of a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Material {
    /// Whatever material the asset was authored with
    #[default]
    Authored,

    /// Diagnostic material coloring faces by their normal
    Normal,
}

/// A loaded scene-graph node handed back by the render engine.
///
/// This is the first mesh of a loaded asset. The session mutates its transform
/// and material, then hands ownership back to the engine on attach.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub material: Material,
}

impl SceneNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            material: Material::Authored,
        }
    }
}

/// Procedural fading shroud hiding the tracked limb behind a wearable.
///
/// The fade itself is rendered by the engine: fully transparent at
/// `radius - fade_width`, fully opaque at `radius`.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftOccluder {
    /// Exterior radius of the shell
    pub radius: f32,
    pub fade_width: f32,
    pub height: f32,
    pub radial_segments: u32,
    pub open_ended: bool,
    pub transform: Transform,
    /// Render the shroud visibly for diagnostics
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform() {
        let transform = Transform::default();
        assert_eq!(transform.position, Vec3::ZERO);
        assert_eq!(transform.rotation, Quat::IDENTITY);
        assert_eq!(transform.scale, Vec3::ONE);
    }

    #[test]
    fn test_named_node() {
        let node = SceneNode::named("watch");
        assert_eq!(node.name, "watch");
        assert_eq!(node.material, Material::Authored);
        assert_eq!(node.transform, Transform::IDENTITY);
    }
}
