//! Components the setup engine attaches to scene nodes.

use glam::Vec3;

use super::NodeId;

/// Rotation range around one local axis, in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AngleLimits {
    pub active: bool,
    pub min: f32,
    pub max: f32,
}

impl Default for AngleLimits {
    fn default() -> Self {
        Self {
            active: false,
            min: -45.0,
            max: 45.0,
        }
    }
}

/// Keeps a bone from stretching past a fraction of its distance to a target node.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LengthLimit {
    pub target: NodeId,
    pub ratio: f32,
}

/// Spring physics decoration for a single bone node.
#[derive(Debug, Clone, PartialEq)]
pub struct SpringBone {
    pub radius: f32,
    pub stiffness: f32,
    pub drag: f32,
    pub spring_force: Vec3,
    pub wind_influence: f32,
    /// Node the bone's rotation is evaluated relative to.
    pub pivot: Option<NodeId>,
    pub y_limit: AngleLimits,
    pub z_limit: AngleLimits,
    pub angular_stiffness: f32,
    pub length_limits: Vec<LengthLimit>,
    pub colliders: Vec<NodeId>,
}

impl Default for SpringBone {
    fn default() -> Self {
        Self {
            radius: 0.05,
            stiffness: 0.01,
            drag: 0.4,
            spring_force: Vec3::new(0.0, -0.0001, 0.0),
            wind_influence: 1.0,
            pivot: None,
            y_limit: AngleLimits::default(),
            z_limit: AngleLimits::default(),
            angular_stiffness: 100.0,
            length_limits: Vec::new(),
            colliders: Vec::new(),
        }
    }
}

/// Collision primitive geometry.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Capsule { radius: f32, height: f32 },
    Panel { width: f32, height: f32 },
}

/// Collision primitive attached to a node, optionally following a renderer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
    pub linked_renderer: Option<NodeId>,
}

/// Simulation-wide parameters that must survive a rebuild.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ManagerSettings {
    pub dynamic_ratio: f32,
    pub gravity: Vec3,
    pub bounce: f32,
    pub friction: f32,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            dynamic_ratio: 1.0,
            gravity: Vec3::new(0.0, -10.0, 0.0),
            bounce: 0.0,
            friction: 1.0,
        }
    }
}

/// Root aggregation component driving all spring bones under it.
///
/// Bones are kept shallowest-first so parents simulate before children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpringManager {
    pub settings: ManagerSettings,
    pub bones: Vec<NodeId>,
}

impl SpringManager {
    pub fn with_settings(settings: ManagerSettings) -> Self {
        Self {
            settings,
            bones: Vec::new(),
        }
    }
}
