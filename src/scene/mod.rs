//! Named-node scene graph the setup engine reads from and builds into.
//!
//! This is the narrow collaborator surface the setup pipeline needs:
//! case-insensitive lookup under a root, descendant enumeration, node
//! creation and destruction, and typed component access. Hosts with their
//! own scene representation mirror this shape.

use std::fmt;

use glam::{EulerRot, Mat4, Quat, Vec3};

mod components;

pub use components::{
    AngleLimits, Collider, ColliderShape, LengthLimit, ManagerSettings, SpringBone, SpringManager,
};

/// Stable handle to a node in a [`Scene`].
///
/// Handles of destroyed nodes go stale; [`Scene::get`] returns `None` for them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named transform with optional physics components.
///
/// Rotation is kept as euler degrees, the representation setup records are
/// authored in; matrix math derives the quaternion on demand.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,

    pub position: Vec3,
    pub euler: Vec3,
    pub scale: Vec3,

    pub bone: Option<SpringBone>,
    pub collider: Option<Collider>,
    pub manager: Option<SpringManager>,

    /// Marks pivots generated by the builder, as opposed to hand-authored nodes.
    pub pivot_marker: bool,
    pub renderer: bool,
    pub skin_bone: bool,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            position: Vec3::ZERO,
            euler: Vec3::ZERO,
            scale: Vec3::ONE,
            bone: None,
            collider: None,
            manager: None,
            pivot_marker: false,
            renderer: false,
            skin_bone: false,
        }
    }
}

/// Flat node arena. Slots of destroyed nodes stay behind as `None` so
/// handles never alias a different node.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
}

/// Convert record euler angles (degrees, applied x, y, z) to a rotation.
pub fn quat_from_euler_deg(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::XYZ,
        euler.x.to_radians(),
        euler.y.to_radians(),
        euler.z.to_radians(),
    )
}

/// Inverse of [`quat_from_euler_deg`], for export.
pub fn euler_deg_from_quat(rotation: Quat) -> Vec3 {
    let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node with no parent.
    pub fn create_root(&mut self, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node::new(name, None)));
        id
    }

    /// Create a child node at the parent's origin.
    pub fn create_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node::new(name, Some(parent))));

        if let Some(node) = self.slot_mut(parent) {
            node.children.push(id);
        }

        id
    }

    fn slot(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slot(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slot_mut(id)
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.slot(id).map(|node| node.name.as_str()).unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map(|node| node.children.as_slice()).unwrap_or_default()
    }

    /// Number of ancestors above this node.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);

        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }

        depth
    }

    /// Destroy a node and its whole subtree.
    pub fn destroy(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0 as usize).and_then(Option::take) else {
            return;
        };

        if let Some(parent) = node.parent {
            if let Some(parent) = self.slot_mut(parent) {
                parent.children.retain(|child| *child != id);
            }
        }

        for child in node.children {
            self.destroy_subtree(child);
        }
    }

    fn destroy_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0 as usize).and_then(Option::take) else {
            return;
        };

        for child in node.children {
            self.destroy_subtree(child);
        }
    }

    /// All live descendants of `root` in pre-order, excluding `root` itself.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(root, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children(id).to_vec() {
            if self.is_alive(child) {
                out.push(child);
                self.collect_descendants(child, out);
            }
        }
    }

    /// Resolve a node by case-insensitive name under `root`, inclusive.
    pub fn find(&self, root: NodeId, name: &str) -> Option<NodeId> {
        if self.name(root).eq_ignore_ascii_case(name) {
            return Some(root);
        }

        self.descendants(root)
            .into_iter()
            .find(|id| self.name(*id).eq_ignore_ascii_case(name))
    }

    /// Resolve a renderer-carrying node by name under `root`.
    pub fn find_renderer(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|id| self.slot(*id).is_some_and(|node| node.renderer) && self.name(*id).eq_ignore_ascii_case(name))
    }

    /// Resolve a collider-carrying node by name under `root`.
    pub fn find_collider(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|id| self.slot(*id).is_some_and(|node| node.collider.is_some()) && self.name(*id).eq_ignore_ascii_case(name))
    }

    pub fn local_matrix(&self, id: NodeId) -> Mat4 {
        let Some(node) = self.slot(id) else {
            return Mat4::IDENTITY;
        };

        Mat4::from_scale_rotation_translation(node.scale, quat_from_euler_deg(node.euler), node.position)
    }

    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut chain = vec![id];
        let mut current = self.parent(id);

        while let Some(parent) = current {
            chain.push(parent);
            current = self.parent(parent);
        }

        chain
            .into_iter()
            .rev()
            .fold(Mat4::IDENTITY, |world, id| world * self.local_matrix(id))
    }

    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world_matrix(id).transform_point3(Vec3::ZERO)
    }

    /// Move a node so it lands on `world` without touching its rotation or scale.
    pub fn set_world_position(&mut self, id: NodeId, world: Vec3) {
        let parent_world = match self.parent(id) {
            Some(parent) => self.world_matrix(parent),
            None => Mat4::IDENTITY,
        };

        let local = parent_world.inverse().transform_point3(world);

        if let Some(node) = self.slot_mut(id) {
            node.position = local;
        }
    }
}
