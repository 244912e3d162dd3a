use std::sync::Arc;

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::navigation::{Intersection, RenderingLayer};

/// Handle to a node stored in a [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(u32);

impl NodeHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Sphere in node-local space that makes a node pickable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl HitSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    fn transform(&self, matrix: &Mat4) -> HitSphere {
        let center = matrix.transform_point3(self.center);
        let scale = matrix.to_scale_rotation_translation().0;
        HitSphere {
            center,
            radius: self.radius * scale.abs().max_element(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeHandle>,
    #[serde(default)]
    pub position: Vec3,
    /// Euler angles in radians, applied in XYZ order.
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_volume: Option<HitSphere>,
}

impl SceneNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: NodeHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_hit_volume(mut self, volume: HitSphere) -> Self {
        self.hit_volume = Some(volume);
        self
    }

    pub fn local_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: None,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: default_scale(),
            visible: default_visible(),
            hit_volume: None,
        }
    }
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_visible() -> bool {
    true
}

/// Shared node store standing in for the host renderer's scene graph.
///
/// Clones share the same nodes, so the page, its effects and the host glue
/// can all hold a handle without global state. Nodes are never removed, which
/// keeps every issued [`NodeHandle`] valid.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Arc<RwLock<Vec<SceneNode>>>,
}

impl Clone for SceneGraph {
    fn clone(&self) -> Self {
        Self {
            nodes: Arc::clone(&self.nodes),
        }
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its handle. A parent that this graph never
    /// issued is dropped, so parent chains cannot form cycles.
    pub fn insert(&self, mut node: SceneNode) -> NodeHandle {
        let mut guard = self.nodes.write();
        if let Some(parent) = node.parent {
            if parent.index() >= guard.len() {
                log::warn!("dropping unknown parent {parent:?} of node {}", node.name);
                node.parent = None;
            }
        }
        let handle = NodeHandle(guard.len() as u32);
        guard.push(node);
        handle
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    pub fn get(&self, handle: NodeHandle) -> Option<SceneNode> {
        self.nodes.read().get(handle.index()).cloned()
    }

    pub fn find(&self, name: &str) -> Option<NodeHandle> {
        self.nodes
            .read()
            .iter()
            .position(|node| node.name == name)
            .map(|index| NodeHandle(index as u32))
    }

    /// Handles of every node, in insertion order.
    pub fn handles(&self) -> impl Iterator<Item = NodeHandle> {
        (0..self.len() as u32).map(NodeHandle)
    }

    /// Returns a snapshot of all nodes in insertion order.
    pub fn snapshot(&self) -> Vec<SceneNode> {
        self.nodes.read().clone()
    }

    /// Applies a mutation to the requested node.
    pub fn update<F, R>(&self, handle: NodeHandle, updater: F) -> Option<R>
    where
        F: FnOnce(&mut SceneNode) -> R,
    {
        let mut guard = self.nodes.write();
        guard.get_mut(handle.index()).map(updater)
    }

    pub fn set_position(&self, handle: NodeHandle, position: Vec3) -> bool {
        self.update(handle, |node| node.position = position).is_some()
    }

    pub fn rotate(&self, handle: NodeHandle, delta: Vec3) -> bool {
        self.update(handle, |node| node.rotation += delta).is_some()
    }

    pub fn set_visible(&self, handle: NodeHandle, visible: bool) -> bool {
        self.update(handle, |node| node.visible = visible).is_some()
    }

    pub fn world_matrix(&self, handle: NodeHandle) -> Option<Mat4> {
        let guard = self.nodes.read();
        world_matrix(&guard, handle)
    }
}

fn world_matrix(nodes: &[SceneNode], handle: NodeHandle) -> Option<Mat4> {
    let mut node = nodes.get(handle.index())?;
    let mut matrix = node.local_matrix();
    while let Some(parent) = node.parent {
        node = nodes.get(parent.index())?;
        matrix = node.local_matrix() * matrix;
    }
    Some(matrix)
}

impl RenderingLayer for SceneGraph {
    fn intersect(&self, ndc: Vec2, camera: &Camera) -> Vec<Intersection> {
        let ray = camera.ray_from_ndc(ndc);
        let guard = self.nodes.read();
        let mut hits: Vec<Intersection> = guard
            .iter()
            .enumerate()
            .filter(|(_, node)| node.visible)
            .filter_map(|(index, node)| {
                let handle = NodeHandle(index as u32);
                let volume = node.hit_volume?;
                let world = volume.transform(&world_matrix(&guard, handle)?);
                let distance = ray.intersect_sphere(world.center, world.radius)?;
                Some(Intersection {
                    node: handle,
                    distance,
                    point: ray.at(distance),
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.nodes.read().get(node.index())?.parent
    }

    fn position(&self, node: NodeHandle) -> Option<Vec3> {
        self.world_matrix(node)
            .map(|matrix| matrix.to_scale_rotation_translation().2)
    }
}
