use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::error::AssetLoadError;
use crate::scene_graph::{HitSphere, NodeHandle, SceneGraph, SceneNode};

/// Turns a model path into a node in the scene graph.
///
/// Loading is two-phase: a successful `load` returns the handle of a freshly
/// inserted group node, a failed one inserts nothing. Callers register a node
/// as interactive only after `load` succeeded.
pub trait AssetLoader {
    fn load(&mut self, path: &str, graph: &SceneGraph) -> Result<NodeHandle, AssetLoadError>;
}

/// Sphere enclosing every vertex of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBounds {
    pub center: Vec3,
    pub radius: f32,
}

/// Reads the vertex positions of an OBJ document and returns their bounds.
///
/// Only `v` records matter for picking; faces, normals and materials are the
/// renderer's business and are skipped.
pub fn obj_bounds(data: &str) -> Result<MeshBounds, String> {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    let mut positions = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        let mut parts = trimmed.split_whitespace();
        if parts.next() != Some("v") {
            continue;
        }
        let position = parse_vec3(parts)
            .map_err(|err| format!("invalid vertex on line {}: {err}", line_no + 1))?;
        min = min.min(position);
        max = max.max(position);
        positions.push(position);
    }

    if positions.is_empty() {
        return Err("OBJ file does not define any vertices".to_string());
    }

    let center = (min + max) * 0.5;
    let radius = positions
        .iter()
        .map(|position| position.distance(center))
        .fold(0.0_f32, f32::max);
    Ok(MeshBounds { center, radius })
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3, String> {
    let mut component = || -> Result<f32, String> {
        parts
            .next()
            .ok_or_else(|| "missing vector component".to_string())?
            .parse::<f32>()
            .map_err(|err| err.to_string())
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}

/// Inserts a model group with a single pickable mesh child.
fn insert_model(graph: &SceneGraph, path: &str, bounds: MeshBounds) -> NodeHandle {
    let group = graph.insert(SceneNode::named(path));
    graph.insert(
        SceneNode::named(format!("{path}#mesh"))
            .with_parent(group)
            .with_hit_volume(HitSphere::new(bounds.center, bounds.radius)),
    );
    group
}

fn load_from_text(graph: &SceneGraph, path: &str, text: &str) -> Result<NodeHandle, AssetLoadError> {
    let bounds = obj_bounds(text).map_err(|reason| AssetLoadError::Malformed {
        path: path.to_string(),
        reason,
    })?;
    log::debug!(
        "loaded {path}: bounds center={} radius={:.3}",
        bounds.center,
        bounds.radius
    );
    Ok(insert_model(graph, path, bounds))
}

/// Loads OBJ models relative to a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl AssetLoader for DirectoryLoader {
    fn load(&mut self, path: &str, graph: &SceneGraph) -> Result<NodeHandle, AssetLoadError> {
        let full_path = self.root.join(path);
        let text = fs::read_to_string(&full_path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => AssetLoadError::NotFound {
                path: path.to_string(),
            },
            _ => AssetLoadError::Io {
                path: path.to_string(),
                source,
            },
        })?;
        load_from_text(graph, path, &text)
    }
}

/// Serves OBJ documents that are already resident in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    sources: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, obj_text: impl Into<String>) {
        self.sources.insert(path.into(), obj_text.into());
    }

    pub fn with_source(mut self, path: impl Into<String>, obj_text: impl Into<String>) -> Self {
        self.insert(path, obj_text);
        self
    }
}

impl AssetLoader for MemoryLoader {
    fn load(&mut self, path: &str, graph: &SceneGraph) -> Result<NodeHandle, AssetLoadError> {
        let text = self
            .sources
            .get(path)
            .ok_or_else(|| AssetLoadError::NotFound {
                path: path.to_string(),
            })?;
        load_from_text(graph, path, text)
    }
}

#[cfg(test)]
pub(crate) const TEST_CUBE: &str = "\
# unit cube
v -0.5 -0.5 -0.5
v 0.5 -0.5 -0.5
v 0.5 0.5 -0.5
v -0.5 0.5 -0.5
v -0.5 -0.5 0.5
v 0.5 -0.5 0.5
v 0.5 0.5 0.5
v -0.5 0.5 0.5
vn 0 0 1
f 1 2 3 4
";
