use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Projection used to build the camera's clip space. Depth follows the GL
/// convention (`-1..1`), matching the browser renderers the pages target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Projection {
    Perspective {
        fov_y_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    /// Frustum spans `±aspect * half_height` horizontally and `±half_height`
    /// vertically.
    Orthographic {
        half_height: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Perspective {
                fov_y_degrees,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh_gl(fov_y_degrees.to_radians(), aspect.max(0.01), near, far),
            Self::Orthographic {
                half_height,
                aspect,
                near,
                far,
            } => {
                let half_width = aspect.max(0.01) * half_height;
                Mat4::orthographic_rh_gl(-half_width, half_width, -half_height, half_height, near, far)
            }
        }
    }

    fn set_aspect(&mut self, value: f32) {
        match self {
            Self::Perspective { aspect, .. } | Self::Orthographic { aspect, .. } => {
                *aspect = value
            }
        }
    }
}

/// Half-line used for hit testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Distance to the nearest intersection with a sphere in front of the
    /// origin. A ray starting inside the sphere reports the exit point.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let offset = self.origin - center;
        let b = offset.dot(self.direction);
        let c = offset.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();
        let near = -b - root;
        if near >= 0.0 {
            return Some(near);
        }
        let far = -b + root;
        (far >= 0.0).then_some(far)
    }
}

/// Camera looking from `position` towards `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Camera {
    /// Camera looking down the negative Z axis, the default orientation of the
    /// page cameras.
    pub fn looking_forward(position: Vec3, projection: Projection) -> Self {
        Self {
            position,
            target: position - Vec3::Z,
            up: Vec3::Y,
            projection,
        }
    }

    /// Moves the camera while keeping its viewing direction.
    pub fn move_to(&mut self, position: Vec3) {
        let forward = self.target - self.position;
        self.position = position;
        self.target = position + forward;
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.projection.set_aspect(aspect);
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection.matrix() * self.view()
    }

    /// Unprojects a normalized device coordinate into a world-space ray that
    /// starts on the near plane.
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_proj().inverse();
        let near = inverse.project_point3(ndc.extend(-1.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(near, far - near)
    }
}
