use std::sync::Arc;

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Pixel dimensions of the surface receiving pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Zero dimensions are bumped to one so conversions never divide by zero.
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width: if width == 0 { 1 } else { width },
            height: if height == 0 { 1 } else { height },
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Maps a screen position (origin top-left, y down) into normalized device
    /// coordinates in `[-1, 1]` with y up.
    pub fn to_ndc(&self, screen: Vec2) -> Vec2 {
        Vec2::new(
            2.0 * screen.x / self.width as f32 - 1.0,
            -(2.0 * screen.y / self.height as f32 - 1.0),
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

/// Source of the current viewport size.
pub trait ViewportProvider {
    fn viewport(&self) -> Viewport;
}

impl ViewportProvider for Viewport {
    fn viewport(&self) -> Viewport {
        *self
    }
}

/// Viewport that can be resized from event handlers while being read elsewhere.
#[derive(Debug, Clone, Default)]
pub struct SharedViewport {
    size: Arc<RwLock<Viewport>>,
}

impl SharedViewport {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            size: Arc::new(RwLock::new(viewport)),
        }
    }

    pub fn update(&self, width: u32, height: u32) {
        *self.size.write() = Viewport::new(width, height);
    }
}

impl ViewportProvider for SharedViewport {
    fn viewport(&self) -> Viewport {
        *self.size.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_map_to_unit_square() {
        let viewport = Viewport::new(800, 600);
        assert_eq!(viewport.to_ndc(Vec2::ZERO), Vec2::new(-1.0, 1.0));
        assert_eq!(viewport.to_ndc(Vec2::new(800.0, 600.0)), Vec2::new(1.0, -1.0));
        assert_eq!(viewport.to_ndc(Vec2::new(400.0, 300.0)), Vec2::ZERO);
    }

    #[test]
    fn zero_sized_viewport_is_clamped() {
        let viewport = Viewport::new(0, 0);
        assert_eq!((viewport.width, viewport.height), (1, 1));
        assert!(viewport.to_ndc(Vec2::new(5.0, 5.0)).is_finite());
    }

    #[test]
    fn shared_viewport_reflects_updates() {
        let shared = SharedViewport::new(Viewport::new(100, 100));
        let reader = shared.clone();
        shared.update(1920, 0);
        assert_eq!(reader.viewport(), Viewport::new(1920, 1));
    }
}
