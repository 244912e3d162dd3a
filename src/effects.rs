//! Decorative per-frame behaviour layered on top of the scene: models that
//! rush towards a clicked target, spinning models, the scroll rail carrying
//! the camera and airship, and a twinkling starfield.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::scene_graph::{NodeHandle, SceneGraph, SceneNode};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergeSpec {
    /// Distance covered per frame at full progress.
    pub speed: f32,
}

impl Default for ConvergeSpec {
    fn default() -> Self {
        Self { speed: 10.0 }
    }
}

impl ConvergeSpec {
    /// Moves every model one step towards `focus`, scaled by the transition
    /// progress. A model sitting on the focus stays put.
    pub fn apply(&self, graph: &SceneGraph, models: &[NodeHandle], focus: Vec3, progress: f32) {
        for &model in models {
            graph.update(model, |node| {
                let direction = (focus - node.position).normalize_or_zero();
                node.position += direction * progress * self.speed;
            });
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpinSpec {
    /// Rotation about Y per frame, in radians.
    pub speed: f32,
    /// Every click flips spinning on or off.
    #[serde(default)]
    pub toggle_on_click: bool,
    #[serde(default)]
    pub spinning: bool,
    /// Speed change per unit of wheel delta; `None` disables wheel control.
    #[serde(default)]
    pub wheel_factor: Option<f32>,
    pub min_speed: f32,
    pub max_speed: f32,
}

impl Default for SpinSpec {
    fn default() -> Self {
        Self {
            speed: 0.02,
            toggle_on_click: false,
            spinning: true,
            wheel_factor: None,
            min_speed: 0.01,
            max_speed: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Spin {
    spec: SpinSpec,
    spinning: bool,
    speed: f32,
}

impl Spin {
    pub fn new(spec: SpinSpec) -> Self {
        Self {
            spec,
            spinning: spec.spinning,
            speed: spec.speed,
        }
    }

    pub fn is_spinning(&self) -> bool {
        self.spinning
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn on_click(&mut self) {
        if self.spec.toggle_on_click {
            self.spinning = !self.spinning;
        }
    }

    /// Adjusts the speed while spinning. Returns whether the wheel was consumed.
    pub fn on_wheel(&mut self, delta_y: f32) -> bool {
        let Some(factor) = self.spec.wheel_factor else {
            return false;
        };
        if !self.spinning {
            return false;
        }
        self.speed = (self.speed + delta_y * factor)
            .max(self.spec.min_speed)
            .min(self.spec.max_speed);
        true
    }

    pub fn apply(&self, graph: &SceneGraph, models: &[NodeHandle]) {
        if !self.spinning {
            return;
        }
        for &model in models {
            graph.rotate(model, Vec3::new(0.0, self.speed, 0.0));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirshipSpec {
    pub position: Vec3,
    pub scale: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RailSpec {
    /// Offset change per unit of wheel delta.
    pub factor: f32,
    pub min: f32,
    pub max: f32,
    pub airship: AirshipSpec,
    pub horizon_start: Vec3,
    pub horizon_end: Vec3,
}

/// Where the rail-driven pieces sit after a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RailState {
    pub offset: f32,
    pub camera_x: f32,
    pub airship: Vec3,
    pub horizon_start: Vec3,
    pub horizon_end: Vec3,
}

/// Horizontal scroll rail: the wheel slides the camera along the horizon and
/// the airship rides ahead of it.
#[derive(Debug, Clone)]
pub struct Rail {
    spec: RailSpec,
    airship: NodeHandle,
    state: RailState,
}

impl Rail {
    pub fn spawn(spec: RailSpec, graph: &SceneGraph) -> Self {
        let airship = graph.insert(
            SceneNode::named("airship")
                .with_position(spec.airship.position)
                .with_scale(spec.airship.scale),
        );
        Self {
            spec,
            airship,
            state: RailState {
                offset: 0.0,
                camera_x: 0.0,
                airship: spec.airship.position,
                horizon_start: spec.horizon_start,
                horizon_end: spec.horizon_end,
            },
        }
    }

    pub fn airship(&self) -> NodeHandle {
        self.airship
    }

    pub fn state(&self) -> RailState {
        self.state
    }

    pub fn scroll(&mut self, delta_y: f32, graph: &SceneGraph, camera: &mut Camera) -> RailState {
        let offset = (self.state.offset + delta_y * self.spec.factor)
            .max(self.spec.min)
            .min(self.spec.max);
        let mut camera_position = camera.position;
        camera_position.x = offset;
        camera.move_to(camera_position);

        let mut airship = self.spec.airship.position;
        airship.x += offset;
        graph.set_position(self.airship, airship);

        let mut horizon_start = self.spec.horizon_start;
        horizon_start.x = airship.x;

        self.state = RailState {
            offset,
            camera_x: offset,
            airship,
            horizon_start,
            horizon_end: self.spec.horizon_end,
        };
        self.state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StarfieldSpec {
    pub count: usize,
    /// Edge length of the cube the stars are scattered in, centred on the origin.
    pub extent: f32,
    pub interval_ms: f64,
    pub visible_probability: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for StarfieldSpec {
    fn default() -> Self {
        Self {
            count: 200,
            extent: 100.0,
            interval_ms: 500.0,
            visible_probability: 0.5,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Starfield {
    spec: StarfieldSpec,
    group: NodeHandle,
    stars: Vec<NodeHandle>,
    rng: SmallRng,
    last_twinkle: Option<f64>,
}

impl Starfield {
    /// Scatters the stars. `fallback_seed` is used when the spec pins none.
    pub fn spawn(spec: StarfieldSpec, graph: &SceneGraph, fallback_seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(spec.seed.unwrap_or(fallback_seed));
        let group = graph.insert(SceneNode::named("stars"));
        let stars = (0..spec.count)
            .map(|index| {
                let position = Vec3::new(
                    (rng.gen::<f32>() - 0.5) * spec.extent,
                    (rng.gen::<f32>() - 0.5) * spec.extent,
                    (rng.gen::<f32>() - 0.5) * spec.extent,
                );
                graph.insert(
                    SceneNode::named(format!("star{index}"))
                        .with_parent(group)
                        .with_position(position),
                )
            })
            .collect();
        Self {
            spec,
            group,
            stars,
            rng,
            last_twinkle: None,
        }
    }

    pub fn group(&self) -> NodeHandle {
        self.group
    }

    pub fn stars(&self) -> &[NodeHandle] {
        &self.stars
    }

    /// Redraws every star's visibility once per interval. The first call only
    /// starts the clock. Returns whether visibility changed hands this frame.
    pub fn twinkle(&mut self, now: f64, graph: &SceneGraph) -> bool {
        let Some(last) = self.last_twinkle else {
            self.last_twinkle = Some(now);
            return false;
        };
        if now - last < self.spec.interval_ms {
            return false;
        }
        self.last_twinkle = Some(now);
        let probability = self.spec.visible_probability;
        if !(0.0..=1.0).contains(&probability) {
            log::warn!("star probability {probability} is outside [0, 1]; not twinkling");
            return false;
        }
        for &star in &self.stars {
            let visible = self.rng.gen_bool(probability);
            graph.set_visible(star, visible);
        }
        true
    }
}
