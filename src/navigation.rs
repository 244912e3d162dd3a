//! Click-to-navigate controller.
//!
//! Pointer input is hit tested against the registered interactive nodes; a
//! hit starts a short transition and, once it has played out, the navigation
//! sink receives the clicked node's destination.

use std::collections::HashMap;
use std::fmt;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::error::DestinationError;
use crate::scene_graph::NodeHandle;
use crate::transition::{Transition, TransitionConfig, TransitionState, TransitionTick};
use crate::viewport::Viewport;

/// Non-empty navigation target such as a URL or route name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Destination(String);

impl Destination {
    pub fn new(value: impl Into<String>) -> Result<Self, DestinationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DestinationError::Empty);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Destination {
    type Error = DestinationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Destination> for String {
    fn from(value: Destination) -> Self {
        value.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scene node that navigates somewhere when clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveObject {
    pub id: NodeHandle,
    pub destination: Destination,
}

impl InteractiveObject {
    pub fn new(id: NodeHandle, destination: Destination) -> Self {
        Self { id, destination }
    }
}

/// A node pierced by a pointer ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub node: NodeHandle,
    pub distance: f32,
    pub point: Vec3,
}

/// Queries the controller needs from whatever owns the scene nodes.
pub trait RenderingLayer {
    /// All nodes hit by the camera ray through `ndc`, nearest first.
    fn intersect(&self, ndc: Vec2, camera: &Camera) -> Vec<Intersection>;
    fn parent(&self, node: NodeHandle) -> Option<NodeHandle>;
    /// World-space position of a node.
    fn position(&self, node: NodeHandle) -> Option<Vec3>;
}

/// Receives the destination once a transition completes.
pub trait NavigationSink {
    fn navigate(&mut self, destination: &str);
}

impl<F> NavigationSink for F
where
    F: FnMut(&str),
{
    fn navigate(&mut self, destination: &str) {
        self(destination)
    }
}

/// Result of feeding one pointer event to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerOutcome {
    Started {
        node: NodeHandle,
        destination: Destination,
    },
    Missed,
    /// A transition is already running; the event was ignored.
    Busy,
}

#[derive(Debug, Clone, Default)]
pub struct InteractiveRegistry {
    objects: HashMap<NodeHandle, InteractiveObject>,
}

impl InteractiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an object; a second registration for the same node replaces
    /// the first.
    pub fn insert(&mut self, object: InteractiveObject) {
        self.objects.insert(object.id, object);
    }

    pub fn get(&self, node: NodeHandle) -> Option<&InteractiveObject> {
        self.objects.get(&node)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Walks from `node` up through its ancestors and returns the first
    /// registered object.
    pub fn resolve(&self, node: NodeHandle, scene: &impl RenderingLayer) -> Option<&InteractiveObject> {
        let mut current = Some(node);
        while let Some(handle) = current {
            if let Some(object) = self.objects.get(&handle) {
                return Some(object);
            }
            current = scene.parent(handle);
        }
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct NavigationController {
    registry: InteractiveRegistry,
    state: TransitionState,
    config: TransitionConfig,
}

impl NavigationController {
    pub fn new(config: TransitionConfig) -> Self {
        Self {
            registry: InteractiveRegistry::new(),
            state: TransitionState::Idle,
            config,
        }
    }

    pub fn register_interactive(&mut self, object: InteractiveObject) {
        log::debug!(
            "registered node {:?} -> {}",
            object.id,
            object.destination
        );
        self.registry.insert(object);
    }

    pub fn registry(&self) -> &InteractiveRegistry {
        &self.registry
    }

    pub fn state(&self) -> &TransitionState {
        &self.state
    }

    pub fn is_transitioning(&self) -> bool {
        self.state.is_active()
    }

    /// Hit tests a pointer position and starts a transition towards the first
    /// interactive node along the ray.
    pub fn handle_pointer_event(
        &mut self,
        screen: Vec2,
        viewport: Viewport,
        camera: &Camera,
        scene: &impl RenderingLayer,
        now: f64,
    ) -> PointerOutcome {
        if self.state.is_active() {
            log::debug!("ignoring pointer event during transition");
            return PointerOutcome::Busy;
        }

        let ndc = viewport.to_ndc(screen);
        let hit = scene
            .intersect(ndc, camera)
            .into_iter()
            .find_map(|intersection| self.registry.resolve(intersection.node, scene));

        let Some(object) = hit else {
            log::debug!("pointer at {screen} hit nothing interactive");
            return PointerOutcome::Missed;
        };

        let focus = scene.position(object.id).unwrap_or(Vec3::ZERO);
        let destination = object.destination.clone();
        let node = object.id;
        log::info!("starting transition to {destination} from node {node:?}");
        self.state.begin(Transition::new(
            now,
            self.config,
            destination.clone(),
            focus,
        ));
        PointerOutcome::Started { node, destination }
    }

    /// Advances the running transition, calling `sink` once it completes.
    pub fn advance_transition(&mut self, now: f64, sink: &mut impl NavigationSink) -> TransitionTick {
        let tick = self.state.advance(now);
        if let TransitionTick::Navigated(destination) = &tick {
            log::info!("navigating to {destination}");
            sink.navigate(destination.as_str());
        }
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Projection;
    use crate::scene_graph::{HitSphere, SceneGraph, SceneNode};

    const VIEWPORT: Viewport = Viewport::new(1600, 900);

    fn camera() -> Camera {
        Camera::looking_forward(
            Vec3::new(0.0, 0.0, 6.0),
            Projection::Orthographic {
                half_height: 4.0,
                aspect: VIEWPORT.width as f32 / VIEWPORT.height as f32,
                near: 0.1,
                far: 1000.0,
            },
        )
    }

    /// Screen position whose ray passes through world `(x, y)`.
    fn screen_at(x: f32, y: f32) -> Vec2 {
        let half_height = 4.0;
        let half_width = half_height * VIEWPORT.aspect();
        let ndc = Vec2::new(x / half_width, y / half_height);
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * VIEWPORT.width as f32,
            (1.0 - ndc.y) * 0.5 * VIEWPORT.height as f32,
        )
    }

    fn destination(value: &str) -> Destination {
        Destination::new(value).unwrap()
    }

    struct Scene {
        graph: SceneGraph,
        controller: NavigationController,
    }

    fn scene_with(objects: &[(Vec3, &str)]) -> (Scene, Vec<NodeHandle>) {
        let graph = SceneGraph::new();
        let mut controller = NavigationController::new(TransitionConfig::default());
        let handles = objects
            .iter()
            .map(|(position, page)| {
                let handle = graph.insert(
                    SceneNode::named(*page)
                        .with_position(*position)
                        .with_hit_volume(HitSphere::new(Vec3::ZERO, 1.0)),
                );
                controller.register_interactive(InteractiveObject::new(handle, destination(page)));
                handle
            })
            .collect();
        (Scene { graph, controller }, handles)
    }

    fn run_frames(controller: &mut NavigationController, from: f64, to: f64, calls: &mut Vec<String>) {
        let mut sink = |dest: &str| calls.push(dest.to_string());
        let mut now = from;
        while now <= to {
            controller.advance_transition(now, &mut sink);
            now += 16.0;
        }
    }

    #[test]
    fn empty_destination_is_rejected() {
        assert_eq!(Destination::new("  "), Err(DestinationError::Empty));
        assert_eq!(Destination::new("a.html").unwrap().as_str(), "a.html");
    }

    #[test]
    fn click_on_object_navigates_once_after_duration_and_settle() {
        let (mut scene, handles) = scene_with(&[(Vec3::new(-5.0, 1.0, -10.0), "activity.html")]);
        let outcome = scene.controller.handle_pointer_event(
            screen_at(-5.0, 1.0),
            VIEWPORT,
            &camera(),
            &scene.graph,
            1_000.0,
        );
        assert_eq!(
            outcome,
            PointerOutcome::Started {
                node: handles[0],
                destination: destination("activity.html"),
            }
        );
        let transition = scene.controller.state().current().unwrap();
        assert_eq!(transition.target(), &destination("activity.html"));
        assert!((transition.focus() - Vec3::new(-5.0, 1.0, -10.0)).length() < 1e-4);

        let mut calls = Vec::new();
        run_frames(&mut scene.controller, 1_000.0, 1_330.0, &mut calls);
        assert!(calls.is_empty());
        run_frames(&mut scene.controller, 1_340.0, 2_000.0, &mut calls);
        assert_eq!(calls, vec!["activity.html".to_string()]);
        assert!(!scene.controller.is_transitioning());
    }

    #[test]
    fn missed_click_stays_idle() {
        let (mut scene, _) = scene_with(&[(Vec3::new(-5.0, 1.0, -10.0), "activity.html")]);
        let outcome = scene.controller.handle_pointer_event(
            screen_at(5.0, -3.0),
            VIEWPORT,
            &camera(),
            &scene.graph,
            0.0,
        );
        assert_eq!(outcome, PointerOutcome::Missed);
        let mut calls = Vec::new();
        run_frames(&mut scene.controller, 0.0, 1_000.0, &mut calls);
        assert!(calls.is_empty());
        assert!(!scene.controller.is_transitioning());
    }

    #[test]
    fn rapid_second_click_is_ignored() {
        let (mut scene, _) = scene_with(&[
            (Vec3::new(-5.0, 1.0, -10.0), "activity.html"),
            (Vec3::new(4.0, -2.0, -5.0), "portfolio.html"),
        ]);
        let camera = camera();
        scene.controller.handle_pointer_event(
            screen_at(-5.0, 1.0),
            VIEWPORT,
            &camera,
            &scene.graph,
            0.0,
        );
        for now in [50.0, 120.0, 290.0] {
            let outcome = scene.controller.handle_pointer_event(
                screen_at(4.0, -2.0),
                VIEWPORT,
                &camera,
                &scene.graph,
                now,
            );
            assert_eq!(outcome, PointerOutcome::Busy);
            let transition = scene.controller.state().current().unwrap();
            assert_eq!(transition.target(), &destination("activity.html"));
            assert_eq!(transition.started_at(), 0.0);
        }
        let mut calls = Vec::new();
        run_frames(&mut scene.controller, 0.0, 1_000.0, &mut calls);
        assert_eq!(calls, vec!["activity.html".to_string()]);
    }

    #[test]
    fn child_hit_resolves_to_registered_ancestor() {
        let graph = SceneGraph::new();
        let group = graph.insert(SceneNode::named("head").with_position(Vec3::new(4.0, -2.0, -5.0)));
        graph.insert(
            SceneNode::named("mesh")
                .with_parent(group)
                .with_hit_volume(HitSphere::new(Vec3::ZERO, 1.0)),
        );
        let mut controller = NavigationController::default();
        controller.register_interactive(InteractiveObject::new(group, destination("portfolio.html")));
        let outcome = controller.handle_pointer_event(
            screen_at(4.0, -2.0),
            VIEWPORT,
            &camera(),
            &graph,
            0.0,
        );
        assert!(matches!(outcome, PointerOutcome::Started { node, .. } if node == group));
    }

    #[test]
    fn unregistered_occluder_does_not_block_hit() {
        let (mut scene, handles) = scene_with(&[(Vec3::new(0.0, 0.0, -10.0), "introduce.html")]);
        scene.graph.insert(
            SceneNode::named("backdrop")
                .with_position(Vec3::new(0.0, 0.0, -2.0))
                .with_hit_volume(HitSphere::new(Vec3::ZERO, 1.5)),
        );
        let outcome = scene.controller.handle_pointer_event(
            screen_at(0.0, 0.0),
            VIEWPORT,
            &camera(),
            &scene.graph,
            0.0,
        );
        assert!(matches!(outcome, PointerOutcome::Started { node, .. } if node == handles[0]));
    }

    #[test]
    fn registration_is_last_write_wins() {
        let graph = SceneGraph::new();
        let node = graph.insert(SceneNode::named("head"));
        let mut controller = NavigationController::default();
        controller.register_interactive(InteractiveObject::new(node, destination("a.html")));
        controller.register_interactive(InteractiveObject::new(node, destination("b.html")));
        assert_eq!(controller.registry().len(), 1);
        assert_eq!(
            controller.registry().get(node).unwrap().destination,
            destination("b.html")
        );
    }

    struct StubLayer {
        hits: Vec<Intersection>,
    }

    impl RenderingLayer for StubLayer {
        fn intersect(&self, _ndc: Vec2, _camera: &Camera) -> Vec<Intersection> {
            self.hits.clone()
        }

        fn parent(&self, _node: NodeHandle) -> Option<NodeHandle> {
            None
        }

        fn position(&self, _node: NodeHandle) -> Option<Vec3> {
            None
        }
    }

    #[test]
    fn first_registered_hit_along_the_ray_wins() {
        let graph = SceneGraph::new();
        let near = graph.insert(SceneNode::named("near"));
        let far = graph.insert(SceneNode::named("far"));
        let mut controller = NavigationController::default();
        controller.register_interactive(InteractiveObject::new(near, destination("near.html")));
        controller.register_interactive(InteractiveObject::new(far, destination("far.html")));
        let layer = StubLayer {
            hits: vec![
                Intersection {
                    node: near,
                    distance: 1.0,
                    point: Vec3::ZERO,
                },
                Intersection {
                    node: far,
                    distance: 2.0,
                    point: Vec3::ZERO,
                },
            ],
        };
        let outcome =
            controller.handle_pointer_event(Vec2::ZERO, VIEWPORT, &camera(), &layer, 0.0);
        assert!(
            matches!(outcome, PointerOutcome::Started { destination, .. } if destination.as_str() == "near.html")
        );
        assert_eq!(controller.state().current().unwrap().focus(), Vec3::ZERO);
    }
}
