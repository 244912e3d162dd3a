use glam::Vec3;

use crate::assets::AssetLoader;
use crate::camera::Camera;
use crate::effects::{ConvergeSpec, Rail, RailState, Spin, Starfield};
use crate::input::InputEvent;
use crate::layout::PageLayout;
use crate::navigation::{InteractiveObject, NavigationController, NavigationSink, PointerOutcome};
use crate::scene_graph::{HitSphere, NodeHandle, SceneGraph, SceneNode};
use crate::transition::TransitionTick;
use crate::viewport::{SharedViewport, Viewport, ViewportProvider};

/// A landing page assembled from a [`PageLayout`]: the scene graph, its
/// camera, the navigation controller and the decorative effects.
pub struct Page {
    name: String,
    graph: SceneGraph,
    camera: Camera,
    viewport: SharedViewport,
    /// Viewport the camera aspect was last derived from.
    applied_viewport: Viewport,
    controller: NavigationController,
    models: Vec<NodeHandle>,
    load_failures: Vec<String>,
    spin: Option<Spin>,
    converge: Option<ConvergeSpec>,
    rail: Option<Rail>,
    starfield: Option<Starfield>,
}

impl Page {
    /// Loads every model of the layout and registers the ones that loaded.
    /// A model that fails to load is logged and left out entirely.
    pub fn build(
        layout: &PageLayout,
        loader: &mut impl AssetLoader,
        viewport: impl ViewportProvider,
        seed: u64,
    ) -> Self {
        let viewport = viewport.viewport();
        let graph = SceneGraph::new();
        let mut camera = layout.camera.build(viewport);
        let mut controller = NavigationController::new(layout.transition);
        let mut models = Vec::new();
        let mut load_failures = Vec::new();

        for (index, spec) in layout.models.iter().enumerate() {
            let model = match loader.load(&spec.path, &graph) {
                Ok(model) => model,
                Err(err) => {
                    log::error!("model load failed: {err}");
                    load_failures.push(err.path().to_string());
                    continue;
                }
            };
            graph.update(model, |node| {
                node.position = spec.position;
                node.rotation = spec.rotation;
                node.scale = spec.scale;
            });
            controller.register_interactive(InteractiveObject::new(model, spec.destination.clone()));

            if let Some(area) = spec.clickable {
                let area_node = graph.insert(
                    SceneNode::named(format!("{}#area{index}", spec.path))
                        .with_position(spec.position + area.offset)
                        .with_hit_volume(HitSphere::new(Vec3::ZERO, area.radius)),
                );
                controller
                    .register_interactive(InteractiveObject::new(area_node, spec.destination.clone()));
            }
            models.push(model);
        }

        if load_failures.is_empty() {
            if let Some(ready) = layout.camera.ready_position {
                camera.move_to(ready);
            }
        }

        let rail = layout.rail.map(|spec| Rail::spawn(spec, &graph));
        let starfield = layout
            .starfield
            .map(|spec| Starfield::spawn(spec, &graph, seed));

        log::info!(
            "page {} ready: {} of {} models loaded, {} interactive nodes",
            layout.name,
            models.len(),
            layout.models.len(),
            controller.registry().len()
        );

        Self {
            name: layout.name.clone(),
            graph,
            camera,
            viewport: SharedViewport::new(viewport),
            applied_viewport: viewport,
            controller,
            models,
            load_failures,
            spin: layout.spin.map(Spin::new),
            converge: layout.converge,
            rail,
            starfield,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.viewport()
    }

    /// Handle the host can resize from its own event handlers. The camera
    /// picks the new size up on the next input event or frame.
    pub fn shared_viewport(&self) -> SharedViewport {
        self.viewport.clone()
    }

    fn sync_viewport(&mut self) -> Viewport {
        let viewport = self.viewport.viewport();
        if viewport != self.applied_viewport {
            self.camera.set_aspect(viewport.aspect());
            self.applied_viewport = viewport;
        }
        viewport
    }

    pub fn controller(&self) -> &NavigationController {
        &self.controller
    }

    /// Group nodes of the models that loaded, in layout order.
    pub fn models(&self) -> &[NodeHandle] {
        &self.models
    }

    /// Paths of the models that failed to load.
    pub fn load_failures(&self) -> &[String] {
        &self.load_failures
    }

    pub fn spin(&self) -> Option<&Spin> {
        self.spin.as_ref()
    }

    pub fn rail_state(&self) -> Option<RailState> {
        self.rail.as_ref().map(Rail::state)
    }

    /// Routes one input event. Clicks report what the hit test did.
    pub fn handle_input(&mut self, event: InputEvent, now: f64) -> Option<PointerOutcome> {
        match event {
            InputEvent::Click { position, button } => {
                if !button.is_primary() {
                    return None;
                }
                if let Some(spin) = self.spin.as_mut() {
                    spin.on_click();
                }
                let viewport = self.sync_viewport();
                Some(self.controller.handle_pointer_event(
                    position,
                    viewport,
                    &self.camera,
                    &self.graph,
                    now,
                ))
            }
            InputEvent::Wheel { delta_y } => {
                if let Some(spin) = self.spin.as_mut() {
                    spin.on_wheel(delta_y);
                }
                if let Some(rail) = self.rail.as_mut() {
                    let state = rail.scroll(delta_y, &self.graph, &mut self.camera);
                    log::debug!("rail offset {:.2}", state.offset);
                }
                None
            }
            InputEvent::Resize { width, height } => {
                self.viewport.update(width, height);
                self.sync_viewport();
                None
            }
        }
    }

    /// Runs one display frame at `now` milliseconds.
    pub fn frame(&mut self, now: f64, sink: &mut impl NavigationSink) -> TransitionTick {
        self.sync_viewport();
        if let Some(spin) = &self.spin {
            spin.apply(&self.graph, &self.models);
        }
        if let Some(starfield) = self.starfield.as_mut() {
            starfield.twinkle(now, &self.graph);
        }
        let tick = self.controller.advance_transition(now, sink);
        if let (TransitionTick::Animating { progress, focus }, Some(converge)) = (&tick, &self.converge) {
            converge.apply(&self.graph, &self.models, *focus, *progress);
        }
        tick
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::assets::{MemoryLoader, TEST_CUBE};
    use crate::navigation::RenderingLayer;

    const VIEWPORT: Viewport = Viewport::new(1600, 900);

    fn screen_of(page: &Page, world: Vec3) -> Vec2 {
        let ndc = page.camera().view_proj().project_point3(world);
        let viewport = page.viewport();
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * viewport.width as f32,
            (1.0 - ndc.y) * 0.5 * viewport.height as f32,
        )
    }

    fn home_page() -> Page {
        let layout = PageLayout::bundled("home").unwrap();
        let mut loader = MemoryLoader::new().with_source("source/male_head.obj", TEST_CUBE);
        Page::build(&layout, &mut loader, VIEWPORT, 1)
    }

    #[test]
    fn home_page_registers_models_and_areas() {
        let page = home_page();
        assert_eq!(page.name(), "home");
        assert_eq!(page.models().len(), 3);
        assert_eq!(page.controller().registry().len(), 6);
        assert!(page.load_failures().is_empty());
        assert_eq!(page.camera().position, Vec3::new(0.0, 0.0, 6.0));
        let spin = page.spin().unwrap();
        assert!(!spin.is_spinning());
    }

    #[test]
    fn clicking_a_head_navigates_once() {
        let mut page = home_page();
        let target = Vec3::new(-5.0, 1.0, -10.0);
        let screen = screen_of(&page, target);
        let outcome = page.handle_input(InputEvent::click(screen.x, screen.y), 0.0);
        assert!(matches!(
            outcome,
            Some(PointerOutcome::Started { ref destination, .. }) if destination.as_str() == "activity.html"
        ));
        assert!(page.spin().unwrap().is_spinning());

        let other = page.models()[1];
        let before = page.graph().position(other).unwrap();

        let mut calls = Vec::new();
        let mut sink = |dest: &str| calls.push(dest.to_string());
        let mut now = 0.0;
        while now < 1_000.0 {
            page.frame(now, &mut sink);
            now += 16.0;
        }
        assert_eq!(calls, vec!["activity.html".to_string()]);

        let after = page.graph().position(other).unwrap();
        assert!(after.distance(target) < before.distance(target));
    }

    #[test]
    fn missed_click_and_secondary_button_do_nothing() {
        let mut page = home_page();
        assert_eq!(
            page.handle_input(InputEvent::click(1590.0, 890.0), 0.0),
            Some(PointerOutcome::Missed)
        );
        let screen = screen_of(&page, Vec3::new(-5.0, 1.0, -10.0));
        let right_click = InputEvent::Click {
            position: screen,
            button: crate::input::MouseButton::RIGHT,
        };
        assert_eq!(page.handle_input(right_click, 0.0), None);
        let mut calls = 0;
        let mut sink = |_: &str| calls += 1;
        for step in 0..60 {
            page.frame(step as f64 * 16.0, &mut sink);
        }
        assert_eq!(calls, 0);
    }

    #[test]
    fn portfolio_skips_failed_model_and_navigates_immediately() {
        let layout = PageLayout::bundled("portfolio").unwrap();
        let mut loader = MemoryLoader::new();
        for path in [
            "source/everyonelck.obj",
            "source/ttalkkag.obj",
            "source/oo.obj",
            "source/groomton3rd.obj",
        ] {
            loader.insert(path, TEST_CUBE);
        }
        let mut page = Page::build(&layout, &mut loader, VIEWPORT, 3);
        assert_eq!(page.models().len(), 4);
        assert_eq!(page.load_failures(), ["source/model5.obj".to_string()]);
        assert_eq!(page.controller().registry().len(), 8);

        let screen = screen_of(&page, Vec3::new(-5.0, 5.0, -10.0));
        let outcome = page.handle_input(InputEvent::click(screen.x, screen.y), 100.0);
        assert!(matches!(outcome, Some(PointerOutcome::Started { .. })));

        let mut calls = Vec::new();
        let mut sink = |dest: &str| calls.push(dest.to_string());
        let tick = page.frame(116.0, &mut sink);
        assert!(matches!(tick, TransitionTick::Navigated(_)));
        assert_eq!(calls, vec!["no_access.html".to_string()]);
    }

    #[test]
    fn wheel_scrolls_rail_and_resize_updates_aspect() {
        let layout = PageLayout::bundled("portfolio").unwrap();
        let mut page = Page::build(&layout, &mut MemoryLoader::new(), VIEWPORT, 3);
        assert!(page.models().is_empty());
        assert_eq!(page.controller().registry().len(), 0);

        page.handle_input(InputEvent::Wheel { delta_y: 2_000.0 }, 0.0);
        let rail = page.rail_state().unwrap();
        assert_eq!(rail.offset, 20.0);
        assert_eq!(page.camera().position.x, 20.0);
        assert_eq!(rail.airship.x, 5.0);

        page.handle_input(
            InputEvent::Resize {
                width: 500,
                height: 1000,
            },
            0.0,
        );
        assert_eq!(page.viewport(), Viewport::new(500, 1000));
        assert!(matches!(
            page.camera().projection,
            crate::camera::Projection::Perspective { aspect, .. } if aspect == 0.5
        ));
    }

    #[test]
    fn host_resize_through_shared_viewport_reaches_hit_testing() {
        let mut page = home_page();
        let handle = page.shared_viewport();
        handle.update(800, 900);
        let mut sink = |_: &str| {};
        page.frame(0.0, &mut sink);
        assert_eq!(page.viewport(), Viewport::new(800, 900));
        assert!(matches!(
            page.camera().projection,
            crate::camera::Projection::Orthographic { aspect, .. } if (aspect - 800.0 / 900.0).abs() < 1e-6
        ));

        let screen = screen_of(&page, Vec3::new(-2.0, -4.0, -7.0));
        let outcome = page.handle_input(InputEvent::click(screen.x, screen.y), 16.0);
        assert!(matches!(
            outcome,
            Some(PointerOutcome::Started { ref destination, .. }) if destination.as_str() == "introduce.html"
        ));
    }
}
