#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use glam::Vec2;
use gloo_events::EventListener;
use js_sys::{Array, Float32Array, Object};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlCanvasElement, MouseEvent, WheelEvent};

use crate::{
    InputEvent, MemoryLoader, MouseButton, NavigationSink, Page, PageLayout, TransitionTick,
    Viewport,
};

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    let _ = wasm_logger::init(wasm_logger::Config::default());
}

/// Sends the browser to the destination by assigning `window.location`.
struct LocationSink;

impl NavigationSink for LocationSink {
    fn navigate(&mut self, destination: &str) {
        let Some(window) = window() else {
            log::error!("window not available; cannot navigate to {destination}");
            return;
        };
        if let Err(err) = window.location().set_href(destination) {
            log::error!("failed to navigate to {destination}: {err:?}");
        }
    }
}

/// Page handle exported to JavaScript. The host renderer draws from
/// [`WasmPortal::node_transforms`] and [`WasmPortal::view_proj`] each frame.
#[wasm_bindgen]
pub struct WasmPortal {
    page: Rc<RefCell<Page>>,
    frame: FrameCallback,
    _listeners: Vec<EventListener>,
}

#[wasm_bindgen]
impl WasmPortal {
    /// `layout` is either a bundled layout name or a `<page>` XML document.
    /// `models` maps model paths to OBJ source text.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: String, layout: String, models: Object) -> Result<WasmPortal, JsValue> {
        let layout = match PageLayout::bundled_xml(&layout) {
            Some(_) => PageLayout::bundled(&layout),
            None => PageLayout::from_xml(&layout),
        }
        .map_err(|err| JsValue::from_str(&format!("invalid layout: {err:?}")))?;

        let mut loader = MemoryLoader::new();
        for entry in Object::entries(&models).iter() {
            let pair: Array = entry.unchecked_into();
            match (pair.get(0).as_string(), pair.get(1).as_string()) {
                (Some(path), Some(source)) => loader.insert(path, source),
                _ => log::warn!("ignoring model entry that is not a string pair"),
            }
        }

        let window = window().ok_or_else(|| JsValue::from_str("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document not available"))?;
        let canvas = document
            .get_element_by_id(&canvas_id)
            .ok_or_else(|| JsValue::from_str("canvas element not found"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("element is not a canvas"))?;

        let viewport = window_viewport(&window);
        let seed = (js_sys::Math::random() * u32::MAX as f64) as u64;
        let page = Rc::new(RefCell::new(Page::build(&layout, &mut loader, viewport, seed)));
        let listeners = attach_listeners(&window, &canvas, &page);

        Ok(Self {
            page,
            frame: Rc::new(RefCell::new(None)),
            _listeners: listeners,
        })
    }

    /// Starts the `requestAnimationFrame` loop. It stops after navigating.
    pub fn start(&self) -> Result<(), JsValue> {
        start_animation_loop(Rc::clone(&self.page), Rc::clone(&self.frame))
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }

    /// Node names in the order used by [`WasmPortal::node_transforms`].
    #[wasm_bindgen(js_name = nodeNames)]
    pub fn node_names(&self) -> Array {
        self.page
            .borrow()
            .graph()
            .snapshot()
            .into_iter()
            .map(|node| JsValue::from_str(&node.name))
            .collect()
    }

    /// Ten floats per node: world position, rotation, scale and a visibility
    /// flag.
    #[wasm_bindgen(js_name = nodeTransforms)]
    pub fn node_transforms(&self) -> Float32Array {
        let page = self.page.borrow();
        let graph = page.graph();
        let nodes = graph.snapshot();
        let mut values = Vec::with_capacity(nodes.len() * 10);
        for (handle, node) in graph.handles().zip(&nodes) {
            let world = graph.world_matrix(handle).unwrap_or_default();
            let (scale, _, translation) = world.to_scale_rotation_translation();
            values.extend_from_slice(&translation.to_array());
            values.extend_from_slice(&node.rotation.to_array());
            values.extend_from_slice(&scale.to_array());
            values.push(if node.visible { 1.0 } else { 0.0 });
        }
        Float32Array::from(values.as_slice())
    }

    /// Column-major view-projection matrix of the page camera.
    #[wasm_bindgen(js_name = viewProj)]
    pub fn view_proj(&self) -> Float32Array {
        Float32Array::from(self.page.borrow().camera().view_proj().to_cols_array().as_slice())
    }

    /// Rail offset, airship position and horizon endpoints, or an empty array
    /// when the page has no rail.
    #[wasm_bindgen(js_name = railState)]
    pub fn rail_state(&self) -> Float32Array {
        let Some(state) = self.page.borrow().rail_state() else {
            return Float32Array::new_with_length(0);
        };
        let mut values = vec![state.offset];
        values.extend_from_slice(&state.airship.to_array());
        values.extend_from_slice(&state.horizon_start.to_array());
        values.extend_from_slice(&state.horizon_end.to_array());
        Float32Array::from(values.as_slice())
    }
}

fn window_viewport(window: &web_sys::Window) -> Viewport {
    let dimension = |value: Result<JsValue, JsValue>| {
        value
            .ok()
            .and_then(|value| value.as_f64())
            .unwrap_or(1.0) as u32
    };
    Viewport::new(dimension(window.inner_width()), dimension(window.inner_height()))
}

fn now(window: &web_sys::Window) -> f64 {
    window
        .performance()
        .map(|performance| performance.now())
        .unwrap_or_default()
}

fn attach_listeners(
    window: &web_sys::Window,
    canvas: &HtmlCanvasElement,
    page: &Rc<RefCell<Page>>,
) -> Vec<EventListener> {
    let mut listeners = Vec::new();

    {
        let page = Rc::clone(page);
        let window = window.clone();
        listeners.push(EventListener::new(canvas, "click", move |event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let input = InputEvent::Click {
                position: Vec2::new(event.client_x() as f32, event.client_y() as f32),
                button: MouseButton::new(event.button() as u8),
            };
            if let Some(outcome) = page.borrow_mut().handle_input(input, now(&window)) {
                log::debug!("{input} => {outcome:?}");
            }
        }));
    }

    {
        let page = Rc::clone(page);
        let clock = window.clone();
        listeners.push(EventListener::new(window, "wheel", move |event| {
            let Some(event) = event.dyn_ref::<WheelEvent>() else {
                return;
            };
            let input = InputEvent::Wheel {
                delta_y: event.delta_y() as f32,
            };
            page.borrow_mut().handle_input(input, now(&clock));
        }));
    }

    {
        let viewport = page.borrow().shared_viewport();
        let source = window.clone();
        listeners.push(EventListener::new(window, "resize", move |_| {
            let size = window_viewport(&source);
            viewport.update(size.width, size.height);
        }));
    }

    listeners
}

fn start_animation_loop(page: Rc<RefCell<Page>>, slot: FrameCallback) -> Result<()> {
    let next = Rc::clone(&slot);
    let closure = Closure::wrap(Box::new(move |timestamp: f64| {
        let tick = page.borrow_mut().frame(timestamp, &mut LocationSink);
        if matches!(tick, TransitionTick::Navigated(_)) {
            return;
        }
        if let Err(err) = request_frame(&next) {
            log::error!("animation loop stopped: {err:?}");
        }
    }) as Box<dyn FnMut(f64)>);
    *slot.borrow_mut() = Some(closure);
    request_frame(&slot)
}

fn request_frame(slot: &FrameCallback) -> Result<()> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let slot = slot.borrow();
    let closure = slot
        .as_ref()
        .ok_or_else(|| anyhow!("animation loop is not initialised"))?;
    window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
    Ok(())
}
