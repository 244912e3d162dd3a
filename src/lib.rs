//! Interaction core for decorative 3D landing pages.
//!
//! Clickable models are registered with a [`NavigationController`]; pointer
//! input is hit tested against them and a hit plays a short transition before
//! the page navigates away. Drawing is left to the host renderer, which reads
//! node transforms from the shared [`SceneGraph`]. The crate stays free of any
//! rendering backend so the whole flow can be driven headless.

pub mod assets;
pub mod camera;
pub mod effects;
pub mod error;
pub mod input;
pub mod layout;
pub mod navigation;
pub mod page;
pub mod scene_graph;
pub mod transition;
pub mod viewport;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use assets::{obj_bounds, AssetLoader, DirectoryLoader, MeshBounds, MemoryLoader};
pub use camera::{Camera, Projection, Ray};
pub use error::{AssetLoadError, DestinationError};
pub use input::{InputEvent, MouseButton};
pub use layout::{CameraSpec, ModelSpec, PageLayout};
pub use navigation::{
    Destination, InteractiveObject, Intersection, NavigationController, NavigationSink,
    PointerOutcome, RenderingLayer,
};
pub use page::Page;
pub use scene_graph::{HitSphere, NodeHandle, SceneGraph, SceneNode};
pub use transition::{TransitionConfig, TransitionState, TransitionTick};
pub use viewport::{SharedViewport, Viewport, ViewportProvider};
