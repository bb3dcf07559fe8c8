//! Monocromatica: a bloomed, slowly orbiting model whose lights, glow and
//! background follow a single HSL color picked on a hue dial.
//!
//! The color pipeline (dial angle → hue → `hsla(...)` string → sinks) is
//! plain Rust and testable headless. Rendering and platform wiring live in
//! [`render`], the native binary and, on `wasm32`, the [`web`] module.

pub mod app;
pub mod camera;
pub mod color;
pub mod controller;
pub mod input;
pub mod mesh;
pub mod params;
pub mod render;
pub mod scene;
pub mod scene_model;
pub mod sink;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use app::Viewer;
pub use camera::OrbitCamera;
pub use color::{hsl_to_rgb, normalize_hue, parse_color_style, ColorError, Hsla};
pub use controller::{ColorController, ColorSink, SinkScope};
pub use input::{hue_from_pointer, pointer_sample, DragState, HueDial, PointerEvent, PointerTarget, RawPointer};
pub use mesh::{Mesh, MeshError};
pub use params::{DebugPanel, ParamError, RenderParams};
pub use render::{CameraParams, FrameState, LightParams, Renderer};
pub use scene::{Scene, SceneBindings, SceneError, SceneObject};
pub use scene_model::SceneModel;
pub use sink::{SceneSink, SceneTarget};
