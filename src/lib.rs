//! flow-lessons
//!
//! Interactive 3D lessons (a basic scene, a debug panel, materials, a haunted house,
//! particles and a galaxy generator) on a small cross-platform wgpu engine that runs
//! natively and in the browser.
//!
//! High-level modules
//! - `camera`: perspective camera, orbit controls and the camera uniform
//! - `context`: central GPU and window context that owns device/queue and the renderer
//! - `data_structures`: engine data models (meshes, instances, textures, scene graph)
//! - `flow`: high level flow control (lessons / update loops) and the event loop
//! - `geometry`: primitive generators and particle clouds
//! - `gui`: the debug panel
//! - `light`, `material`, `color`: what meshes are shaded with
//! - `pipelines`: render pipelines (mesh, points, shadow) and their cache
//! - `render`: draw planning and the scene renderer
//! - `resources`: helpers to load textures and create GPU resources
//! - `scene`: scene graph plus the GPU resources its nodes refer to
//! - `clock`, `tween`: time keeping for animations
//! - `lessons`: the lessons themselves
//!

pub mod camera;
pub mod clock;
pub mod color;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod geometry;
pub mod gui;
pub mod lessons;
pub mod light;
pub mod material;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod tween;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use color::Color;
pub use egui;
pub use wgpu;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
