//! Interactive turntable viewer for a single animated glTF model.
//!
//! The controller, orbit controls, animation mixer and page state machine
//! are plain data driven by a host clock; `viewer` owns the wgpu side. Two
//! hosts drive them: a winit window natively and the browser page on wasm32.

pub mod animation;
pub mod app;
pub mod cli;
pub mod controller;
pub mod controls;
pub mod error;
#[cfg(not(target_arch = "wasm32"))]
pub mod headless;
pub mod loader;
pub mod model;
pub mod page;
pub mod scene;
#[cfg(not(target_arch = "wasm32"))]
pub mod shell;
pub mod viewer;
#[cfg(target_arch = "wasm32")]
mod web;

pub use app::ViewerInstance;
pub use controller::ViewerController;
pub use error::InitializationError;
pub use page::{PageAction, PageViewer, ViewerPage};
pub use vitrine_assets::LoadError;
