//! Application framework for lava-rs.
//!
//! This crate provides a trait-based application framework that handles:
//! - Window creation and management
//! - GPU context initialization
//! - Render target creation, resize and reload
//! - Frame driving and per-slot command buffers
//! - Event loop handling
//!
//! # Example
//!
//! ```no_run
//! use lava_app::{run_app, AppConfig, AppContext, FrameContext, LavaApp};
//!
//! struct MyApp;
//!
//! impl LavaApp for MyApp {
//!     fn init(_ctx: &mut AppContext) -> anyhow::Result<Self> {
//!         Ok(MyApp)
//!     }
//!
//!     fn update(&mut self, _ctx: &mut AppContext, _dt: f32) {}
//!
//!     fn render(&mut self, _ctx: &AppContext, _frame: &mut FrameContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app::<MyApp>(AppConfig::new("my app"))
//! }
//! ```

mod app;
mod context;
mod frame;
mod runner;
mod time;

pub use app::LavaApp;
pub use context::AppContext;
pub use frame::FrameContext;
pub use runner::{run_app, AppConfig};
pub use time::RunTime;

// Re-export commonly used types for convenience
pub use lava_frame::{RenderTarget, TargetHooks, TargetListener};
pub use lava_gpu::{GpuContext, GpuContextBuilder, VulkanBackend};
pub use winit::event::WindowEvent;
