//! `LavaApp` trait definition.

use crate::context::AppContext;
use crate::frame::FrameContext;
use lava_core::Size;
use winit::event::WindowEvent;

/// Trait for lava-rs applications.
///
/// The framework creates the window, the GPU context and the render target,
/// drives frames and rebuilds the swapchain on resize. Application state
/// lives in the implementing type.
pub trait LavaApp: Sized {
    /// Initialize the application.
    ///
    /// Called once after the window and the render target exist. Register
    /// target listeners here.
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self>;

    /// Update application state.
    ///
    /// Called every frame before rendering with the scaled time step from
    /// [`AppContext::run_time`].
    fn update(&mut self, ctx: &mut AppContext, dt: f32);

    /// Record commands for the acquired backbuffer.
    ///
    /// The command buffer is already recording; the framework ends, submits
    /// and presents it. The backbuffer is in `UNDEFINED` layout on entry and
    /// must be left in `PRESENT_SRC_KHR`.
    fn render(&mut self, ctx: &AppContext, frame: &mut FrameContext) -> anyhow::Result<()>;

    /// Called after the render target was rebuilt at a new size.
    #[allow(unused_variables)]
    fn on_resize(&mut self, ctx: &mut AppContext, size: Size) -> anyhow::Result<()> {
        Ok(())
    }

    /// Handle a window event. Return `true` to stop further processing.
    #[allow(unused_variables)]
    fn on_event(&mut self, ctx: &mut AppContext, event: &WindowEvent) -> bool {
        false
    }

    /// Release resources before shutdown. The GPU is idle.
    #[allow(unused_variables)]
    fn cleanup(&mut self, ctx: &mut AppContext) {}
}
