//! Render target: swapchain and renderer behind lifecycle callbacks.
//!
//! Anything whose lifetime follows the swapchain images (framebuffers,
//! depth buffers, per-image descriptor sets) registers as a
//! [`TargetListener`] or installs [`TargetHooks`]. The target calls them in a
//! fixed order whenever the swapchain starts or stops:
//!
//! - start: `on_create_attachments`, listeners' `on_created` in registration
//!   order, `on_swapchain_start`
//! - stop: `on_swapchain_stop`, listeners' `on_destroyed` in reverse
//!   registration order, `on_destroy_attachments`
//!
//! Before a stop the pending frame is aborted and every frame in flight is
//! waited for, so dependents never free resources the GPU still reads. A
//! resize or reload is a stop, a swapchain rebuild and a start.

use std::sync::Arc;

use ash::vk;
use lava_core::{is_degenerate, Area, Listener, ListenerList, Size};
use lava_gpu::{FrameBackend, GpuError, Result};
use tracing::{debug, info, warn};

use crate::config::TargetConfig;
use crate::renderer::Renderer;
use crate::swapchain::Swapchain;

/// Clear color a target starts with.
pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.086, 0.086, 0.094, 1.0];

/// Dependent of the swapchain images.
pub trait TargetListener {
    /// The swapchain (re)started. `views` holds one view per backbuffer
    /// followed by the views returned from
    /// [`TargetHooks::on_create_attachments`].
    fn on_created(&mut self, views: &[vk::ImageView], area: Area) -> Result<()>;

    /// The swapchain is about to be rebuilt or destroyed; release anything
    /// that references its images.
    fn on_destroyed(&mut self);
}

/// Owner-level callbacks around swapchain (re)creation.
pub trait TargetHooks {
    fn on_swapchain_start(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_swapchain_stop(&mut self) {}

    /// Create size-dependent attachments. The returned views are appended to
    /// the backbuffer views passed to listeners.
    fn on_create_attachments(
        &mut self,
        _size: Size,
        _format: vk::Format,
    ) -> Result<Vec<vk::ImageView>> {
        Ok(Vec::new())
    }

    fn on_destroy_attachments(&mut self) {}
}

/// Presentable render target.
pub struct RenderTarget<B: FrameBackend> {
    renderer: Renderer<B>,
    swapchain: Swapchain<B>,
    listeners: ListenerList<dyn TargetListener>,
    hooks: Option<Box<dyn TargetHooks>>,
    /// Views from the attachment hook; `Some` while attachments exist.
    attachments: Option<Vec<vk::ImageView>>,
    clear_color: [f32; 4],
    created: bool,
    started: bool,
}

impl<B: FrameBackend> RenderTarget<B> {
    /// Create a render target in the destroyed state.
    pub fn new(backend: Arc<B>, config: TargetConfig) -> Self {
        Self {
            renderer: Renderer::new(backend.clone(), config.renderer),
            swapchain: Swapchain::new(backend, config.swapchain),
            listeners: ListenerList::new(),
            hooks: None,
            attachments: None,
            clear_color: DEFAULT_CLEAR_COLOR,
            created: false,
            started: false,
        }
    }

    /// Create the swapchain and the renderer, then start the swapchain if it
    /// has images. Does nothing if already created.
    ///
    /// On failure everything created so far is destroyed again.
    pub fn create(&mut self, size: Size) -> Result<()> {
        if self.created {
            return Ok(());
        }

        self.swapchain.create(size)?;
        if let Err(e) = self.renderer.create() {
            self.swapchain.destroy();
            return Err(e);
        }
        self.created = true;

        if let Err(e) = self.start() {
            self.destroy();
            return Err(e);
        }

        info!(
            "Render target created: {}x{}, {} backbuffers, {} frames in flight",
            self.swapchain.size().x,
            self.swapchain.size().y,
            self.swapchain.backbuffer_count(),
            self.renderer.queued_frames()
        );
        Ok(())
    }

    /// Tear everything down. Does nothing if already destroyed.
    pub fn destroy(&mut self) {
        if !self.created {
            return;
        }

        if let Err(e) = self.renderer.abort_frame() {
            warn!("Failed to abort pending frame: {e}");
        }
        if let Err(e) = self.renderer.wait_idle() {
            warn!("Frames still in flight at destroy: {e}");
        }
        self.stop();
        self.renderer.destroy();
        self.swapchain.destroy();
        self.created = false;
        debug!("Render target destroyed");
    }

    /// Rebuild at `new_size`.
    ///
    /// A degenerate size is ignored, and so is the current size unless the
    /// swapchain needs a reload or has no images yet.
    pub fn resize(&mut self, new_size: Size) -> Result<()> {
        self.require_created("resize")?;

        if is_degenerate(new_size) {
            debug!("Ignoring resize to {}x{}", new_size.x, new_size.y);
            return Ok(());
        }
        if new_size == self.swapchain.size()
            && self.swapchain.is_ready()
            && !self.swapchain.must_reload()
        {
            return Ok(());
        }

        self.rebuild(new_size)
    }

    /// Rebuild at the current size.
    pub fn reload(&mut self) -> Result<()> {
        self.require_created("reload")?;
        self.rebuild(self.swapchain.size())
    }

    fn rebuild(&mut self, size: Size) -> Result<()> {
        self.renderer.abort_frame()?;
        self.renderer.wait_idle()?;
        self.stop();
        self.swapchain.resize(size)?;
        self.start()
    }

    fn require_created(&self, operation: &str) -> Result<()> {
        if self.created {
            Ok(())
        } else {
            Err(GpuError::InvalidState(format!(
                "{operation} on a destroyed render target"
            )))
        }
    }

    fn start(&mut self) -> Result<()> {
        if self.started || !self.swapchain.is_ready() {
            return Ok(());
        }

        let size = self.swapchain.size();
        if let Some(hooks) = self.hooks.as_mut() {
            self.attachments = Some(hooks.on_create_attachments(size, self.swapchain.format())?);
        }

        let views = self.views();
        let area = Area::from_size(size);

        let mut notified = 0;
        let mut result = self.listeners.try_for_each::<GpuError>(|listener| {
            listener.on_created(&views, area)?;
            notified += 1;
            Ok(())
        });
        if result.is_ok() {
            if let Some(hooks) = self.hooks.as_mut() {
                result = hooks.on_swapchain_start();
            }
        }

        if let Err(e) = result {
            for listener in self.listeners.iter().take(notified).rev() {
                listener.lock().on_destroyed();
            }
            self.destroy_attachments();
            return Err(e);
        }

        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;

        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_swapchain_stop();
        }
        self.listeners.for_each_rev(|listener| listener.on_destroyed());
        self.destroy_attachments();
    }

    fn destroy_attachments(&mut self) {
        if self.attachments.take().is_some() {
            if let Some(hooks) = self.hooks.as_mut() {
                hooks.on_destroy_attachments();
            }
        }
    }

    fn views(&self) -> Vec<vk::ImageView> {
        let mut views = self.swapchain.image_views().to_vec();
        if let Some(attachments) = &self.attachments {
            views.extend_from_slice(attachments);
        }
        views
    }

    /// Register a listener. If the swapchain is running, the listener is
    /// told about it right away.
    ///
    /// Returns false if the listener was already registered.
    pub fn add_listener(&mut self, listener: Listener<dyn TargetListener>) -> Result<bool> {
        if !self.listeners.add(listener.clone()) {
            return Ok(false);
        }

        if self.started {
            let views = self.views();
            let area = Area::from_size(self.swapchain.size());
            if let Err(e) = listener.lock().on_created(&views, area) {
                self.listeners.remove(&listener);
                return Err(e);
            }
        }
        Ok(true)
    }

    /// Unregister a listener, calling `on_destroyed` once submitted frames
    /// are done if the swapchain is running. Returns false if it was not
    /// registered.
    pub fn remove_listener(&mut self, listener: &Listener<dyn TargetListener>) -> bool {
        if !self.listeners.remove(listener) {
            return false;
        }
        if self.started {
            if let Err(e) = self.renderer.wait_idle() {
                warn!("Frames still in flight at listener removal: {e}");
            }
            listener.lock().on_destroyed();
        }
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Install the owner callbacks. Only allowed while the swapchain is not
    /// running.
    pub fn set_hooks(&mut self, hooks: Box<dyn TargetHooks>) -> Result<()> {
        if self.started {
            return Err(GpuError::InvalidState(
                "hooks replaced while the swapchain is running".to_string(),
            ));
        }
        self.hooks = Some(hooks);
        Ok(())
    }

    /// See [`Renderer::begin_frame`].
    pub fn begin_frame(&mut self) -> Result<Option<u32>> {
        self.renderer.begin_frame(&mut self.swapchain)
    }

    /// See [`Renderer::end_frame`].
    pub fn end_frame(&mut self, command_buffers: &[vk::CommandBuffer]) -> Result<bool> {
        self.renderer.end_frame(&mut self.swapchain, command_buffers)
    }

    /// See [`Renderer::frame`].
    pub fn frame(&mut self, command_buffers: &[vk::CommandBuffer]) -> Result<bool> {
        self.renderer.frame(&mut self.swapchain, command_buffers)
    }

    /// See [`Renderer::abort_frame`].
    pub fn abort_frame(&mut self) -> Result<()> {
        self.renderer.abort_frame()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// True while listeners hold live swapchain resources.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn must_reload(&self) -> bool {
        self.swapchain.must_reload()
    }

    pub fn size(&self) -> Size {
        self.swapchain.size()
    }

    pub fn format(&self) -> vk::Format {
        self.swapchain.format()
    }

    /// Number of backbuffers.
    pub fn frame_count(&self) -> usize {
        self.swapchain.backbuffer_count()
    }

    pub fn backbuffers(&self) -> &[vk::Image] {
        self.swapchain.images()
    }

    pub fn backbuffer_image(&self, index: usize) -> Option<vk::Image> {
        self.swapchain.image(index)
    }

    pub fn backbuffer_views(&self) -> &[vk::ImageView] {
        self.swapchain.image_views()
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Set the RGB clear color; alpha stays opaque.
    pub fn set_clear_color(&mut self, rgb: [f32; 3]) {
        self.clear_color = [rgb[0], rgb[1], rgb[2], 1.0];
    }

    pub fn renderer(&self) -> &Renderer<B> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<B> {
        &mut self.renderer
    }

    pub fn swapchain(&self) -> &Swapchain<B> {
        &self.swapchain
    }

    pub fn backend(&self) -> &Arc<B> {
        self.swapchain.backend()
    }
}

impl<B: FrameBackend> Drop for RenderTarget<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}
