//! Frame synchronizer.
//!
//! The [`Renderer`] rotates over `queued_frames` frame slots. Each slot owns
//! a fence (created signaled) and two semaphores: one signaled when the
//! presentation engine hands over an image, one signaled when rendering into
//! it is done. A frame is driven as
//!
//! 1. [`Renderer::begin_frame`]: wait for the slot's previous frame, acquire
//!    an image, wait for whatever slot last rendered into that image;
//! 2. record command buffers for the returned image index;
//! 3. [`Renderer::end_frame`]: submit, present, move to the next slot.
//!
//! Waiting on the slot fence bounds how far the CPU runs ahead of the GPU to
//! `queued_frames` frames.

use std::sync::Arc;

use ash::vk;
use lava_gpu::{AcquireResult, FrameBackend, GpuError, Result, SubmitDesc};
use tracing::{debug, warn};

use crate::config::RendererConfig;
use crate::swapchain::Swapchain;

#[derive(Debug, Clone, Copy)]
struct FrameSlot {
    fence: vk::Fence,
    image_acquired: vk::Semaphore,
    render_complete: vk::Semaphore,
}

#[derive(Debug, Clone, Copy)]
struct PendingFrame {
    image_index: u32,
    /// False when the image was carried over from an aborted frame and no
    /// acquisition happened.
    waits_acquire: bool,
}

/// Frame synchronizer over a fixed number of frames in flight.
///
/// Not internally synchronized: `begin_frame` and `end_frame` must be called
/// alternately from the thread that owns the queue.
pub struct Renderer<B: FrameBackend> {
    backend: Arc<B>,
    config: RendererConfig,
    slots: Vec<FrameSlot>,
    /// Fence of the slot that last rendered into each swapchain image.
    fences_in_use: Vec<vk::Fence>,
    /// Swapchain generation `fences_in_use` and `abandoned` refer to.
    tracked_generation: Option<u64>,
    current_sync: usize,
    current_frame: u64,
    pending: Option<PendingFrame>,
    /// Image acquired by an aborted frame, handed out again by the next
    /// `begin_frame`.
    abandoned: Option<u32>,
    active: bool,
    on_destroy: Option<Box<dyn FnMut()>>,
}

impl<B: FrameBackend> Renderer<B> {
    /// Create a renderer in the destroyed state.
    pub fn new(backend: Arc<B>, config: RendererConfig) -> Self {
        Self {
            backend,
            config: config.with_queued_frames(config.queued_frames),
            slots: Vec::new(),
            fences_in_use: Vec::new(),
            tracked_generation: None,
            current_sync: 0,
            current_frame: 0,
            pending: None,
            abandoned: None,
            active: true,
            on_destroy: None,
        }
    }

    /// Create the per-slot fences and semaphores.
    ///
    /// Either every slot is created or, on failure, nothing is left behind.
    pub fn create(&mut self) -> Result<()> {
        if self.is_created() {
            return Ok(());
        }

        let count = self.config.queued_frames as usize;
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            match create_slot(self.backend.as_ref()) {
                Ok(slot) => slots.push(slot),
                Err(e) => {
                    for slot in &slots {
                        destroy_slot(self.backend.as_ref(), slot);
                    }
                    return Err(e);
                }
            }
        }

        debug!("Renderer created with {count} frames in flight");
        self.slots = slots;
        self.reset_counters();
        Ok(())
    }

    /// Wait for the GPU, run the `on_destroy` callback and free every slot.
    /// Does nothing if already destroyed.
    pub fn destroy(&mut self) {
        if !self.is_created() {
            return;
        }

        if let Err(e) = self.backend.wait_idle() {
            warn!("Device wait before renderer destroy failed: {e}");
        }

        if let Some(on_destroy) = self.on_destroy.as_mut() {
            on_destroy();
        }

        for slot in std::mem::take(&mut self.slots) {
            destroy_slot(self.backend.as_ref(), &slot);
        }
        self.reset_counters();
    }

    fn reset_counters(&mut self) {
        self.fences_in_use.clear();
        self.tracked_generation = None;
        self.current_sync = 0;
        self.current_frame = 0;
        self.pending = None;
        self.abandoned = None;
    }

    /// Start a frame.
    ///
    /// Returns the acquired image index, or `None` when there is nothing to
    /// render: the renderer is inactive, the swapchain is not ready or must
    /// be reloaded, or the surface turned out of date during acquisition.
    /// In the last case the swapchain is marked for reload and the slot does
    /// not advance.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn begin_frame(&mut self, swapchain: &mut Swapchain<B>) -> Result<Option<u32>> {
        if !self.active || !self.is_created() {
            return Ok(None);
        }
        if self.pending.is_some() {
            return Err(GpuError::InvalidState(
                "begin_frame called while a frame is pending".to_string(),
            ));
        }
        if !swapchain.is_ready() || swapchain.must_reload() {
            return Ok(None);
        }

        self.track_swapchain(swapchain);

        let slot = self.slots[self.current_sync];
        let fence_timeout = self.config.fence_timeout_ns();
        self.backend.wait_for_fence(slot.fence, fence_timeout)?;

        let (image_index, waits_acquire) = match self.abandoned.take() {
            Some(index) => (index, false),
            None => match self.backend.acquire_next_image(
                swapchain.handle(),
                slot.image_acquired,
                self.config.acquire_timeout_ns(),
            )? {
                AcquireResult::Acquired { index, suboptimal } => {
                    if suboptimal {
                        warn!("Swapchain is suboptimal for the surface");
                        swapchain.mark_reload();
                    }
                    (index, true)
                }
                AcquireResult::OutOfDate => {
                    debug!("Swapchain out of date on acquire");
                    swapchain.mark_reload();
                    return Ok(None);
                }
            },
        };

        let image = image_index as usize;
        let Some(&in_use) = self.fences_in_use.get(image) else {
            return Err(GpuError::InvalidState(format!(
                "acquired image {image_index} out of range"
            )));
        };
        if in_use != vk::Fence::null() && in_use != slot.fence {
            self.backend.wait_for_fence(in_use, fence_timeout)?;
        }
        self.fences_in_use[image] = slot.fence;

        self.backend.reset_fence(slot.fence)?;

        self.current_frame += 1;
        self.pending = Some(PendingFrame {
            image_index,
            waits_acquire,
        });
        Ok(Some(image_index))
    }

    /// Submit `command_buffers` for the pending frame and present it.
    ///
    /// Returns `Ok(false)` if the renderer is inactive and no frame is
    /// pending; calling it without a pending frame otherwise is an error.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn end_frame(
        &mut self,
        swapchain: &mut Swapchain<B>,
        command_buffers: &[vk::CommandBuffer],
    ) -> Result<bool> {
        let Some(frame) = self.pending.take() else {
            if !self.active {
                return Ok(false);
            }
            return Err(GpuError::InvalidState(
                "end_frame called without begin_frame".to_string(),
            ));
        };

        let slot = self.slots[self.current_sync];
        self.backend.submit(&SubmitDesc {
            command_buffers,
            wait_semaphore: frame.waits_acquire.then_some(slot.image_acquired),
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: Some(slot.render_complete),
            fence: slot.fence,
        })?;

        let presented =
            self.backend
                .present(swapchain.handle(), frame.image_index, slot.render_complete)?;
        if presented.needs_reload() {
            debug!("Swapchain needs reload after present: {presented:?}");
            swapchain.mark_reload();
        }

        self.advance();
        Ok(true)
    }

    /// Run a whole frame with pre-recorded command buffers.
    ///
    /// Returns false if no frame was rendered.
    pub fn frame(
        &mut self,
        swapchain: &mut Swapchain<B>,
        command_buffers: &[vk::CommandBuffer],
    ) -> Result<bool> {
        if self.begin_frame(swapchain)?.is_none() {
            return Ok(false);
        }
        self.end_frame(swapchain, command_buffers)
    }

    /// Abandon the pending frame, if any.
    ///
    /// An empty batch consumes the acquisition semaphore and signals the
    /// slot fence, so no slot is left waiting forever. The acquired image is
    /// not presented; the next `begin_frame` on the same swapchain renders
    /// into it again without acquiring.
    pub fn abort_frame(&mut self) -> Result<()> {
        let Some(frame) = self.pending.take() else {
            return Ok(());
        };

        let slot = self.slots[self.current_sync];
        self.backend.submit(&SubmitDesc {
            command_buffers: &[],
            wait_semaphore: frame.waits_acquire.then_some(slot.image_acquired),
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: None,
            fence: slot.fence,
        })?;

        debug!("Frame {} aborted, image {} kept", self.current_frame, frame.image_index);
        self.abandoned = Some(frame.image_index);
        self.advance();
        Ok(())
    }

    /// Wait until the GPU has finished every submitted frame.
    pub fn wait_idle(&self) -> Result<()> {
        let timeout = self.config.fence_timeout_ns();
        for (index, slot) in self.slots.iter().enumerate() {
            // The pending slot's fence was reset and has nothing to wait for
            if self.pending.is_some() && index == self.current_sync {
                continue;
            }
            self.backend.wait_for_fence(slot.fence, timeout)?;
        }
        Ok(())
    }

    fn advance(&mut self) {
        self.current_sync = (self.current_sync + 1) % self.slots.len();
    }

    /// Image tracking belongs to one swapchain; start over when it changes.
    fn track_swapchain(&mut self, swapchain: &Swapchain<B>) {
        if self.tracked_generation == Some(swapchain.generation()) {
            return;
        }

        self.tracked_generation = Some(swapchain.generation());
        self.fences_in_use.clear();
        self.fences_in_use
            .resize(swapchain.backbuffer_count(), vk::Fence::null());
        self.abandoned = None;
    }

    /// Pause or resume rendering without tearing down any state.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Register a callback run on every `destroy`, before the slots are
    /// freed and after the GPU went idle.
    pub fn set_on_destroy(&mut self, on_destroy: impl FnMut() + 'static) {
        self.on_destroy = Some(Box::new(on_destroy));
    }

    pub fn is_created(&self) -> bool {
        !self.slots.is_empty()
    }

    /// True between a successful `begin_frame` and its `end_frame`.
    pub fn is_frame_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of frames started since creation.
    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// Index of the slot the next frame uses.
    pub fn current_sync(&self) -> usize {
        self.current_sync
    }

    pub fn queued_frames(&self) -> u32 {
        self.config.queued_frames
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }
}

impl<B: FrameBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn create_slot<B: FrameBackend + ?Sized>(backend: &B) -> Result<FrameSlot> {
    let fence = backend.create_fence(true)?;

    let image_acquired = match backend.create_semaphore() {
        Ok(semaphore) => semaphore,
        Err(e) => {
            backend.destroy_fence(fence);
            return Err(e);
        }
    };

    let render_complete = match backend.create_semaphore() {
        Ok(semaphore) => semaphore,
        Err(e) => {
            backend.destroy_semaphore(image_acquired);
            backend.destroy_fence(fence);
            return Err(e);
        }
    };

    Ok(FrameSlot {
        fence,
        image_acquired,
        render_complete,
    })
}

fn destroy_slot<B: FrameBackend + ?Sized>(backend: &B, slot: &FrameSlot) {
    backend.destroy_semaphore(slot.render_complete);
    backend.destroy_semaphore(slot.image_acquired);
    backend.destroy_fence(slot.fence);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwapchainConfig;
    use crate::testing::{Event, MockBackend};
    use lava_core::Size;
    use lava_gpu::PresentResult;
    use parking_lot::Mutex;

    fn setup(
        queued_frames: u32,
    ) -> (
        Arc<MockBackend>,
        Swapchain<MockBackend>,
        Renderer<MockBackend>,
    ) {
        let backend = MockBackend::new();
        let mut swapchain = Swapchain::new(backend.clone(), SwapchainConfig::default());
        swapchain.create(Size::new(640, 480)).unwrap();
        let mut renderer = Renderer::new(
            backend.clone(),
            RendererConfig::default().with_queued_frames(queued_frames),
        );
        renderer.create().unwrap();
        (backend, swapchain, renderer)
    }

    fn first_wait(events: &[Event]) -> Option<vk::Fence> {
        events.iter().find_map(|event| match event {
            Event::WaitFence { fence, .. } => Some(*fence),
            _ => None,
        })
    }

    #[test]
    fn create_allocates_every_slot() {
        let (backend, _swapchain, renderer) = setup(3);
        assert!(renderer.is_created());
        assert_eq!(renderer.queued_frames(), 3);
        assert_eq!(backend.live_fences(), 3);
        assert_eq!(backend.live_semaphores(), 6);
    }

    #[test]
    fn cpu_runs_at_most_k_frames_ahead() {
        for k in 1..=4u32 {
            let (backend, mut swapchain, mut renderer) = setup(k);

            for i in 0..10u64 {
                backend.take_events();
                assert!(renderer.begin_frame(&mut swapchain).unwrap().is_some());
                let events = backend.take_events();

                if let Some(target) = i.checked_sub(u64::from(k)) {
                    assert_eq!(
                        first_wait(&events),
                        backend.submission_fence(target),
                        "K={k}, frame {i}"
                    );
                    assert!(backend.is_complete(target), "K={k}, frame {i}");
                } else {
                    assert!(
                        matches!(
                            events.first(),
                            Some(Event::WaitFence {
                                completed: None,
                                ..
                            })
                        ),
                        "K={k}, frame {i} must not block"
                    );
                }

                assert!(renderer.end_frame(&mut swapchain, &[]).unwrap());
            }
        }
    }

    #[test]
    fn slots_rotate_round_robin() {
        let (backend, mut swapchain, mut renderer) = setup(2);
        let mut slots = Vec::new();

        for i in 0..5u64 {
            slots.push(renderer.current_sync());
            backend.take_events();
            renderer.begin_frame(&mut swapchain).unwrap();
            let events = backend.take_events();
            if i >= 2 {
                assert_eq!(first_wait(&events), backend.submission_fence(i - 2));
                assert!(backend.is_complete(i - 2));
            }
            renderer.end_frame(&mut swapchain, &[]).unwrap();
        }

        assert_eq!(slots, [0, 1, 0, 1, 0]);
        assert_eq!(renderer.current_frame(), 5);
    }

    #[test]
    fn reused_image_waits_on_other_slot_fence() {
        // Two slots over three images: the fourth frame renders into image 0
        // from slot 1, while image 0 was last used by slot 0.
        let (backend, mut swapchain, mut renderer) = setup(2);
        for _ in 0..3 {
            assert!(renderer.frame(&mut swapchain, &[]).unwrap());
        }

        let slot0_fence = renderer.slots[0].fence;
        let slot1_fence = renderer.slots[1].fence;
        backend.take_events();
        assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), Some(0));
        let waits: Vec<_> = backend
            .take_events()
            .into_iter()
            .filter_map(|event| match event {
                Event::WaitFence { fence, .. } => Some(fence),
                _ => None,
            })
            .collect();

        assert_eq!(waits, [slot1_fence, slot0_fence]);
        assert_eq!(renderer.fences_in_use[0], slot1_fence);
    }

    #[test]
    fn same_slot_image_waits_once() {
        let (backend, mut swapchain, mut renderer) = setup(3);
        for _ in 0..3 {
            renderer.frame(&mut swapchain, &[]).unwrap();
        }

        backend.take_events();
        renderer.begin_frame(&mut swapchain).unwrap();
        let waits = backend
            .take_events()
            .iter()
            .filter(|event| matches!(event, Event::WaitFence { .. }))
            .count();
        assert_eq!(waits, 1);
    }

    #[test]
    fn submit_and_present_are_gated() {
        let (backend, mut swapchain, mut renderer) = setup(2);
        let fence = renderer.slots[0].fence;
        backend.take_events();

        assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), Some(0));
        assert!(renderer.end_frame(&mut swapchain, &[]).unwrap());

        let events = backend.take_events();
        assert_eq!(
            events,
            [
                Event::WaitFence {
                    fence,
                    completed: None
                },
                Event::Acquire(Some(0)),
                Event::ResetFence(fence),
                Event::Submit {
                    id: 0,
                    fence,
                    waits_acquire: true
                },
                Event::Present(0),
            ]
        );
        assert_eq!(renderer.current_sync(), 1);
    }

    #[test]
    fn zero_size_surface_never_blocks() {
        let backend = MockBackend::new();
        let mut swapchain = Swapchain::new(backend.clone(), SwapchainConfig::default());
        swapchain.create(Size::ZERO).unwrap();
        let mut renderer = Renderer::new(backend.clone(), RendererConfig::default());
        renderer.create().unwrap();

        for _ in 0..3 {
            assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), None);
        }
        assert!(backend.events().is_empty());
        assert_eq!(renderer.current_frame(), 0);
    }

    #[test]
    fn out_of_date_acquire_then_reload() {
        let (backend, mut swapchain, mut renderer) = setup(2);
        for _ in 0..3 {
            assert!(renderer.frame(&mut swapchain, &[]).unwrap());
        }

        backend.script_acquire(AcquireResult::OutOfDate);
        let sync = renderer.current_sync();
        assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), None);
        assert!(swapchain.must_reload());
        assert_eq!(renderer.current_sync(), sync);
        assert_eq!(renderer.current_frame(), 3);

        // Still flagged: no frame, no wait
        backend.take_events();
        assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), None);
        assert!(backend.take_events().is_empty());

        renderer.wait_idle().unwrap();
        swapchain.reload().unwrap();
        assert!(!swapchain.must_reload());
        assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), Some(0));
        assert!(renderer.end_frame(&mut swapchain, &[]).unwrap());
    }

    #[test]
    fn suboptimal_acquire_renders_and_flags_reload() {
        let (backend, mut swapchain, mut renderer) = setup(2);
        backend.script_acquire(AcquireResult::Acquired {
            index: 1,
            suboptimal: true,
        });

        assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), Some(1));
        assert!(swapchain.must_reload());
        assert!(renderer.end_frame(&mut swapchain, &[]).unwrap());
        assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), None);
    }

    #[test]
    fn out_of_date_present_flags_reload() {
        let (backend, mut swapchain, mut renderer) = setup(2);
        backend.script_present(PresentResult::OutOfDate);

        assert!(renderer.frame(&mut swapchain, &[]).unwrap());
        assert!(swapchain.must_reload());
        assert_eq!(renderer.current_sync(), 1);
    }

    #[test]
    fn fence_timeout_is_fatal() {
        let (backend, mut swapchain, mut renderer) = setup(2);
        backend.state().hang = true;
        renderer.frame(&mut swapchain, &[]).unwrap();
        renderer.frame(&mut swapchain, &[]).unwrap();

        let err = renderer.begin_frame(&mut swapchain).unwrap_err();
        assert!(matches!(err, GpuError::FenceTimeout(_)));
    }

    #[test]
    fn begin_and_end_must_alternate() {
        let (_backend, mut swapchain, mut renderer) = setup(2);

        assert!(matches!(
            renderer.end_frame(&mut swapchain, &[]),
            Err(GpuError::InvalidState(_))
        ));

        renderer.begin_frame(&mut swapchain).unwrap();
        assert!(renderer.is_frame_pending());
        assert!(matches!(
            renderer.begin_frame(&mut swapchain),
            Err(GpuError::InvalidState(_))
        ));

        renderer.end_frame(&mut swapchain, &[]).unwrap();
        assert!(matches!(
            renderer.end_frame(&mut swapchain, &[]),
            Err(GpuError::InvalidState(_))
        ));
    }

    #[test]
    fn inactive_renderer_is_a_no_op() {
        let (backend, mut swapchain, mut renderer) = setup(2);
        backend.take_events();
        renderer.set_active(false);

        assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), None);
        assert!(!renderer.end_frame(&mut swapchain, &[]).unwrap());
        assert!(backend.events().is_empty());

        renderer.set_active(true);
        assert!(renderer.frame(&mut swapchain, &[]).unwrap());
    }

    #[test]
    fn aborted_frame_reuses_image_without_deadlock() {
        let (backend, mut swapchain, mut renderer) = setup(2);

        assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), Some(0));
        renderer.abort_frame().unwrap();
        assert!(!renderer.is_frame_pending());
        assert_eq!(renderer.current_sync(), 1);

        backend.take_events();
        assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), Some(0));
        assert!(renderer.end_frame(&mut swapchain, &[]).unwrap());
        let events = backend.take_events();
        assert!(!events.iter().any(|e| matches!(e, Event::Acquire(_))));
        assert!(events.iter().any(|e| matches!(
            e,
            Event::Submit {
                waits_acquire: false,
                ..
            }
        )));

        for _ in 0..6 {
            assert!(renderer.frame(&mut swapchain, &[]).unwrap());
        }
    }

    #[test]
    fn recycled_swapchain_handle_starts_fresh() {
        let (backend, mut swapchain, mut renderer) = setup(2);
        let first = swapchain.handle();

        assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), Some(0));
        renderer.abort_frame().unwrap();
        renderer.wait_idle().unwrap();

        swapchain.reload().unwrap();
        backend.state().swapchain_handle = Some(first);
        swapchain.reload().unwrap();
        assert_eq!(swapchain.handle(), first);

        // The kept image belonged to a swapchain that is gone
        backend.take_events();
        assert_eq!(renderer.begin_frame(&mut swapchain).unwrap(), Some(0));
        assert!(backend.take_events().contains(&Event::Acquire(Some(0))));
        assert!(renderer.end_frame(&mut swapchain, &[]).unwrap());
    }

    #[test]
    fn acquire_failure_is_fatal() {
        let (backend, mut swapchain, mut renderer) = setup(2);
        backend.state().fail_acquire = Some(vk::Result::ERROR_DEVICE_LOST);

        let err = renderer.begin_frame(&mut swapchain).unwrap_err();
        assert!(matches!(
            err,
            GpuError::Acquire(vk::Result::ERROR_DEVICE_LOST)
        ));
        assert!(!renderer.is_frame_pending());
        assert!(!swapchain.must_reload());
    }

    #[test]
    fn submit_failure_is_fatal() {
        let (backend, mut swapchain, mut renderer) = setup(2);
        assert!(renderer.begin_frame(&mut swapchain).unwrap().is_some());
        backend.state().fail_submit = Some(vk::Result::ERROR_DEVICE_LOST);

        let err = renderer.end_frame(&mut swapchain, &[]).unwrap_err();
        assert!(matches!(
            err,
            GpuError::Submit(vk::Result::ERROR_DEVICE_LOST)
        ));
        assert!(!backend
            .events()
            .iter()
            .any(|event| matches!(event, Event::Present(_))));
    }

    #[test]
    fn abort_without_pending_frame_does_nothing() {
        let (backend, _swapchain, mut renderer) = setup(2);
        renderer.abort_frame().unwrap();
        assert_eq!(backend.submission_count(), 0);
    }

    #[test]
    fn create_failure_leaves_nothing_behind() {
        let backend = MockBackend::new();
        backend.state().fence_budget = Some(1);
        let mut renderer = Renderer::new(backend.clone(), RendererConfig::default());
        assert!(matches!(renderer.create(), Err(GpuError::SyncCreation(_))));
        assert!(!renderer.is_created());
        assert_eq!(backend.live_fences(), 0);
        assert_eq!(backend.live_semaphores(), 0);

        let backend = MockBackend::new();
        backend.state().semaphore_budget = Some(3);
        let mut renderer = Renderer::new(backend.clone(), RendererConfig::default());
        assert!(renderer.create().is_err());
        assert_eq!(backend.live_fences(), 0);
        assert_eq!(backend.live_semaphores(), 0);
    }

    #[test]
    fn recreate_resets_counters() {
        let (backend, mut swapchain, mut renderer) = setup(2);
        for _ in 0..3 {
            renderer.frame(&mut swapchain, &[]).unwrap();
        }
        assert_eq!(renderer.current_frame(), 3);
        assert_eq!(renderer.current_sync(), 1);

        renderer.destroy();
        assert!(!renderer.is_created());
        assert_eq!(backend.live_fences(), 0);

        renderer.create().unwrap();
        assert_eq!(renderer.current_frame(), 0);
        assert_eq!(renderer.current_sync(), 0);
        assert!(renderer.frame(&mut swapchain, &[]).unwrap());
    }

    #[test]
    fn destroy_is_idempotent_and_runs_callback() {
        let (backend, _swapchain, mut renderer) = setup(2);
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        renderer.set_on_destroy(move || *counter.lock() += 1);

        renderer.destroy();
        renderer.destroy();
        assert_eq!(*calls.lock(), 1);
        assert!(backend.events().contains(&Event::WaitIdle));
    }

    #[test]
    fn wait_idle_skips_pending_slot() {
        let (backend, mut swapchain, mut renderer) = setup(2);
        renderer.frame(&mut swapchain, &[]).unwrap();
        renderer.begin_frame(&mut swapchain).unwrap();

        renderer.wait_idle().unwrap();
        assert!(backend.is_complete(0));
        renderer.end_frame(&mut swapchain, &[]).unwrap();
    }
}
