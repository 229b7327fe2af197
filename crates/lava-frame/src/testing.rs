//! Scripted in-memory backend for engine tests.
//!
//! Fences, semaphores and swapchains are plain handles backed by a table.
//! Submissions complete in order, but only when something waits for them, so
//! tests can observe exactly which wait unblocked which frame. Protocol
//! violations (waiting on an unsignaled semaphore, resetting a pending fence,
//! submitting with a signaled fence) fail with `GpuError::InvalidState`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use ash::vk::{self, Handle};
use lava_gpu::{
    AcquireResult, DeviceBackend, GpuError, PresentResult, Result, SubmitDesc,
    SurfaceBackend, SurfaceCapabilities, SwapchainChain, SwapchainDesc,
};
use parking_lot::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Signaled,
    Unsignaled,
    Pending(u64),
}

/// Backend call recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    /// `completed` is the submission the wait retired, if any.
    WaitFence {
        fence: vk::Fence,
        completed: Option<u64>,
    },
    ResetFence(vk::Fence),
    Acquire(Option<u32>),
    Submit {
        id: u64,
        fence: vk::Fence,
        waits_acquire: bool,
    },
    Present(u32),
    CreateSwapchain {
        old: Option<vk::SwapchainKHR>,
    },
    DestroySwapchain(vk::SwapchainKHR),
    WaitIdle,
}

pub(crate) struct MockState {
    next_handle: u64,
    fences: HashMap<vk::Fence, FenceState>,
    semaphores: HashMap<vk::Semaphore, bool>,
    swapchains: HashMap<vk::SwapchainKHR, u32>,
    submissions: Vec<vk::Fence>,
    completed: HashSet<u64>,
    acquire_cursor: u32,
    events: Vec<Event>,
    swapchains_created: usize,
    swapchains_destroyed: usize,

    pub caps: SurfaceCapabilities,
    pub acquire_script: VecDeque<AcquireResult>,
    pub present_script: VecDeque<PresentResult>,
    /// Number of fences that can still be created; `None` is unlimited.
    pub fence_budget: Option<usize>,
    /// Number of semaphores that can still be created; `None` is unlimited.
    pub semaphore_budget: Option<usize>,
    pub fail_swapchain_creation: bool,
    /// Handle the next swapchain is created with, as a driver reusing a
    /// freed handle would.
    pub swapchain_handle: Option<vk::SwapchainKHR>,
    /// Error returned by the next acquire.
    pub fail_acquire: Option<vk::Result>,
    /// Error returned by the next submit.
    pub fail_submit: Option<vk::Result>,
    /// Submitted work never completes.
    pub hang: bool,
}

impl MockState {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn complete_through(&mut self, id: u64) {
        for fence_state in self.fences.values_mut() {
            if let FenceState::Pending(pending) = *fence_state {
                if pending <= id {
                    *fence_state = FenceState::Signaled;
                }
            }
        }
        self.completed.extend(0..=id);
    }

    fn wait_semaphore(&mut self, semaphore: vk::Semaphore, what: &str) -> Result<()> {
        match self.semaphores.get_mut(&semaphore) {
            Some(signaled) if *signaled => {
                *signaled = false;
                Ok(())
            }
            Some(_) => Err(GpuError::InvalidState(format!(
                "{what} waits on an unsignaled semaphore"
            ))),
            None => Err(GpuError::InvalidState(format!(
                "{what} waits on an unknown semaphore"
            ))),
        }
    }

    fn signal_semaphore(&mut self, semaphore: vk::Semaphore, what: &str) -> Result<()> {
        match self.semaphores.get_mut(&semaphore) {
            Some(signaled) if !*signaled => {
                *signaled = true;
                Ok(())
            }
            Some(_) => Err(GpuError::InvalidState(format!(
                "{what} signals a semaphore that is already signaled"
            ))),
            None => Err(GpuError::InvalidState(format!(
                "{what} signals an unknown semaphore"
            ))),
        }
    }
}

/// In-memory [`DeviceBackend`] + [`SurfaceBackend`].
pub(crate) struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    /// A surface with an undefined current extent (the requested size is
    /// used), three backbuffers and both UNORM and sRGB formats.
    pub fn new() -> Arc<Self> {
        let caps = SurfaceCapabilities {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT
                    | vk::ImageUsageFlags::TRANSFER_DST,
            },
            formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_UNORM,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        };

        Arc::new(Self {
            state: Mutex::new(MockState {
                next_handle: 0,
                fences: HashMap::new(),
                semaphores: HashMap::new(),
                swapchains: HashMap::new(),
                submissions: Vec::new(),
                completed: HashSet::new(),
                acquire_cursor: 0,
                events: Vec::new(),
                swapchains_created: 0,
                swapchains_destroyed: 0,
                caps,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                fence_budget: None,
                semaphore_budget: None,
                fail_swapchain_creation: false,
                swapchain_handle: None,
                fail_acquire: None,
                fail_submit: None,
                hang: false,
            }),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock()
    }

    /// Fix the surface's current extent; `0x0` simulates a minimized window.
    pub fn set_surface_extent(&self, width: u32, height: u32) {
        self.state().caps.capabilities.current_extent = vk::Extent2D { width, height };
    }

    pub fn script_acquire(&self, result: AcquireResult) {
        self.state().acquire_script.push_back(result);
    }

    pub fn script_present(&self, result: PresentResult) {
        self.state().present_script.push_back(result);
    }

    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    /// Return and clear the recorded events.
    pub fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut self.state().events)
    }

    pub fn is_complete(&self, submission: u64) -> bool {
        self.state().completed.contains(&submission)
    }

    /// True if every submission so far has completed.
    pub fn is_idle(&self) -> bool {
        let state = self.state();
        (0..state.submissions.len() as u64).all(|id| state.completed.contains(&id))
    }

    /// Fence signaled by submission `id`.
    pub fn submission_fence(&self, id: u64) -> Option<vk::Fence> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.state().submissions.get(index).copied())
    }

    pub fn submission_count(&self) -> u64 {
        self.state().submissions.len() as u64
    }

    pub fn live_fences(&self) -> usize {
        self.state().fences.len()
    }

    pub fn live_semaphores(&self) -> usize {
        self.state().semaphores.len()
    }

    pub fn live_swapchains(&self) -> usize {
        self.state().swapchains.len()
    }

    pub fn swapchains_created(&self) -> usize {
        self.state().swapchains_created
    }

    pub fn swapchains_destroyed(&self) -> usize {
        self.state().swapchains_destroyed
    }
}

impl DeviceBackend for MockBackend {
    fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        let mut state = self.state();
        if let Some(budget) = state.fence_budget.as_mut() {
            if *budget == 0 {
                return Err(GpuError::SyncCreation("fence budget exhausted".to_string()));
            }
            *budget -= 1;
        }
        let fence = vk::Fence::from_raw(state.handle());
        let initial = if signaled {
            FenceState::Signaled
        } else {
            FenceState::Unsignaled
        };
        state.fences.insert(fence, initial);
        Ok(fence)
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        let mut state = self.state();
        if let Some(budget) = state.semaphore_budget.as_mut() {
            if *budget == 0 {
                return Err(GpuError::SyncCreation(
                    "semaphore budget exhausted".to_string(),
                ));
            }
            *budget -= 1;
        }
        let semaphore = vk::Semaphore::from_raw(state.handle());
        state.semaphores.insert(semaphore, false);
        Ok(semaphore)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        self.state().fences.remove(&fence);
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.state().semaphores.remove(&semaphore);
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> Result<()> {
        let mut state = self.state();
        let completed = match state.fences.get(&fence).copied() {
            Some(FenceState::Signaled) => None,
            Some(FenceState::Pending(id)) if !state.hang => {
                state.complete_through(id);
                Some(id)
            }
            Some(_) => return Err(GpuError::FenceTimeout(timeout_ns)),
            None => {
                return Err(GpuError::InvalidState(
                    "wait on an unknown fence".to_string(),
                ))
            }
        };
        state.events.push(Event::WaitFence { fence, completed });
        Ok(())
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        let mut state = self.state();
        match state.fences.get_mut(&fence) {
            Some(FenceState::Pending(_)) => {
                return Err(GpuError::InvalidState(
                    "reset of a pending fence".to_string(),
                ))
            }
            Some(fence_state) => *fence_state = FenceState::Unsignaled,
            None => {
                return Err(GpuError::InvalidState(
                    "reset of an unknown fence".to_string(),
                ))
            }
        }
        state.events.push(Event::ResetFence(fence));
        Ok(())
    }

    fn submit(&self, desc: &SubmitDesc<'_>) -> Result<()> {
        let mut state = self.state();
        if let Some(error) = state.fail_submit.take() {
            return Err(GpuError::Submit(error));
        }
        if state.fences.get(&desc.fence) != Some(&FenceState::Unsignaled) {
            return Err(GpuError::InvalidState(
                "submit with a fence that is not reset".to_string(),
            ));
        }
        if let Some(semaphore) = desc.wait_semaphore {
            state.wait_semaphore(semaphore, "submit")?;
        }
        if let Some(semaphore) = desc.signal_semaphore {
            state.signal_semaphore(semaphore, "submit")?;
        }

        let id = state.submissions.len() as u64;
        state.submissions.push(desc.fence);
        state.fences.insert(desc.fence, FenceState::Pending(id));
        state.events.push(Event::Submit {
            id,
            fence: desc.fence,
            waits_acquire: desc.wait_semaphore.is_some(),
        });
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        let mut state = self.state();
        if !state.hang {
            if let Some(last) = (state.submissions.len() as u64).checked_sub(1) {
                state.complete_through(last);
            }
        }
        state.events.push(Event::WaitIdle);
        Ok(())
    }
}

impl SurfaceBackend for MockBackend {
    fn surface_capabilities(&self) -> Result<SurfaceCapabilities> {
        Ok(self.state().caps.clone())
    }

    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        old: vk::SwapchainKHR,
    ) -> Result<SwapchainChain> {
        let mut state = self.state();
        if state.fail_swapchain_creation {
            return Err(GpuError::SwapchainCreation(
                "injected failure".to_string(),
            ));
        }

        let handle = match state.swapchain_handle.take() {
            Some(handle) => handle,
            None => vk::SwapchainKHR::from_raw(state.handle()),
        };
        let mut chain = SwapchainChain {
            handle,
            ..Default::default()
        };
        for _ in 0..desc.image_count {
            chain.images.push(vk::Image::from_raw(state.handle()));
            chain.views.push(vk::ImageView::from_raw(state.handle()));
        }

        state.swapchains.insert(handle, desc.image_count);
        state.swapchains_created += 1;
        state.acquire_cursor = 0;
        state.events.push(Event::CreateSwapchain {
            old: (old != vk::SwapchainKHR::null()).then_some(old),
        });
        Ok(chain)
    }

    fn destroy_swapchain(&self, chain: &SwapchainChain) {
        let mut state = self.state();
        if state.swapchains.remove(&chain.handle).is_some() {
            state.swapchains_destroyed += 1;
            state.events.push(Event::DestroySwapchain(chain.handle));
        }
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        semaphore: vk::Semaphore,
        _timeout_ns: u64,
    ) -> Result<AcquireResult> {
        let mut state = self.state();
        let Some(&image_count) = state.swapchains.get(&swapchain) else {
            return Err(GpuError::Acquire(vk::Result::ERROR_SURFACE_LOST_KHR));
        };
        if let Some(error) = state.fail_acquire.take() {
            return Err(GpuError::Acquire(error));
        }

        let result = match state.acquire_script.pop_front() {
            Some(result) => result,
            None => {
                let index = state.acquire_cursor % image_count;
                state.acquire_cursor += 1;
                AcquireResult::Acquired {
                    index,
                    suboptimal: false,
                }
            }
        };

        let image = match result {
            AcquireResult::Acquired { index, .. } => {
                state.signal_semaphore(semaphore, "acquire")?;
                Some(index)
            }
            AcquireResult::OutOfDate => None,
        };
        state.events.push(Event::Acquire(image));
        Ok(result)
    }

    fn present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<PresentResult> {
        let mut state = self.state();
        match state.swapchains.get(&swapchain) {
            Some(&count) if image_index < count => {}
            _ => {
                return Err(GpuError::InvalidState(
                    "present of an unknown image".to_string(),
                ))
            }
        }
        state.wait_semaphore(wait_semaphore, "present")?;
        state.events.push(Event::Present(image_index));
        Ok(state
            .present_script
            .pop_front()
            .unwrap_or(PresentResult::Presented))
    }
}
