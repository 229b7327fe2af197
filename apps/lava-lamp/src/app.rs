//! Lamp application.

use std::sync::Arc;

use ash::vk;
use lava_app::{AppContext, FrameContext, LavaApp, TargetListener, WindowEvent};
use lava_core::{Area, Listener, Size};
use lava_gpu::command::{color_subresource_range, transition_color_image};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};
use winit::keyboard::{Key, NamedKey};

use crate::lamp::Lamp;

/// Change of run time speed per key press.
const SPEED_STEP: f32 = 0.25;

/// Follows the backbuffers of the render target.
#[derive(Debug, Default)]
struct Backbuffers {
    count: usize,
    area: Option<Area>,
    rebuilds: u32,
}

impl TargetListener for Backbuffers {
    fn on_created(&mut self, views: &[vk::ImageView], area: Area) -> lava_gpu::Result<()> {
        self.count = views.len();
        self.area = Some(area);
        self.rebuilds += 1;
        debug!(
            "Backbuffers ready: {} at {}x{}",
            self.count, area.size.x, area.size.y
        );
        Ok(())
    }

    fn on_destroyed(&mut self) {
        self.area = None;
    }
}

pub struct LavaLamp {
    lamp: Lamp<StdRng>,
    backbuffers: Arc<Mutex<Backbuffers>>,
}

impl LavaApp for LavaLamp {
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self> {
        let backbuffers = Arc::new(Mutex::new(Backbuffers::default()));
        let listener: Listener<dyn TargetListener> = backbuffers.clone();
        ctx.target.add_listener(listener)?;

        info!("Enter toggles auto play, Space pauses, +/- change speed");

        Ok(Self {
            lamp: Lamp::new(StdRng::from_entropy()),
            backbuffers,
        })
    }

    fn update(&mut self, _ctx: &mut AppContext, dt: f32) {
        self.lamp.update(dt);
    }

    fn render(&mut self, ctx: &AppContext, frame: &mut FrameContext) -> anyhow::Result<()> {
        let device = ctx.device();
        let color = self.lamp.shade(frame.clear_color);
        let clear = vk::ClearColorValue { float32: color };

        // SAFETY: the command buffer is recording and the backbuffer belongs
        // to the pending frame; the first barrier chains with the acquire
        // wait at COLOR_ATTACHMENT_OUTPUT
        unsafe {
            transition_color_image(
                device,
                frame.command_buffer,
                frame.backbuffer,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::AccessFlags::empty(),
                vk::AccessFlags::TRANSFER_WRITE,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::TRANSFER,
            );
            device.cmd_clear_color_image(
                frame.command_buffer,
                frame.backbuffer,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &clear,
                &[color_subresource_range()],
            );
            transition_color_image(
                device,
                frame.command_buffer,
                frame.backbuffer,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::PRESENT_SRC_KHR,
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::empty(),
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            );
        }

        Ok(())
    }

    fn on_resize(&mut self, _ctx: &mut AppContext, size: Size) -> anyhow::Result<()> {
        let backbuffers = self.backbuffers.lock();
        info!(
            "Lamp resized to {}x{} ({} backbuffers, rebuild {})",
            size.x, size.y, backbuffers.count, backbuffers.rebuilds
        );
        Ok(())
    }

    fn on_event(&mut self, ctx: &mut AppContext, event: &WindowEvent) -> bool {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return false;
        };
        if !event.state.is_pressed() {
            return false;
        }

        match event.logical_key.as_ref() {
            Key::Named(NamedKey::Enter) => {
                self.lamp.toggle_auto_play();
                info!("Auto play: {}", self.lamp.auto_play);
            }
            Key::Named(NamedKey::Space) => {
                ctx.run_time.toggle_pause();
                info!("Paused: {}", ctx.run_time.paused);
            }
            Key::Character("+" | "=") => {
                ctx.run_time.set_speed(ctx.run_time.speed + SPEED_STEP);
                info!("Speed: {:.2}", ctx.run_time.speed);
            }
            Key::Character("-") => {
                ctx.run_time.set_speed(ctx.run_time.speed - SPEED_STEP);
                info!("Speed: {:.2}", ctx.run_time.speed);
            }
            _ => return false,
        }
        true
    }

    fn cleanup(&mut self, _ctx: &mut AppContext) {
        info!(
            "Lamp shut down after {} swapchain starts",
            self.backbuffers.lock().rebuilds
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backbuffers_follow_the_target() {
        let mut backbuffers = Backbuffers::default();
        let area = Area::from_size(Size::new(640, 480));

        backbuffers
            .on_created(&[vk::ImageView::null(); 3], area)
            .unwrap();
        assert_eq!(backbuffers.count, 3);
        assert_eq!(backbuffers.area, Some(area));

        backbuffers.on_destroyed();
        assert_eq!(backbuffers.area, None);

        backbuffers
            .on_created(&[vk::ImageView::null(); 2], area)
            .unwrap();
        assert_eq!(backbuffers.count, 2);
        assert_eq!(backbuffers.rebuilds, 2);
    }
}
