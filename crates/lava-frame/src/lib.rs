//! Frame lifecycle for lava-rs.
//!
//! This crate provides:
//! - [`Swapchain`]: the presentable image chain, recreated on resize or when
//!   the surface reports it out of date
//! - [`Renderer`]: the frame synchronizer rotating fences and semaphores over
//!   a fixed number of frames in flight
//! - [`RenderTarget`]: both of the above behind listener and hook callbacks so
//!   size-dependent resources are rebuilt together with the swapchain
//!
//! Everything is driven from a single thread. Frame submission and
//! presentation are not internally synchronized; submitting from several
//! threads requires an external queue mutex and is not supported.

pub mod config;
pub mod renderer;
pub mod swapchain;
pub mod target;

#[cfg(test)]
mod testing;

pub use config::{RendererConfig, SwapchainConfig, TargetConfig};
pub use renderer::Renderer;
pub use swapchain::Swapchain;
pub use target::{RenderTarget, TargetHooks, TargetListener, DEFAULT_CLEAR_COLOR};
