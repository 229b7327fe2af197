//! Core types shared across lava-rs.
//!
//! This crate provides:
//! - Size and area types for render targets
//! - An ordered, identity-keyed listener list
//! - The core error type

pub mod error;
pub mod listener;
pub mod types;

pub use error::{Error, Result};
pub use listener::{Listener, ListenerList};
pub use types::{is_degenerate, parse_size, Area, Size};
