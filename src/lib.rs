//! Real-time templated image generator.
//!
//! Templates are INI files describing a background canvas and the elements
//! drawn on it (images, text, dates, per-frame timers). A request names a
//! template; the generator loads it (following imports), composites every
//! frame and encodes the result as JPEG, PNG or (animated) GIF.

pub mod config;
pub mod core;
pub mod element;
pub mod error;
pub mod geometry;
pub mod render;
pub mod server;
pub mod template;

pub use crate::config::{ErrorPolicy, GeneratorConfig, ResourceLayout};
pub use crate::core::generator::{Generator, RenderOutcome};
pub use crate::error::{ElementError, GeneratorError, Result};
