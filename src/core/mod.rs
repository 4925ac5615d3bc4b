pub mod generator;

pub use generator::{Generator, RenderOutcome};
