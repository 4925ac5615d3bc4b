pub mod backend;
pub mod canvas;
pub mod compositor;
pub mod encoder;
pub mod frames;
pub mod gif;
pub mod options;
pub mod raster;

pub use backend::{GraphicsBackend, Renderer};
pub use compositor::{Composed, Compositor};
pub use encoder::{EncodedImage, OutputEncoder};
pub use frames::FrameSequence;
pub use gif::{AnimatedEncoder, GifFallbackEncoder};
pub use options::{OutputFormat, RenderOptions};
pub use raster::RasterBackend;
