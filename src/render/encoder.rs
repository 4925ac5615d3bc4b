/// Turns finished frames into the response bytes.
use image::RgbaImage;
use tracing::{debug, info};

use crate::element::ConfigMeta;
use crate::error::BackendError;
use crate::render::backend::GraphicsBackend;
use crate::render::canvas::Composition;
use crate::render::frames::FrameSequence;
use crate::render::gif::AnimatedEncoder;
use crate::render::options::{OutputFormat, RenderOptions};

/// File name announced for fallback GIFs.
pub const FALLBACK_FILENAME: &str = "output.gif";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: Option<String>,
}

/// Export options for `frame_count` materialized frames.
pub fn render_options(config: &ConfigMeta, frame_count: usize) -> RenderOptions {
    let mut options = RenderOptions::default();
    match config.format {
        OutputFormat::Gif => {
            if frame_count > 1 {
                options.flatten = false;
                options.animated = true;
                options.animated_delay_ms = Some(config.interval * 1000);
                options.animated_loops = Some(0);
            }
        }
        OutputFormat::Png => options.flatten = false,
        OutputFormat::Jpg => options.jpeg_quality = Some(config.quality),
    }
    options
}

pub struct OutputEncoder<'a> {
    backend: &'a dyn GraphicsBackend,
    fallback: &'a dyn AnimatedEncoder,
}

impl<'a> OutputEncoder<'a> {
    pub fn new(backend: &'a dyn GraphicsBackend, fallback: &'a dyn AnimatedEncoder) -> Self {
        Self { backend, fallback }
    }

    pub fn encode(
        &self,
        frames: FrameSequence,
        config: &ConfigMeta,
    ) -> Result<EncodedImage, BackendError> {
        let count = frames.materialized_count();

        if config.format == OutputFormat::Gif && !self.backend.supports_layers() && count > 1 {
            return self.encode_fallback(frames, config);
        }

        let options = render_options(config, count);
        let mut canvases = frames.into_frames();
        let composition = if canvases.len() == 1 {
            Composition::single(canvases.remove(0))
        } else {
            let mut composition =
                Composition::single(self.backend.create(config.dimensions, config.bgcolor)?);
            for canvas in canvases {
                composition.add_layer(canvas);
            }
            composition.coalesce();
            composition
        };

        let bytes = self.backend.encode(&composition, config.format, &options)?;
        info!(
            "Encoded {} via {} ({} frame(s), {} bytes)",
            config.format,
            self.backend.renderer(),
            count,
            bytes.len()
        );
        Ok(EncodedImage {
            bytes,
            content_type: config.format.content_type(),
            filename: None,
        })
    }

    fn encode_fallback(
        &self,
        frames: FrameSequence,
        config: &ConfigMeta,
    ) -> Result<EncodedImage, BackendError> {
        let images: Vec<RgbaImage> = frames
            .into_frames()
            .iter()
            .map(|canvas| canvas.to_rgba())
            .collect();
        let delay_cs = u16::try_from(config.interval * 100).unwrap_or(u16::MAX);
        let durations = vec![delay_cs; images.len()];

        debug!(
            "{} renderer has no layers, using fallback GIF encoder",
            self.backend.renderer()
        );
        let bytes = self.fallback.encode(&images, &durations, 0)?;
        info!(
            "Encoded fallback GIF ({} frame(s), {} bytes)",
            images.len(),
            bytes.len()
        );
        Ok(EncodedImage {
            bytes,
            content_type: OutputFormat::Gif.content_type(),
            filename: Some(FALLBACK_FILENAME.to_string()),
        })
    }
}
