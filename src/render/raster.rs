/// Software raster backend.
/// Decodes with `image`, composites on tiny-skia pixmaps and rasterizes text
/// with rusttype. The `Gd` flavour has no layer support; `Imagick` and
/// `Gmagick` export multi-layer compositions as native animated GIFs.
use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{Delay, DynamicImage, Frame, ImageFormat};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::BackendError;
use crate::geometry::{Point, Rgb, Rgba, Size};
use crate::render::backend::{FontHandle, GraphicsBackend, Renderer};
use crate::render::canvas::{Canvas, Composition};
use crate::render::options::{OutputFormat, RenderOptions};

/// JPEG quality used when the options carry none.
const DEFAULT_JPEG_QUALITY: u8 = 90;

pub struct RasterBackend {
    renderer: Renderer,
    /// Decoded images by path, for the lifetime of one render
    images: RefCell<HashMap<PathBuf, Canvas>>,
    /// Parsed font faces by path
    fonts: RefCell<HashMap<PathBuf, rusttype::Font<'static>>>,
}

impl RasterBackend {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            images: RefCell::new(HashMap::new()),
            fonts: RefCell::new(HashMap::new()),
        }
    }

    fn load_face(&self, path: &Path) -> Result<rusttype::Font<'static>, BackendError> {
        if let Some(face) = self.fonts.borrow().get(path) {
            return Ok(face.clone());
        }

        debug!("Loading font: {}", path.display());
        let data = std::fs::read(path)?;
        let face = rusttype::Font::try_from_vec(data).ok_or_else(|| BackendError::Font {
            path: path.to_path_buf(),
        })?;
        self.fonts
            .borrow_mut()
            .insert(path.to_path_buf(), face.clone());
        Ok(face)
    }

    fn encode_animated_gif(
        &self,
        composition: &Composition,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, BackendError> {
        let delay = Delay::from_numer_denom_ms(options.animated_delay_ms.unwrap_or(1000), 1);
        let repeat = match options.animated_loops {
            None | Some(0) => Repeat::Infinite,
            Some(n) => Repeat::Finite(n),
        };

        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            encoder.set_repeat(repeat)?;
            let frames = composition
                .frames()
                .into_iter()
                .map(|canvas| Frame::from_parts(canvas.to_rgba(), 0, 0, delay));
            encoder.encode_frames(frames)?;
        }

        debug!(
            "Encoded animated GIF: {} frame(s), {} bytes",
            composition.frames().len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

impl GraphicsBackend for RasterBackend {
    fn renderer(&self) -> Renderer {
        self.renderer
    }

    fn create(&self, size: Size, background: Rgb) -> Result<Canvas, BackendError> {
        Canvas::new(size, background)
    }

    fn open(&self, path: &Path) -> Result<Canvas, BackendError> {
        if let Some(canvas) = self.images.borrow().get(path) {
            return Ok(canvas.clone());
        }

        debug!("Loading image: {}", path.display());
        let rgba = image::open(path)?.to_rgba8();
        let canvas = Canvas::from_rgba(&rgba)?;
        self.images
            .borrow_mut()
            .insert(path.to_path_buf(), canvas.clone());
        Ok(canvas)
    }

    fn crop(&self, image: &Canvas, origin: Point, size: Size) -> Result<Canvas, BackendError> {
        image.crop(origin, size)
    }

    fn paste(
        &self,
        target: &mut Canvas,
        image: &Canvas,
        position: Point,
        opacity: u8,
    ) -> Result<(), BackendError> {
        target.paste(image, position, opacity);
        Ok(())
    }

    fn font(&self, path: &Path, size: f32, color: Rgba) -> Result<FontHandle, BackendError> {
        let face = self.load_face(path)?;
        Ok(FontHandle::new(path, size, color).with_face(face))
    }

    fn draw_text(
        &self,
        target: &mut Canvas,
        text: &str,
        font: &FontHandle,
        position: Point,
    ) -> Result<(), BackendError> {
        let face = font.face().ok_or_else(|| BackendError::Font {
            path: font.path.clone(),
        })?;

        let scale = rusttype::Scale::uniform(font.size);
        let v_metrics = face.v_metrics(scale);
        let origin = rusttype::point(position.x as f32, position.y as f32 + v_metrics.ascent);

        // Rasterize each glyph
        for glyph in face.layout(text, scale, origin) {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, v| {
                    target.blend_pixel(bb.min.x + gx as i32, bb.min.y + gy as i32, font.color, v);
                });
            }
        }

        debug!("Rendered text '{}' at ({}, {})", text, position.x, position.y);
        Ok(())
    }

    fn duplicate(&self, canvas: &Canvas) -> Result<Canvas, BackendError> {
        // PNG keeps the alpha channel, unlike a GIF copy
        let mut bytes = Vec::new();
        canvas
            .to_rgba()
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?.to_rgba8();
        Canvas::from_rgba(&decoded)
    }

    fn encode(
        &self,
        composition: &Composition,
        format: OutputFormat,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, BackendError> {
        if options.animated {
            if !self.supports_layers() {
                return Err(BackendError::Unsupported(format!(
                    "the {} renderer cannot export animations",
                    self.renderer
                )));
            }
            if format != OutputFormat::Gif {
                return Err(BackendError::Unsupported(format!(
                    "animated {format} output"
                )));
            }
            return self.encode_animated_gif(composition, options);
        }

        let still = composition.still().to_rgba();
        let mut bytes = Vec::new();
        match format {
            OutputFormat::Jpg => {
                let quality = options.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY).clamp(1, 100);
                let rgb = DynamicImage::ImageRgba8(still).to_rgb8();
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))?;
            }
            OutputFormat::Png => {
                if options.flatten {
                    let rgb = DynamicImage::ImageRgba8(still).to_rgb8();
                    rgb.write_with_encoder(PngEncoder::new(&mut bytes))?;
                } else {
                    still.write_with_encoder(PngEncoder::new(&mut bytes))?;
                }
            }
            OutputFormat::Gif => {
                let mut encoder = GifEncoder::new(&mut bytes);
                encoder.encode_frame(Frame::new(still))?;
            }
        }

        debug!("Encoded {} ({} bytes)", format, bytes.len());
        Ok(bytes)
    }
}
