/// Canvas surfaces backed by tiny-skia pixmaps.
use image::RgbaImage;
use tiny_skia::{Color, IntRect, Pixmap, PixmapPaint, Transform};

use crate::error::BackendError;
use crate::geometry::{Point, Rgb, Rgba, Size};

/// A premultiplied RGBA surface.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    /// Create an opaque canvas filled with `background`.
    pub fn new(size: Size, background: Rgb) -> Result<Self, BackendError> {
        let mut pixmap = Pixmap::new(size.width, size.height).ok_or(BackendError::InvalidCanvas {
            width: size.width,
            height: size.height,
        })?;
        pixmap.fill(Color::from_rgba8(background.r, background.g, background.b, 255));
        Ok(Self { pixmap })
    }

    /// Import a straight-alpha image.
    pub fn from_rgba(image: &RgbaImage) -> Result<Self, BackendError> {
        let (w, h) = image.dimensions();
        let mut pixmap = Pixmap::new(w, h).ok_or(BackendError::InvalidCanvas {
            width: w,
            height: h,
        })?;
        // tiny-skia expects premultiplied alpha RGBA
        let data = pixmap.data_mut();
        for (i, pixel) in image.pixels().enumerate() {
            let a = u16::from(pixel[3]);
            data[i * 4] = premultiply(pixel[0], a);
            data[i * 4 + 1] = premultiply(pixel[1], a);
            data[i * 4 + 2] = premultiply(pixel[2], a);
            data[i * 4 + 3] = pixel[3];
        }
        Ok(Self { pixmap })
    }

    /// Export as a straight-alpha image.
    pub fn to_rgba(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.pixmap.width(), self.pixmap.height());
        for (dst, src) in out.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    pub fn size(&self) -> Size {
        Size::new(self.pixmap.width(), self.pixmap.height())
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight-alpha colour of one pixel, `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        // Pixmap::pixel only checks the linear index
        if x >= self.pixmap.width() || y >= self.pixmap.height() {
            return None;
        }
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some(Rgba {
            r: c.red(),
            g: c.green(),
            b: c.blue(),
            a: c.alpha(),
        })
    }

    /// Copy the `size` rectangle at `origin`, clipped to the canvas.
    pub fn crop(&self, origin: Point, size: Size) -> Result<Canvas, BackendError> {
        let own = self.size();
        let width = size.width.min(own.width.saturating_sub(origin.x));
        let height = size.height.min(own.height.saturating_sub(origin.y));
        let pixmap = IntRect::from_xywh(origin.x as i32, origin.y as i32, width, height)
            .and_then(|rect| self.pixmap.clone_rect(rect))
            .ok_or(BackendError::InvalidCanvas { width, height })?;
        Ok(Canvas { pixmap })
    }

    /// Source-over `image` at `position` with an opacity percentage.
    pub fn paste(&mut self, image: &Canvas, position: Point, opacity: u8) {
        let paint = PixmapPaint {
            opacity: f32::from(opacity.min(100)) / 100.0,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            position.x as i32,
            position.y as i32,
            image.pixmap.as_ref(),
            &paint,
            Transform::identity(),
            None,
        );
    }

    /// Blend `color` into one pixel with the given coverage (0.0-1.0).
    pub(crate) fn blend_pixel(&mut self, x: i32, y: i32, color: Rgba, coverage: f32) {
        let (w, h) = (self.pixmap.width() as i32, self.pixmap.height() as i32);
        if x < 0 || y < 0 || x >= w || y >= h {
            return;
        }
        let a = coverage.clamp(0.0, 1.0) * f32::from(color.a) / 255.0;
        if a <= 0.0 {
            return;
        }
        let idx = ((y * w + x) * 4) as usize;
        let data = self.pixmap.data_mut();
        let src = [color.r, color.g, color.b, 255];
        for c in 0..4 {
            let blended = f32::from(src[c]) * a + f32::from(data[idx + c]) * (1.0 - a);
            data[idx + c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn premultiply(channel: u8, alpha: u16) -> u8 {
    ((u16::from(channel) * alpha + 127) / 255) as u8
}

/// A base canvas plus optional animation layers.
#[derive(Debug, Clone)]
pub struct Composition {
    pub base: Canvas,
    pub layers: Vec<Canvas>,
}

impl Composition {
    pub fn single(canvas: Canvas) -> Self {
        Self {
            base: canvas,
            layers: Vec::new(),
        }
    }

    pub fn add_layer(&mut self, layer: Canvas) {
        self.layers.push(layer);
    }

    /// Flatten each layer over the base so every layer is a complete frame.
    pub fn coalesce(&mut self) {
        for layer in &mut self.layers {
            let mut full = self.base.clone();
            full.paste(layer, Point::ORIGIN, 100);
            *layer = full;
        }
    }

    /// Frames in display order: the layers, or the base when there are none.
    pub fn frames(&self) -> Vec<&Canvas> {
        if self.layers.is_empty() {
            vec![&self.base]
        } else {
            self.layers.iter().collect()
        }
    }

    /// Canvas written by a non-animated export.
    pub fn still(&self) -> &Canvas {
        self.layers.first().unwrap_or(&self.base)
    }
}
