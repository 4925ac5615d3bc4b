/// Graphics backend capability consumed by elements, the compositor and the encoder.
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::BackendError;
use crate::geometry::{Point, Rgb, Rgba, Size};
use crate::render::canvas::{Canvas, Composition};
use crate::render::options::{OutputFormat, RenderOptions};

/// Renderer named by a template's `renderer` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    /// Baseline raster backend: no layers, no native animated GIF.
    Gd,
    Imagick,
    Gmagick,
}

impl Renderer {
    /// Whether the backend can hold several layers and export them natively.
    pub fn supports_layers(self) -> bool {
        !matches!(self, Renderer::Gd)
    }
}

impl FromStr for Renderer {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gd" => Ok(Renderer::Gd),
            "imagick" => Ok(Renderer::Imagick),
            "gmagick" => Ok(Renderer::Gmagick),
            _ => Err(format!("Unknown renderer: {s}")),
        }
    }
}

impl fmt::Display for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Renderer::Gd => "Gd",
            Renderer::Imagick => "Imagick",
            Renderer::Gmagick => "Gmagick",
        };
        f.write_str(name)
    }
}

/// A font ready for drawing: face, pixel size and colour.
#[derive(Clone)]
pub struct FontHandle {
    pub path: PathBuf,
    pub size: f32,
    pub color: Rgba,
    face: Option<rusttype::Font<'static>>,
}

impl FontHandle {
    pub fn new(path: impl Into<PathBuf>, size: f32, color: Rgba) -> Self {
        Self {
            path: path.into(),
            size,
            color,
            face: None,
        }
    }

    pub fn with_face(mut self, face: rusttype::Font<'static>) -> Self {
        self.face = Some(face);
        self
    }

    pub fn face(&self) -> Option<&rusttype::Font<'static>> {
        self.face.as_ref()
    }
}

impl fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontHandle")
            .field("path", &self.path)
            .field("size", &self.size)
            .field("color", &self.color)
            .field("loaded", &self.face.is_some())
            .finish()
    }
}

/// Drawing and export operations of one graphics backend.
pub trait GraphicsBackend {
    fn renderer(&self) -> Renderer;

    fn supports_layers(&self) -> bool {
        self.renderer().supports_layers()
    }

    /// Blank opaque canvas.
    fn create(&self, size: Size, background: Rgb) -> Result<Canvas, BackendError>;

    /// Decode an image file.
    fn open(&self, path: &Path) -> Result<Canvas, BackendError>;

    fn crop(&self, image: &Canvas, origin: Point, size: Size) -> Result<Canvas, BackendError>;

    /// Draw `image` onto `target` at `position` with an opacity percentage.
    fn paste(
        &self,
        target: &mut Canvas,
        image: &Canvas,
        position: Point,
        opacity: u8,
    ) -> Result<(), BackendError>;

    fn font(&self, path: &Path, size: f32, color: Rgba) -> Result<FontHandle, BackendError>;

    /// Draw `text` with its box's top-left corner at `position`.
    fn draw_text(
        &self,
        target: &mut Canvas,
        text: &str,
        font: &FontHandle,
        position: Point,
    ) -> Result<(), BackendError>;

    /// Copy a canvas through a lossless intermediate encoding.
    fn duplicate(&self, canvas: &Canvas) -> Result<Canvas, BackendError>;

    /// Serialize a composition.
    fn encode(
        &self,
        composition: &Composition,
        format: OutputFormat,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, BackendError>;
}
