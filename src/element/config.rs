/// The `[config]` section of a template.
use crate::element::{BuildContext, ElementBase, ElementKind};
use crate::error::{ElementError, GeneratorError};
use crate::geometry::{Rgb, Size};
use crate::render::backend::Renderer;
use crate::render::options::OutputFormat;
use crate::template::model::{split_list, Section, CONFIG_SECTION};

/// Longest interval whose delay still fits a 16-bit centisecond GIF field.
pub const MAX_INTERVAL_SECS: u32 = 655;

pub const MAX_FRAMES: usize = 500;

/// Largest canvas, in pixels.
pub const MAX_CANVAS_PIXELS: u64 = 4096 * 4096;

/// Pixels over all frames of one render.
pub const MAX_TOTAL_PIXELS: u64 = 1 << 28;

/// Resolved configuration of one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMeta {
    pub name: String,
    pub template: String,
    /// Renderer name as written; checked when the backend is selected
    pub renderer: String,
    pub format: OutputFormat,
    pub quality: u8,
    /// Back-to-front element names
    pub layout: Vec<String>,
    pub dimensions: Size,
    pub bgcolor: Rgb,
    /// Seconds between frames
    pub interval: u32,
    pub frames: usize,
    pub import: Option<String>,
}

impl Default for ConfigMeta {
    fn default() -> Self {
        Self {
            name: CONFIG_SECTION.to_string(),
            template: String::new(),
            renderer: Renderer::Gd.to_string(),
            format: OutputFormat::Jpg,
            quality: 90,
            layout: Vec::new(),
            dimensions: Size::new(200, 100),
            bgcolor: Rgb::WHITE,
            interval: 1,
            frames: 1,
            import: None,
        }
    }
}

impl ConfigMeta {
    pub fn renderer(&self) -> Result<Renderer, GeneratorError> {
        self.renderer
            .parse()
            .map_err(|_| GeneratorError::InvalidRenderer(self.renderer.clone()))
    }

    fn invalid(&self, field: &'static str, value: &str, reason: impl Into<String>) -> ElementError {
        ElementError::invalid(&self.name, field, value, reason)
    }
}

impl ElementKind for ConfigMeta {
    fn with_defaults(base: ElementBase, _ctx: &BuildContext<'_>) -> Self {
        Self {
            name: base.name,
            template: base.template,
            ..Self::default()
        }
    }

    fn load_section(&mut self, section: &Section) -> Result<(), ElementError> {
        for (key, value) in section.entries() {
            match key {
                "renderer" => self.renderer = value.trim().to_string(),
                "format" => {
                    self.format = value
                        .parse()
                        .map_err(|reason: String| self.invalid("format", value, reason))?;
                }
                "quality" => {
                    self.quality = crate::element::parse_percentage(&self.name, "quality", value)?;
                }
                "layout" => self.layout = split_list(value),
                "dimensions" => {
                    let size: Size = value
                        .parse()
                        .map_err(|reason: String| self.invalid("dimensions", value, reason))?;
                    if u64::from(size.width) * u64::from(size.height) > MAX_CANVAS_PIXELS {
                        return Err(self.invalid(
                            "dimensions",
                            value,
                            format!("canvas larger than {MAX_CANVAS_PIXELS} pixels"),
                        ));
                    }
                    self.dimensions = size;
                }
                "bgcolor" => {
                    self.bgcolor = value
                        .parse()
                        .map_err(|reason: String| self.invalid("bgcolor", value, reason))?;
                }
                "interval" => {
                    self.interval = match value.trim().parse::<u32>() {
                        Ok(v) if v <= MAX_INTERVAL_SECS => v,
                        _ => {
                            return Err(self.invalid(
                                "interval",
                                value,
                                format!("expected 0-{MAX_INTERVAL_SECS} seconds"),
                            ));
                        }
                    };
                }
                "frames" => {
                    self.frames = match value.trim().parse::<usize>() {
                        Ok(v) if (1..=MAX_FRAMES).contains(&v) => v,
                        _ => {
                            return Err(self.invalid(
                                "frames",
                                value,
                                format!("expected 1-{MAX_FRAMES}"),
                            ));
                        }
                    };
                }
                "import" => {
                    let name = value.trim();
                    self.import = (!name.is_empty()).then(|| name.to_string());
                }
                _ => {}
            }
        }

        let area = u64::from(self.dimensions.width) * u64::from(self.dimensions.height);
        if area * self.frames as u64 > MAX_TOTAL_PIXELS {
            return Err(self.invalid(
                "frames",
                &self.frames.to_string(),
                format!("{} frames of {} pixels exceed the render limit", self.frames, area),
            ));
        }
        Ok(())
    }
}
