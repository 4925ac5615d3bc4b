pub mod config;
pub mod date;
pub mod factory;
pub mod font;
pub mod image;
pub mod placeholder;
pub mod text;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use tracing::warn;

use crate::config::ResourceLayout;
use crate::error::{BackendError, ElementError};
use crate::geometry::Point;
use crate::render::backend::GraphicsBackend;
use crate::render::canvas::Canvas;
use crate::template::model::{split_list, Section};

pub use config::ConfigMeta;
pub use date::{DateElement, TimerElement};
pub use factory::ElementFactory;
pub use font::FontElement;
pub use image::ImageElement;
pub use placeholder::{NoPlaceholders, PlaceholderResolver};
pub use text::TextElement;

/// Elements of a resolved template by section name.
pub type ElementMap = HashMap<String, Element>;

/// Static inputs available while elements are built.
pub struct BuildContext<'a> {
    /// Template declaring the element; resources are looked up under its name
    pub template: &'a str,
    /// Configuration in effect for the template (own or inherited)
    pub config: Option<&'a ConfigMeta>,
    pub resources: &'a ResourceLayout,
    pub placeholders: &'a dyn PlaceholderResolver,
    pub max_substitution_passes: usize,
    /// Instant of the request
    pub now: DateTime<Utc>,
    pub default_timezone: Tz,
}

/// Read-only state available while frames are drawn.
pub struct RenderContext<'a> {
    pub config: &'a ConfigMeta,
    pub elements: &'a ElementMap,
    pub backend: &'a dyn GraphicsBackend,
}

/// What happened when an element was asked to draw on a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Draw {
    Drawn,
    /// The element has nothing to draw (fonts, the config)
    Nothing,
    /// Drawing was skipped for the given reason
    Skipped(String),
}

/// Attributes shared by all drawable elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementBase {
    pub name: String,
    pub template: String,
    pub position: Point,
    /// 0 (transparent) to 100 (opaque)
    pub opacity: u8,
    /// Frames the element is drawn on; empty means all of them
    pub on_frames: Vec<usize>,
}

impl ElementBase {
    pub fn new(template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            position: Point::ORIGIN,
            opacity: 100,
            on_frames: Vec::new(),
        }
    }

    pub fn load_section(&mut self, section: &Section) -> Result<(), ElementError> {
        if let Some(value) = section.get("position") {
            self.position = value
                .parse()
                .map_err(|reason: String| ElementError::invalid(&self.name, "position", value, reason))?;
        }

        if let Some(value) = section.get("opacity") {
            self.opacity = parse_percentage(&self.name, "opacity", value)?;
        }

        if let Some(value) = section.get("onFrames") {
            self.on_frames = split_list(value)
                .iter()
                .map(|item| {
                    item.parse::<usize>().map_err(|_| {
                        ElementError::invalid(&self.name, "onFrames", value, "expected frame indices")
                    })
                })
                .collect::<Result<_, _>>()?;
        }

        Ok(())
    }

    pub fn visible_on(&self, frame: usize) -> bool {
        self.on_frames.is_empty() || self.on_frames.contains(&frame)
    }

    /// Warn about `onFrames` entries no frame will ever match.
    pub(crate) fn check_frames(&self, frame_count: usize) {
        for frame in self.on_frames.iter().filter(|f| **f >= frame_count) {
            warn!(
                "Element {} lists frame {} but the template only has {} frame(s)",
                self.name, frame, frame_count
            );
        }
    }
}

/// Construction contract of every element variant: defaults, then section
/// overrides, then validation and normalization.
pub trait ElementKind: Sized {
    fn with_defaults(base: ElementBase, ctx: &BuildContext<'_>) -> Self;

    fn load_section(&mut self, section: &Section) -> Result<(), ElementError>;

    fn post_load(&mut self, _ctx: &BuildContext<'_>) -> Result<(), ElementError> {
        Ok(())
    }

    fn build(
        base: ElementBase,
        section: &Section,
        ctx: &BuildContext<'_>,
    ) -> Result<Self, ElementError> {
        let mut element = Self::with_defaults(base, ctx);
        element.load_section(section)?;
        element.post_load(ctx)?;
        Ok(element)
    }
}

/// Draw contract: put the element's value for `frame` onto `target`.
pub trait FrameRenderer {
    fn render_to_frame(
        &self,
        ctx: &RenderContext<'_>,
        frame: usize,
        target: &mut Canvas,
    ) -> Result<Draw, BackendError>;
}

/// One element of a template.
///
/// Every section of a template becomes one element. Construction is static:
/// a variant sees only its own section and a [`BuildContext`]. Drawing happens
/// later through [`FrameRenderer`] with a read-only [`RenderContext`] holding
/// the finished element map and the backend.
#[derive(Debug, Clone)]
pub enum Element {
    Config(ConfigMeta),
    Font(FontElement),
    Image(ImageElement),
    Text(TextElement),
    Date(DateElement),
    Timer(TimerElement),
}

impl Element {
    pub fn name(&self) -> &str {
        match self {
            Element::Config(c) => &c.name,
            Element::Font(f) => &f.base.name,
            Element::Image(i) => &i.base.name,
            Element::Text(t) => &t.base.name,
            Element::Date(d) => &d.text.base.name,
            Element::Timer(t) => &t.text.base.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Element::Config(_) => "config",
            Element::Font(_) => "font",
            Element::Image(_) => "image",
            Element::Text(_) => "text",
            Element::Date(_) => "date",
            Element::Timer(_) => "timer",
        }
    }

    pub fn base(&self) -> Option<&ElementBase> {
        match self {
            Element::Config(_) => None,
            Element::Font(f) => Some(&f.base),
            Element::Image(i) => Some(&i.base),
            Element::Text(t) => Some(&t.base),
            Element::Date(d) => Some(&d.text.base),
            Element::Timer(t) => Some(&t.text.base),
        }
    }

    pub fn visible_on(&self, frame: usize) -> bool {
        self.base().is_none_or(|base| base.visible_on(frame))
    }
}

impl FrameRenderer for Element {
    fn render_to_frame(
        &self,
        ctx: &RenderContext<'_>,
        frame: usize,
        target: &mut Canvas,
    ) -> Result<Draw, BackendError> {
        match self {
            Element::Config(_) | Element::Font(_) => Ok(Draw::Nothing),
            Element::Image(image) => image.render_to_frame(ctx, frame, target),
            Element::Text(text) => text.render_to_frame(ctx, frame, target),
            Element::Date(date) => date.render_to_frame(ctx, frame, target),
            Element::Timer(timer) => timer.render_to_frame(ctx, frame, target),
        }
    }
}

// -- Helpers --

pub(crate) fn parse_percentage(
    element: &str,
    field: &'static str,
    value: &str,
) -> Result<u8, ElementError> {
    match value.trim().parse::<u8>() {
        Ok(v) if v <= 100 => Ok(v),
        _ => Err(ElementError::invalid(element, field, value, "expected 0-100")),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::section;
    use super::*;

    #[test]
    fn test_base_defaults() {
        let base = ElementBase::new("tpl", "logo");
        assert_eq!(base.position, Point::ORIGIN);
        assert_eq!(base.opacity, 100);
        assert!(base.on_frames.is_empty());
        assert!(base.visible_on(0));
        assert!(base.visible_on(41));
    }

    #[test]
    fn test_base_loads_common_keys() {
        let mut base = ElementBase::new("tpl", "logo");
        base.load_section(&section(
            "logo",
            &[("position", "10,20"), ("opacity", "40"), ("onFrames", "0, 2")],
        ))
        .unwrap();

        assert_eq!(base.position, Point::new(10, 20));
        assert_eq!(base.opacity, 40);
        assert!(base.visible_on(0));
        assert!(!base.visible_on(1));
        assert!(base.visible_on(2));
    }

    #[test]
    fn test_base_rejects_bad_values() {
        let mut base = ElementBase::new("tpl", "logo");
        let err = base
            .load_section(&section("logo", &[("opacity", "150")]))
            .unwrap_err();
        assert!(matches!(err, ElementError::InvalidValue { field: "opacity", .. }));

        let err = base
            .load_section(&section("logo", &[("position", "ten,20")]))
            .unwrap_err();
        assert!(matches!(err, ElementError::InvalidValue { field: "position", .. }));

        let err = base
            .load_section(&section("logo", &[("onFrames", "1,x")]))
            .unwrap_err();
        assert!(matches!(err, ElementError::InvalidValue { field: "onFrames", .. }));
    }
}
