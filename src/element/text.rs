/// Literal text drawn with a declared font.
use tracing::warn;

use crate::element::placeholder::{substitute_with, UnknownTokens};
use crate::element::{
    BuildContext, Draw, Element, ElementBase, ElementKind, FrameRenderer, RenderContext,
};
use crate::error::{BackendError, ElementError};
use crate::geometry::Rgb;
use crate::render::canvas::Canvas;
use crate::template::model::Section;

pub const DEFAULT_STRING: &str = "UNDEFINED STRING";
pub const DEFAULT_FONT: &str = "UNDEFINED FONT";
pub const DEFAULT_SIZE: f32 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub base: ElementBase,
    pub string: String,
    /// Name of a Font element
    pub font: String,
    /// Pixel size
    pub size: f32,
    pub color: Rgb,
}

impl TextElement {
    /// Draw `text` at the element position with its font, size and colour.
    ///
    /// A font reference that does not name a loaded Font element skips the
    /// draw instead of failing the render.
    pub(crate) fn draw_string(
        &self,
        ctx: &RenderContext<'_>,
        target: &mut Canvas,
        text: &str,
    ) -> Result<Draw, BackendError> {
        let font = match ctx.elements.get(&self.font) {
            Some(Element::Font(font)) => font,
            Some(other) => {
                return Ok(Draw::Skipped(format!(
                    "Element {} refers to {} \"{}\" as its font",
                    self.base.name,
                    other.kind(),
                    self.font
                )));
            }
            None => {
                return Ok(Draw::Skipped(format!(
                    "Font \"{}\" not found for element {}",
                    self.font, self.base.name
                )));
            }
        };

        let handle = ctx.backend.font(
            &font.path,
            self.size,
            self.color.with_opacity(self.base.opacity),
        )?;
        ctx.backend
            .draw_text(target, text, &handle, self.base.position)?;
        Ok(Draw::Drawn)
    }

    /// Fill `%token%` placeholders in the display string.
    pub(crate) fn substitute_placeholders(
        &mut self,
        ctx: &BuildContext<'_>,
        unknown: UnknownTokens,
    ) {
        let result = substitute_with(
            &self.string,
            ctx.placeholders,
            ctx.max_substitution_passes,
            unknown,
        );
        if result.exhausted {
            warn!(
                "Placeholders in element {} still unresolved after {} passes",
                self.base.name, result.passes
            );
        }
        self.string = result.text;
    }
}

impl ElementKind for TextElement {
    fn with_defaults(base: ElementBase, _ctx: &BuildContext<'_>) -> Self {
        Self {
            base,
            string: DEFAULT_STRING.to_string(),
            font: DEFAULT_FONT.to_string(),
            size: DEFAULT_SIZE,
            color: Rgb::WHITE,
        }
    }

    fn load_section(&mut self, section: &Section) -> Result<(), ElementError> {
        self.base.load_section(section)?;

        if let Some(string) = section.get("string") {
            self.string = string.to_string();
        }
        if let Some(font) = section.get("font") {
            self.font = font.trim().to_string();
        }
        if let Some(value) = section.get("size") {
            self.size = match value.trim().parse::<f32>() {
                Ok(size) if size.is_finite() && size > 0.0 => size,
                _ => {
                    return Err(ElementError::invalid(
                        &self.base.name,
                        "size",
                        value,
                        "expected a positive number",
                    ));
                }
            };
        }
        if let Some(value) = section.get("color") {
            self.color = value.parse().map_err(|reason: String| {
                ElementError::invalid(&self.base.name, "color", value, reason)
            })?;
        }
        Ok(())
    }

    fn post_load(&mut self, ctx: &BuildContext<'_>) -> Result<(), ElementError> {
        self.substitute_placeholders(ctx, UnknownTokens::Blank);
        Ok(())
    }
}

impl FrameRenderer for TextElement {
    fn render_to_frame(
        &self,
        ctx: &RenderContext<'_>,
        _frame: usize,
        target: &mut Canvas,
    ) -> Result<Draw, BackendError> {
        self.draw_string(ctx, target, &self.string)
    }
}
