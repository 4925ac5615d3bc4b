/// Maps a section's `type` to an element variant.
use crate::element::{
    BuildContext, ConfigMeta, DateElement, Element, ElementBase, ElementKind, FontElement,
    ImageElement, TextElement, TimerElement,
};
use crate::error::ElementError;
use crate::template::model::Section;

pub struct ElementFactory;

impl ElementFactory {
    /// Build the element `name` of `template` from its section, by type tag.
    pub fn create(
        type_tag: &str,
        template: &str,
        name: &str,
        section: &Section,
        ctx: &BuildContext<'_>,
    ) -> Result<Element, ElementError> {
        let base = ElementBase::new(template, name);
        match type_tag.trim().to_lowercase().as_str() {
            "config" => ConfigMeta::build(base, section, ctx).map(Element::Config),
            "font" => FontElement::build(base, section, ctx).map(Element::Font),
            "image" => ImageElement::build(base, section, ctx).map(Element::Image),
            "text" => TextElement::build(base, section, ctx).map(Element::Text),
            "date" => DateElement::build(base, section, ctx).map(Element::Date),
            "timer" | "datetimer" => TimerElement::build(base, section, ctx).map(Element::Timer),
            _ => Err(ElementError::UnresolvedType {
                element: name.to_string(),
                type_tag: type_tag.to_string(),
            }),
        }
    }

    /// Build an ordinary (non-config) section from its `type` key.
    pub fn from_section(
        template: &str,
        section: &Section,
        ctx: &BuildContext<'_>,
    ) -> Result<Element, ElementError> {
        let type_tag = section
            .get("type")
            .ok_or_else(|| ElementError::missing(&section.name, "type"))?;

        if type_tag.trim().eq_ignore_ascii_case("config") {
            return Err(ElementError::UnresolvedType {
                element: section.name.clone(),
                type_tag: type_tag.to_string(),
            });
        }

        Self::create(type_tag, template, &section.name, section, ctx)
    }

    /// Build the `[config]` section.
    pub fn config(
        template: &str,
        section: &Section,
        ctx: &BuildContext<'_>,
    ) -> Result<ConfigMeta, ElementError> {
        ConfigMeta::build(ElementBase::new(template, &section.name), section, ctx)
    }
}
