/// Font declaration; Text elements refer to it by name.
use std::path::PathBuf;

use crate::element::{BuildContext, ElementBase, ElementKind};
use crate::error::ElementError;
use crate::template::model::Section;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontElement {
    pub base: ElementBase,
    pub file: String,
    /// Resolved font file
    pub path: PathBuf,
}

impl ElementKind for FontElement {
    fn with_defaults(base: ElementBase, _ctx: &BuildContext<'_>) -> Self {
        Self {
            base,
            file: String::new(),
            path: PathBuf::new(),
        }
    }

    fn load_section(&mut self, section: &Section) -> Result<(), ElementError> {
        self.base.load_section(section)?;
        if let Some(file) = section.get("file") {
            self.file = file.trim().to_string();
        }
        Ok(())
    }

    fn post_load(&mut self, ctx: &BuildContext<'_>) -> Result<(), ElementError> {
        if self.file.is_empty() {
            return Err(ElementError::missing(&self.base.name, "file"));
        }

        let path = ctx.resources.font_path(ctx.template, &self.file);
        if !path.is_file() {
            return Err(ElementError::ResourceNotFound {
                element: self.base.name.clone(),
                path,
            });
        }
        self.path = path;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceLayout;
    use crate::element::test_support::{context, section, touch};
    use crate::element::NoPlaceholders;
    use chrono::Utc;

    #[test]
    fn test_font_resolves_under_template_directory() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "fonts", "promo", "Sans.ttf");
        let resources = ResourceLayout::new(dir.path());
        let ctx = context("promo", None, &resources, &NoPlaceholders, Utc::now());

        let font = FontElement::build(
            ElementBase::new("promo", "sans"),
            &section("sans", &[("type", "font"), ("file", "Sans.ttf")]),
            &ctx,
        )
        .unwrap();
        assert_eq!(font.path, dir.path().join("fonts").join("promo").join("Sans.ttf"));
    }

    #[test]
    fn test_font_requires_file() {
        let resources = ResourceLayout::new("/nonexistent");
        let ctx = context("promo", None, &resources, &NoPlaceholders, Utc::now());

        let err = FontElement::build(
            ElementBase::new("promo", "sans"),
            &section("sans", &[("type", "font")]),
            &ctx,
        )
        .unwrap_err();
        assert_eq!(err, ElementError::missing("sans", "file"));
    }

    #[test]
    fn test_missing_font_file() {
        let dir = tempfile::tempdir().unwrap();
        let resources = ResourceLayout::new(dir.path());
        let ctx = context("promo", None, &resources, &NoPlaceholders, Utc::now());

        let err = FontElement::build(
            ElementBase::new("promo", "sans"),
            &section("sans", &[("file", "Gone.ttf")]),
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, ElementError::ResourceNotFound { .. }));
    }
}
