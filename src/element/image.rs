/// Static image pasted onto every frame it is visible on.
use std::path::PathBuf;
use tracing::debug;

use crate::element::{BuildContext, Draw, ElementBase, ElementKind, FrameRenderer, RenderContext};
use crate::error::{BackendError, ElementError};
use crate::geometry::Point;
use crate::render::canvas::Canvas;
use crate::template::model::Section;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageElement {
    pub base: ElementBase,
    pub file: String,
    /// Resolved image file
    pub path: PathBuf,
}

impl ElementKind for ImageElement {
    fn with_defaults(base: ElementBase, _ctx: &BuildContext<'_>) -> Self {
        Self {
            base,
            file: String::new(),
            path: PathBuf::new(),
        }
    }

    fn load_section(&mut self, section: &Section) -> Result<(), ElementError> {
        self.base.load_section(section)?;
        if let Some(file) = section.get("image").or_else(|| section.get("file")) {
            self.file = file.trim().to_string();
        }
        Ok(())
    }

    fn post_load(&mut self, ctx: &BuildContext<'_>) -> Result<(), ElementError> {
        if self.file.is_empty() {
            return Err(ElementError::missing(&self.base.name, "image"));
        }

        let path = ctx.resources.image_path(ctx.template, &self.file);
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

impl FrameRenderer for ImageElement {
    fn render_to_frame(
        &self,
        ctx: &RenderContext<'_>,
        _frame: usize,
        target: &mut Canvas,
    ) -> Result<Draw, BackendError> {
        let mut image = ctx.backend.open(&self.path)?;

        let bounds = target.size();
        if bounds.is_exceeded_by(image.size()) {
            debug!(
                "Cropping image {} from {} to {}",
                self.base.name,
                image.size(),
                bounds
            );
            image = ctx.backend.crop(&image, Point::ORIGIN, bounds)?;
        }

        ctx.backend
            .paste(target, &image, self.base.position, self.base.opacity)?;
        Ok(Draw::Drawn)
    }
}
