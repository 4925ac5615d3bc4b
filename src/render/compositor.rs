/// Draws the layout, back to front, onto every frame.
use tracing::{debug, warn};

use crate::element::{Draw, FrameRenderer, RenderContext};
use crate::error::BackendError;
use crate::render::frames::FrameSequence;

/// Frames after drawing, plus non-fatal problems met on the way.
#[derive(Debug)]
pub struct Composed {
    pub frames: FrameSequence,
    pub warnings: Vec<String>,
}

pub struct Compositor<'a> {
    ctx: RenderContext<'a>,
}

impl<'a> Compositor<'a> {
    pub fn new(ctx: RenderContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn render(&self) -> Result<Composed, BackendError> {
        let config = self.ctx.config;
        let background = self.ctx.backend.create(config.dimensions, config.bgcolor)?;
        let mut frames = FrameSequence::new(background, config.frames);
        let mut warnings = Vec::new();

        for name in &config.layout {
            let Some(element) = self.ctx.elements.get(name) else {
                debug!("Layout entry {} has no element, skipping", name);
                continue;
            };

            // Missing frames copy frame 0 before this element touches it
            frames.materialize(self.ctx.backend)?;

            let mut skipped = None;
            for index in 0..frames.len() {
                if !element.visible_on(index) {
                    continue;
                }
                let Some(target) = frames.get_mut(index) else {
                    continue;
                };
                if let Draw::Skipped(reason) = element.render_to_frame(&self.ctx, index, target)? {
                    skipped.get_or_insert(reason);
                }
            }

            if let Some(reason) = skipped {
                warn!("{}", reason);
                warnings.push(reason);
            }
        }

        debug!(
            "Composited {} layout entries on {} frame(s)",
            config.layout.len(),
            frames.materialized_count()
        );
        Ok(Composed { frames, warnings })
    }
}
