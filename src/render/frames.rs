/// Frame arena. Frame 0 exists from the start; the others are created from a
/// copy of frame 0 the first time an element references them.
use tracing::debug;

use crate::error::BackendError;
use crate::render::backend::GraphicsBackend;
use crate::render::canvas::Canvas;

#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<Option<Canvas>>,
    materialized: usize,
}

impl FrameSequence {
    /// `count` frames (at least one), frame 0 being `base`.
    pub fn new(base: Canvas, count: usize) -> Self {
        let mut frames = vec![None; count.max(1)];
        frames[0] = Some(base);
        Self {
            frames,
            materialized: 1,
        }
    }

    /// Configured number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn materialized_count(&self) -> usize {
        self.materialized
    }

    pub fn is_materialized(&self, index: usize) -> bool {
        self.frames.get(index).is_some_and(Option::is_some)
    }

    pub fn get(&self, index: usize) -> Option<&Canvas> {
        self.frames.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Canvas> {
        self.frames.get_mut(index).and_then(Option::as_mut)
    }

    /// Create every missing frame from frame 0 as it is now. Frames that
    /// already exist are left alone; returns how many were created.
    pub fn materialize(&mut self, backend: &dyn GraphicsBackend) -> Result<usize, BackendError> {
        if self.materialized == self.frames.len() {
            return Ok(0);
        }

        let mut created = 0;
        for index in 1..self.frames.len() {
            if self.frames[index].is_some() {
                continue;
            }
            let copy = match &self.frames[0] {
                Some(reference) => backend.duplicate(reference)?,
                None => return Err(BackendError::Unsupported("frame 0 is missing".to_string())),
            };
            self.frames[index] = Some(copy);
            created += 1;
        }

        self.materialized += created;
        debug!(
            "Materialized {} frame(s), {}/{} present",
            created,
            self.materialized,
            self.frames.len()
        );
        Ok(created)
    }

    /// Materialized frames in index order.
    pub fn into_frames(self) -> Vec<Canvas> {
        self.frames.into_iter().flatten().collect()
    }
}
