/// Fallback animated GIF encoder.
/// Used when the selected backend cannot export layered GIFs itself.
use image::RgbaImage;
use tracing::debug;

use crate::error::BackendError;

/// NeuQuant sampling speed (1 = best quality, 30 = fastest).
const QUANTIZE_SPEED: i32 = 10;

/// Delay used for frames without an explicit duration, in centiseconds.
const DEFAULT_DELAY_CS: u16 = 100;

/// Turns raw frames into one animated byte stream.
pub trait AnimatedEncoder {
    /// `durations_cs[i]` is the display time of frame `i` in hundredths of a
    /// second; `loops` of 0 repeats forever.
    fn encode(
        &self,
        frames: &[RgbaImage],
        durations_cs: &[u16],
        loops: u16,
    ) -> Result<Vec<u8>, BackendError>;
}

#[derive(Debug, Clone)]
pub struct GifFallbackEncoder {
    speed: i32,
}

impl GifFallbackEncoder {
    pub fn new() -> Self {
        Self {
            speed: QUANTIZE_SPEED,
        }
    }

    pub fn with_speed(speed: i32) -> Self {
        Self {
            speed: speed.clamp(1, 30),
        }
    }
}

impl Default for GifFallbackEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimatedEncoder for GifFallbackEncoder {
    fn encode(
        &self,
        frames: &[RgbaImage],
        durations_cs: &[u16],
        loops: u16,
    ) -> Result<Vec<u8>, BackendError> {
        let first = frames
            .first()
            .ok_or_else(|| BackendError::Unsupported("GIF without frames".to_string()))?;
        let (w, h) = first.dimensions();
        let too_large = || BackendError::InvalidCanvas {
            width: w,
            height: h,
        };
        let width = u16::try_from(w).map_err(|_| too_large())?;
        let height = u16::try_from(h).map_err(|_| too_large())?;

        let mut bytes = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut bytes, width, height, &[])?;
            let repeat = if loops == 0 {
                gif::Repeat::Infinite
            } else {
                gif::Repeat::Finite(loops)
            };
            encoder.set_repeat(repeat)?;

            for (i, image) in frames.iter().enumerate() {
                if image.dimensions() != (w, h) {
                    return Err(BackendError::Unsupported(format!(
                        "frame {} is {}x{}, expected {}x{}",
                        i,
                        image.width(),
                        image.height(),
                        w,
                        h
                    )));
                }
                let mut pixels = image.as_raw().clone();
                let mut frame = gif::Frame::from_rgba_speed(width, height, &mut pixels, self.speed);
                frame.delay = durations_cs
                    .get(i)
                    .or(durations_cs.last())
                    .copied()
                    .unwrap_or(DEFAULT_DELAY_CS);
                encoder.write_frame(&frame)?;
            }
        }

        debug!(
            "Fallback GIF encoder: {} frame(s), {} bytes",
            frames.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}
