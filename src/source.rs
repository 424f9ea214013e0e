//! Input image providers
//!
//! The engine samples whatever RGBA frame the host last handed it. Camera
//! capture is outside this crate; a still image or a procedural card stands in.

use std::path::Path;

use anyhow::Context;
use rayon::prelude::*;

use crate::noise::fbm;

/// One RGBA frame, rows top to bottom
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub width: i32,
    pub height: i32,
    pub rgba: &'a [u8],
}

pub trait ImageSource {
    /// A new frame if the image changed since the last call
    fn frame(&mut self, time_s: f32) -> Option<Frame<'_>>;

    fn name(&self) -> &str;
}

// ============================================================================
// Still image
// ============================================================================

pub struct StillImage {
    name: String,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    delivered: bool,
}

impl StillImage {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .with_context(|| format!("failed to open input image {}", path.display()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        log::info!("loaded input image {} ({}x{})", path.display(), width, height);
        Ok(Self {
            name: path.display().to_string(),
            width,
            height,
            rgba: image.into_raw(),
            delivered: false,
        })
    }
}

impl ImageSource for StillImage {
    fn frame(&mut self, _time_s: f32) -> Option<Frame<'_>> {
        if self.delivered {
            return None;
        }
        self.delivered = true;
        Some(Frame {
            width: self.width as i32,
            height: self.height as i32,
            rgba: &self.rgba,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Drifting test card
// ============================================================================

/// Slowly moving coloured clouds with a dark band, enough structure to give
/// every channel, the brightness term and the edge term something to follow.
pub struct DriftingCard {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    seed: u32,
}

impl DriftingCard {
    pub fn new(width: u32, height: u32, seed: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            rgba: vec![0; (width * height * 4) as usize],
            seed,
        }
    }

    fn paint(&mut self, time_s: f32) {
        let (w, h, seed) = (self.width, self.height, self.seed);
        let drift = time_s * 0.05;
        self.rgba
            .par_chunks_mut(w as usize * 4)
            .enumerate()
            .for_each(|(y, row)| {
                let v = y as f32 / h as f32;
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    let u = x as f32 / w as f32;
                    let channel = |offset: u32| {
                        fbm(u * 3.0 + drift, v * 3.0, drift * 0.5, 4, seed.wrapping_add(offset))
                    };
                    let band = if (0.45..0.55).contains(&u) { 0.2 } else { 1.0 };
                    let q = |c: f32| ((c * 1.6 - 0.3).clamp(0.0, 1.0) * band * 255.0) as u8;
                    px.copy_from_slice(&[q(channel(0)), q(channel(101)), q(channel(202)), 255]);
                }
            });
    }
}

impl ImageSource for DriftingCard {
    fn frame(&mut self, time_s: f32) -> Option<Frame<'_>> {
        self.paint(time_s);
        Some(Frame {
            width: self.width as i32,
            height: self.height as i32,
            rgba: &self.rgba,
        })
    }

    fn name(&self) -> &str {
        "drifting card"
    }
}
