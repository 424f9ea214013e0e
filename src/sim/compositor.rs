//! Final image
//!
//! Reads the `B` density of every channel, sharpens it around a threshold and
//! mixes the four inks subtractively. The grid is fitted inside the output
//! without stretching; whatever the grid does not cover is bare paper.

use super::codec;
use crate::gpu::{Fragment, FragmentProgram, Texture};
use crate::noise::smoothstep_between;

/// Placement of the grid on the output surface.
///
/// `scale` is the fraction of the output each grid axis spans, zoom included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    scale: [f32; 2],
}

impl Default for Letterbox {
    fn default() -> Self {
        Self { scale: [1.0, 1.0] }
    }
}

impl Letterbox {
    pub fn fit(grid: (u32, u32), output: (u32, u32), zoom: f32) -> Self {
        let grid_aspect = grid.0.max(1) as f32 / grid.1.max(1) as f32;
        let output_aspect = output.0.max(1) as f32 / output.1.max(1) as f32;
        let mut sx = grid_aspect / output_aspect;
        let mut sy = 1.0;
        if sx > 1.0 {
            sy /= sx;
            sx = 1.0;
        }
        let zoom = zoom.max(1.0e-3);
        Self {
            scale: [sx * zoom, sy * zoom],
        }
    }

    pub fn scale(&self) -> [f32; 2] {
        self.scale
    }

    /// Output coordinate to grid coordinate. May land outside [0, 1].
    #[inline]
    pub fn to_grid(&self, uv: [f32; 2]) -> [f32; 2] {
        [
            0.5 + (uv[0] - 0.5) / self.scale[0],
            0.5 + (uv[1] - 0.5) / self.scale[1],
        ]
    }

    #[inline]
    pub fn covers(grid_uv: [f32; 2]) -> bool {
        (0.0..=1.0).contains(&grid_uv[0]) && (0.0..=1.0).contains(&grid_uv[1])
    }
}

/// Filtered `B` of a field at `uv`, honouring the texture's filter mode
#[inline]
pub fn density(field: &Texture, uv: [f32; 2]) -> f32 {
    let s = field.sample(uv[0], uv[1]);
    codec::decode_normalized(s[2], s[3])
}

/// Smooth threshold of width `1 / sharpness` centred on `threshold`
#[inline]
pub fn sharpen(value: f32, threshold: f32, sharpness: f32) -> f32 {
    let half = 1.0 / (2.0 * sharpness.max(1.0e-3));
    smoothstep_between(threshold - half, threshold + half, value)
}

/// Subtractive synthesis of four ink coverages
#[inline]
pub fn cmyk_to_rgb(ink: [f32; 4]) -> [f32; 3] {
    let [c, m, y, k] = ink;
    [(1.0 - c) * (1.0 - k), (1.0 - m) * (1.0 - k), (1.0 - y) * (1.0 - k)]
}

#[inline]
fn to_rgba8(rgb: [f32; 3]) -> [u8; 4] {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [q(rgb[0]), q(rgb[1]), q(rgb[2]), 255]
}

/// Four channels in C, M, Y, K sampler order
#[derive(Debug, Clone, Default)]
pub struct CompositeProgram {
    pub threshold: f32,
    pub sharpness: f32,
    pub invert: bool,
    pub letterbox: Letterbox,
}

impl FragmentProgram for CompositeProgram {
    const NAME: &'static str = "composite";
    const SAMPLERS: usize = 4;

    fn shade(&self, frag: &Fragment, samplers: &[&Texture]) -> [u8; 4] {
        let grid = self.letterbox.to_grid(frag.uv);
        let mut ink = [0.0; 4];
        if Letterbox::covers(grid) {
            for (i, field) in samplers.iter().enumerate().take(4) {
                ink[i] = sharpen(density(field, grid), self.threshold, self.sharpness);
            }
        }
        let mut rgb = cmyk_to_rgb(ink);
        if self.invert {
            rgb = rgb.map(|v| 1.0 - v);
        }
        to_rgba8(rgb)
    }
}

/// One channel's raw density as grey
#[derive(Debug, Clone, Default)]
pub struct ChannelViewProgram {
    pub letterbox: Letterbox,
}

impl FragmentProgram for ChannelViewProgram {
    const NAME: &'static str = "channel view";
    const SAMPLERS: usize = 1;

    fn shade(&self, frag: &Fragment, samplers: &[&Texture]) -> [u8; 4] {
        let grid = self.letterbox.to_grid(frag.uv);
        let v = if Letterbox::covers(grid) {
            density(samplers[0], grid)
        } else {
            0.0
        };
        to_rgba8([v, v, v])
    }
}
