//! Reset pattern
//!
//! Every channel starts from A = 1 with B = 1 inside a fixed set of small
//! dots. Dot centres come from a sine hash of the dot index, so the pattern is
//! the same on every run and every reset.

use super::codec;
use crate::error::EngineError;
use crate::gpu::{require_samplers, DeviceLimits, Fragment, FragmentProgram, Texture};

pub const DOT_COUNT: usize = 50;
/// Dot radius as a fraction of the grid height
pub const DOT_RADIUS: f32 = 0.005;

/// `fract(sin(dot(st, (12.9898, 78.233))) * 43758.5453)`
#[inline]
pub fn sine_hash(x: f32, y: f32) -> f32 {
    let v = (x * 12.9898 + y * 78.233).sin() * 43758.547;
    v - v.floor()
}

/// Dot centres in normalized grid coordinates
pub fn dot_centers() -> [[f32; 2]; DOT_COUNT] {
    let mut centers = [[0.0; 2]; DOT_COUNT];
    for (i, center) in centers.iter_mut().enumerate() {
        *center = [sine_hash(i as f32, 0.12345), sine_hash(i as f32, 0.6789)];
    }
    centers
}

pub struct SeedProgram {
    /// Whether the dots are drawn at all
    pub starter: bool,
    /// Grid width over height, keeps dots round
    pub aspect: f32,
    centers: [[f32; 2]; DOT_COUNT],
}

impl Default for SeedProgram {
    fn default() -> Self {
        Self {
            starter: true,
            aspect: 1.0,
            centers: dot_centers(),
        }
    }
}

impl SeedProgram {
    fn inside_dot(&self, uv: [f32; 2]) -> bool {
        let px = uv[0] * self.aspect;
        self.centers.iter().any(|c| {
            let dx = px - c[0] * self.aspect;
            let dy = uv[1] - c[1];
            (dx * dx + dy * dy).sqrt() < DOT_RADIUS
        })
    }
}

impl FragmentProgram for SeedProgram {
    const NAME: &'static str = "seed";
    const SAMPLERS: usize = 0;

    fn build(limits: &DeviceLimits) -> Result<Self, EngineError> {
        require_samplers(Self::NAME, Self::SAMPLERS, limits)?;
        Ok(Self::default())
    }

    fn shade(&self, frag: &Fragment, _samplers: &[&Texture]) -> [u8; 4] {
        let b = if self.starter && self.inside_dot(frag.uv) { 1.0 } else { 0.0 };
        codec::encode(1.0, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{FilterMode, RenderContext};

    fn seeded(width: u32, height: u32, starter: bool) -> Vec<u8> {
        let mut ctx = RenderContext::new(DeviceLimits::default());
        let target = ctx.create_texture(width, height, FilterMode::Linear);
        let program = SeedProgram {
            starter,
            aspect: width as f32 / height as f32,
            ..SeedProgram::default()
        };
        ctx.draw(&program, target, &[]).unwrap();
        ctx.texture(target).unwrap().as_bytes().to_vec()
    }

    #[test]
    fn test_centers_are_in_unit_square() {
        for c in dot_centers() {
            assert!((0.0..1.0).contains(&c[0]) && (0.0..1.0).contains(&c[1]));
        }
    }

    #[test]
    fn test_reset_is_deterministic() {
        let a = seeded(400, 300, true);
        let b = seeded(400, 300, true);
        assert_eq!(a, b);
    }

    #[test]
    fn test_starter_pattern_has_dots_on_substrate() {
        let bytes = seeded(400, 300, true);
        let mut dots = 0;
        for texel in bytes.chunks_exact(4) {
            let (a, b) = codec::decode([texel[0], texel[1], texel[2], texel[3]]);
            assert!((a - 1.0).abs() < 1e-4);
            if b > 0.5 {
                dots += 1;
            }
        }
        assert!(dots > 0);
        assert!(dots < 400 * 300 / 100);
    }

    #[test]
    fn test_blank_pattern_is_uniform() {
        let bytes = seeded(64, 48, false);
        let first = [bytes[0], bytes[1], bytes[2], bytes[3]];
        assert!(bytes.chunks_exact(4).all(|t| t == first));
        assert_eq!(codec::decode(first).1, 0.0);
    }
}
