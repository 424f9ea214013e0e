//! Stencil update kernel
//!
//! One forward-Euler step of the Gray-Scott system per draw. The kernel reads
//! the previous buffer of a field (sampler 0), writes the current one, and in
//! image mode also samples the input image (sampler 1).

use super::codec;
use super::modulation::{self, ImageSample, Influence};
use super::{Channel, ParameterTuple};
use crate::error::EngineError;
use crate::gpu::{require_samplers, DeviceLimits, Fragment, FragmentProgram, Texture};
use crate::noise::{simplex3, smoothstep_between};

/// 3x3 Laplacian weights, row-major
pub const STENCIL: [[f32; 3]; 3] = [[0.05, 0.20, 0.05], [0.20, -1.0, 0.20], [0.05, 0.20, 0.05]];

/// Feed range of the parameter map, bottom to top
pub const MAP_FEED: [f32; 2] = [0.01, 0.1];
/// Kill range of the parameter map, left to right
pub const MAP_KILL: [f32; 2] = [0.045, 0.07];

/// Width of the brush's soft edge in normalized units
const BRUSH_FEATHER: f32 = 0.001;

/// Decoded (A, B) at an integer texel, clamped to the grid edge
#[inline]
fn fetch(field: &Texture, x: i32, y: i32) -> (f32, f32) {
    codec::decode(field.texel(x, y))
}

/// Weighted 3x3 neighbourhood of both species. Borders repeat the edge texel.
pub fn laplacian(field: &Texture, x: i32, y: i32) -> (f32, f32) {
    let mut sum = (0.0, 0.0);
    for (dy, row) in STENCIL.iter().enumerate() {
        for (dx, &w) in row.iter().enumerate() {
            let (a, b) = fetch(field, x + dx as i32 - 1, y + dy as i32 - 1);
            sum.0 += a * w;
            sum.1 += b * w;
        }
    }
    sum
}

/// One explicit Euler step with unit time step
#[inline]
pub fn react(a: f32, b: f32, lap: (f32, f32), diffusion: [f32; 2], feed: f32, kill: f32) -> (f32, f32) {
    let reaction = a * b * b;
    (
        a + diffusion[0] * lap.0 - reaction + feed * (1.0 - a),
        b + diffusion[1] * lap.1 + reaction - (kill + feed) * b,
    )
}

/// Brush as the kernel sees it
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BrushStamp {
    /// Normalized grid position, row 0 at the top
    pub position: [f32; 2],
    pub size: f32,
    /// Zero while the pointer is up
    pub strength: f32,
}

impl BrushStamp {
    /// Push weight in [0, 1] at `uv`. `aspect` is width over height of the
    /// surface the brush size is measured on.
    pub fn weight(&self, uv: [f32; 2], aspect: f32) -> f32 {
        if self.strength == 0.0 {
            return 0.0;
        }
        let dx = (uv[0] - self.position[0]) * aspect;
        let dy = uv[1] - self.position[1];
        let dist = (dx * dx + dy * dy).sqrt() / aspect;
        let inside = 1.0 - smoothstep_between(self.size - BRUSH_FEATHER, self.size, dist);
        inside * self.strength
    }
}

fn check_stencil(program: &'static str) -> Result<(), EngineError> {
    let total: f32 = STENCIL.iter().flatten().sum();
    if total.abs() > 1e-6 {
        return Err(EngineError::ResourceBuildFailure {
            program,
            reason: format!("stencil weights sum to {} instead of 0", total),
        });
    }
    Ok(())
}

// ============================================================================
// Image-modulated update
// ============================================================================

/// Update for one channel with feed/kill driven by the input image
#[derive(Debug, Clone, Default)]
pub struct UpdateProgram {
    pub channel: Option<Channel>,
    pub params: ParameterTuple,
    pub diffuse_scale: f32,
    pub influence: Influence,
    pub brush: BrushStamp,
    /// Aspect of the simulation grid, used for the brush falloff
    pub aspect: f32,
    pub noise_scale: f32,
    pub noise_strength: f32,
    pub time: f32,
}

impl UpdateProgram {
    fn cell(&self, frag: &Fragment, field: &Texture, image: &Texture) -> (f32, f32) {
        let (x, y) = (frag.x as i32, frag.y as i32);
        let (a, b) = fetch(field, x, y);
        let lap = laplacian(field, x, y);

        let sample = match self.channel {
            Some(channel) => ImageSample::read(image, channel, frag.uv, frag.texel),
            None => ImageSample {
                coverage: 0.0,
                brightness: 0.0,
                edge: 0.0,
            },
        };

        let push = self.brush.weight(frag.uv, self.aspect);
        let a = modulation::mix(a, 1.0, push);
        let b = modulation::mix(b, 1.0, push);

        let noise = if self.noise_strength == 0.0 {
            0.0
        } else {
            simplex3(frag.uv[0] * self.noise_scale, frag.uv[1] * self.noise_scale, self.time)
        };
        let p = &self.params;
        let (feed, kill) = modulation::rates(
            [p.feed_min, p.feed_max],
            [p.kill_min, p.kill_max],
            &sample,
            self.influence,
            noise,
            self.noise_strength,
        );

        let diffusion = [self.diffuse_scale * p.diff_a, self.diffuse_scale * p.diff_b];
        react(a, b, lap, diffusion, feed, kill)
    }
}

impl FragmentProgram for UpdateProgram {
    const NAME: &'static str = "update";
    const SAMPLERS: usize = 2;

    fn build(limits: &DeviceLimits) -> Result<Self, EngineError> {
        require_samplers(Self::NAME, Self::SAMPLERS, limits)?;
        check_stencil(Self::NAME)?;
        Ok(Self::default())
    }

    fn shade(&self, frag: &Fragment, samplers: &[&Texture]) -> [u8; 4] {
        let (a, b) = self.cell(frag, samplers[0], samplers[1]);
        codec::encode(a, b)
    }
}

// ============================================================================
// Parameter map
// ============================================================================

/// Update where feed rises bottom to top and kill rises left to right
#[derive(Debug, Clone, Default)]
pub struct ParameterMapProgram {
    /// Diffusion rates of the channel being stepped
    pub diffusion: [f32; 2],
}

impl ParameterMapProgram {
    pub fn rates_at(uv: [f32; 2]) -> (f32, f32) {
        (
            modulation::mix(MAP_FEED[0], MAP_FEED[1], 1.0 - uv[1]),
            modulation::mix(MAP_KILL[0], MAP_KILL[1], uv[0]),
        )
    }
}

impl FragmentProgram for ParameterMapProgram {
    const NAME: &'static str = "parameter map";
    const SAMPLERS: usize = 1;

    fn build(limits: &DeviceLimits) -> Result<Self, EngineError> {
        require_samplers(Self::NAME, Self::SAMPLERS, limits)?;
        check_stencil(Self::NAME)?;
        Ok(Self::default())
    }

    fn shade(&self, frag: &Fragment, samplers: &[&Texture]) -> [u8; 4] {
        let field = samplers[0];
        let (x, y) = (frag.x as i32, frag.y as i32);
        let (a, b) = fetch(field, x, y);
        let (feed, kill) = Self::rates_at(frag.uv);
        let (a, b) = react(a, b, laplacian(field, x, y), self.diffusion, feed, kill);
        codec::encode(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::FilterMode;

    fn uniform_field(w: u32, h: u32, a: f32, b: f32) -> Texture {
        let mut t = Texture::new(w, h, FilterMode::Linear);
        t.fill(codec::encode(a, b));
        t
    }

    #[test]
    fn test_stencil_sums_to_zero() {
        assert!(check_stencil("test").is_ok());
    }

    #[test]
    fn test_laplacian_of_uniform_field_is_zero() {
        let field = uniform_field(5, 5, 0.7, 0.3);
        for (x, y) in [(0, 0), (2, 2), (4, 4), (4, 0)] {
            let (la, lb) = laplacian(&field, x, y);
            assert!(la.abs() < 1e-6 && lb.abs() < 1e-6);
        }
    }

    #[test]
    fn test_laplacian_spike() {
        let mut field = uniform_field(5, 5, 0.0, 0.0);
        field.set_pixel(2, 2, codec::encode(0.0, 1.0));
        let centre = laplacian(&field, 2, 2).1;
        let side = laplacian(&field, 1, 2).1;
        let corner = laplacian(&field, 1, 1).1;
        assert!((centre + 1.0).abs() < 1e-4);
        assert!((side - 0.2).abs() < 1e-4);
        assert!((corner - 0.05).abs() < 1e-4);
    }

    #[test]
    fn test_react_fixed_point() {
        assert_eq!(react(1.0, 0.0, (0.0, 0.0), [1.0, 0.5], 0.03, 0.06), (1.0, 0.0));
    }

    #[test]
    fn test_brush_weight() {
        let brush = BrushStamp {
            position: [0.5, 0.5],
            size: 0.1,
            strength: 1.0,
        };
        assert_eq!(brush.weight([0.5, 0.5], 1.0), 1.0);
        assert_eq!(brush.weight([0.9, 0.5], 1.0), 0.0);
        // Wide surface: horizontal distances shrink back to height units
        assert_eq!(brush.weight([0.55, 0.5], 2.0), 1.0);
        let idle = BrushStamp { strength: 0.0, ..brush };
        assert_eq!(idle.weight([0.5, 0.5], 1.0), 0.0);
    }

    #[test]
    fn test_parameter_map_corners() {
        let (feed, kill) = ParameterMapProgram::rates_at([0.0, 1.0]);
        assert!((feed - 0.01).abs() < 1e-6 && (kill - 0.045).abs() < 1e-6);
        let (feed, kill) = ParameterMapProgram::rates_at([1.0, 0.0]);
        assert!((feed - 0.1).abs() < 1e-6 && (kill - 0.07).abs() < 1e-6);
    }

    #[test]
    fn test_build_requires_two_samplers() {
        let limits = DeviceLimits {
            max_samplers: 1,
            ..DeviceLimits::default()
        };
        assert!(matches!(
            UpdateProgram::build(&limits),
            Err(EngineError::ResourceBuildFailure { program: "update", .. })
        ));
        assert!(ParameterMapProgram::build(&limits).is_ok());
    }
}
