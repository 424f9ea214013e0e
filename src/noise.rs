//! Noise Generation Utilities
//!
//! Lattice hash, value noise and 3D simplex noise. Simplex drives the
//! feed/kill perturbation; value noise paints the procedural test card.

/// Hash-based pseudo-random value for integer grid coordinates.
/// Returns a value in [0.0, 1.0).
#[inline]
pub fn noise_hash(x: i32, y: i32, z: i32, seed: u32) -> f32 {
    (lattice_hash(x, y, z, seed) & 0x7fff) as f32 / 0x8000 as f32
}

#[inline]
fn lattice_hash(x: i32, y: i32, z: i32, seed: u32) -> u32 {
    let mut h = seed.wrapping_add(x as u32).wrapping_mul(374761393);
    h = h.wrapping_add(y as u32).wrapping_mul(668265263);
    h = h.wrapping_add(z as u32).wrapping_mul(2147483647);
    h = (h ^ (h >> 13)).wrapping_mul(1274126177);
    h ^ (h >> 16)
}

/// Smoothstep interpolation: 3t² - 2t³
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// GLSL-style smoothstep between two edges, clamped
#[inline]
pub fn smoothstep_between(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    smoothstep(((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0))
}

/// 3D value noise with smoothstep interpolation.
/// Returns a value in approximately [0.0, 1.0].
pub fn value_noise(x: f32, y: f32, z: f32, seed: u32) -> f32 {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    let iz = z.floor() as i32;
    let fx = smoothstep(x - ix as f32);
    let fy = smoothstep(y - iy as f32);
    let fz = smoothstep(z - iz as f32);

    let corner = |dx: i32, dy: i32, dz: i32| noise_hash(ix + dx, iy + dy, iz + dz, seed);
    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

    let x0 = lerp(corner(0, 0, 0), corner(1, 0, 0), fx);
    let x1 = lerp(corner(0, 1, 0), corner(1, 1, 0), fx);
    let x2 = lerp(corner(0, 0, 1), corner(1, 0, 1), fx);
    let x3 = lerp(corner(0, 1, 1), corner(1, 1, 1), fx);

    lerp(lerp(x0, x1, fy), lerp(x2, x3, fy), fz)
}

/// Fractional Brownian motion over 3D value noise
pub fn fbm(x: f32, y: f32, z: f32, octaves: u32, seed: u32) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 0.5;
    let mut frequency = 1.0;
    for _ in 0..octaves {
        value += amplitude * value_noise(x * frequency, y * frequency, z * frequency, seed);
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    value
}

// ============================================================================
// Simplex
// ============================================================================

const F3: f32 = 1.0 / 3.0;
const G3: f32 = 1.0 / 6.0;

const GRAD3: [[f32; 3]; 12] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
];

const SIMPLEX_SEED: u32 = 0x5eed_1e55;

#[inline]
fn corner_contribution(i: i32, j: i32, k: i32, x: f32, y: f32, z: f32) -> f32 {
    let t = 0.6 - x * x - y * y - z * z;
    if t <= 0.0 {
        return 0.0;
    }
    let g = GRAD3[(lattice_hash(i, j, k, SIMPLEX_SEED) % 12) as usize];
    let t2 = t * t;
    t2 * t2 * (g[0] * x + g[1] * y + g[2] * z)
}

/// 3D simplex noise in [-1, 1]
pub fn simplex3(x: f32, y: f32, z: f32) -> f32 {
    let s = (x + y + z) * F3;
    let i = (x + s).floor();
    let j = (y + s).floor();
    let k = (z + s).floor();
    let t = (i + j + k) * G3;
    let x0 = x - (i - t);
    let y0 = y - (j - t);
    let z0 = z - (k - t);

    // Which of the six tetrahedra we are in
    let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
        if y0 >= z0 {
            (1, 0, 0, 1, 1, 0)
        } else if x0 >= z0 {
            (1, 0, 0, 1, 0, 1)
        } else {
            (0, 0, 1, 1, 0, 1)
        }
    } else if y0 < z0 {
        (0, 0, 1, 0, 1, 1)
    } else if x0 < z0 {
        (0, 1, 0, 0, 1, 1)
    } else {
        (0, 1, 0, 1, 1, 0)
    };

    let x1 = x0 - i1 as f32 + G3;
    let y1 = y0 - j1 as f32 + G3;
    let z1 = z0 - k1 as f32 + G3;
    let x2 = x0 - i2 as f32 + 2.0 * G3;
    let y2 = y0 - j2 as f32 + 2.0 * G3;
    let z2 = z0 - k2 as f32 + 2.0 * G3;
    let x3 = x0 - 1.0 + 3.0 * G3;
    let y3 = y0 - 1.0 + 3.0 * G3;
    let z3 = z0 - 1.0 + 3.0 * G3;

    let (i, j, k) = (i as i32, j as i32, k as i32);
    let n = corner_contribution(i, j, k, x0, y0, z0)
        + corner_contribution(i + i1, j + j1, k + k1, x1, y1, z1)
        + corner_contribution(i + i2, j + j2, k + k2, x2, y2, z2)
        + corner_contribution(i + 1, j + 1, k + 1, x3, y3, z3);

    (32.0 * n).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_hash_deterministic() {
        let v1 = noise_hash(10, 20, 30, 42);
        let v2 = noise_hash(10, 20, 30, 42);
        assert_eq!(v1, v2);
    }

    #[test]
    fn test_noise_hash_range() {
        for x in -10..10 {
            for y in -10..10 {
                let v = noise_hash(x, y, 0, 12345);
                assert!((0.0..1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_smoothstep_between_edges() {
        assert_eq!(smoothstep_between(0.2, 0.4, 0.1), 0.0);
        assert_eq!(smoothstep_between(0.2, 0.4, 0.5), 1.0);
        assert!((smoothstep_between(0.2, 0.4, 0.3) - 0.5).abs() < 1e-5);
        assert_eq!(smoothstep_between(0.5, 0.5, 0.4), 0.0);
        assert_eq!(smoothstep_between(0.5, 0.5, 0.6), 1.0);
    }

    #[test]
    fn test_value_noise_continuity() {
        let seed = 999;
        for i in 0..100 {
            let x = i as f32 * 0.1;
            let v1 = value_noise(x, 0.0, 0.0, seed);
            let v2 = value_noise(x + 0.01, 0.0, 0.0, seed);
            assert!((v1 - v2).abs() < 0.5, "Noise discontinuity at x={}", x);
        }
    }

    #[test]
    fn test_simplex_range_and_sign() {
        let mut saw_positive = false;
        let mut saw_negative = false;
        for i in 0..40 {
            for j in 0..40 {
                let v = simplex3(i as f32 * 0.173, j as f32 * 0.219, 0.5);
                assert!((-1.0..=1.0).contains(&v));
                saw_positive |= v > 0.05;
                saw_negative |= v < -0.05;
            }
        }
        assert!(saw_positive && saw_negative);
    }

    #[test]
    fn test_simplex_continuity() {
        for i in 0..200 {
            let x = i as f32 * 0.05;
            let a = simplex3(x, 1.3, 2.7);
            let b = simplex3(x + 0.001, 1.3, 2.7);
            assert!((a - b).abs() < 0.05, "simplex jump at x={}", x);
        }
    }
}
