//! Value pair codec
//!
//! Each simulated scalar is stored in two bytes of an RGBA8 texel: a coarse
//! byte holding `floor(255.99 * v)` and a fine byte holding the fractional
//! remainder. Pairs occupy a whole texel as `[a_coarse, a_fine, b_coarse, b_fine]`.

/// Scale applied before splitting a scalar into coarse and fine parts
pub const ENCODE_SCALE: f32 = 255.99;

/// Keeps a decoded value in its original coarse bucket when re-encoded,
/// despite f32 rounding in the decode/encode pair. Well below one fine step.
const BUCKET_BIAS: f32 = 1.0e-4;

/// Weight of the normalized coarse byte when decoding
const COARSE_WEIGHT: f32 = 255.0 / ENCODE_SCALE;
/// Weight of the normalized fine byte when decoding
const FINE_WEIGHT: f32 = 1.0 / ENCODE_SCALE;

/// Split one scalar into (coarse, fine) bytes. Input is clamped to [0, 1].
#[inline]
pub fn encode16(v: f32) -> [u8; 2] {
    let scaled = ENCODE_SCALE * v.clamp(0.0, 1.0) + BUCKET_BIAS;
    let coarse = scaled.floor();
    let fine = scaled - coarse;
    [coarse as u8, (fine * 255.0).round() as u8]
}

/// Rebuild one scalar from its (coarse, fine) bytes
#[inline]
pub fn decode16(bytes: [u8; 2]) -> f32 {
    decode_normalized(bytes[0] as f32 / 255.0, bytes[1] as f32 / 255.0)
}

/// Rebuild one scalar from normalized bytes, as returned by a filtered
/// texture sample. Decoding is linear, so filtering before or after it agrees.
#[inline]
pub fn decode_normalized(coarse: f32, fine: f32) -> f32 {
    coarse * COARSE_WEIGHT + fine * FINE_WEIGHT
}

/// Encode an (A, B) pair into one texel
#[inline]
pub fn encode(a: f32, b: f32) -> [u8; 4] {
    let [a0, a1] = encode16(a);
    let [b0, b1] = encode16(b);
    [a0, a1, b0, b1]
}

/// Decode one texel into its (A, B) pair
#[inline]
pub fn decode(texel: [u8; 4]) -> (f32, f32) {
    (decode16([texel[0], texel[1]]), decode16([texel[2], texel[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// splitmix64 so the sweep is reproducible without pulling in an RNG
    fn next(state: &mut u64) -> f32 {
        *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = *state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        (z >> 40) as f32 / (1u64 << 24) as f32
    }

    #[test]
    fn test_round_trip_within_bound() {
        let bound = 1.0 / 65536.0;
        let mut state = 0x5eed;
        for _ in 0..100_000 {
            let a = next(&mut state);
            let b = next(&mut state);
            let (da, db) = decode(encode(a, b));
            assert!((da - a).abs() <= bound, "a={} decoded={}", a, da);
            assert!((db - b).abs() <= bound, "b={} decoded={}", b, db);
        }
    }

    #[test]
    fn test_endpoints() {
        let (a, b) = decode(encode(1.0, 0.0));
        assert!((a - 1.0).abs() <= 1.0 / 65536.0);
        assert_eq!(b, 0.0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(encode(-3.0, 7.5), encode(0.0, 1.0));
    }

    #[test]
    fn test_reencoding_is_stable() {
        // Stored texels must survive decode -> encode unchanged, otherwise a
        // resting field would drift one fine step per iteration.
        for coarse in [0u8, 1, 17, 128, 254, 255] {
            for fine in [0u8, 3, 100, 200, 252] {
                let texel = [coarse, fine, coarse, fine];
                let (a, b) = decode(texel);
                assert_eq!(encode(a, b), texel);
            }
        }
    }
}
