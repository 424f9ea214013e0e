//! Modulation map
//!
//! Turns the input image into a per-cell scalar that positions each cell
//! inside its channel's feed/kill ranges, then perturbs the rates with
//! brightness, edge strength and noise.

use super::Channel;
use crate::gpu::Texture;

/// Rec. 601 luma
#[inline]
pub fn luminance(rgb: [f32; 3]) -> f32 {
    rgb[0] * 0.299 + rgb[1] * 0.587 + rgb[2] * 0.114
}

/// Naive subtractive separation. Pure black is all key.
pub fn rgb_to_cmyk(rgb: [f32; 3]) -> [f32; 4] {
    let [r, g, b] = rgb;
    let k = 1.0 - r.max(g).max(b);
    if k >= 1.0 {
        return [0.0, 0.0, 0.0, k];
    }
    let w = 1.0 - k;
    [(1.0 - r - k) / w, (1.0 - g - k) / w, (1.0 - b - k) / w, k]
}

/// Sobel gradient magnitude of the luminance around `uv`, sampling `step`
/// apart in normalized units.
pub fn sobel_edge(image: &Texture, uv: [f32; 2], step: [f32; 2]) -> f32 {
    let lum = |dx: f32, dy: f32| {
        let s = image.sample(uv[0] + dx * step[0], uv[1] + dy * step[1]);
        luminance([s[0], s[1], s[2]])
    };
    let tl = lum(-1.0, -1.0);
    let t = lum(0.0, -1.0);
    let tr = lum(1.0, -1.0);
    let l = lum(-1.0, 0.0);
    let r = lum(1.0, 0.0);
    let bl = lum(-1.0, 1.0);
    let b = lum(0.0, 1.0);
    let br = lum(1.0, 1.0);

    let gx = (tr + 2.0 * r + br) - (tl + 2.0 * l + bl);
    let gy = (bl + 2.0 * b + br) - (tl + 2.0 * t + tr);
    (gx * gx + gy * gy).sqrt()
}

#[inline]
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Per-cell image features for one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSample {
    /// This channel's ink coverage in the input
    pub coverage: f32,
    pub brightness: f32,
    pub edge: f32,
}

impl ImageSample {
    pub fn read(image: &Texture, channel: Channel, uv: [f32; 2], step: [f32; 2]) -> Self {
        let s = image.sample(uv[0], uv[1]);
        let rgb = [s[0], s[1], s[2]];
        Self {
            coverage: rgb_to_cmyk(rgb)[channel.index()],
            brightness: luminance(rgb),
            edge: sobel_edge(image, uv, step),
        }
    }
}

/// Influence weights applied to the image features. Either may be negative.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Influence {
    pub brightness: f32,
    pub edge: f32,
}

/// Map value in the feed/kill ranges, before the rate perturbations
pub fn map_value(sample: &ImageSample, influence: Influence) -> f32 {
    let v = mix(sample.coverage, 1.0, sample.brightness * influence.brightness);
    mix(v, 1.0, sample.edge * influence.edge)
}

/// Feed and kill for one cell.
///
/// `noise` is the raw noise value in [-1, 1]; it is scaled by
/// `noise_strength` once for the displacement and again for the blend.
pub fn rates(
    feed_range: [f32; 2],
    kill_range: [f32; 2],
    sample: &ImageSample,
    influence: Influence,
    noise: f32,
    noise_strength: f32,
) -> (f32, f32) {
    let map = map_value(sample, influence);
    let mut feed = mix(feed_range[0], feed_range[1], map);
    let mut kill = mix(kill_range[0], kill_range[1], map);

    feed = mix(feed, feed * (1.0 - sample.brightness), influence.brightness);
    kill = mix(kill, kill * (1.0 + sample.brightness), influence.brightness);

    feed = mix(feed, feed * (1.0 - sample.edge), influence.edge);
    kill = mix(kill, kill * (1.0 + sample.edge), influence.edge);

    let n = noise * noise_strength;
    feed = mix(feed, feed * (1.0 - n), noise_strength);
    kill = mix(kill, kill * (1.0 + n), noise_strength);

    (feed, kill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::FilterMode;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_cmyk_primaries() {
        assert_eq!(rgb_to_cmyk([1.0, 1.0, 1.0]), [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(rgb_to_cmyk([0.0, 0.0, 0.0]), [0.0, 0.0, 0.0, 1.0]);
        let red = rgb_to_cmyk([1.0, 0.0, 0.0]);
        assert_eq!(red, [0.0, 1.0, 1.0, 0.0]);
        let grey = rgb_to_cmyk([0.5, 0.5, 0.5]);
        assert!(close(grey[3], 0.5) && close(grey[0], 0.0));
    }

    #[test]
    fn test_edge_on_flat_and_step_images() {
        let mut flat = Texture::new(8, 8, FilterMode::Nearest);
        flat.fill([128, 128, 128, 255]);
        assert!(close(sobel_edge(&flat, [0.5, 0.5], [0.125, 0.125]), 0.0));

        let mut step = Texture::new(8, 8, FilterMode::Nearest);
        for y in 0..8 {
            for x in 4..8 {
                step.set_pixel(x, y, [255, 255, 255, 255]);
            }
        }
        // Centre of column 3, right beside the step
        let edge = sobel_edge(&step, [3.5 / 8.0, 0.5], [0.125, 0.125]);
        assert!(close(edge, 4.0), "edge = {}", edge);
    }

    #[test]
    fn test_rates_without_influence_follow_coverage() {
        let sample = ImageSample {
            coverage: 0.25,
            brightness: 0.8,
            edge: 0.3,
        };
        let (feed, kill) = rates([0.0, 0.4], [0.1, 0.5], &sample, Influence::default(), 0.7, 0.0);
        assert!(close(feed, 0.1));
        assert!(close(kill, 0.2));
    }

    #[test]
    fn test_brightness_influence_lowers_feed() {
        let sample = ImageSample {
            coverage: 0.0,
            brightness: 0.5,
            edge: 0.0,
        };
        let influence = Influence {
            brightness: 1.0,
            edge: 0.0,
        };
        // map -> 0.5, feed 0.02 -> halved, kill 0.06 -> x1.5
        let (feed, kill) = rates([0.0, 0.04], [0.04, 0.08], &sample, influence, 0.0, 0.0);
        assert!(close(feed, 0.01));
        assert!(close(kill, 0.09));
    }

    #[test]
    fn test_noise_displaces_rates_by_strength() {
        let sample = ImageSample {
            coverage: 0.5,
            brightness: 0.0,
            edge: 0.0,
        };
        let none = Influence::default();
        // Base rates: feed 0.04, kill 0.06; n = noise * strength = 0.2
        let (feed, kill) = rates([0.02, 0.06], [0.04, 0.08], &sample, none, 0.5, 0.4);
        assert!(close(feed, mix(0.04, 0.04 * 0.8, 0.4)), "feed = {}", feed);
        assert!(close(kill, mix(0.06, 0.06 * 1.2, 0.4)), "kill = {}", kill);
        assert!(close(feed, 0.0368) && close(kill, 0.0648));

        // Negative noise moves the other way
        let (feed, kill) = rates([0.02, 0.06], [0.04, 0.08], &sample, none, -0.5, 0.4);
        assert!(close(feed, 0.0432));
        assert!(close(kill, 0.0552));
    }

    #[test]
    fn test_edge_influence_shapes_rates() {
        let sample = ImageSample {
            coverage: 0.0,
            brightness: 0.0,
            edge: 0.5,
        };
        let influence = Influence {
            brightness: 0.0,
            edge: 1.0,
        };
        // map -> 0.5, feed 0.02 halved, kill 0.06 x1.5
        let (feed, kill) = rates([0.0, 0.04], [0.04, 0.08], &sample, influence, 0.0, 0.0);
        assert!(close(feed, 0.01));
        assert!(close(kill, 0.09));
    }

    #[test]
    fn test_negative_edge_influence_inverts_effect() {
        let sample = ImageSample {
            coverage: 0.5,
            brightness: 0.0,
            edge: 0.4,
        };
        let neutral = rates([0.0, 0.1], [0.0, 0.1], &sample, Influence::default(), 0.0, 0.0);
        assert!(close(neutral.0, 0.05) && close(neutral.1, 0.05));

        let inverted = Influence {
            brightness: 0.0,
            edge: -0.5,
        };
        // map -> 0.4; feed 0.04 -> 0.048, kill 0.04 -> 0.032
        let (feed, kill) = rates([0.0, 0.1], [0.0, 0.1], &sample, inverted, 0.0, 0.0);
        assert!(close(map_value(&sample, inverted), 0.4));
        assert!(close(feed, 0.048), "feed = {}", feed);
        assert!(close(kill, 0.032), "kill = {}", kill);
    }

    #[test]
    fn test_read_picks_channel_coverage() {
        let mut image = Texture::new(4, 4, FilterMode::Nearest);
        image.fill([255, 0, 255, 255]);
        let step = [0.25, 0.25];

        let magenta = ImageSample::read(&image, Channel::Magenta, [0.5, 0.5], step);
        let cyan = ImageSample::read(&image, Channel::Cyan, [0.5, 0.5], step);
        assert!(close(magenta.coverage, 1.0));
        assert!(close(cyan.coverage, 0.0));
        assert!(close(magenta.brightness, 0.299 + 0.114));
        assert!(close(magenta.edge, 0.0));

        // Full coverage puts magenta at the top of its ranges
        let (feed, kill) = rates([0.01, 0.05], [0.06, 0.07], &magenta, Influence::default(), 0.0, 0.0);
        assert!(close(feed, 0.05) && close(kill, 0.07));
        let (feed, _) = rates([0.01, 0.05], [0.06, 0.07], &cyan, Influence::default(), 0.0, 0.0);
        assert!(close(feed, 0.01));
    }
}
