//! RGBA8 texture storage and sampling
//!
//! Addressing is always clamp-to-edge. Sampling follows the usual texel-centre
//! convention: texel `i` covers `[i, i + 1) / size` and its centre sits at
//! `(i + 0.5) / size`, so sampling a centre returns that texel exactly under
//! either filter.

/// How a texture is read between texel centres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Linear,
    Nearest,
}

/// A texture stored as RGBA pixels
#[derive(Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    filter: FilterMode,
    pixels: Vec<u8>, // RGBA format, 4 bytes per pixel
}

impl Texture {
    /// Create a zero-filled texture. Dimensions are raised to at least 1x1.
    pub fn new(width: u32, height: u32, filter: FilterMode) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            filter,
            pixels: vec![0; (width * height * 4) as usize],
        }
    }

    /// Create texture from raw RGBA data
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if width > 0 && height > 0 && data.len() == (width * height * 4) as usize {
            Some(Self {
                width,
                height,
                filter: FilterMode::Linear,
                pixels: data,
            })
        } else {
            None
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    pub fn set_filter(&mut self, filter: FilterMode) {
        self.filter = filter;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Set a pixel in the texture
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x < self.width && y < self.height {
            let idx = ((y * self.width + x) * 4) as usize;
            self.pixels[idx..idx + 4].copy_from_slice(&rgba);
        }
    }

    /// Fill every texel with the same value
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Raw texel fetch with clamp-to-edge addressing
    #[inline]
    pub fn texel(&self, tx: i32, ty: i32) -> [u8; 4] {
        let x = tx.clamp(0, self.width as i32 - 1) as u32;
        let y = ty.clamp(0, self.height as i32 - 1) as u32;
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Texel fetch returning normalized components
    #[inline]
    pub fn texel_f32(&self, tx: i32, ty: i32) -> [f32; 4] {
        let t = self.texel(tx, ty);
        [
            t[0] as f32 / 255.0,
            t[1] as f32 / 255.0,
            t[2] as f32 / 255.0,
            t[3] as f32 / 255.0,
        ]
    }

    /// Sample with UV coordinates using the texture's own filter mode.
    /// Returns normalized RGBA.
    pub fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        match self.filter {
            FilterMode::Nearest => {
                let x = (u * self.width as f32).floor() as i32;
                let y = (v * self.height as f32).floor() as i32;
                self.texel_f32(x, y)
            },
            FilterMode::Linear => self.sample_with(u, v, |x, y| self.texel_f32(x, y)),
        }
    }

    /// Bilinear blend of an arbitrary per-texel function.
    ///
    /// Used where texels must be transformed before they are filtered, such as
    /// encoded fields that only make sense once decoded.
    pub fn sample_with<T, F>(&self, u: f32, v: f32, fetch: F) -> T
    where
        T: Lerp,
        F: Fn(i32, i32) -> T,
    {
        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i32, y0 as i32);

        let top = fetch(x0, y0).lerp(fetch(x0 + 1, y0), tx);
        let bottom = fetch(x0, y0 + 1).lerp(fetch(x0 + 1, y0 + 1), tx);
        top.lerp(bottom, ty)
    }
}

/// Values that can be linearly interpolated by the bilinear sampler
pub trait Lerp: Copy {
    fn lerp(self, other: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl<const N: usize> Lerp for [f32; N] {
    #[inline]
    fn lerp(self, other: Self, t: f32) -> Self {
        let mut out = self;
        for (o, b) in out.iter_mut().zip(other) {
            *o += (b - *o) * t;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> Texture {
        // 2x1: black | white
        Texture::from_rgba(2, 1, vec![0, 0, 0, 255, 255, 255, 255, 255]).unwrap()
    }

    #[test]
    fn test_texel_clamps_to_edge() {
        let tex = gradient();
        assert_eq!(tex.texel(-5, 0), [0, 0, 0, 255]);
        assert_eq!(tex.texel(7, 3), [255, 255, 255, 255]);
    }

    #[test]
    fn test_linear_sample_at_centres_is_exact() {
        let tex = gradient();
        assert_eq!(tex.sample(0.25, 0.5)[0], 0.0);
        assert_eq!(tex.sample(0.75, 0.5)[0], 1.0);
        assert!((tex.sample(0.5, 0.5)[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_sample_snaps() {
        let mut tex = gradient();
        tex.set_filter(FilterMode::Nearest);
        assert_eq!(tex.sample(0.49, 0.5)[0], 0.0);
        assert_eq!(tex.sample(0.51, 0.5)[0], 1.0);
    }

    #[test]
    fn test_from_rgba_rejects_bad_lengths() {
        assert!(Texture::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(Texture::from_rgba(0, 2, Vec::new()).is_none());
    }
}
