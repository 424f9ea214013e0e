use rayon::prelude::*;

// ============================================================================
// Utility Functions
// ============================================================================

/// Write ABGR pixel to slice (RGBA8888 little-endian byte order)
#[inline]
fn write_pixel(dest: &mut [u8], r: u8, g: u8, b: u8) {
    dest[0] = 255; // A
    dest[1] = b; // B
    dest[2] = g; // G
    dest[3] = r; // R
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// Host-side framebuffer in the window texture's byte order
pub struct PixelBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![0; (width * height * 4) as usize],
            width,
            height,
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
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * 4) as usize
    }

    /// Clear to a solid color
    pub fn clear(&mut self, r: u8, g: u8, b: u8) {
        for px in self.pixels.chunks_exact_mut(4) {
            write_pixel(px, r, g, b);
        }
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, r: u8, g: u8, b: u8) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            write_pixel(&mut self.pixels[idx..idx + 4], r, g, b);
        }
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<(u8, u8, u8)> {
        if !self.in_bounds(x, y) {
            return None;
        }
        let idx = self.pixel_index(x as u32, y as u32);
        Some((self.pixels[idx + 3], self.pixels[idx + 2], self.pixels[idx + 1]))
    }

    /// Copy a same-sized image stored as RGBA bytes. Alpha is forced opaque.
    pub fn copy_from_rgba(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<(), String> {
        if width != self.width || height != self.height || rgba.len() != self.pixels.len() {
            return Err(format!(
                "cannot copy {}x{} image into {}x{} buffer",
                width, height, self.width, self.height
            ));
        }
        self.pixels
            .par_chunks_exact_mut(4)
            .zip(rgba.par_chunks_exact(4))
            .for_each(|(dst, src)| write_pixel(dst, src[0], src[1], src[2]));
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixels_are_abgr() {
        let mut buffer = PixelBuffer::with_size(2, 2);
        buffer.set_pixel(1, 0, 10, 20, 30);
        assert_eq!(&buffer.as_bytes()[4..8], &[255, 30, 20, 10]);
        assert_eq!(buffer.get_pixel(1, 0), Some((10, 20, 30)));
        assert_eq!(buffer.get_pixel(2, 0), None);
    }

    #[test]
    fn test_copy_from_rgba() {
        let mut buffer = PixelBuffer::with_size(2, 1);
        buffer.copy_from_rgba(2, 1, &[1, 2, 3, 0, 4, 5, 6, 9]).unwrap();
        assert_eq!(buffer.as_bytes(), &[255, 3, 2, 1, 255, 6, 5, 4]);
        assert!(buffer.copy_from_rgba(1, 1, &[0; 4]).is_err());
    }

    #[test]
    fn test_clear() {
        let mut buffer = PixelBuffer::with_size(3, 3);
        buffer.clear(255, 255, 255);
        assert!(buffer.as_bytes().iter().all(|&b| b == 255));
    }
}
