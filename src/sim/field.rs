//! Double-buffered field storage for one channel

use crate::error::EngineError;
use crate::gpu::{FilterMode, RenderContext, TextureId};

/// Two same-sized textures whose roles alternate every iteration.
///
/// The kernel always samples `previous()` and renders into `current()`;
/// calling `swap()` once before each iteration is what keeps those two
/// distinct.
pub struct Field {
    current: TextureId,
    previous: TextureId,
    width: u32,
    height: u32,
    needs_init: bool,
}

impl Field {
    /// Allocate a 1x1 field that still needs seeding
    pub fn new(ctx: &mut RenderContext) -> Self {
        Self {
            current: ctx.create_texture(1, 1, FilterMode::Linear),
            previous: ctx.create_texture(1, 1, FilterMode::Linear),
            width: 1,
            height: 1,
            needs_init: true,
        }
    }

    /// Make both buffers `width` x `height`. A no-op when nothing changed;
    /// otherwise storage is reallocated and the field is marked for seeding.
    /// Returns whether a reallocation happened.
    pub fn reserve(&mut self, ctx: &mut RenderContext, width: u32, height: u32) -> Result<bool, EngineError> {
        let width = width.max(1);
        let height = height.max(1);
        if width == self.width && height == self.height {
            return Ok(false);
        }
        ctx.reserve(self.current, width, height)?;
        ctx.reserve(self.previous, width, height)?;
        self.width = width;
        self.height = height;
        self.needs_init = true;
        Ok(true)
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }

    #[inline]
    pub fn current(&self) -> TextureId {
        self.current
    }

    #[inline]
    pub fn previous(&self) -> TextureId {
        self.previous
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn needs_init(&self) -> bool {
        self.needs_init
    }

    pub fn mark_initialized(&mut self) {
        self.needs_init = false;
    }

    pub fn set_filter(&self, ctx: &mut RenderContext, filter: FilterMode) -> Result<(), EngineError> {
        ctx.set_filter(self.current, filter)?;
        ctx.set_filter(self.previous, filter)
    }

    /// Return both buffers to the context
    pub fn release(self, ctx: &mut RenderContext) {
        ctx.release(self.current);
        ctx.release(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::DeviceLimits;

    #[test]
    fn test_swap_exchanges_roles() {
        let mut ctx = RenderContext::new(DeviceLimits::default());
        let mut field = Field::new(&mut ctx);
        let (cur, prev) = (field.current(), field.previous());
        assert_ne!(cur, prev);
        field.swap();
        assert_eq!(field.current(), prev);
        assert_eq!(field.previous(), cur);
    }

    #[test]
    fn test_reserve_is_idempotent() {
        let mut ctx = RenderContext::new(DeviceLimits::default());
        let mut field = Field::new(&mut ctx);
        assert!(field.reserve(&mut ctx, 8, 6).unwrap());
        field.mark_initialized();
        assert!(!field.reserve(&mut ctx, 8, 6).unwrap());
        assert!(!field.needs_init());

        assert!(field.reserve(&mut ctx, 9, 6).unwrap());
        assert!(field.needs_init());
        assert_eq!(ctx.texture(field.current()).unwrap().width(), 9);
        assert_eq!(ctx.texture(field.previous()).unwrap().width(), 9);
    }

    #[test]
    fn test_release_returns_storage() {
        let mut ctx = RenderContext::new(DeviceLimits::default());
        let field = Field::new(&mut ctx);
        assert_eq!(ctx.texture_count(), 2);
        field.release(&mut ctx);
        assert_eq!(ctx.texture_count(), 0);
    }
}
