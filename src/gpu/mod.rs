//! Rendering context
//!
//! A small device model: an arena of RGBA8 textures addressed by integer
//! handles, and a `draw` call that runs a fragment program over one target
//! while sampling others. Rows of the target are shaded in parallel; from the
//! caller's side a draw is a single ordered command.

mod program;
mod texture;

pub use program::{require_samplers, BuildState, Fragment, FragmentProgram, ProgramSlot};
pub use texture::{FilterMode, Lerp, Texture};

use log::trace;
use rayon::prelude::*;

use crate::error::EngineError;

/// Handle to a texture owned by a `RenderContext`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(u32);

/// What programs and textures may ask of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_samplers: usize,
    pub max_texture_size: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_samplers: 16,
            max_texture_size: 8192,
        }
    }
}

pub struct RenderContext {
    limits: DeviceLimits,
    slots: Vec<Option<Texture>>,
    free: Vec<u32>,
}

impl RenderContext {
    pub fn new(limits: DeviceLimits) -> Self {
        Self {
            limits,
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    /// Allocate a texture and return its handle. Freed slots are reused.
    pub fn create_texture(&mut self, width: u32, height: u32, filter: FilterMode) -> TextureId {
        let texture = Texture::new(width, height, filter);
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(texture);
            TextureId(index)
        } else {
            self.slots.push(Some(texture));
            TextureId(self.slots.len() as u32 - 1)
        }
    }

    /// Reallocate storage if the dimensions differ. Returns true when the
    /// texture was reallocated (its contents are then zeroed).
    pub fn reserve(&mut self, id: TextureId, width: u32, height: u32) -> Result<bool, EngineError> {
        let max = self.limits.max_texture_size;
        if width > max || height > max {
            return Err(EngineError::TextureTooLarge { width, height, max });
        }
        let texture = self.texture_mut(id)?;
        if texture.width() == width.max(1) && texture.height() == height.max(1) {
            return Ok(false);
        }
        *texture = Texture::new(width, height, texture.filter());
        Ok(true)
    }

    /// Replace the contents (and size) of a texture with RGBA bytes
    pub fn upload(&mut self, id: TextureId, width: u32, height: u32, rgba: &[u8]) -> Result<(), EngineError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(EngineError::InvalidInputDimensions {
                width: i64::from(width),
                height: i64::from(height),
            });
        }
        let texture = self.texture_mut(id)?;
        let filter = texture.filter();
        let mut fresh = Texture::new(width, height, filter);
        fresh.as_bytes_mut().copy_from_slice(rgba);
        *texture = fresh;
        Ok(())
    }

    pub fn set_filter(&mut self, id: TextureId, filter: FilterMode) -> Result<(), EngineError> {
        self.texture_mut(id)?.set_filter(filter);
        Ok(())
    }

    pub fn texture(&self, id: TextureId) -> Result<&Texture, EngineError> {
        self.slots
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(EngineError::MissingTexture(id))
    }

    pub fn texture_mut(&mut self, id: TextureId) -> Result<&mut Texture, EngineError> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(EngineError::MissingTexture(id))
    }

    pub fn release(&mut self, id: TextureId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            if slot.take().is_some() {
                self.free.push(id.0);
            }
        }
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Run `program` over every texel of `target`, sampling `bindings` in order.
    ///
    /// The target is detached from the arena for the duration of the draw, so
    /// a program can never observe the texture it is writing.
    pub fn draw<P>(&mut self, program: &P, target: TextureId, bindings: &[TextureId]) -> Result<(), EngineError>
    where
        P: FragmentProgram,
    {
        if bindings.contains(&target) {
            return Err(EngineError::FeedbackLoop);
        }
        let mut out = self
            .slots
            .get_mut(target.0 as usize)
            .and_then(Option::take)
            .ok_or(EngineError::MissingTexture(target))?;

        let result = self.shade_into(program, &mut out, bindings);
        self.slots[target.0 as usize] = Some(out);
        result
    }

    fn shade_into<P>(&self, program: &P, out: &mut Texture, bindings: &[TextureId]) -> Result<(), EngineError>
    where
        P: FragmentProgram,
    {
        let samplers = bindings
            .iter()
            .map(|&id| self.texture(id))
            .collect::<Result<Vec<_>, _>>()?;

        let width = out.width() as usize;
        let texel = [1.0 / out.width() as f32, 1.0 / out.height() as f32];
        trace!("draw '{}' {}x{}", P::NAME, out.width(), out.height());

        out.as_bytes_mut()
            .par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    let frag = Fragment {
                        x: x as u32,
                        y: y as u32,
                        uv: [(x as f32 + 0.5) * texel[0], (y as f32 + 0.5) * texel[1]],
                        texel,
                    };
                    px.copy_from_slice(&program.shade(&frag, &samplers));
                }
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Copies the bound texture, adding one to every byte
    #[derive(Default)]
    struct Increment;

    impl FragmentProgram for Increment {
        const NAME: &'static str = "increment";
        const SAMPLERS: usize = 1;

        fn shade(&self, frag: &Fragment, samplers: &[&Texture]) -> [u8; 4] {
            let t = samplers[0].texel(frag.x as i32, frag.y as i32);
            t.map(|b| b.wrapping_add(1))
        }
    }

    #[test]
    fn test_draw_reads_source_and_writes_target() {
        let mut ctx = RenderContext::new(DeviceLimits::default());
        let src = ctx.create_texture(3, 2, FilterMode::Nearest);
        let dst = ctx.create_texture(3, 2, FilterMode::Nearest);
        ctx.draw(&Increment, dst, &[src]).unwrap();
        assert!(ctx.texture(dst).unwrap().as_bytes().iter().all(|&b| b == 1));
        assert!(ctx.texture(src).unwrap().as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_draw_rejects_feedback_loop() {
        let mut ctx = RenderContext::new(DeviceLimits::default());
        let tex = ctx.create_texture(2, 2, FilterMode::Nearest);
        assert_eq!(ctx.draw(&Increment, tex, &[tex]), Err(EngineError::FeedbackLoop));
        // Target survives the rejected draw
        assert!(ctx.texture(tex).is_ok());
    }

    #[test]
    fn test_released_slots_are_reused() {
        let mut ctx = RenderContext::new(DeviceLimits::default());
        let a = ctx.create_texture(1, 1, FilterMode::Linear);
        let _b = ctx.create_texture(1, 1, FilterMode::Linear);
        ctx.release(a);
        assert!(ctx.texture(a).is_err());
        let c = ctx.create_texture(4, 4, FilterMode::Linear);
        assert_eq!(a, c);
        assert_eq!(ctx.texture_count(), 2);
    }

    #[test]
    fn test_reserve_only_reallocates_on_change() {
        let mut ctx = RenderContext::new(DeviceLimits::default());
        let tex = ctx.create_texture(4, 4, FilterMode::Linear);
        assert!(!ctx.reserve(tex, 4, 4).unwrap());
        assert!(ctx.reserve(tex, 8, 2).unwrap());
        assert_eq!(ctx.texture(tex).unwrap().width(), 8);
        assert!(matches!(
            ctx.reserve(tex, 100_000, 2),
            Err(EngineError::TextureTooLarge { .. })
        ));
    }
}
