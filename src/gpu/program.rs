//! Fragment programs and their build lifecycle

use log::{debug, error, info};

use super::{DeviceLimits, Texture};
use crate::error::EngineError;

/// Per-fragment inputs handed to a program
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub x: u32,
    pub y: u32,
    /// Normalized coordinate of the texel centre, row 0 at the top
    pub uv: [f32; 2],
    /// Size of one target texel in normalized units
    pub texel: [f32; 2],
}

/// A per-pixel program executed over a whole render target.
///
/// Programs carry their uniforms as plain fields that the owner updates
/// between draws; `shade` only ever sees shared references, so one draw can
/// fan out across threads.
pub trait FragmentProgram: Sync {
    /// Name used in logs and build errors
    const NAME: &'static str;
    /// Number of textures the program samples
    const SAMPLERS: usize;

    /// Build the program for a device. The default only checks sampler count.
    fn build(limits: &DeviceLimits) -> Result<Self, EngineError>
    where
        Self: Sized + Default,
    {
        require_samplers(Self::NAME, Self::SAMPLERS, limits)?;
        Ok(Self::default())
    }

    fn shade(&self, frag: &Fragment, samplers: &[&Texture]) -> [u8; 4];
}

pub fn require_samplers(
    program: &'static str,
    needed: usize,
    limits: &DeviceLimits,
) -> Result<(), EngineError> {
    if needed > limits.max_samplers {
        return Err(EngineError::ResourceBuildFailure {
            program,
            reason: format!(
                "needs {} samplers, device offers {}",
                needed, limits.max_samplers
            ),
        });
    }
    Ok(())
}

/// Lifecycle of one program
#[derive(Debug)]
pub enum BuildState<P> {
    Unbuilt,
    Building,
    Ready(P),
    Failed(String),
}

/// Owns one program and advances its build one step per `poll`
pub struct ProgramSlot<P> {
    state: BuildState<P>,
}

impl<P> ProgramSlot<P>
where
    P: FragmentProgram + Default,
{
    pub fn new() -> Self {
        Self {
            state: BuildState::Unbuilt,
        }
    }

    /// Advance the build. Ready and failed slots are left alone, so a failed
    /// program is reported exactly once.
    pub fn poll(&mut self, limits: &DeviceLimits) {
        match self.state {
            BuildState::Unbuilt => {
                debug!("building '{}' program", P::NAME);
                self.state = BuildState::Building;
            },
            BuildState::Building => {
                self.state = match P::build(limits) {
                    Ok(program) => {
                        info!("'{}' program ready", P::NAME);
                        BuildState::Ready(program)
                    },
                    Err(e) => {
                        error!("{}", e);
                        BuildState::Failed(e.to_string())
                    },
                };
            },
            BuildState::Ready(_) | BuildState::Failed(_) => {},
        }
    }

    pub fn get(&self) -> Option<&P> {
        match &self.state {
            BuildState::Ready(p) => Some(p),
            _ => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut P> {
        match &mut self.state {
            BuildState::Ready(p) => Some(p),
            _ => None,
        }
    }

    pub fn state(&self) -> &BuildState<P> {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, BuildState::Ready(_))
    }
}

impl<P> Default for ProgramSlot<P>
where
    P: FragmentProgram + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Greedy;

    impl FragmentProgram for Greedy {
        const NAME: &'static str = "greedy";
        const SAMPLERS: usize = 64;

        fn shade(&self, _frag: &Fragment, _samplers: &[&Texture]) -> [u8; 4] {
            [0; 4]
        }
    }

    #[test]
    fn test_slot_becomes_ready_on_second_poll() {
        let limits = DeviceLimits {
            max_samplers: 64,
            ..DeviceLimits::default()
        };
        let mut slot: ProgramSlot<Greedy> = ProgramSlot::new();
        slot.poll(&limits);
        assert!(matches!(slot.state(), BuildState::Building));
        slot.poll(&limits);
        assert!(slot.is_ready());
    }

    #[test]
    fn test_slot_failure_is_sticky() {
        let limits = DeviceLimits::default();
        let mut slot: ProgramSlot<Greedy> = ProgramSlot::new();
        for _ in 0..5 {
            slot.poll(&limits);
        }
        assert!(matches!(slot.state(), BuildState::Failed(_)));
        assert!(slot.get().is_none());
    }
}
