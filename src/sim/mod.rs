//! Reaction-diffusion engine
//!
//! Four Gray-Scott systems (cyan, magenta, yellow, key) stepped on a shared
//! grid and composited into one subtractive image. All state lives in a
//! `RenderContext`; the host hands in a read-only `Settings` each frame.
//!
//! Per frame: `update` sizes the grid, reseeds if needed, asks the pacing
//! controller for an iteration budget and steps each channel in turn; `render`
//! composites the current buffers.

mod codec;
mod compositor;
mod field;
mod kernel;
mod modulation;
mod pacing;
mod params;
mod resources;
mod seed;

pub use compositor::{ChannelViewProgram, CompositeProgram, Letterbox};
pub use field::Field;
pub use kernel::{BrushStamp, ParameterMapProgram, UpdateProgram};
pub use modulation::Influence;
pub use pacing::Pacing;
pub use params::{Channel, ParameterTuple, PresetRegistry, DEFAULT_PRESET};
pub use resources::GridPlan;
pub use seed::SeedProgram;

use std::collections::HashSet;

use log::{debug, info, trace, warn};

use crate::error::EngineError;
use crate::gpu::{DeviceLimits, FilterMode, ProgramSlot, RenderContext, Texture, TextureId};
use crate::input::Brush;
use crate::settings::{ChannelPresets, InitState, Interface, Settings, View};

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No output size yet
    Idle,
    /// Fields must be seeded before the next iteration
    NeedsReset,
    Running,
}

/// Settings whose change invalidates the running pattern
#[derive(Debug, Clone, PartialEq)]
struct Structure {
    interface: Interface,
    init_state: InitState,
    per_channel: bool,
    channel_presets: ChannelPresets,
}

impl Structure {
    fn of(settings: &Settings) -> Self {
        Self {
            interface: settings.interface,
            init_state: settings.init_state,
            per_channel: settings.per_channel,
            channel_presets: settings.channel_presets.clone(),
        }
    }
}

pub struct Engine {
    ctx: RenderContext,
    fields: Vec<Field>,
    input: TextureId,
    input_size: (u32, u32),
    output: TextureId,

    seed: ProgramSlot<SeedProgram>,
    update: ProgramSlot<UpdateProgram>,
    map: ProgramSlot<ParameterMapProgram>,
    composite: ProgramSlot<CompositeProgram>,
    channel_view: ProgramSlot<ChannelViewProgram>,

    presets: PresetRegistry,
    pacing: Pacing,
    state: EngineState,
    structure: Option<Structure>,
    target: (u32, u32),
    iteration: u64,
    noise_time: f32,
    warned: HashSet<String>,
}

impl Engine {
    pub fn new(limits: DeviceLimits) -> Self {
        let mut ctx = RenderContext::new(limits);
        let fields = Channel::ALL.iter().map(|_| Field::new(&mut ctx)).collect();

        // Opaque black until the first frame arrives
        let input = ctx.create_texture(1, 1, FilterMode::Linear);
        if let Ok(texture) = ctx.texture_mut(input) {
            texture.fill([0, 0, 0, 255]);
        }
        let output = ctx.create_texture(1, 1, FilterMode::Nearest);

        Self {
            ctx,
            fields,
            input,
            input_size: (1, 1),
            output,
            seed: ProgramSlot::new(),
            update: ProgramSlot::new(),
            map: ProgramSlot::new(),
            composite: ProgramSlot::new(),
            channel_view: ProgramSlot::new(),
            presets: PresetRegistry::builtin(),
            pacing: Pacing::new(),
            state: EngineState::Idle,
            structure: None,
            target: (0, 0),
            iteration: 0,
            noise_time: 0.0,
            warned: HashSet::new(),
        }
    }

    pub fn with_presets(mut self, presets: PresetRegistry) -> Self {
        self.presets = presets;
        self
    }

    pub fn set_presets(&mut self, presets: PresetRegistry) {
        self.presets = presets;
    }

    pub fn presets(&self) -> &PresetRegistry {
        &self.presets
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Kernel steps taken by each channel since the last reset
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn noise_time(&self) -> f32 {
        self.noise_time
    }

    pub fn field_dimensions(&self) -> (u32, u32) {
        self.fields
            .first()
            .map_or((0, 0), |f| (f.width(), f.height()))
    }

    pub fn input_dimensions(&self) -> (u32, u32) {
        self.input_size
    }

    // ========================================================================
    // Host-facing controls
    // ========================================================================

    /// Output surface size. A zero dimension parks the engine.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == self.target {
            return;
        }
        self.target = (width, height);
        if width == 0 || height == 0 {
            debug!("output collapsed to {}x{}, idling", width, height);
            self.state = EngineState::Idle;
            return;
        }
        info!("output resized to {}x{}", width, height);
        if self.state == EngineState::Idle {
            self.state = EngineState::NeedsReset;
        }
    }

    /// Reseed every channel on the next update
    pub fn restart(&mut self) {
        self.iteration = 0;
        self.pacing.reset();
        if self.state != EngineState::Idle {
            self.state = EngineState::NeedsReset;
        }
    }

    /// Replace the input image. On bad dimensions the previous image stays
    /// bound and the error is returned (and logged once).
    pub fn upload_input(&mut self, width: i32, height: i32, rgba: &[u8]) -> Result<(), EngineError> {
        let result = if width <= 0 || height <= 0 {
            Err(EngineError::InvalidInputDimensions {
                width: i64::from(width),
                height: i64::from(height),
            })
        } else {
            self.ctx.upload(self.input, width as u32, height as u32, rgba)
        };
        match result {
            Ok(()) => {
                self.input_size = (width as u32, height as u32);
                Ok(())
            },
            Err(e) => {
                self.warn_once(&e);
                Err(e)
            },
        }
    }

    /// Advance every program build by one step
    pub fn poll_programs(&mut self) {
        let limits = *self.ctx.limits();
        self.seed.poll(&limits);
        self.update.poll(&limits);
        self.map.poll(&limits);
        self.composite.poll(&limits);
        self.channel_view.poll(&limits);
    }

    // ========================================================================
    // Per-frame work
    // ========================================================================

    /// Run this frame's simulation step. Returns the number of iterations
    /// each channel advanced, zero when the frame was skipped.
    pub fn update(&mut self, settings: &Settings, brush: &Brush, now_ms: f64) -> Result<u32, EngineError> {
        self.poll_programs();
        if !self.prepare(settings)? {
            return Ok(0);
        }

        let total = self.pacing.next_iteration_count(now_ms, settings.speed);
        if total == 0 {
            return Ok(0);
        }
        let per_channel = pacing::per_channel(total);

        let ready = match settings.interface {
            Interface::Image => self.update.is_ready(),
            Interface::ParameterMap => self.map.is_ready(),
        };
        if !ready {
            return Ok(0);
        }

        self.noise_time += settings.noise_speed;
        for channel in Channel::ALL {
            self.step_channel(channel, per_channel, settings, brush)?;
        }
        self.iteration += u64::from(per_channel);
        trace!("frame: {} iterations per channel, total {}", per_channel, self.iteration);
        Ok(per_channel)
    }

    /// Size the grid and seed it if required. Returns true once the fields
    /// hold a running pattern.
    pub fn prepare(&mut self, settings: &Settings) -> Result<bool, EngineError> {
        if self.state == EngineState::Idle {
            return Ok(false);
        }

        for err in self.presets.unknown_names(settings) {
            self.warn_once(&err);
        }

        let structure = Structure::of(settings);
        if self.structure.as_ref().is_some_and(|s| *s != structure) {
            debug!("structural settings changed, reseeding");
            self.state = EngineState::NeedsReset;
        }
        self.structure = Some(structure);

        let plan = resources::plan(self.target, self.input_size, settings.interface, settings.chunkiness);
        match resources::allocate(&mut self.ctx, &mut self.fields, plan) {
            Ok(true) => {
                info!("grid resized to {}x{} ({:?})", plan.width, plan.height, plan.filter);
                self.state = EngineState::NeedsReset;
            },
            Ok(false) => {},
            Err(e @ EngineError::TextureTooLarge { .. }) => {
                self.warn_once(&e);
                return Ok(false);
            },
            Err(e) => return Err(e),
        }

        if self.state == EngineState::NeedsReset {
            self.iteration = 0;
            if !self.reseed(settings.init_state)? {
                return Ok(false);
            }
            self.state = EngineState::Running;
        }
        Ok(true)
    }

    /// Write the base pattern into the current buffer of every channel.
    /// Returns false while the seed program is not built.
    fn reseed(&mut self, init_state: InitState) -> Result<bool, EngineError> {
        let Some(program) = self.seed.get_mut() else {
            trace!("seed program not ready, reset deferred");
            return Ok(false);
        };
        let (width, height) = self.fields.first().map_or((1, 1), |f| (f.width(), f.height()));
        program.starter = init_state == InitState::Starter;
        program.aspect = width as f32 / height as f32;

        for field in &mut self.fields {
            self.ctx.draw(&*program, field.current(), &[])?;
            field.mark_initialized();
        }
        info!("seeded {} channels at {}x{} ({:?})", self.fields.len(), width, height, init_state);
        Ok(true)
    }

    /// Run `count` kernel iterations on one channel. Skips silently when the
    /// kernel for the current interface is not built.
    pub fn step_channel(
        &mut self,
        channel: Channel,
        count: u32,
        settings: &Settings,
        brush: &Brush,
    ) -> Result<(), EngineError> {
        let params = self.presets.resolve(channel, settings);
        let field = &mut self.fields[channel.index()];
        let (width, height) = (field.width(), field.height());

        match settings.interface {
            Interface::Image => {
                let Some(program) = self.update.get_mut() else {
                    return Ok(());
                };
                let letterbox = Letterbox::fit((width, height), self.target, settings.zoom);
                program.channel = Some(channel);
                program.params = params;
                program.diffuse_scale = settings.diffuse_scale;
                program.influence = Influence {
                    brightness: settings.brightness_influence,
                    edge: settings.edge_influence,
                };
                program.brush = BrushStamp {
                    position: letterbox.to_grid(brush.position),
                    size: settings.brush_size,
                    strength: if brush.active { settings.brush_strength } else { 0.0 },
                };
                program.aspect = width as f32 / height as f32;
                program.noise_scale = settings.noise_scale;
                program.noise_strength = settings.noise_strength;
                program.time = self.noise_time;

                for _ in 0..count {
                    field.swap();
                    self.ctx.draw(&*program, field.current(), &[field.previous(), self.input])?;
                }
            },
            Interface::ParameterMap => {
                let Some(program) = self.map.get_mut() else {
                    return Ok(());
                };
                program.diffusion = [params.diff_a, params.diff_b];
                for _ in 0..count {
                    field.swap();
                    self.ctx.draw(&*program, field.current(), &[field.previous()])?;
                }
            },
        }
        Ok(())
    }

    /// Composite the current buffers at the output size. `None` when the
    /// display program is unavailable, the output exceeds the device limit,
    /// or there is nothing to show yet.
    pub fn render(&mut self, settings: &Settings) -> Result<Option<&Texture>, EngineError> {
        self.poll_programs();
        if self.state == EngineState::Idle {
            return Ok(None);
        }
        let (width, height) = self.target;
        match self.ctx.reserve(self.output, width, height) {
            Ok(_) => {},
            Err(e @ EngineError::TextureTooLarge { .. }) => {
                self.warn_once(&e);
                return Ok(None);
            },
            Err(e) => return Err(e),
        }
        let letterbox = Letterbox::fit(self.field_dimensions(), self.target, settings.zoom);

        match settings.view {
            View::Composite => {
                let Some(program) = self.composite.get_mut() else {
                    return Ok(None);
                };
                program.threshold = settings.pattern_threshold;
                program.sharpness = settings.pattern_sharpness;
                program.invert = settings.invert;
                program.letterbox = letterbox;
                let bindings: Vec<TextureId> = self.fields.iter().map(Field::current).collect();
                self.ctx.draw(&*program, self.output, &bindings)?;
            },
            View::Channel(channel) => {
                let Some(program) = self.channel_view.get_mut() else {
                    return Ok(None);
                };
                program.letterbox = letterbox;
                let current = self.fields[channel.index()].current();
                self.ctx.draw(&*program, self.output, &[current])?;
            },
        }
        self.ctx.texture(self.output).map(Some)
    }

    fn warn_once(&mut self, err: &EngineError) {
        if self.warned.insert(err.to_string()) {
            warn!("{}", err);
        }
    }
}
