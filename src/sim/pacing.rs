//! Adaptive iteration pacing

/// Fastest frame rate the iteration target is calibrated for
pub const MAX_FPS: f64 = 60.0;
/// Below this rate the iteration count shrinks again
pub const MIN_FPS: f64 = 10.0;

/// Guards against division by zero on back-to-back frames
const INTERVAL_FLOOR_MS: f64 = 0.1;
/// Absorbs float noise before rounding up, so exact ratios stay exact
const CEIL_SLACK: f64 = 1.0e-6;

/// Scales iterations per frame so simulated time per wall-clock second stays
/// roughly constant between 10 and 60 fps.
#[derive(Debug, Clone, Default)]
pub struct Pacing {
    last_ms: f64,
}

impl Pacing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous frame timestamp
    pub fn reset(&mut self) {
        self.last_ms = 0.0;
    }

    pub fn last_timestamp(&self) -> f64 {
        self.last_ms
    }

    /// Iterations to run this frame for a target expressed at 60 fps.
    /// Records `now_ms` as the new reference timestamp.
    pub fn next_iteration_count(&mut self, now_ms: f64, target: u32) -> u32 {
        let instant_fps = 1000.0 / (INTERVAL_FLOOR_MS + now_ms - self.last_ms);
        self.last_ms = now_ms;
        scaled_count(instant_fps, target)
    }
}

/// Iteration count for a measured frame rate
pub fn scaled_count(instant_fps: f64, target: u32) -> u32 {
    let ratio = if !instant_fps.is_finite() || instant_fps <= 0.0 {
        // A negative or infinite interval: clock went backwards
        return 0;
    } else if instant_fps > MAX_FPS {
        MAX_FPS / instant_fps
    } else if instant_fps < MIN_FPS {
        instant_fps / MIN_FPS
    } else {
        return target;
    };
    let count = (ratio * f64::from(target) - CEIL_SLACK).ceil();
    count.max(0.0) as u32
}

/// Share of a frame's iterations run on each of the four channels
#[inline]
pub fn per_channel(total: u32) -> u32 {
    total.div_ceil(4)
}
