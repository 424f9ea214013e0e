//! Frame timing for the render loop

use std::collections::VecDeque;
use std::time::Instant;

/// FPS counter with a rolling window of frame times
pub struct FpsCounter {
    frame_times: VecDeque<f32>,
    last_frame: Instant,
    sample_count: usize,
}

/// Snapshot of the rolling window, in milliseconds where noted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub avg_fps: f32,
    pub min_fps: f32,
    pub max_fps: f32,
    pub median_ms: f32,
    pub p99_ms: f32,
}

impl FpsCounter {
    pub fn new(sample_count: usize) -> Self {
        let sample_count = sample_count.max(1);
        Self {
            frame_times: VecDeque::with_capacity(sample_count),
            last_frame: Instant::now(),
            sample_count,
        }
    }

    /// Call once per frame. Returns the seconds since the previous call.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.record(dt);
        dt
    }

    /// Push a frame duration in seconds into the window.
    pub fn record(&mut self, dt: f32) {
        self.frame_times.push_back(dt);
        if self.frame_times.len() > self.sample_count {
            self.frame_times.pop_front();
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_times.len()
    }

    pub fn avg_fps(&self) -> f32 {
        let avg_dt = self.frame_times.iter().sum::<f32>() / self.frame_times.len().max(1) as f32;
        if avg_dt > 0.0 {
            1.0 / avg_dt
        } else {
            0.0
        }
    }

    pub fn stats(&self) -> FrameStats {
        if self.frame_times.is_empty() {
            return FrameStats { avg_fps: 0.0, min_fps: 0.0, max_fps: 0.0, median_ms: 0.0, p99_ms: 0.0 };
        }
        let mut sorted: Vec<f32> = self.frame_times.iter().copied().collect();
        sorted.sort_by(f32::total_cmp);

        let len = sorted.len();
        let fps = |dt: f32| if dt > 0.0 { 1.0 / dt } else { 0.0 };
        let p99 = ((len as f32 * 0.99).floor() as usize).min(len - 1);

        FrameStats {
            avg_fps: self.avg_fps(),
            min_fps: fps(sorted[len - 1]),
            max_fps: fps(sorted[0]),
            median_ms: sorted[len / 2] * 1000.0,
            p99_ms: sorted[p99] * 1000.0,
        }
    }
}
