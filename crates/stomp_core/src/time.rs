//! Fixed-timestep clock.
//!
//! Wall-clock time feeds an accumulator; the simulation consumes it in
//! `fixed_dt` slices via `should_step()`. Per-frame gameplay constants (the
//! projectile drift, for instance) assume one step per 1/60 s.

use std::time::Instant;

pub const DEFAULT_FIXED_DT: f64 = 1.0 / 60.0;

pub struct TimeState {
    pub fixed_dt: f64,
    pub max_accumulator: f64,
    accumulator: f64,
    pub total_time: f64,
    pub fixed_step_count: u64,
    pub frame_count: u64,
    pub steps_this_frame: u32,
    pub real_dt: f64,
    last_instant: Instant,
}

impl TimeState {
    pub fn new() -> Self {
        Self {
            fixed_dt: DEFAULT_FIXED_DT,
            max_accumulator: 0.25,
            accumulator: 0.0,
            total_time: 0.0,
            fixed_step_count: 0,
            frame_count: 0,
            steps_this_frame: 0,
            real_dt: 0.0,
            last_instant: Instant::now(),
        }
    }

    /// Fixed step length in whole microseconds, the unit animation playback uses.
    pub fn fixed_dt_us(&self) -> u64 {
        (self.fixed_dt * 1_000_000.0).round() as u64
    }

    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(elapsed);
    }

    /// Feed `elapsed` seconds into the accumulator. Split out from
    /// `begin_frame` so stepping can be driven without a wall clock.
    pub fn advance(&mut self, elapsed: f64) {
        self.real_dt = elapsed;

        // Spiral-of-death cap
        if self.real_dt > self.max_accumulator {
            log::warn!(
                "Frame took {:.1}ms, capping accumulator to {}ms",
                self.real_dt * 1000.0,
                self.max_accumulator * 1000.0
            );
            self.real_dt = self.max_accumulator;
        }

        self.accumulator += self.real_dt;
        self.steps_this_frame = 0;
        self.frame_count += 1;
    }

    pub fn should_step(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            self.total_time += self.fixed_dt;
            self.fixed_step_count += 1;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }
}

impl Default for TimeState {
    fn default() -> Self {
        Self::new()
    }
}
