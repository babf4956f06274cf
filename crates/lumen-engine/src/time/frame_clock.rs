use std::time::{Duration, Instant};

/// Frame timing snapshot handed to `App::update`.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Clamped time since the previous tick, in seconds.
    pub dt: f32,

    /// Seconds since the clock was created or last reset (sum of clamped deltas).
    pub elapsed: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// Delta time is clamped to avoid pathological values when the process is paused
/// by the debugger, minimized, or stalls.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: Duration,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub const DEFAULT_DT_MIN: Duration = Duration::from_micros(100);
    pub const DEFAULT_DT_MAX: Duration = Duration::from_millis(250);

    pub fn new() -> Self {
        Self::with_clamps(Self::DEFAULT_DT_MIN, Self::DEFAULT_DT_MAX)
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            elapsed: Duration::ZERO,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the baseline and the elapsed time. The frame counter keeps running.
    pub fn reset(&mut self) {
        self.last = Instant::now();
        self.elapsed = Duration::ZERO;
    }

    /// Advances the clock to the current instant.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    ///
    /// An instant earlier than the previous tick is treated as a zero delta
    /// (and then clamped up to the minimum).
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;
        self.elapsed += dt;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts frames over a fixed window and reports the rate when the window closes.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: f32,
    accumulated: f32,
    frames: u32,
}

impl FpsCounter {
    pub fn new(window_secs: f32) -> Self {
        Self {
            window: window_secs.max(f32::EPSILON),
            accumulated: 0.0,
            frames: 0,
        }
    }

    /// Records one frame of length `dt`; returns the average FPS once per window.
    pub fn record(&mut self, dt: f32) -> Option<f32> {
        self.accumulated += dt;
        self.frames += 1;

        if self.accumulated < self.window {
            return None;
        }

        let fps = self.frames as f32 / self.accumulated;
        self.accumulated = 0.0;
        self.frames = 0;
        Some(fps)
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_index_zero() {
        let mut clock = FrameClock::new();
        let t0 = clock.tick();
        let t1 = clock.tick();
        assert_eq!(t0.frame_index, 0);
        assert_eq!(t1.frame_index, 1);
    }

    #[test]
    fn delta_is_clamped_to_max() {
        let mut clock = FrameClock::new();
        let later = clock.last + Duration::from_secs(10);
        let ft = clock.tick_at(later);
        assert_eq!(ft.dt, FrameClock::DEFAULT_DT_MAX.as_secs_f32());
    }

    #[test]
    fn delta_is_clamped_to_min() {
        let mut clock = FrameClock::with_clamps(Duration::from_millis(1), Duration::from_millis(50));
        let same = clock.last;
        let ft = clock.tick_at(same);
        assert_eq!(ft.dt, Duration::from_millis(1).as_secs_f32());
    }

    #[test]
    fn elapsed_accumulates_clamped_deltas() {
        let mut clock = FrameClock::new();
        let base = clock.last;
        clock.tick_at(base + Duration::from_millis(100));
        let ft = clock.tick_at(base + Duration::from_millis(200));
        assert!((ft.elapsed - 0.2).abs() < 1e-4);
    }

    #[test]
    fn reset_clears_elapsed_but_not_index() {
        let mut clock = FrameClock::new();
        let base = clock.last;
        clock.tick_at(base + Duration::from_millis(100));
        clock.reset();
        let ft = clock.tick_at(clock.last + Duration::from_millis(10));
        assert!(ft.elapsed < 0.011);
        assert_eq!(ft.frame_index, 1);
    }

    #[test]
    fn fps_counter_reports_once_per_window() {
        let mut fps = FpsCounter::new(1.0);
        let mut reports = Vec::new();
        for _ in 0..150 {
            if let Some(rate) = fps.record(1.0 / 60.0) {
                reports.push(rate);
            }
        }
        assert_eq!(reports.len(), 2);
        assert!((reports[0] - 60.0).abs() < 1.0);
    }
}
