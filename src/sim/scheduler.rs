/// Fixed-timestep scheduling with catch-up, and the pausable clocks
/// that drive it.
///
/// Two scheduler instances run side by side: one for always-on logic
/// (title screen animation, housekeeping) on the main clock, and one for
/// in-game logic on the game stopwatch. Pausing freezes the stopwatch
/// itself, so the in-game scheduler resumes exactly in phase — no burst
/// of catch-up ticks after a pause.
///
/// Between ticks the renderer asks for the frame fraction: how far
/// wall-clock time has progressed into the next pending step, clamped to
/// [0, 1], used to interpolate entity state.

use std::time::{Duration, Instant};

/// A monotonic clock reporting seconds, excluding paused spans.
pub struct PausableClock {
    origin: Instant,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl PausableClock {
    pub fn new() -> Self {
        PausableClock {
            origin: Instant::now(),
            paused_at: None,
            paused_total: Duration::ZERO,
        }
    }

    /// Seconds since reset, with paused time discounted.
    pub fn time(&self) -> f32 {
        let end = self.paused_at.unwrap_or_else(Instant::now);
        (end - self.origin - self.paused_total).as_secs_f32()
    }

    pub fn pause(&mut self) {
        if self.paused_at.is_none() {
            self.paused_at = Some(Instant::now());
        }
    }

    pub fn resume(&mut self) {
        if let Some(t) = self.paused_at.take() {
            self.paused_total += t.elapsed();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn reset(&mut self) {
        self.origin = Instant::now();
        self.paused_at = None;
        self.paused_total = Duration::ZERO;
    }
}

pub struct StepScheduler {
    step_size: f32,
    max_steps: u32,
    start_of_step: f32,
    fraction: f32,
}

impl StepScheduler {
    pub fn new(step_size: f32, max_steps: u32) -> Self {
        StepScheduler {
            step_size,
            max_steps,
            start_of_step: 0.0,
            fraction: 0.0,
        }
    }

    /// Re-anchor to `now`, e.g. when (re)entering the game phase, so the
    /// first frame doesn't try to catch up over idle time.
    pub fn align(&mut self, now: f32) {
        self.start_of_step = now;
        self.fraction = 0.0;
    }

    /// Run as many fixed steps as `now` calls for, capped at `max_steps`
    /// so a long stall (window minimized, debugger) doesn't turn into an
    /// unbounded catch-up burst. Returns the number of ticks performed.
    pub fn advance(&mut self, now: f32, mut tick: impl FnMut()) -> u32 {
        let mut steps = 0;
        while now - self.start_of_step > self.step_size {
            tick();
            self.start_of_step += self.step_size;
            steps += 1;
            if steps > self.max_steps {
                break;
            }
        }
        self.fraction = ((now - self.start_of_step) / self.step_size).clamp(0.0, 1.0);
        steps
    }

    /// Progress into the next pending step, in [0, 1], for interpolated
    /// rendering.
    pub fn fraction(&self) -> f32 {
        self.fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 1.0 / 30.0;

    #[test]
    fn ticks_accumulate_with_time() {
        let mut s = StepScheduler::new(STEP, 10);
        let mut ticks = 0;
        s.advance(0.0, || ticks += 1);
        assert_eq!(ticks, 0);

        s.advance(STEP * 3.5, || ticks += 1);
        assert_eq!(ticks, 3);
        // Fraction reflects the leftover half step.
        assert!((s.fraction() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn catch_up_is_clamped() {
        let mut s = StepScheduler::new(STEP, 10);
        let mut ticks = 0;
        // A jump of 100 steps performs at most max_steps (+1 for the
        // loop's final check) ticks and clamps the fraction.
        s.advance(STEP * 100.0, || ticks += 1);
        assert!(ticks <= 11, "ran {} ticks", ticks);
        let f = s.fraction();
        assert!((0.0..=1.0).contains(&f), "fraction {}", f);
    }

    #[test]
    fn backlog_drains_across_calls() {
        let mut s = StepScheduler::new(STEP, 10);
        let mut total = 0;
        let mut last = 0;
        // Each call is capped, but repeated calls work the backlog off.
        for _ in 0..20 {
            last = s.advance(STEP * 100.0, || total += 1);
        }
        assert_eq!(last, 0, "backlog not drained");
        assert!((98..=101).contains(&total), "drained {} ticks", total);
        assert!((0.0..=1.0).contains(&s.fraction()));
    }

    #[test]
    fn fraction_stays_in_range() {
        let mut s = StepScheduler::new(STEP, 10);
        for i in 0..200 {
            s.advance(i as f32 * STEP * 0.37, || {});
            let f = s.fraction();
            assert!((0.0..=1.0).contains(&f));
        }
    }

    #[test]
    fn align_resets_phase() {
        let mut s = StepScheduler::new(STEP, 10);
        let mut ticks = 0;
        s.align(5.0);
        s.advance(5.0 + STEP * 1.5, || ticks += 1);
        assert_eq!(ticks, 1);
    }

    #[test]
    fn clock_pause_freezes_time() {
        let mut c = PausableClock::new();
        c.pause();
        let t0 = c.time();
        std::thread::sleep(Duration::from_millis(15));
        let t1 = c.time();
        assert_eq!(t0, t1);
        c.resume();
        assert!(!c.is_paused());
    }

    #[test]
    fn paused_span_is_discounted() {
        let mut c = PausableClock::new();
        std::thread::sleep(Duration::from_millis(5));
        c.pause();
        let frozen = c.time();
        std::thread::sleep(Duration::from_millis(20));
        c.resume();
        // Just after resume, time continues from the frozen reading.
        assert!(c.time() - frozen < 0.010, "paused span leaked into clock");
    }
}
