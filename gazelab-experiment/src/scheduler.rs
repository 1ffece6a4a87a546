use crate::error::{ExperimentError, Result};
use gazelab_core::{StimulusGrid, StimulusPoint, StimulusTiming, TrialPhase};
use rand::rngs::ThreadRng;
use rand::Rng;

const MS_TO_NS: u64 = 1_000_000;

/// Transitions reported by [`DotScheduler::update`]. The caller repaints on
/// `DotShown`/`RestStarted` and hands the trial to persistence on `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    DotShown,
    RestStarted,
    Finished,
}

/// Drives the display/rest cycle of one trial: draws each grid point exactly
/// once, uniformly at random without replacement, holding each on screen for
/// the configured display time with a rest interval in between.
///
/// All timing is against a caller-supplied monotonic nanosecond clock; the
/// scheduler never blocks and never retries.
#[derive(Debug)]
pub struct DotScheduler<R: Rng = ThreadRng> {
    timing: StimulusTiming,
    grid: StimulusGrid,
    remaining: Vec<StimulusPoint>,
    current: Option<StimulusPoint>,
    phase: TrialPhase,
    phase_start_ns: u64,
    shown: usize,
    rng: R,
}

impl DotScheduler<ThreadRng> {
    /// Fails fast on zero durations or a grid smaller than 2×2, before any
    /// state exists.
    pub fn new(timing: StimulusTiming) -> Result<Self> {
        Self::with_rng(timing, rand::rng())
    }
}

impl<R: Rng> DotScheduler<R> {
    pub fn with_rng(timing: StimulusTiming, rng: R) -> Result<Self> {
        validate_timing(&timing)?;
        let grid = StimulusGrid::new(timing.grid_size);
        let remaining = grid.points().to_vec();
        Ok(Self {
            timing,
            grid,
            remaining,
            current: None,
            phase: TrialPhase::Idle,
            phase_start_ns: 0,
            shown: 0,
            rng,
        })
    }

    /// `Idle → Displaying`: shows the first dot. No-op outside `Idle`.
    pub fn start(&mut self, now_ns: u64) -> Option<SchedulerEvent> {
        if self.phase != TrialPhase::Idle {
            return None;
        }
        Some(self.select_next(now_ns))
    }

    /// Advances the phase machine against the given clock. At most one
    /// transition fires per call; the event loop calls this every frame.
    pub fn update(&mut self, now_ns: u64) -> Option<SchedulerEvent> {
        match self.phase {
            TrialPhase::Displaying => {
                if now_ns.saturating_sub(self.phase_start_ns) >= self.timing.dot_display_ms * MS_TO_NS {
                    self.current = None;
                    if self.remaining.is_empty() {
                        // Nothing left to show; skip the trailing rest.
                        self.phase = TrialPhase::Done;
                        return Some(SchedulerEvent::Finished);
                    }
                    self.phase = TrialPhase::Resting;
                    self.phase_start_ns = now_ns;
                    return Some(SchedulerEvent::RestStarted);
                }
                None
            }
            TrialPhase::Resting => {
                if now_ns.saturating_sub(self.phase_start_ns) >= self.timing.rest_ms * MS_TO_NS {
                    return Some(self.select_next(now_ns));
                }
                None
            }
            TrialPhase::Idle | TrialPhase::Done => None,
        }
    }

    /// Uniform draw without replacement. Completion is detected here: an
    /// empty working set means the sequence is exhausted.
    fn select_next(&mut self, now_ns: u64) -> SchedulerEvent {
        if self.remaining.is_empty() {
            self.current = None;
            self.phase = TrialPhase::Done;
            return SchedulerEvent::Finished;
        }
        let idx = self.rng.random_range(0..self.remaining.len());
        self.current = Some(self.remaining.swap_remove(idx));
        self.phase = TrialPhase::Displaying;
        self.phase_start_ns = now_ns;
        self.shown += 1;
        SchedulerEvent::DotShown
    }

    /// The on-screen target, present only while `Displaying`.
    pub fn active_position(&self) -> Option<StimulusPoint> {
        match self.phase {
            TrialPhase::Displaying => self.current,
            _ => None,
        }
    }

    /// True iff the active dot is the precomputed center point, compared
    /// bit-exactly. Drives the smile cue; for even grid sizes the comparison
    /// never matches, and for odd sizes above 5 coincidence is not
    /// guaranteed either (see [`StimulusGrid::center`]).
    pub fn is_cue_target(&self) -> bool {
        self.active_position() == Some(self.grid.center())
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == TrialPhase::Done
    }

    pub fn timing(&self) -> &StimulusTiming {
        &self.timing
    }

    /// (dots shown so far, total dots in the grid).
    pub fn progress(&self) -> (usize, usize) {
        (self.shown, self.grid.len())
    }
}

fn validate_timing(timing: &StimulusTiming) -> Result<()> {
    if timing.dot_display_ms == 0 {
        return Err(ExperimentError::InvalidTiming(
            "dot display time must be positive".to_string(),
        ));
    }
    if timing.rest_ms == 0 {
        return Err(ExperimentError::InvalidTiming(
            "rest time must be positive".to_string(),
        ));
    }
    if timing.grid_size < 2 {
        return Err(ExperimentError::InvalidTiming(format!(
            "grid size must be at least 2, got {}",
            timing.grid_size
        )));
    }
    if timing.dot_radius == 0 {
        return Err(ExperimentError::InvalidTiming(
            "dot radius must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scheduler(timing: StimulusTiming, seed: u64) -> DotScheduler<StdRng> {
        DotScheduler::with_rng(timing, StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn rejects_invalid_parameters() {
        let base = StimulusTiming::default();
        for timing in [
            StimulusTiming { dot_display_ms: 0, ..base },
            StimulusTiming { rest_ms: 0, ..base },
            StimulusTiming { grid_size: 1, ..base },
            StimulusTiming { dot_radius: 0, ..base },
        ] {
            assert!(matches!(
                DotScheduler::new(timing),
                Err(ExperimentError::InvalidTiming(_))
            ));
        }
    }

    #[test]
    fn idle_has_no_active_position() {
        let sched = scheduler(StimulusTiming::default(), 1);
        assert_eq!(sched.phase(), TrialPhase::Idle);
        assert_eq!(sched.active_position(), None);
        assert!(!sched.is_cue_target());
    }

    #[test]
    fn shows_every_point_exactly_once() {
        for seed in 0..5 {
            let timing = StimulusTiming { grid_size: 4, ..StimulusTiming::default() };
            let mut sched = scheduler(timing, seed);
            let mut shown = Vec::new();

            let mut now = 0u64;
            if sched.start(now) == Some(SchedulerEvent::DotShown) {
                shown.push(sched.active_position().unwrap());
            }
            loop {
                now += 100 * MS_TO_NS;
                match sched.update(now) {
                    Some(SchedulerEvent::DotShown) => {
                        shown.push(sched.active_position().unwrap());
                    }
                    Some(SchedulerEvent::Finished) => break,
                    _ => {}
                }
            }

            let grid = StimulusGrid::new(4);
            assert_eq!(shown.len(), grid.len());
            for p in grid.points() {
                assert_eq!(shown.iter().filter(|s| **s == *p).count(), 1);
            }
        }
    }

    #[test]
    fn nominal_trial_timeline_for_3x3_grid() {
        // 9 display phases of 2000 ms interleaved with 8 rests of 1000 ms.
        let mut sched = scheduler(StimulusTiming::default(), 42);
        let mut displays = 0;
        let mut rests = 0;
        let mut finished_at = None;

        let mut now = 0u64;
        if sched.start(now) == Some(SchedulerEvent::DotShown) {
            displays += 1;
        }
        while finished_at.is_none() {
            now += MS_TO_NS; // 1 ms resolution
            match sched.update(now) {
                Some(SchedulerEvent::DotShown) => displays += 1,
                Some(SchedulerEvent::RestStarted) => rests += 1,
                Some(SchedulerEvent::Finished) => finished_at = Some(now),
                None => {}
            }
        }

        assert_eq!(displays, 9);
        assert_eq!(rests, 8);
        assert_eq!(finished_at.unwrap(), 26_000 * MS_TO_NS);
        assert!(sched.is_done());
        assert_eq!(sched.active_position(), None);
    }

    #[test]
    fn cue_fires_for_exactly_one_dot_on_odd_grids() {
        let mut sched = scheduler(StimulusTiming::default(), 7);
        let mut cue_count = 0;

        let mut now = 0u64;
        if sched.start(now).is_some() && sched.is_cue_target() {
            cue_count += 1;
        }
        loop {
            now += 100 * MS_TO_NS;
            match sched.update(now) {
                Some(SchedulerEvent::DotShown) => {
                    if sched.is_cue_target() {
                        cue_count += 1;
                    }
                }
                Some(SchedulerEvent::Finished) => break,
                _ => {}
            }
        }
        assert_eq!(cue_count, 1);
    }

    #[test]
    fn cue_never_fires_on_even_grids() {
        let timing = StimulusTiming { grid_size: 4, ..StimulusTiming::default() };
        let mut sched = scheduler(timing, 7);
        let mut now = 0u64;
        sched.start(now);
        loop {
            assert!(!sched.is_cue_target() || sched.active_position().is_none());
            now += 100 * MS_TO_NS;
            if sched.update(now) == Some(SchedulerEvent::Finished) {
                break;
            }
        }
    }

    #[test]
    fn no_active_position_during_rest() {
        let mut sched = scheduler(StimulusTiming::default(), 3);
        sched.start(0);
        assert!(sched.active_position().is_some());

        let ev = sched.update(2000 * MS_TO_NS);
        assert_eq!(ev, Some(SchedulerEvent::RestStarted));
        assert_eq!(sched.phase(), TrialPhase::Resting);
        assert_eq!(sched.active_position(), None);
    }

    #[test]
    fn start_is_a_noop_once_running() {
        let mut sched = scheduler(StimulusTiming::default(), 3);
        sched.start(0);
        let first = sched.active_position();
        assert_eq!(sched.start(1), None);
        assert_eq!(sched.active_position(), first);
    }
}
