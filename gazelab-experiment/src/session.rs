use crate::error::{ExperimentError, Result};
use crate::recorder::SampleRecorder;
use crate::scheduler::{DotScheduler, SchedulerEvent};
use gazelab_core::{
    Condition, ConditionSpace, Frame, LandmarkExtractor, LandmarkSink, StimulusTiming,
};
use log::{info, warn};
use std::collections::HashSet;

/// Tracks which points of the condition space have been exhausted for the
/// current subject. The completed set only grows within a session; a new
/// subject gets a fresh tracker.
#[derive(Debug)]
pub struct SessionTracker {
    space: ConditionSpace,
    completed: HashSet<Condition>,
}

impl SessionTracker {
    pub fn new(space: ConditionSpace) -> Self {
        Self {
            space,
            completed: HashSet::new(),
        }
    }

    /// True iff the condition belongs to the space and has not been run.
    pub fn is_available(&self, condition: &Condition) -> bool {
        self.space.contains(condition) && !self.completed.contains(condition)
    }

    /// Idempotent: re-completing a condition changes nothing. Conditions
    /// outside the space are ignored with a warning.
    pub fn mark_completed(&mut self, condition: Condition) {
        if !self.space.contains(&condition) {
            warn!("ignoring completion of unknown condition ({condition})");
            return;
        }
        self.completed.insert(condition);
    }

    /// Space minus completed, in the space's iteration order.
    pub fn remaining(&self) -> Vec<Condition> {
        self.space
            .iter()
            .filter(|c| !self.completed.contains(c))
            .collect()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn total(&self) -> usize {
        self.space.len()
    }

    /// Session complete: no further trials may start for this subject.
    pub fn is_exhausted(&self) -> bool {
        self.completed.len() >= self.space.len()
    }
}

/// One open trial: the scheduler and recorder bound to a single condition.
/// Discarded wholesale on completion or abort.
#[derive(Debug)]
pub struct Trial {
    condition: Condition,
    pub scheduler: DotScheduler,
    pub recorder: SampleRecorder,
}

impl Trial {
    pub fn condition(&self) -> Condition {
        self.condition
    }

    /// One capture tick: asks the extractor for landmarks and records them
    /// against the scheduler's active target, if any.
    pub fn tick<E: LandmarkExtractor + ?Sized>(&mut self, extractor: &mut E, frame: &Frame) {
        let active = self.scheduler.active_position();
        self.recorder.on_tick(extractor, frame, active);
    }

    pub fn update(&mut self, now_ns: u64) -> Option<SchedulerEvent> {
        self.scheduler.update(now_ns)
    }
}

/// Outcome summary returned when a trial is persisted and closed.
#[derive(Debug, Clone, Copy)]
pub struct TrialSummary {
    pub condition: Condition,
    pub samples: usize,
}

/// All trials for one subject. Validates conditions against the tracker,
/// keeps at most one trial open, and enforces the persist-then-complete
/// ordering: a condition is only marked done once its records are on disk.
#[derive(Debug)]
pub struct Session {
    subject_id: String,
    timing: StimulusTiming,
    tracker: SessionTracker,
    current: Option<Trial>,
}

impl Session {
    pub fn new(subject_id: &str, space: ConditionSpace, timing: StimulusTiming) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            timing,
            tracker: SessionTracker::new(space),
            current: None,
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn timing(&self) -> StimulusTiming {
        self.timing
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn current_trial(&mut self) -> Option<&mut Trial> {
        self.current.as_mut()
    }

    /// Opens a trial for `condition`. Refused synchronously, before any
    /// resource is touched, when a trial is already open, the session is
    /// exhausted, or the condition is unknown or already completed.
    pub fn begin_trial(
        &mut self,
        condition: Condition,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<&mut Trial> {
        if self.current.is_some() {
            return Err(ExperimentError::TrialInProgress);
        }
        if self.tracker.is_exhausted() {
            return Err(ExperimentError::SessionExhausted);
        }
        if !self.tracker.space.contains(&condition) {
            return Err(ExperimentError::UnknownCondition(condition));
        }
        if self.tracker.completed.contains(&condition) {
            return Err(ExperimentError::ConditionCompleted(condition));
        }

        let scheduler = DotScheduler::new(self.timing)?;
        let recorder = SampleRecorder::new(surface_width, surface_height);
        info!(
            "subject {}: trial opened for {condition}",
            self.subject_id
        );
        Ok(self.current.insert(Trial {
            condition,
            scheduler,
            recorder,
        }))
    }

    /// Discards the open trial without persisting anything. Its condition
    /// stays available.
    pub fn abort_trial(&mut self) {
        if let Some(trial) = self.current.take() {
            info!(
                "subject {}: trial aborted for {} ({} samples discarded)",
                self.subject_id,
                trial.condition,
                trial.recorder.len()
            );
        }
    }

    /// Persists the finished trial through `sink` and, only on success,
    /// marks its condition complete. On failure the records are released
    /// and the condition remains eligible for a retry. A trial whose
    /// scheduler has not reached `Done` is refused and left open.
    pub fn finish_trial(&mut self, sink: &mut dyn LandmarkSink) -> Result<TrialSummary> {
        let trial = self.current.take().ok_or(ExperimentError::NoActiveTrial)?;
        if !trial.scheduler.is_done() {
            let err = ExperimentError::TrialNotFinished;
            self.current = Some(trial);
            return Err(err);
        }

        let headers = SampleRecorder::headers();
        sink.write_landmarks(&headers, trial.recorder.records())?;

        self.tracker.mark_completed(trial.condition);
        let summary = TrialSummary {
            condition: trial.condition,
            samples: trial.recorder.len(),
        };
        info!(
            "subject {}: trial complete for {} ({} samples, {}/{} conditions done)",
            self.subject_id,
            summary.condition,
            summary.samples,
            self.tracker.completed_count(),
            self.tracker.total()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazelab_core::CaptureRecord;
    use std::io;

    #[test]
    fn tracker_availability_over_full_default_space() {
        let space = ConditionSpace::default();
        let mut tracker = SessionTracker::new(space.clone());
        let all: Vec<Condition> = space.iter().collect();
        assert_eq!(all.len(), 75);

        for c in &all {
            assert!(tracker.is_available(c));
        }
        for c in &all {
            tracker.mark_completed(*c);
            assert!(!tracker.is_available(c));
        }
        assert!(tracker.is_exhausted());
        assert!(tracker.remaining().is_empty());
    }

    #[test]
    fn mark_completed_is_idempotent() {
        let mut tracker = SessionTracker::new(ConditionSpace::default());
        let c = Condition { yaw: 15, pitch: 0, distance: 30 };
        tracker.mark_completed(c);
        let remaining = tracker.remaining();
        tracker.mark_completed(c);
        assert_eq!(tracker.remaining(), remaining);
        assert_eq!(tracker.completed_count(), 1);
    }

    #[test]
    fn unknown_condition_is_never_available_nor_completable() {
        let mut tracker = SessionTracker::new(ConditionSpace::default());
        let foreign = Condition { yaw: 90, pitch: 0, distance: 30 };
        assert!(!tracker.is_available(&foreign));
        tracker.mark_completed(foreign);
        assert_eq!(tracker.completed_count(), 0);
    }

    struct OkSink {
        rows_seen: usize,
    }

    impl LandmarkSink for OkSink {
        fn write_landmarks(
            &mut self,
            _header: &[String],
            records: &[CaptureRecord],
        ) -> io::Result<()> {
            self.rows_seen = records.len();
            Ok(())
        }
    }

    struct FailingSink;

    impl LandmarkSink for FailingSink {
        fn write_landmarks(
            &mut self,
            _header: &[String],
            _records: &[CaptureRecord],
        ) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    fn run_to_done(trial: &mut Trial) {
        let mut now = 0u64;
        trial.scheduler.start(now);
        loop {
            now += 100_000_000;
            if trial.update(now) == Some(SchedulerEvent::Finished) {
                break;
            }
        }
    }

    #[test]
    fn begin_trial_refuses_completed_condition() {
        let mut session = Session::new("001", ConditionSpace::default(), StimulusTiming::default());
        let c = Condition { yaw: 0, pitch: 0, distance: 60 };

        session.begin_trial(c, 800, 600).unwrap();
        run_to_done(session.current_trial().unwrap());
        session.finish_trial(&mut OkSink { rows_seen: 0 }).unwrap();

        assert!(matches!(
            session.begin_trial(c, 800, 600),
            Err(ExperimentError::ConditionCompleted(_))
        ));
    }

    #[test]
    fn begin_trial_refuses_second_open_trial() {
        let mut session = Session::new("001", ConditionSpace::default(), StimulusTiming::default());
        session
            .begin_trial(Condition { yaw: 0, pitch: 0, distance: 30 }, 800, 600)
            .unwrap();
        assert!(matches!(
            session.begin_trial(Condition { yaw: 0, pitch: 0, distance: 60 }, 800, 600),
            Err(ExperimentError::TrialInProgress)
        ));
    }

    #[test]
    fn zero_sample_trial_still_completes() {
        let mut session = Session::new("001", ConditionSpace::default(), StimulusTiming::default());
        let c = Condition { yaw: 30, pitch: -30, distance: 90 };
        session.begin_trial(c, 800, 600).unwrap();
        run_to_done(session.current_trial().unwrap());

        let mut sink = OkSink { rows_seen: 99 };
        let summary = session.finish_trial(&mut sink).unwrap();
        assert_eq!(summary.samples, 0);
        assert_eq!(sink.rows_seen, 0);
        assert!(!session.tracker().is_available(&c));
    }

    #[test]
    fn persistence_failure_leaves_condition_available() {
        let mut session = Session::new("001", ConditionSpace::default(), StimulusTiming::default());
        let c = Condition { yaw: -15, pitch: 15, distance: 60 };
        session.begin_trial(c, 800, 600).unwrap();
        run_to_done(session.current_trial().unwrap());

        let err = session.finish_trial(&mut FailingSink).unwrap_err();
        assert!(matches!(err, ExperimentError::Persist(_)));
        // Records are released with the trial and the condition stays open.
        assert!(session.current_trial().is_none());
        assert!(session.tracker().is_available(&c));
        assert_eq!(session.tracker().completed_count(), 0);

        // The condition can be retried.
        session.begin_trial(c, 800, 600).unwrap();
    }

    #[test]
    fn finish_refuses_unfinished_trial() {
        let mut session = Session::new("001", ConditionSpace::default(), StimulusTiming::default());
        session
            .begin_trial(Condition { yaw: 0, pitch: 15, distance: 30 }, 800, 600)
            .unwrap();
        assert!(matches!(
            session.finish_trial(&mut OkSink { rows_seen: 0 }),
            Err(ExperimentError::TrialNotFinished)
        ));
        // Trial is still open after the refusal.
        assert!(session.current_trial().is_some());
    }

    #[test]
    fn exhausted_session_rejects_any_trial() {
        let space = ConditionSpace::new(vec![0], vec![0], vec![30, 60]);
        let mut session = Session::new("001", space, StimulusTiming::default());
        for distance in [30, 60] {
            let c = Condition { yaw: 0, pitch: 0, distance };
            session.begin_trial(c, 800, 600).unwrap();
            run_to_done(session.current_trial().unwrap());
            session.finish_trial(&mut OkSink { rows_seen: 0 }).unwrap();
        }
        assert!(session.tracker().is_exhausted());
        assert!(matches!(
            session.begin_trial(Condition { yaw: 0, pitch: 0, distance: 30 }, 800, 600),
            Err(ExperimentError::SessionExhausted)
        ));
    }
}
