use gazelab_core::Condition;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExperimentError {
    /// Invalid timing or grid parameters; raised before any state
    /// transition, so a misconfigured trial never starts.
    #[error("invalid stimulus timing: {0}")]
    InvalidTiming(String),

    /// The requested condition is not part of the configured space.
    #[error("condition outside the configured space: {0}")]
    UnknownCondition(Condition),

    /// The requested condition was already run for this subject.
    #[error("condition already completed: {0}")]
    ConditionCompleted(Condition),

    /// Every combination has been run; no further trials for this subject.
    #[error("all condition combinations are complete for this subject")]
    SessionExhausted,

    /// Only one trial may be open at a time.
    #[error("a trial is already in progress")]
    TrialInProgress,

    #[error("no trial is in progress")]
    NoActiveTrial,

    /// The scheduler has not reached its terminal state yet.
    #[error("trial has not finished its stimulus sequence")]
    TrialNotFinished,

    /// Persistence failed; fatal to the trial only. The condition stays
    /// eligible for a retry.
    #[error("failed to persist trial data: {0}")]
    Persist(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExperimentError>;
