pub mod error;
pub mod recorder;
pub mod scheduler;
pub mod session;

pub use error::{ExperimentError, Result};
pub use recorder::SampleRecorder;
pub use scheduler::{DotScheduler, SchedulerEvent};
pub use session::{Session, SessionTracker, Trial, TrialSummary};
