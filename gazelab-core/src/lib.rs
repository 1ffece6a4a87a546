pub mod capture;
pub mod condition;
pub mod metadata;
pub mod record;
pub mod stimulus;
pub mod trial;

pub use capture::{Frame, FrameSource, LandmarkExtractor};
pub use condition::{Condition, ConditionSpace};
pub use metadata::{SessionMetadata, SessionNote, SubjectInfo};
pub use record::{column_headers, CaptureRecord, Landmark, LandmarkSet, LandmarkSink, LANDMARK_COUNT};
pub use stimulus::{StimulusGrid, StimulusPoint};
pub use trial::{StimulusTiming, TrialConfig, TrialPhase};
