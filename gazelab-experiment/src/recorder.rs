use chrono::Local;
use gazelab_core::{column_headers, CaptureRecord, Frame, LandmarkExtractor, StimulusPoint};

/// Wall-clock format of the `timestamp` column, microsecond resolution.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Accumulates one trial's landmark samples. Recording is gated to display
/// phases: a tick without an active target is a no-op, as is a tick whose
/// frame contains no detectable face. Records are append-only and handed
/// over wholesale at trial end.
#[derive(Debug)]
pub struct SampleRecorder {
    surface_width: u32,
    surface_height: u32,
    records: Vec<CaptureRecord>,
}

impl SampleRecorder {
    /// `surface_*` are the pixel dimensions the normalized target positions
    /// are scaled by when recorded.
    pub fn new(surface_width: u32, surface_height: u32) -> Self {
        Self {
            surface_width,
            surface_height,
            records: Vec::new(),
        }
    }

    /// Tracks viewport resizes so later records scale correctly.
    pub fn set_surface_size(&mut self, width: u32, height: u32) {
        self.surface_width = width;
        self.surface_height = height;
    }

    /// One capture tick. `active` is the scheduler's current target, if any.
    /// Extraction failures are absorbed silently; the tick is skipped, never
    /// retried, never escalated.
    pub fn on_tick<E: LandmarkExtractor + ?Sized>(
        &mut self,
        extractor: &mut E,
        frame: &Frame,
        active: Option<StimulusPoint>,
    ) {
        let Some(target) = active else { return };
        let Some(landmarks) = extractor.extract(frame) else { return };

        let (target_x, target_y) = target.to_pixels(self.surface_width, self.surface_height);
        self.records.push(CaptureRecord {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            target_x,
            target_y,
            landmarks,
        });
    }

    pub fn records(&self) -> &[CaptureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header row for the persisted landmark table.
    pub fn headers() -> Vec<String> {
        column_headers()
    }
}
