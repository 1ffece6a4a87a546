use std::fmt::Write as _;
use std::io;

/// Number of points in one face-mesh landmark set (iris-refined mesh).
pub const LANDMARK_COUNT: usize = 478;

/// Fixed leading columns of the landmark table.
pub const FIXED_COLUMNS: [&str; 3] = ["timestamp", "target_x", "target_y"];

/// One normalized 3-D facial landmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// An ordered, fixed-length set of facial landmarks from one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet(Vec<Landmark>);

impl LandmarkSet {
    /// Accepts only complete sets of [`LANDMARK_COUNT`] points.
    pub fn new(points: Vec<Landmark>) -> Option<Self> {
        (points.len() == LANDMARK_COUNT).then_some(Self(points))
    }

    pub fn points(&self) -> &[Landmark] {
        &self.0
    }
}

/// One timestamped landmark sample bound to the on-screen target that was
/// displayed when the sample was taken. Target coordinates are absolute
/// pixels on the presentation surface.
#[derive(Debug, Clone)]
pub struct CaptureRecord {
    pub timestamp: String,
    pub target_x: f64,
    pub target_y: f64,
    pub landmarks: LandmarkSet,
}

impl CaptureRecord {
    /// Serializes the record as one CSV data row, column order matching
    /// [`column_headers`]. All fields are numeric or a plain timestamp, so
    /// no quoting is needed.
    pub fn csv_row(&self) -> String {
        let mut row = String::with_capacity(32 + LANDMARK_COUNT * 30);
        let _ = write!(row, "{},{},{}", self.timestamp, self.target_x, self.target_y);
        for p in self.landmarks.points() {
            let _ = write!(row, ",{},{},{}", p.x, p.y, p.z);
        }
        row
    }
}

/// The header row of the landmark table: the three fixed columns followed by
/// `landmark_<i>_x`, `landmark_<i>_y`, `landmark_<i>_z` per tracked point.
pub fn column_headers() -> Vec<String> {
    let mut headers: Vec<String> = FIXED_COLUMNS.iter().map(|s| (*s).to_string()).collect();
    headers.reserve(LANDMARK_COUNT * 3);
    for i in 0..LANDMARK_COUNT {
        headers.push(format!("landmark_{i}_x"));
        headers.push(format!("landmark_{i}_y"));
        headers.push(format!("landmark_{i}_z"));
    }
    headers
}

/// Persistence seam for a finished trial's record list. The caller hands the
/// complete header and rows over in one call; partial writes count as
/// failure and the trial is not marked complete.
pub trait LandmarkSink {
    fn write_landmarks(&mut self, header: &[String], records: &[CaptureRecord]) -> io::Result<()>;
}
