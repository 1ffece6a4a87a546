use crate::record::LandmarkSet;

/// One camera frame, tightly packed RGB8.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// A camera or replay device producing frames on demand. A `None` return is
/// a per-call failure; the tick that requested the frame is simply skipped.
pub trait FrameSource {
    fn grab(&mut self) -> Option<Frame>;
}

/// The face-mesh capability: given one frame, yields zero or one complete
/// landmark sets. No face in the frame is not an error.
pub trait LandmarkExtractor {
    fn extract(&mut self, frame: &Frame) -> Option<LandmarkSet>;
}
