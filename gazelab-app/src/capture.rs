//! Stand-in capture backends for camera-less dry runs. A production build
//! plugs a real camera and face-mesh model in through the same
//! [`FrameSource`] / [`LandmarkExtractor`] traits.

use gazelab_core::{Frame, FrameSource, Landmark, LandmarkExtractor, LandmarkSet, LANDMARK_COUNT};

/// Produces flat gray frames on demand.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FrameSource for SyntheticCamera {
    fn grab(&mut self) -> Option<Frame> {
        Some(Frame {
            width: self.width,
            height: self.height,
            data: vec![0x80; (self.width * self.height * 3) as usize],
        })
    }
}

/// Always "detects" the same canned face, so a dry run exercises the full
/// record path end to end.
pub struct SyntheticFaceMesh {
    landmarks: LandmarkSet,
}

impl SyntheticFaceMesh {
    pub fn new() -> Self {
        let points = (0..LANDMARK_COUNT)
            .map(|i| {
                let t = i as f32 / LANDMARK_COUNT as f32;
                Landmark {
                    x: 0.4 + 0.2 * t,
                    y: 0.3 + 0.4 * t,
                    z: -0.05 + 0.1 * t,
                }
            })
            .collect();
        let landmarks =
            LandmarkSet::new(points).expect("canned set has LANDMARK_COUNT points");
        Self { landmarks }
    }
}

impl Default for SyntheticFaceMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl LandmarkExtractor for SyntheticFaceMesh {
    fn extract(&mut self, _frame: &Frame) -> Option<LandmarkSet> {
        Some(self.landmarks.clone())
    }
}
