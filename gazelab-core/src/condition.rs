use serde::{Deserialize, Serialize};
use std::fmt;

/// Camera yaw angles of the study protocol, in degrees.
pub const DEFAULT_YAW_ANGLES: [i32; 5] = [0, 15, -15, 30, -30];
/// Camera pitch angles of the study protocol, in degrees.
pub const DEFAULT_PITCH_ANGLES: [i32; 5] = [0, 15, -15, 30, -30];
/// Subject distances of the study protocol, in centimeters.
pub const DEFAULT_DISTANCES_CM: [u32; 3] = [30, 60, 90];

/// One physical camera setup: (yaw, pitch, distance). Immutable; a trial
/// runs under exactly one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub yaw: i32,
    pub pitch: i32,
    pub distance: u32,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "yaw {}°, pitch {}°, distance {} cm",
            self.yaw, self.pitch, self.distance
        )
    }
}

/// The cartesian product of the yaw, pitch and distance domains a session
/// must cover.
#[derive(Debug, Clone)]
pub struct ConditionSpace {
    yaw: Vec<i32>,
    pitch: Vec<i32>,
    distance: Vec<u32>,
}

impl Default for ConditionSpace {
    fn default() -> Self {
        Self {
            yaw: DEFAULT_YAW_ANGLES.to_vec(),
            pitch: DEFAULT_PITCH_ANGLES.to_vec(),
            distance: DEFAULT_DISTANCES_CM.to_vec(),
        }
    }
}

impl ConditionSpace {
    pub fn new(yaw: Vec<i32>, pitch: Vec<i32>, distance: Vec<u32>) -> Self {
        Self { yaw, pitch, distance }
    }

    /// True iff every component of `condition` is drawn from its domain.
    pub fn contains(&self, condition: &Condition) -> bool {
        self.yaw.contains(&condition.yaw)
            && self.pitch.contains(&condition.pitch)
            && self.distance.contains(&condition.distance)
    }

    /// Total number of combinations (75 for the default domains).
    pub fn len(&self) -> usize {
        self.yaw.len() * self.pitch.len() * self.distance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All combinations, yaw-major then pitch then distance, matching the
    /// order the progress report lists them in.
    pub fn iter(&self) -> impl Iterator<Item = Condition> + '_ {
        self.yaw.iter().flat_map(move |&yaw| {
            self.pitch.iter().flat_map(move |&pitch| {
                self.distance
                    .iter()
                    .map(move |&distance| Condition { yaw, pitch, distance })
            })
        })
    }
}
