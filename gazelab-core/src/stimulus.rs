use serde::{Deserialize, Serialize};

/// Fraction of the screen reserved at the left/right edges.
pub const MARGIN_H: f64 = 0.1;
/// Fraction of the screen reserved at the top/bottom edges.
pub const MARGIN_V: f64 = 0.1;

/// One on-screen target position, normalized to [0,1]² of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StimulusPoint {
    pub x: f64,
    pub y: f64,
}

impl StimulusPoint {
    /// Scales the normalized position to absolute pixel coordinates.
    pub fn to_pixels(self, width: u32, height: u32) -> (f64, f64) {
        (self.x * f64::from(width), self.y * f64::from(height))
    }
}

/// An N×N set of evenly spaced target positions inside the margins, plus the
/// screen-center position used for the smile cue.
#[derive(Debug, Clone)]
pub struct StimulusGrid {
    points: Vec<StimulusPoint>,
    center: StimulusPoint,
    size: u32,
}

impl StimulusGrid {
    /// Generates the grid for the given size. Deterministic: the same size
    /// always yields the same points in the same order.
    ///
    /// `size` must be at least 2; callers validate via `StimulusTiming`.
    pub fn new(size: u32) -> Self {
        debug_assert!(size >= 2);

        let available_w = 1.0 - 2.0 * MARGIN_H;
        let available_h = 1.0 - 2.0 * MARGIN_V;
        let step_x = available_w / f64::from(size - 1);
        let step_y = available_h / f64::from(size - 1);

        let mut points = Vec::with_capacity((size * size) as usize);
        for i in 0..size {
            for j in 0..size {
                points.push(StimulusPoint {
                    x: MARGIN_H + f64::from(i) * step_x,
                    y: MARGIN_V + f64::from(j) * step_y,
                });
            }
        }

        let center = StimulusPoint {
            x: MARGIN_H + available_w / 2.0,
            y: MARGIN_V + available_h / 2.0,
        };

        Self { points, center, size }
    }

    pub fn points(&self) -> &[StimulusPoint] {
        &self.points
    }

    /// The cue position, computed from the margin formula independently of
    /// the grid points. For even sizes no generated point lands on it, so a
    /// cue comparison against it never matches. For odd sizes coincidence
    /// requires `mid * (span / (size - 1))` to reproduce `span / 2.0`
    /// bit-exactly; that holds for sizes 3 and 5, where the step divisor is
    /// a power of two, but is not guaranteed for larger odd sizes, where
    /// rounding can leave the center unmatched as well. Both asymmetries
    /// are inherited from the study protocol and kept as is.
    pub fn center(&self) -> StimulusPoint {
        self.center
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_n_squared_distinct_points() {
        for size in 2..=6 {
            let grid = StimulusGrid::new(size);
            assert_eq!(grid.len(), (size * size) as usize);
            for (i, a) in grid.points().iter().enumerate() {
                for b in &grid.points()[i + 1..] {
                    assert_ne!(a, b, "duplicate point in grid of size {size}");
                }
            }
        }
    }

    #[test]
    fn grid_points_respect_margins() {
        for size in 2..=6 {
            let grid = StimulusGrid::new(size);
            for p in grid.points() {
                assert!(p.x >= MARGIN_H - 1e-12 && p.x <= 1.0 - MARGIN_H + 1e-12);
                assert!(p.y >= MARGIN_V - 1e-12 && p.y <= 1.0 - MARGIN_V + 1e-12);
            }
        }
    }

    #[test]
    fn grid_is_deterministic() {
        let a = StimulusGrid::new(4);
        let b = StimulusGrid::new(4);
        assert_eq!(a.points(), b.points());
    }

    #[test]
    fn center_coincides_with_grid_point_for_odd_sizes() {
        for size in [3, 5] {
            let grid = StimulusGrid::new(size);
            let hits = grid
                .points()
                .iter()
                .filter(|p| **p == grid.center())
                .count();
            assert_eq!(hits, 1, "size {size}");
        }
    }

    #[test]
    fn center_hits_at_most_one_point_on_larger_odd_sizes() {
        // Bit-exact coincidence is only guaranteed for sizes 3 and 5; for
        // larger odd sizes step rounding may leave the center unmatched,
        // but it must never match more than one point.
        for size in [7, 9, 11] {
            let grid = StimulusGrid::new(size);
            let hits = grid
                .points()
                .iter()
                .filter(|p| **p == grid.center())
                .count();
            assert!(hits <= 1, "size {size}: {hits} hits");
        }
    }

    #[test]
    fn center_misses_every_grid_point_for_even_sizes() {
        for size in [2, 4] {
            let grid = StimulusGrid::new(size);
            assert!(grid.points().iter().all(|p| *p != grid.center()));
        }
    }

    #[test]
    fn to_pixels_scales_by_viewport() {
        let p = StimulusPoint { x: 0.5, y: 0.1 };
        assert_eq!(p.to_pixels(1920, 1080), (960.0, 108.0));
    }
}
