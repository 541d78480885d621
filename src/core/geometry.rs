use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Axis-aligned rectangle in page pixel coordinates.
///
/// `x_max`/`y_max` are exclusive, so a rectangle covers `width() * height()`
/// pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    x_min: i32,
    y_min: i32,
    x_max: i32,
    y_max: i32,
}

impl Rect {
    /// Builds a rectangle without checking its area. Meant for template
    /// literals; `Template::validate` rejects degenerate ones.
    pub const fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Checked constructor. Takes wide coordinates so callers can do their
    /// arithmetic in `i64` and leave the narrowing to this one place.
    pub fn try_new(x_min: i64, y_min: i64, x_max: i64, y_max: i64) -> Result<Self, GeometryError> {
        let narrow = |v: i64| i32::try_from(v).ok();
        let (Some(x0), Some(y0), Some(x1), Some(y1)) =
            (narrow(x_min), narrow(y_min), narrow(x_max), narrow(y_max))
        else {
            return Err(GeometryError::OutOfRange {
                x_min,
                y_min,
                x_max,
                y_max,
            });
        };
        let rect = Self::new(x0, y0, x1, y1);
        if rect.is_empty() {
            return Err(GeometryError::InvalidBounds {
                x_min,
                y_min,
                x_max,
                y_max,
            });
        }
        Ok(rect)
    }

    pub fn x_min(&self) -> i32 {
        self.x_min
    }

    pub fn y_min(&self) -> i32 {
        self.y_min
    }

    pub fn x_max(&self) -> i32 {
        self.x_max
    }

    pub fn y_max(&self) -> i32 {
        self.y_max
    }

    pub fn width(&self) -> u32 {
        span(self.x_min, self.x_max)
    }

    pub fn height(&self) -> u32 {
        span(self.y_min, self.y_max)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.x_max <= self.x_min || self.y_max <= self.y_min
    }

    /// Overlap with `[0, width) x [0, height)`, or `None` when disjoint.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Rect> {
        let width = i32::try_from(width).unwrap_or(i32::MAX);
        let height = i32::try_from(height).unwrap_or(i32::MAX);
        let clipped = Rect::new(
            self.x_min.max(0),
            self.y_min.max(0),
            self.x_max.min(width),
            self.y_max.min(height),
        );
        if clipped.is_empty() {
            None
        } else {
            Some(clipped)
        }
    }
}

// Any two i32 values are less than 2^32 apart, so the span always fits.
fn span(min: i32, max: i32) -> u32 {
    u32::try_from((i64::from(max) - i64::from(min)).max(0)).unwrap_or(u32::MAX)
}

/// Generates `column_count` cells of `cell_width x cell_height`, left edges
/// `column_pitch` apart starting at `start_x`, all sharing `start_y`.
///
/// Pitch and cell width are independent: a pitch larger than the cell leaves
/// gaps, a smaller one makes neighbouring cells overlap.
///
/// Fails when a cell is empty or reaches past the `i32` coordinate space.
pub fn make_grid_zones(
    start_x: i32,
    start_y: i32,
    cell_width: u32,
    cell_height: u32,
    column_count: usize,
    column_pitch: u32,
) -> Result<Vec<Rect>, GeometryError> {
    let y_min = i64::from(start_y);
    let y_max = y_min + i64::from(cell_height);

    (0..column_count)
        .map(|col| {
            let offset = i64::try_from(col)
                .ok()
                .and_then(|col| col.checked_mul(i64::from(column_pitch)));
            let x_min = offset
                .and_then(|offset| offset.checked_add(i64::from(start_x)))
                .unwrap_or(i64::MAX);
            let x_max = x_min.saturating_add(i64::from(cell_width));
            Rect::try_new(x_min, y_min, x_max, y_max)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn grid_spacing_follows_pitch() {
        let zones = make_grid_zones(32, 355, 11, 40, 12, 11).unwrap();
        assert_eq!(zones.len(), 12);
        for (i, zone) in zones.iter().enumerate() {
            assert_eq!(zone.x_min(), 32 + i as i32 * 11);
            assert_eq!(zone.y_min(), 355);
            assert_eq!(zone.width(), 11);
            assert_eq!(zone.height(), 40);
        }
        assert_eq!(zones[11], Rect::new(153, 355, 164, 395));
    }

    #[test]
    fn zero_columns_is_empty() {
        assert_eq!(make_grid_zones(0, 0, 10, 10, 0, 10), Ok(Vec::new()));
    }

    #[test]
    fn pitch_independent_of_width() {
        let gapped = make_grid_zones(0, 0, 10, 5, 3, 25).unwrap();
        assert_eq!(
            gapped.iter().map(Rect::x_min).collect::<Vec<_>>(),
            vec![0, 25, 50]
        );
        assert!(gapped.iter().all(|r| r.width() == 10));

        let overlapping = make_grid_zones(4, 2, 10, 5, 3, 6).unwrap();
        assert_eq!(overlapping[1], Rect::new(10, 2, 20, 7));
        assert_eq!(overlapping[2], Rect::new(16, 2, 26, 7));
    }

    #[test]
    fn grid_past_coordinate_space_is_an_error() {
        assert!(matches!(
            make_grid_zones(i32::MAX - 20, 0, 11, 40, 12, 11),
            Err(GeometryError::OutOfRange { .. })
        ));
        assert!(matches!(
            make_grid_zones(2_000_000_000, 0, 11, 40, 12, 100_000_000),
            Err(GeometryError::OutOfRange { .. })
        ));
        assert!(matches!(
            make_grid_zones(0, i32::MAX - 5, 11, 40, 1, 11),
            Err(GeometryError::OutOfRange { .. })
        ));
        assert!(matches!(
            make_grid_zones(0, 0, 0, 40, 3, 11),
            Err(GeometryError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn extents_of_huge_rects_do_not_overflow() {
        let rect = Rect::new(-2_000_000_000, 0, 2_000_000_000, 10);
        assert_eq!(rect.width(), 4_000_000_000);
        assert_eq!(rect.height(), 10);
        assert_eq!(Rect::new(i32::MIN, 0, i32::MAX, 1).width(), u32::MAX);
        assert_eq!(Rect::new(5, 5, -5, 6).width(), 0);
    }

    #[test]
    fn rejects_degenerate_rect() {
        assert!(Rect::try_new(10, 10, 10, 20).is_err());
        assert!(Rect::try_new(10, 20, 30, 5).is_err());
        assert_eq!(Rect::try_new(0, 0, 4, 3).map(|r| r.area()), Ok(12));
        assert!(matches!(
            Rect::try_new(0, 0, i64::from(i32::MAX) + 1, 3),
            Err(GeometryError::OutOfRange { .. })
        ));
    }

    #[test]
    fn clips_against_image_bounds() {
        let rect = Rect::new(-5, 90, 20, 130);
        assert_eq!(rect.clip_to(100, 100), Some(Rect::new(0, 90, 20, 100)));
        assert_eq!(Rect::new(200, 0, 210, 10).clip_to(100, 100), None);
    }
}
