//! Axis-aligned bounding regions

use crate::point::*;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// An axis-aligned box `[[x_min, x_max], [y_min, y_max], [z_min, z_max]]` in world space.
///
/// Regions are immutable once built. They are used as the candidate pre-filter
/// for constrained sampling, never as the constraint itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    min: Point3f,
    max: Point3f,
}

impl BoundingRegion {
    /// Create a region from its corners, rejecting inverted or non-finite bounds
    pub fn new(min: Point3f, max: Point3f) -> Result<Self> {
        for axis in Axis::ALL {
            let (lo, hi) = (min[axis.index()], max[axis.index()]);
            if !lo.is_finite() || !hi.is_finite() {
                return Err(Error::Configuration(format!(
                    "region bounds on {:?} are not finite: [{}, {}]",
                    axis, lo, hi
                )));
            }
            if lo > hi {
                return Err(Error::Configuration(format!(
                    "region bounds on {:?} are inverted: [{}, {}]",
                    axis, lo, hi
                )));
            }
        }
        Ok(Self { min, max })
    }

    /// Create a region from `[[x_min, x_max], [y_min, y_max], [z_min, z_max]]`
    pub fn from_ranges(ranges: [[f32; 2]; 3]) -> Result<Self> {
        Self::new(
            Point3f::new(ranges[0][0], ranges[1][0], ranges[2][0]),
            Point3f::new(ranges[0][1], ranges[1][1], ranges[2][1]),
        )
    }

    /// Tightest region around a set of points, `None` when the set is empty
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3f>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let (mut min, mut max) = (first, first);

        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(Self { min, max })
    }

    pub fn min(&self) -> Point3f {
        self.min
    }

    pub fn max(&self) -> Point3f {
        self.max
    }

    /// `[min, max]` on one axis
    pub fn axis_range(&self, axis: Axis) -> (f32, f32) {
        (self.min[axis.index()], self.max[axis.index()])
    }

    /// Side lengths of the box
    pub fn extent(&self) -> Vector3f {
        self.max - self.min
    }

    pub fn center(&self) -> Point3f {
        nalgebra::center(&self.min, &self.max)
    }

    /// Inclusive containment test
    pub fn contains(&self, point: &Point3f) -> bool {
        Axis::ALL.iter().all(|&axis| {
            let (lo, hi) = self.axis_range(axis);
            let v = point[axis.index()];
            v >= lo && v <= hi
        })
    }

    /// Axes on which `min == max`
    pub fn degenerate_axes(&self) -> Vec<Axis> {
        Axis::ALL
            .iter()
            .copied()
            .filter(|&axis| {
                let (lo, hi) = self.axis_range(axis);
                lo == hi
            })
            .collect()
    }

    pub fn is_degenerate(&self) -> bool {
        !self.degenerate_axes().is_empty()
    }

    /// Ranges in `[[x_min, x_max], [y_min, y_max], [z_min, z_max]]` form
    pub fn as_ranges(&self) -> [[f32; 2]; 3] {
        [
            [self.min.x, self.max.x],
            [self.min.y, self.max.y],
            [self.min.z, self.max.z],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_points_bounds_all_points() {
        let points = vec![
            Point3f::new(1.0, -2.0, 3.0),
            Point3f::new(-1.0, 4.0, 0.5),
            Point3f::new(0.0, 0.0, 7.0),
        ];
        let region = BoundingRegion::from_points(&points).unwrap();
        assert_eq!(region.as_ranges(), [[-1.0, 1.0], [-2.0, 4.0], [0.5, 7.0]]);
        assert!(points.iter().all(|p| region.contains(p)));
    }

    #[test]
    fn test_from_points_empty() {
        let points: Vec<Point3f> = Vec::new();
        assert!(BoundingRegion::from_points(&points).is_none());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let result = BoundingRegion::from_ranges([[1.0, 0.0], [0.0, 1.0], [0.0, 1.0]]);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_non_finite_bounds_rejected() {
        let result = BoundingRegion::from_ranges([[0.0, f32::NAN], [0.0, 1.0], [0.0, 1.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_degenerate_axes() {
        let region = BoundingRegion::from_ranges([[0.0, 1.0], [2.0, 2.0], [0.0, 1.0]]).unwrap();
        assert_eq!(region.degenerate_axes(), vec![Axis::Y]);
        assert!(region.is_degenerate());
    }

    #[test]
    fn test_center_and_extent() {
        let region = BoundingRegion::from_ranges([[0.0, 10.0], [-2.0, 2.0], [1.0, 3.0]]).unwrap();
        let center = region.center();
        assert_relative_eq!(center.x, 5.0);
        assert_relative_eq!(center.y, 0.0);
        assert_relative_eq!(center.z, 2.0);
        assert_relative_eq!(region.extent().x, 10.0);
    }
}
