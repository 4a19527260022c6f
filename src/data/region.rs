//! Detector regions of interest and region averaging.

use ndarray::{s, Array1, ArrayView3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rectangular pixel region with inclusive bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[usize; 4]", into = "[usize; 4]")]
pub struct Region {
    pub y_min: usize,
    pub y_max: usize,
    pub x_min: usize,
    pub x_max: usize,
}

impl Region {
    pub fn new(y_min: usize, y_max: usize, x_min: usize, x_max: usize) -> Self {
        Self {
            y_min,
            y_max,
            x_min,
            x_max,
        }
    }

    /// Bounds are ordered (min <= max on both axes).
    pub fn is_valid(&self) -> bool {
        self.y_min <= self.y_max && self.x_min <= self.x_max
    }

    /// Number of pixels covered.
    pub fn pixel_count(&self) -> usize {
        if !self.is_valid() {
            return 0;
        }
        (self.y_max - self.y_min + 1) * (self.x_max - self.x_min + 1)
    }

    #[inline]
    pub fn contains(&self, y: usize, x: usize) -> bool {
        (self.y_min..=self.y_max).contains(&y) && (self.x_min..=self.x_max).contains(&x)
    }

    /// Check whether two regions share at least one pixel.
    pub fn overlaps(&self, other: &Region) -> bool {
        !(other.y_max < self.y_min
            || other.y_min > self.y_max
            || other.x_max < self.x_min
            || other.x_min > self.x_max)
    }

    /// Check the region is valid and fits in a frame of `rows` x `cols` pixels.
    pub fn fits(&self, rows: usize, cols: usize) -> bool {
        self.is_valid() && self.y_max < rows && self.x_max < cols
    }

    /// Iterate over `(y, x)` pixel coordinates, row-major.
    pub fn pixels(self) -> impl Iterator<Item = (usize, usize)> {
        (self.y_min..=self.y_max)
            .flat_map(move |y| (self.x_min..=self.x_max).map(move |x| (y, x)))
    }
}

impl From<[usize; 4]> for Region {
    fn from(r: [usize; 4]) -> Self {
        Region::new(r[0], r[1], r[2], r[3])
    }
}

impl From<Region> for [usize; 4] {
    fn from(r: Region) -> Self {
        [r.y_min, r.y_max, r.x_min, r.x_max]
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.y_min, self.y_max, self.x_min, self.x_max
        )
    }
}

/// Average each frame over a region.
///
/// Returns the per-frame mean and its Poisson uncertainty
/// `sqrt(sum) / pixel_count`. The region must fit the frames.
pub fn region_mean(frames: ArrayView3<f64>, region: &Region) -> (Array1<f64>, Array1<f64>) {
    let pixels = region.pixel_count() as f64;
    let sums = Array1::from_iter(frames.outer_iter().map(|frame| {
        frame
            .slice(s![region.y_min..=region.y_max, region.x_min..=region.x_max])
            .sum()
    }));

    (sums.mapv(|v| v / pixels), sums.mapv(|v| v.sqrt() / pixels))
}

/// Average each frame over `region` while skipping every pixel of `exclude`.
///
/// A region entirely covered by `exclude` yields zeros.
pub fn masked_region_mean(
    frames: ArrayView3<f64>,
    region: &Region,
    exclude: &Region,
) -> (Array1<f64>, Array1<f64>) {
    let kept: Vec<(usize, usize)> = region
        .pixels()
        .filter(|&(y, x)| !exclude.contains(y, x))
        .collect();

    let n_frames = frames.len_of(ndarray::Axis(0));
    if kept.is_empty() {
        log::warn!(
            "background region {} lies inside signal region {}, background set to zero",
            region,
            exclude
        );
        return (Array1::zeros(n_frames), Array1::zeros(n_frames));
    }

    let pixels = kept.len() as f64;
    let sums = Array1::from_iter(
        frames
            .outer_iter()
            .map(|frame| kept.iter().map(|&(y, x)| frame[[y, x]]).sum::<f64>()),
    );

    (sums.mapv(|v| v / pixels), sums.mapv(|v| v.sqrt() / pixels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// Frame where pixel (y, x) holds `10 * y + x`.
    fn indexed_frames(n: usize) -> Array3<f64> {
        Array3::from_shape_fn((n, 6, 6), |(_, y, x)| (10 * y + x) as f64)
    }

    #[test]
    fn test_pixel_count_inclusive() {
        assert_eq!(Region::new(0, 0, 0, 0).pixel_count(), 1);
        assert_eq!(Region::new(1, 3, 2, 5).pixel_count(), 12);
    }

    #[test]
    fn test_inverted_region_never_fits() {
        let inverted = Region::new(5, 2, 0, 1);
        assert_eq!(inverted.pixel_count(), 0);
        assert!(!inverted.fits(8, 8));
    }

    #[test]
    fn test_overlap() {
        let a = Region::new(0, 2, 0, 2);
        assert!(a.overlaps(&Region::new(2, 4, 2, 4)));
        assert!(!a.overlaps(&Region::new(3, 4, 0, 2)));
        assert!(!a.overlaps(&Region::new(0, 2, 3, 5)));
    }

    #[test]
    fn test_region_mean() {
        let frames = Array3::from_elem((3, 4, 4), 4.0);
        let (mean, err) = region_mean(frames.view(), &Region::new(0, 1, 0, 1));

        assert_eq!(mean.to_vec(), vec![4.0; 3]);
        // sqrt(16) / 4
        assert_eq!(err.to_vec(), vec![1.0; 3]);
    }

    #[test]
    fn test_masked_mean_excludes_signal_pixels() {
        let frames = indexed_frames(2);
        let signal = Region::new(1, 2, 1, 2);
        let background = Region::new(0, 2, 0, 2);

        let (mean, _) = masked_region_mean(frames.view(), &background, &signal);

        // Background pixels minus the 2x2 signal block: (0,0) (0,1) (0,2) (1,0) (2,0)
        let expected = (0.0 + 1.0 + 2.0 + 10.0 + 20.0) / 5.0;
        assert!((mean[0] - expected).abs() < 1e-12);
        assert!((mean[1] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_masked_mean_fully_covered() {
        let frames = indexed_frames(2);
        let region = Region::new(1, 1, 1, 1);
        let (mean, err) = masked_region_mean(frames.view(), &region, &Region::new(0, 3, 0, 3));

        assert_eq!(mean.to_vec(), vec![0.0, 0.0]);
        assert_eq!(err.to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_serde_as_array() {
        let region: Region = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(region, Region::new(1, 2, 3, 4));
        assert_eq!(region.to_string(), "[1, 2, 3, 4]");
    }
}
