// Elevation sample grid and its in-place transforms
use std::cell::Cell;

use crate::error::{Result, TerrainError};

/// Value rasters use for "no measurement". Treated as elevation zero.
pub const NO_DATA_SENTINEL: f32 = -f32::MAX;

/// Global minimum and maximum of a grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStats {
    pub min: f32,
    pub max: f32,
}

/// Row-major grid of elevation samples.
///
/// Imagine width is three, height is two and the samples are:
///
/// ```text
/// a b c
/// d e f
/// ```
///
/// They are stored as `a b c d e f`, so sample `(x, y)` lives at `x + y * width`.
///
/// Min/max are computed on first request and cached. Every mutating operation
/// clears the cache, so a `None` here means the statistics are dirty.
#[derive(Debug, Clone)]
pub struct SampleGrid {
    samples: Vec<f32>,
    width: usize,
    height: usize,
    stats: Cell<Option<GridStats>>,
}

impl SampleGrid {
    /// Create a grid from row-major samples
    pub fn new(samples: Vec<f32>, width: usize, height: usize) -> Result<Self> {
        if samples.is_empty() || width == 0 || height == 0 || samples.len() != width * height {
            return Err(TerrainError::InvalidGrid {
                len: samples.len(),
                width,
                height,
            });
        }

        Ok(Self {
            samples,
            width,
            height,
            stats: Cell::new(None),
        })
    }

    /// Create a grid from decoded raster samples, replacing no-data cells with zero.
    ///
    /// No-data cells are the [`NO_DATA_SENTINEL`], NaN, and `no_data` when the
    /// raster declares one.
    pub fn from_raster(
        mut samples: Vec<f32>,
        width: usize,
        height: usize,
        no_data: Option<f32>,
    ) -> Result<Self> {
        for sample in &mut samples {
            if *sample == NO_DATA_SENTINEL || sample.is_nan() || Some(*sample) == no_data {
                *sample = 0.0;
            }
        }
        Self::new(samples, width, height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Get the sample at column `x`, row `y`.
    ///
    /// Panics when the position is outside the grid.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        assert!(
            x < self.width && y < self.height,
            "sample ({}, {}) out of bounds for {}x{} grid",
            x,
            y,
            self.width,
            self.height
        );
        self.samples[x + y * self.width]
    }

    /// Min and max over the whole buffer
    pub fn stats(&self) -> GridStats {
        if let Some(stats) = self.stats.get() {
            return stats;
        }

        let first = self.samples[0];
        let mut stats = GridStats {
            min: first,
            max: first,
        };
        for &sample in &self.samples {
            stats.min = stats.min.min(sample);
            stats.max = stats.max.max(sample);
        }

        self.stats.set(Some(stats));
        stats
    }

    pub fn min(&self) -> f32 {
        self.stats().min
    }

    pub fn max(&self) -> f32 {
        self.stats().max
    }

    /// Shift all samples so the lowest one equals `target`
    pub fn zero(&mut self, target: f32) {
        let min = self.min();
        for sample in &mut self.samples {
            *sample = *sample - min + target;
        }
        self.invalidate_stats();
    }

    /// Multiply every sample by `factor`
    pub fn scale(&mut self, factor: f32) {
        for sample in &mut self.samples {
            *sample *= factor;
        }
        self.invalidate_stats();
    }

    /// Subtract `other` sample by sample. Both grids must have the same dimensions.
    pub fn diff(&mut self, other: &SampleGrid) -> Result<()> {
        if (self.width, self.height) != (other.width, other.height) {
            return Err(TerrainError::DimensionMismatch {
                expected: (self.width, self.height),
                found: (other.width, other.height),
            });
        }

        for (sample, subtrahend) in self.samples.iter_mut().zip(&other.samples) {
            *sample -= subtrahend;
        }
        self.invalidate_stats();
        Ok(())
    }

    fn invalidate_stats(&mut self) {
        self.stats.set(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> SampleGrid {
        SampleGrid::new(
            vec![1.0, 1.1, 1.2, 0.9, 1.4, 2.5, 1.9, 1.1, 0.3, 0.4, 0.8, 0.6],
            4,
            3,
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(matches!(
            SampleGrid::new(vec![1.0; 5], 2, 3),
            Err(TerrainError::InvalidGrid { len: 5, width: 2, height: 3 })
        ));
        assert!(SampleGrid::new(Vec::new(), 0, 0).is_err());
    }

    #[test]
    fn test_get_is_row_major() {
        let grid = SampleGrid::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2).unwrap();
        assert_eq!(grid.get(0, 0), 1.0);
        assert_eq!(grid.get(2, 0), 3.0);
        assert_eq!(grid.get(0, 1), 4.0);
        assert_eq!(grid.get(2, 1), 6.0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_get_out_of_bounds_panics() {
        sample_grid().get(4, 0);
    }

    #[test]
    fn test_min_max_bound_every_sample() {
        let grid = sample_grid();
        let (min, max) = (grid.min(), grid.max());
        assert_eq!(min, 0.3);
        assert_eq!(max, 2.5);
        assert!(grid.samples().iter().all(|&s| min <= s && s <= max));
        assert!(grid.samples().contains(&min));
        assert!(grid.samples().contains(&max));
    }

    #[test]
    fn test_from_raster_zeroes_no_data() {
        let grid = SampleGrid::from_raster(
            vec![NO_DATA_SENTINEL, 4.0, f32::NAN, -9999.0],
            2,
            2,
            Some(-9999.0),
        )
        .unwrap();
        assert_eq!(grid.samples(), &[0.0, 4.0, 0.0, 0.0]);
        assert_eq!(grid.min(), 0.0);
    }

    #[test]
    fn test_zero_sets_minimum() {
        let mut grid = sample_grid();
        assert_eq!(grid.min(), 0.3);

        grid.zero(10.0);
        assert_eq!(grid.min(), 10.0);
        assert!((grid.max() - 12.2).abs() < 1e-5);

        grid.zero(-3.5);
        assert_eq!(grid.min(), -3.5);
    }

    #[test]
    fn test_scale_round_trip() {
        let original = sample_grid();
        let mut grid = original.clone();
        grid.scale(3.0);
        assert!((grid.max() - 7.5).abs() < 1e-5);

        grid.scale(1.0 / 3.0);
        for (a, b) in grid.samples().iter().zip(original.samples()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_negative_scale_refreshes_stats() {
        let mut grid = sample_grid();
        assert_eq!(grid.max(), 2.5);
        grid.scale(-1.0);
        assert_eq!(grid.min(), -2.5);
        assert_eq!(grid.max(), -0.3);
    }

    #[test]
    fn test_diff_is_anti_symmetric() {
        let a = sample_grid();
        let b = SampleGrid::new((0..12).map(|v| v as f32 * 0.25).collect(), 4, 3).unwrap();

        let mut a_minus_b = a.clone();
        a_minus_b.diff(&b).unwrap();
        a_minus_b.scale(-1.0);

        let mut b_minus_a = b.clone();
        b_minus_a.diff(&a).unwrap();

        assert_eq!(a_minus_b.samples(), b_minus_a.samples());
    }

    #[test]
    fn test_diff_rejects_mismatched_grids() {
        let mut a = sample_grid();
        let b = SampleGrid::new(vec![1.0; 6], 3, 2).unwrap();
        let err = a.diff(&b).unwrap_err();
        assert!(matches!(
            err,
            TerrainError::DimensionMismatch { expected: (4, 3), found: (3, 2) }
        ));
        // Left untouched
        assert_eq!(a.samples(), sample_grid().samples());
    }

    #[test]
    fn test_diff_refreshes_stats() {
        let mut a = sample_grid();
        assert_eq!(a.min(), 0.3);
        let ones = SampleGrid::new(vec![1.0; 12], 4, 3).unwrap();
        a.diff(&ones).unwrap();
        assert!((a.min() + 0.7).abs() < 1e-6);
        assert!((a.max() - 1.5).abs() < 1e-6);
    }
}
