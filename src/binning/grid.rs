use super::ConsensusError;

/// A fixed-width partition of the m/z axis spanning `[minimum, maximum)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinGrid {
    minimum: f64,
    maximum: f64,
    bin_width: f64,
    n_bins: usize,
}

impl Default for BinGrid {
    fn default() -> Self {
        Self::new_unchecked(100.0, 2000.0, 0.02)
    }
}

impl BinGrid {
    fn new_unchecked(minimum: f64, maximum: f64, bin_width: f64) -> Self {
        let n_bins = ((maximum - minimum) / bin_width).floor() as usize + 1;
        Self {
            minimum,
            maximum,
            bin_width,
            n_bins,
        }
    }

    pub fn new(minimum: f64, maximum: f64, bin_width: f64) -> Result<Self, ConsensusError> {
        if !(minimum.is_finite() && maximum.is_finite() && bin_width.is_finite()) {
            return Err(ConsensusError::InvalidBinGrid(format!(
                "bounds and width must be finite, got [{minimum}, {maximum}) by {bin_width}"
            )));
        }
        if bin_width <= 0.0 {
            return Err(ConsensusError::InvalidBinGrid(format!(
                "bin width must be positive, got {bin_width}"
            )));
        }
        if maximum <= minimum {
            return Err(ConsensusError::InvalidBinGrid(format!(
                "maximum {maximum} must be greater than minimum {minimum}"
            )));
        }
        Ok(Self::new_unchecked(minimum, maximum, bin_width))
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// The number of bins, `floor((maximum - minimum) / bin_width) + 1`
    pub fn len(&self) -> usize {
        self.n_bins
    }

    pub fn is_empty(&self) -> bool {
        self.n_bins == 0
    }

    #[inline]
    pub fn contains(&self, mz: f64) -> bool {
        mz >= self.minimum && mz < self.maximum
    }

    /// The bin `mz` falls into, or `None` when it lies outside `[minimum, maximum)`
    #[inline]
    pub fn bin_index(&self, mz: f64) -> Option<usize> {
        if !self.contains(mz) {
            return None;
        }
        let index = ((mz - self.minimum) / self.bin_width).floor() as usize;
        (index < self.n_bins).then_some(index)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_grid() {
        let grid = BinGrid::default();
        assert_eq!(grid.minimum(), 100.0);
        assert_eq!(grid.maximum(), 2000.0);
        assert_eq!(grid.bin_width(), 0.02);
        assert!(grid.len() == 95000 || grid.len() == 95001, "{}", grid.len());
    }

    #[test]
    fn test_half_open_range() {
        let grid = BinGrid::default();
        assert_eq!(grid.bin_index(100.0), Some(0));
        assert_eq!(grid.bin_index(99.9999), None);
        assert_eq!(grid.bin_index(2000.0), None);
        assert!(grid.bin_index(1999.9999).unwrap() < grid.len());
        assert_eq!(grid.bin_index(f64::NAN), None);
    }

    #[test]
    fn test_exact_bin_count() {
        let grid = BinGrid::new(0.0, 10.0, 1.0).unwrap();
        assert_eq!(grid.len(), 11);
        assert_eq!(grid.bin_index(9.5), Some(9));
        assert_eq!(grid.bin_index(0.99), Some(0));
        assert_eq!(grid.bin_index(1.0), Some(1));
    }

    #[test]
    fn test_invalid_grids() {
        assert!(matches!(
            BinGrid::new(100.0, 2000.0, 0.0),
            Err(ConsensusError::InvalidBinGrid(_))
        ));
        assert!(BinGrid::new(100.0, 2000.0, -1.0).is_err());
        assert!(BinGrid::new(2000.0, 100.0, 0.02).is_err());
        assert!(BinGrid::new(100.0, 100.0, 0.02).is_err());
        assert!(BinGrid::new(f64::NAN, 100.0, 0.02).is_err());
        assert!(BinGrid::new(100.0, f64::INFINITY, 0.02).is_err());
    }
}
