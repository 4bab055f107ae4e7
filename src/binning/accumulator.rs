use crate::spectrum::PeakList;

use super::grid::BinGrid;

/// Per-bin running sums for one cluster.
///
/// Every in-range peak adds to its bin's m/z sum, intensity sum and peak count.
/// Separately, each bin counts how many distinct members reached it, which is
/// what the quorum is tested against. Each cluster gets its own accumulator,
/// dropped once the consensus arrays have been extracted.
#[derive(Debug, Clone)]
pub struct BinAccumulator {
    grid: BinGrid,
    intensity_sums: Vec<f64>,
    mz_sums: Vec<f64>,
    peak_counts: Vec<u32>,
    member_counts: Vec<u32>,
    /// 1-based ordinal of the last member to reach each bin, 0 if none has
    last_member: Vec<u32>,
    n_members: u32,
}

impl BinAccumulator {
    pub fn new(grid: BinGrid) -> Self {
        let n = grid.len();
        Self {
            grid,
            intensity_sums: vec![0.0; n],
            mz_sums: vec![0.0; n],
            peak_counts: vec![0; n],
            member_counts: vec![0; n],
            last_member: vec![0; n],
            n_members: 0,
        }
    }

    /// Add every in-range peak of `peak_list` as one more member, returning how
    /// many of its peaks fell on the grid. Peaks outside the grid are dropped.
    pub fn add_peak_list(&mut self, peak_list: &PeakList) -> usize {
        self.n_members += 1;
        let member = self.n_members;
        let mut n_added = 0;
        for (mz, intensity) in peak_list.iter() {
            let Some(bin) = self.grid.bin_index(mz) else {
                continue;
            };
            self.peak_counts[bin] += 1;
            self.intensity_sums[bin] += intensity as f64;
            self.mz_sums[bin] += mz;
            if self.last_member[bin] != member {
                self.last_member[bin] = member;
                self.member_counts[bin] += 1;
            }
            n_added += 1;
        }
        n_added
    }

    /// The number of distinct members that contributed to `bin`
    pub fn members(&self, bin: usize) -> u32 {
        self.member_counts.get(bin).copied().unwrap_or_default()
    }

    /// The number of peaks that landed in `bin`
    pub fn peaks(&self, bin: usize) -> u32 {
        self.peak_counts.get(bin).copied().unwrap_or_default()
    }

    /// The mean `(m/z, intensity)` over the peaks in `bin`, if at least `quorum`
    /// distinct members contributed to it.
    #[inline]
    pub fn resolve(&self, bin: usize, quorum: u32) -> Option<(f64, f32)> {
        let members = self.members(bin);
        if members == 0 || members < quorum {
            return None;
        }
        let n = self.peak_counts[bin] as f64;
        Some((self.mz_sums[bin] / n, (self.intensity_sums[bin] / n) as f32))
    }

    /// Collect the bins meeting `quorum` into parallel, ascending m/z and intensity arrays
    pub fn into_arrays(self, quorum: u32) -> (Vec<f64>, Vec<f32>) {
        let (mz_array, intensity_array) = (0..self.member_counts.len())
            .filter_map(|bin| self.resolve(bin, quorum))
            .unzip();
        (mz_array, intensity_array)
    }
}
