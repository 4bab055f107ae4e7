use log::trace;

use crate::spectrum::{ConsensusSpectrum, PeakList};

use super::accumulator::BinAccumulator;
use super::grid::BinGrid;
use super::ConsensusError;

/// Whether a bin must be supported by a minimum number of cluster members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QuorumPolicy {
    /// Require `floor(0.25 * N) + 1` members
    #[default]
    Enabled,
    /// Keep any bin at least one member contributed to
    Disabled,
}

impl QuorumPolicy {
    /// The minimum number of members that must hit a bin in a cluster of `n_members`
    pub fn quorum(&self, n_members: usize) -> u32 {
        match self {
            Self::Enabled => (n_members / 4) as u32 + 1,
            Self::Disabled => 1,
        }
    }
}

impl From<bool> for QuorumPolicy {
    fn from(value: bool) -> Self {
        if value {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

/// How to lay out and filter the consensus bins
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinningParameters {
    pub grid: BinGrid,
    pub quorum: QuorumPolicy,
}

impl BinningParameters {
    pub fn new(grid: BinGrid, quorum: QuorumPolicy) -> Self {
        Self { grid, quorum }
    }

    pub fn with_grid(mut self, grid: BinGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_quorum(mut self, quorum: QuorumPolicy) -> Self {
        self.quorum = quorum;
        self
    }
}

/// Reduce the members of one cluster into a [`ConsensusSpectrum`].
///
/// Every in-range peak is added to its bin, then bins hit by fewer members than the
/// quorum are discarded and the rest report their mean m/z and mean intensity. The
/// precursor m/z is averaged over all members.
///
/// # Errors
/// - [`ConsensusError::EmptyCluster`] when `peak_lists` is empty
/// - [`ConsensusError::InconsistentCharge`] when the members disagree on precursor charge
pub fn combine_bin_mean(
    peak_lists: &[PeakList],
    params: &BinningParameters,
) -> Result<ConsensusSpectrum, ConsensusError> {
    let first = peak_lists
        .first()
        .ok_or(ConsensusError::EmptyCluster)?;
    let cluster_id = first.cluster_id().to_string();

    let n_members = peak_lists.len();
    let quorum = params.quorum.quorum(n_members);

    let mut accumulator = BinAccumulator::new(params.grid);
    let mut precursor_mz_sum = 0.0;
    for peak_list in peak_lists {
        let n_added = accumulator.add_peak_list(peak_list);
        trace!(
            "{} contributed {} of {} peaks to cluster {}",
            peak_list.spectrum_id(),
            n_added,
            peak_list.len(),
            cluster_id
        );
        precursor_mz_sum += peak_list.precursor_mz();
    }

    let precursor_charge = first.precursor_charge();
    if peak_lists
        .iter()
        .any(|p| p.precursor_charge() != precursor_charge)
    {
        return Err(ConsensusError::InconsistentCharge {
            cluster_id,
            charges: peak_lists.iter().map(|p| p.precursor_charge()).collect(),
        });
    }

    let (mz_array, intensity_array) = accumulator.into_arrays(quorum);
    trace!(
        "Cluster {cluster_id} kept {} bins with quorum {quorum} over {n_members} members",
        mz_array.len()
    );

    Ok(ConsensusSpectrum {
        cluster_id,
        mz_array,
        intensity_array,
        precursor_mz: precursor_mz_sum / n_members as f64,
        precursor_charge,
        n_members,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn member(i: usize, mzs: Vec<f64>, intensities: Vec<f32>) -> PeakList {
        PeakList::new("17", format!("mzspec:PXD0:run:scan:{i}"), 600.0, 2, mzs, intensities)
    }

    #[test]
    fn test_quorum_sizes() {
        let q = QuorumPolicy::Enabled;
        assert_eq!(q.quorum(1), 1);
        assert_eq!(q.quorum(3), 1);
        assert_eq!(q.quorum(4), 2);
        assert_eq!(q.quorum(7), 2);
        assert_eq!(q.quorum(8), 3);
        assert_eq!(q.quorum(100), 26);
        assert_eq!(QuorumPolicy::Disabled.quorum(100), 1);
        assert_eq!(QuorumPolicy::from(false), QuorumPolicy::Disabled);
    }

    #[test_log::test]
    fn test_four_member_scenario() {
        let members: Vec<PeakList> = [(10.0, 600.1), (20.0, 600.2), (30.0, 600.3), (40.0, 600.4)]
            .into_iter()
            .enumerate()
            .map(|(i, (intensity, prec))| {
                PeakList::new("c1", format!("s{i}"), prec, 2, vec![500.0], vec![intensity])
            })
            .collect();
        let consensus = combine_bin_mean(&members, &BinningParameters::default()).unwrap();
        assert_eq!(consensus.cluster_id, "c1");
        assert_eq!(consensus.len(), 1);
        assert!((consensus.mz_array[0] - 500.0).abs() < 1e-9);
        assert_eq!(consensus.intensity_array[0], 25.0);
        assert!((consensus.precursor_mz - 600.25).abs() < 1e-9);
        assert_eq!(consensus.precursor_charge, 2);
        assert_eq!(consensus.n_members, 4);
    }

    #[test]
    fn test_single_member_unfiltered() {
        let mzs = vec![150.0, 720.31, 1999.5, 250.125];
        let intensities = vec![1.0, 2.5, 3.0, 4.0];
        let members = vec![member(0, mzs.clone(), intensities)];
        let consensus = combine_bin_mean(&members, &BinningParameters::default()).unwrap();
        assert_eq!(consensus.len(), 4);
        let mut expected = mzs;
        expected.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(consensus.mz_array, expected);
        assert_eq!(consensus.intensity_array, vec![1.0, 4.0, 2.5, 3.0]);
    }

    #[test]
    fn test_single_member_peaks_sharing_a_bin() {
        let members = vec![member(0, vec![500.001, 500.011], vec![10.0, 30.0])];
        let consensus = combine_bin_mean(&members, &BinningParameters::default()).unwrap();
        assert_eq!(consensus.intensity_array, vec![20.0]);
        assert_eq!(consensus.len(), 1);
        assert!((consensus.mz_array[0] - 500.006).abs() < 1e-9, "{:?}", consensus.mz_array);
    }

    #[test]
    fn test_quorum_filters_sparse_bins() {
        // 4 members, quorum 2: the 300.00 bin is hit by two members, 400.00 by one
        let members = vec![
            member(0, vec![300.005, 400.005], vec![10.0, 50.0]),
            member(1, vec![300.007], vec![30.0]),
            member(2, vec![800.0], vec![1.0]),
            member(3, vec![], vec![]),
        ];
        let consensus = combine_bin_mean(&members, &BinningParameters::default()).unwrap();
        assert_eq!(consensus.len(), 1);
        assert!((consensus.mz_array[0] - 300.006).abs() < 1e-9);
        assert_eq!(consensus.intensity_array[0], 20.0);

        let params = BinningParameters::default().with_quorum(QuorumPolicy::Disabled);
        let consensus = combine_bin_mean(&members, &params).unwrap();
        assert_eq!(consensus.len(), 3);
        assert!(consensus.mz_array.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_quorum_property() {
        let grid = BinGrid::new(100.0, 200.0, 1.0).unwrap();
        let params = BinningParameters::default().with_grid(grid);
        // Member i has a peak in every bin b with b % (i + 1) == 0
        let members: Vec<PeakList> = (0..9)
            .map(|i| {
                let mzs: Vec<f64> = (0..100)
                    .filter(|b| b % (i + 1) == 0)
                    .map(|b| 100.5 + b as f64)
                    .collect();
                let intensities = vec![1.0; mzs.len()];
                member(i, mzs, intensities)
            })
            .collect();
        let quorum = QuorumPolicy::Enabled.quorum(members.len()) as usize;
        assert_eq!(quorum, 3);
        let consensus = combine_bin_mean(&members, &params).unwrap();

        for b in 0..100usize {
            let support = (0..9).filter(|i| b % (i + 1) == 0).count();
            let mz = 100.5 + b as f64;
            let present = consensus.mz_array.iter().any(|m| (m - mz).abs() < 1e-9);
            assert_eq!(present, support >= quorum, "bin {b} support {support}");
        }
    }

    #[test]
    fn test_upper_bound_excluded() {
        let members = vec![member(0, vec![2000.0, 100.0, 99.99], vec![5.0, 6.0, 7.0])];
        let consensus = combine_bin_mean(&members, &BinningParameters::default()).unwrap();
        assert_eq!(consensus.mz_array, vec![100.0]);
        assert_eq!(consensus.intensity_array, vec![6.0]);
    }

    #[test]
    fn test_inconsistent_charge() {
        let members = vec![
            PeakList::new("9", "a", 500.0, 2, vec![300.0], vec![1.0]),
            PeakList::new("9", "b", 500.0, 3, vec![300.0], vec![1.0]),
        ];
        let err = combine_bin_mean(&members, &BinningParameters::default()).unwrap_err();
        assert_eq!(
            err,
            ConsensusError::InconsistentCharge {
                cluster_id: "9".into(),
                charges: vec![2, 3]
            }
        );
        assert_eq!(err.cluster_id(), Some("9"));
    }

    #[test]
    fn test_empty_cluster() {
        let err = combine_bin_mean(&[], &BinningParameters::default()).unwrap_err();
        assert_eq!(err, ConsensusError::EmptyCluster);
        assert_eq!(err.cluster_id(), None);
        assert_eq!(err.to_string(), "Cannot build a consensus spectrum from an empty cluster");
    }

    #[test]
    fn test_deterministic() {
        let members: Vec<PeakList> = (0..12)
            .map(|i| {
                let mzs: Vec<f64> = (0..50).map(|j| 150.0 + j as f64 * 13.37 + i as f64 * 0.001).collect();
                let intensities: Vec<f32> = (0..50).map(|j| (j * (i + 1)) as f32 * 0.37).collect();
                member(i, mzs, intensities)
            })
            .collect();
        let params = BinningParameters::default();
        let a = combine_bin_mean(&members, &params).unwrap();
        let b = combine_bin_mean(&members, &params).unwrap();
        assert_eq!(a, b);

        // Summation order only perturbs results within floating point tolerance
        let mut reversed = members.clone();
        reversed.reverse();
        let c = combine_bin_mean(&reversed, &params).unwrap();
        assert_eq!(a.len(), c.len());
        for ((m1, i1), (m2, i2)) in a.iter().zip(c.iter()) {
            assert!((m1 - m2).abs() < 1e-9);
            assert!((i1 - i2).abs() <= 1e-4 * i1.abs().max(1.0));
        }
        assert!((a.precursor_mz - c.precursor_mz).abs() < 1e-9);
    }
}
