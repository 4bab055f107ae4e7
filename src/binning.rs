//! Reduce the members of one cluster into a single [`ConsensusSpectrum`](crate::spectrum::ConsensusSpectrum)
//! by accumulating peaks on a fixed-width m/z grid and keeping only those bins that enough
//! members contributed to.
//!
//! ```
//! use mzconsensus::binning::{combine_bin_mean, BinningParameters};
//! use mzconsensus::spectrum::PeakList;
//!
//! let members: Vec<PeakList> = (1..=4)
//!     .map(|i| PeakList::new("1", format!("scan={i}"), 600.0, 2, vec![500.0], vec![10.0 * i as f32]))
//!     .collect();
//! let consensus = combine_bin_mean(&members, &BinningParameters::default()).unwrap();
//! assert_eq!(consensus.intensity_array, vec![25.0]);
//! ```
use thiserror::Error;

mod accumulator;
mod combine;
mod grid;

pub use accumulator::BinAccumulator;
pub use combine::{combine_bin_mean, BinningParameters, QuorumPolicy};
pub use grid::BinGrid;

/// Failures that are scoped to a single cluster, or to the binning configuration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConsensusError {
    #[error("Cannot build a consensus spectrum from an empty cluster")]
    EmptyCluster,
    #[error("Not all precursor charges in cluster {cluster_id} are equal: {charges:?}")]
    InconsistentCharge {
        cluster_id: String,
        charges: Vec<i32>,
    },
    #[error("Invalid bin grid: {0}")]
    InvalidBinGrid(String),
}

impl ConsensusError {
    /// The cluster this error refers to, if any
    pub fn cluster_id(&self) -> Option<&str> {
        match self {
            Self::InconsistentCharge { cluster_id, .. } => Some(cluster_id),
            Self::EmptyCluster | Self::InvalidBinGrid(_) => None,
        }
    }
}
