//! The data model flowing through the consensus pipeline: raw [`PeakList`] records as read
//! from a clustered peak list, the [`ClusterMap`] grouping them, and the [`ConsensusSpectrum`]
//! produced for each cluster.
pub mod cluster;
pub mod consensus;
pub mod peak_list;

pub use crate::spectrum::cluster::{group_by_cluster, ClusterMap};
pub use crate::spectrum::consensus::ConsensusSpectrum;
pub use crate::spectrum::peak_list::{PeakList, UnpairedArrays};
