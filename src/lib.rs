//! Build consensus spectra from clustered tandem mass spectra.
//!
//! A clustered MGF file groups many noisy MS/MS peak lists under shared cluster
//! identifiers. For each cluster, every member's peaks are accumulated on a fixed-width
//! m/z grid, bins supported by too few members are discarded, and the survivors become
//! one representative spectrum whose peaks are the per-bin mean m/z and mean intensity.
//!
//! ```no_run
//! use mzconsensus::{ConsensusPipeline, PipelineConfig};
//!
//! let pipeline = ConsensusPipeline::new(PipelineConfig::default().with_threads(4));
//! let summary = pipeline.run_paths("clustered.mgf", "merged_spectra.mgf")?;
//! println!("{} consensus spectra written", summary.n_written);
//! # Ok::<(), mzconsensus::PipelineError>(())
//! ```
pub mod binning;
pub mod io;
pub mod pipeline;
pub mod spectrum;

pub use crate::binning::{combine_bin_mean, BinGrid, BinningParameters, ConsensusError, QuorumPolicy};

pub use crate::io::mgf::{MGFError, MGFReader, MGFWriter};

pub use crate::pipeline::{
    ClusterFailurePolicy, ConsensusPipeline, PipelineConfig, PipelineError, PipelineSummary,
};

pub use crate::spectrum::{ClusterMap, ConsensusSpectrum, PeakList};
