//! Reading clustered peak lists and writing consensus spectra.
pub mod cluster_list;
pub mod compression;
pub mod mgf;
mod offset_index;
pub mod traits;

pub use crate::io::cluster_list::{assemble_clusters, read_cluster_list};
pub use crate::io::compression::{create_output, open_input, OutputSink};
pub use crate::io::mgf::{
    ClusteredTitle, ConsensusTitle, MGFError, MGFReader, MGFReaderType, MGFTitle, MGFWriter,
    SpectrumTitle, TitleParser,
};
pub use crate::io::offset_index::OffsetIndex;
pub use crate::io::traits::{ConsensusWriter, PeakListSource, SeekRead};
