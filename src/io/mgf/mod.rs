//! Read clustered [MGF](https://www.matrixscience.com/help/data_file_help.html#GEN) peak lists
//! and write consensus spectra back out in the same format.
//!
//! Records are delimited by `BEGIN IONS` / `END IONS`. The fields this crate reads are
//! `TITLE`, `PEPMASS`, `CHARGE` and the `m/z intensity` peak lines; other headers are
//! accepted and ignored.
mod reader;
mod title;
mod writer;

pub use reader::{MGFError, MGFParserState, MGFReader, MGFReaderType};
pub use title::{ClusteredTitle, ConsensusTitle, MGFTitle, SpectrumTitle, TitleParser};
pub use writer::{MGFWriter, MGFWriterType};
