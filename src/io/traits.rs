use std::collections::HashMap;
use std::io;

use crate::spectrum::{ConsensusSpectrum, PeakList};

pub trait SeekRead: io::Read + io::Seek {}
impl<T: io::Read + io::Seek> SeekRead for T {}

/// A source of peak lists that can be looked up by spectrum identifier.
///
/// This is the seam for readers over other acquisition formats. The consensus
/// machinery only cares that a [`PeakList`] comes back, not how it was read.
pub trait PeakListSource {
    /// Retrieve the peak list for the spectrum identified by `id`
    fn get_peak_list_by_id(&mut self, id: &str) -> Option<PeakList>;
}

impl PeakListSource for HashMap<String, PeakList> {
    fn get_peak_list_by_id(&mut self, id: &str) -> Option<PeakList> {
        self.get(id).cloned()
    }
}

/// A destination for consensus spectra, written one record at a time
pub trait ConsensusWriter {
    /// Write a single spectrum, returning the number of records written
    fn write(&mut self, spectrum: &ConsensusSpectrum) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()>;

    /// Flush and finalize the underlying stream
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}
