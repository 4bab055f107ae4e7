use std::io::{self, prelude::*, BufWriter};

use crate::io::traits::ConsensusWriter;
use crate::spectrum::ConsensusSpectrum;

/// Writes [`ConsensusSpectrum`]s as MGF records, one at a time.
///
/// Each record carries the cluster identifier as its title, the mean precursor
/// m/z and the shared precursor charge, followed by the retained peaks in ascending
/// m/z order. Numbers are written with their shortest round-trip representation.
pub struct MGFWriterType<W: io::Write> {
    pub handle: io::BufWriter<W>,
    pub offset: usize,
}

impl<W: io::Write> MGFWriterType<W> {
    pub fn new(file: W) -> MGFWriterType<W> {
        let handle = io::BufWriter::with_capacity(1 << 16, file);
        MGFWriterType { handle, offset: 0 }
    }

    /// The number of records written so far
    pub fn len(&self) -> usize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }

    pub fn into_inner(self) -> BufWriter<W> {
        self.handle
    }

    /// Write a spectrum header `KEY=value`
    pub fn write_kv(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.handle.write_all(key.as_bytes())?;
        self.handle.write_all(b"=")?;
        self.handle.write_all(value.as_bytes())?;
        self.handle.write_all(b"\n")?;
        Ok(())
    }

    fn format_charge(charge: i32) -> String {
        if charge < 0 {
            format!("{}-", charge.unsigned_abs())
        } else {
            format!("{charge}+")
        }
    }

    /// Write the header of a spectrum, everything after `BEGIN IONS` and before
    /// the peak list.
    pub fn write_header(&mut self, spectrum: &ConsensusSpectrum) -> io::Result<()> {
        self.write_kv("TITLE", &spectrum.cluster_id)?;
        self.write_kv("PEPMASS", &spectrum.precursor_mz.to_string())?;
        self.write_kv("CHARGE", &Self::format_charge(spectrum.precursor_charge))?;
        Ok(())
    }

    /// Write the peak list of a spectrum, everything until the `END IONS`
    pub fn write_peaks(&mut self, spectrum: &ConsensusSpectrum) -> io::Result<()> {
        for (mz, intensity) in spectrum.iter() {
            self.handle.write_all(mz.to_string().as_bytes())?;
            self.handle.write_all(b" ")?;
            self.handle.write_all(intensity.to_string().as_bytes())?;
            self.handle.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Write a spectrum from start to finish, followed by a blank separator line
    pub fn write(&mut self, spectrum: &ConsensusSpectrum) -> io::Result<usize> {
        if spectrum.is_empty() {
            log::debug!(
                "Writing consensus spectrum for cluster {} with no peaks",
                spectrum.cluster_id
            );
        }
        self.handle.write_all(b"BEGIN IONS\n")?;
        self.write_header(spectrum)?;
        self.write_peaks(spectrum)?;
        self.handle.write_all(b"END IONS\n\n")?;
        self.offset += 1;
        Ok(1)
    }
}

impl<W: io::Write> ConsensusWriter for MGFWriterType<W> {
    fn write(&mut self, spectrum: &ConsensusSpectrum) -> io::Result<usize> {
        MGFWriterType::write(self, spectrum)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.handle.flush()
    }
}

pub type MGFWriter<W> = MGFWriterType<W>;
