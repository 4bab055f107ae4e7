use std::{
    fs,
    io::{self, prelude::*, SeekFrom},
    path, str,
};

use log::{trace, warn};
use thiserror::Error;

use super::super::{
    offset_index::OffsetIndex,
    traits::{PeakListSource, SeekRead},
};
use super::title::{ClusteredTitle, MGFTitle, TitleParser};

use crate::spectrum::PeakList;

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum MGFParserState {
    Start,
    FileHeader,
    ScanHeaders,
    Peaks,
    Between,
    Done,
    Error,
}

#[derive(Debug, Error)]
pub enum MGFError {
    #[error("Line {line_number}: title {title:?} is not of the form {expected}")]
    MalformedTitle {
        line_number: usize,
        title: String,
        expected: &'static str,
    },
    #[error("Line {line_number}: encountered a malformed peak line {line:?}")]
    MalformedPeakLine { line_number: usize, line: String },
    #[error("Line {line_number}: peak line {line:?} needs both an m/z and an intensity")]
    NotEnoughColumnsForPeakLine { line_number: usize, line: String },
    #[error("Line {line_number}: encountered a malformed header line: {message}")]
    MalformedHeaderLine { line_number: usize, message: String },
    #[error("Line {line_number}: record {title:?} ended without {missing}")]
    IncompleteRecord {
        line_number: usize,
        title: String,
        missing: &'static str,
    },
    #[error("Input ended inside the record opened on line {line_number}")]
    UnterminatedRecord { line_number: usize },
    #[error("Encountered an IO error: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
}

impl MGFError {
    /// The line the error was detected on, when the error came from the text itself
    pub fn line_number(&self) -> Option<usize> {
        match self {
            Self::MalformedTitle { line_number, .. }
            | Self::MalformedPeakLine { line_number, .. }
            | Self::NotEnoughColumnsForPeakLine { line_number, .. }
            | Self::MalformedHeaderLine { line_number, .. }
            | Self::IncompleteRecord { line_number, .. }
            | Self::UnterminatedRecord { line_number } => Some(*line_number),
            Self::IOError(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct PeakListBuilder {
    title: Option<MGFTitle>,
    raw_title: String,
    precursor_mz: Option<f64>,
    precursor_charge: Option<i32>,
    mz_array: Vec<f64>,
    intensity_array: Vec<f32>,
    start_line: usize,
}

impl PeakListBuilder {
    fn build(self, line_number: usize) -> Result<PeakList, MGFError> {
        let incomplete = |missing| MGFError::IncompleteRecord {
            line_number,
            title: self.raw_title.clone(),
            missing,
        };
        let title = self.title.clone().ok_or_else(|| incomplete("a TITLE"))?;
        let precursor_mz = self
            .precursor_mz
            .ok_or_else(|| incomplete("a PEPMASS"))?;
        let precursor_charge = self
            .precursor_charge
            .ok_or_else(|| incomplete("a CHARGE"))?;
        Ok(PeakList::new(
            title.cluster_id,
            title.spectrum_id,
            precursor_mz,
            precursor_charge,
            self.mz_array,
            self.intensity_array,
        ))
    }
}

/// A streaming parser for MGF files whose records are annotated with cluster
/// membership in their titles.
///
/// Records are produced one at a time as [`PeakList`]s, so arbitrarily large
/// files can be consumed without holding them in memory. How a `TITLE=` line is
/// split into cluster and spectrum identifiers is controlled by a [`TitleParser`].
///
/// When the source is seekable, [`MGFReaderType::new_indexed`] pre-scans the file
/// so that records may be retrieved by spectrum identifier through
/// [`PeakListSource`].
pub struct MGFReaderType<R: io::Read, T: TitleParser = ClusteredTitle> {
    pub handle: io::BufReader<R>,
    pub state: MGFParserState,
    title_parser: T,
    line_number: usize,
    index: OffsetIndex,
}

impl<R: io::Read> MGFReaderType<R, ClusteredTitle> {
    /// Create a new, unindexed MGF parser expecting `cluster_id;spectrum_identifier` titles
    pub fn new(file: R) -> Self {
        Self::with_title_parser(file, ClusteredTitle)
    }
}

impl<R: io::Read, T: TitleParser> MGFReaderType<R, T> {
    /// Create a new, unindexed MGF parser using `title_parser` to interpret titles
    pub fn with_title_parser(file: R, title_parser: T) -> Self {
        let handle = io::BufReader::with_capacity(1 << 16, file);
        Self {
            handle,
            state: MGFParserState::Start,
            title_parser,
            line_number: 0,
            index: OffsetIndex::default(),
        }
    }

    fn fail(&mut self, error: MGFError) -> MGFError {
        self.state = MGFParserState::Error;
        error
    }

    fn parse_peak_from_line(
        &mut self,
        line: &str,
        builder: &mut PeakListBuilder,
    ) -> Result<bool, MGFError> {
        if !line.starts_with(|c: char| c.is_ascii_digit()) {
            return Ok(false);
        }
        let mut it = line.split_ascii_whitespace();
        let (mz_token, intensity_token) = match (it.next(), it.next()) {
            (Some(mz), Some(intensity)) => (mz, intensity),
            _ => {
                return Err(self.fail(MGFError::NotEnoughColumnsForPeakLine {
                    line_number: self.line_number,
                    line: line.to_string(),
                }))
            }
        };
        match (mz_token.parse::<f64>(), intensity_token.parse::<f32>()) {
            (Ok(mz), Ok(intensity)) => {
                builder.mz_array.push(mz);
                builder.intensity_array.push(intensity);
                Ok(true)
            }
            _ => Err(self.fail(MGFError::MalformedPeakLine {
                line_number: self.line_number,
                line: line.to_string(),
            })),
        }
    }

    fn parse_charge(&mut self, value: &str) -> Result<i32, MGFError> {
        let (sign, value, tail_sign) = if let Some(stripped) = value.strip_suffix('+') {
            (1, stripped, true)
        } else if let Some(stripped) = value.strip_suffix('-') {
            (-1, stripped, true)
        } else {
            (1, value, false)
        };

        if tail_sign && (value.starts_with('-') || value.starts_with('+')) {
            return Err(self.fail(MGFError::MalformedHeaderLine {
                line_number: self.line_number,
                message: format!("Could not parse charge value {value}"),
            }));
        }

        match value.trim().parse::<i32>() {
            Ok(z) => Ok(sign * z),
            Err(e) => Err(self.fail(MGFError::MalformedHeaderLine {
                line_number: self.line_number,
                message: format!("Could not parse charge value {value} : {e}"),
            })),
        }
    }

    fn parse_pepmass(&mut self, value: &str) -> Result<f64, MGFError> {
        let token = match value.split_ascii_whitespace().next() {
            Some(token) => token,
            None => {
                return Err(self.fail(MGFError::MalformedHeaderLine {
                    line_number: self.line_number,
                    message: "No m/z value in PEPMASS header".into(),
                }))
            }
        };
        token.parse::<f64>().map_err(|e| {
            self.fail(MGFError::MalformedHeaderLine {
                line_number: self.line_number,
                message: format!("Malformed m/z value in PEPMASS header {value}: {e}"),
            })
        })
    }

    fn handle_scan_header(
        &mut self,
        line: &str,
        builder: &mut PeakListBuilder,
    ) -> Result<bool, MGFError> {
        if self.parse_peak_from_line(line, builder)? {
            self.state = MGFParserState::Peaks;
            Ok(true)
        } else if line == "END IONS" {
            self.state = MGFParserState::Between;
            Ok(false)
        } else if let Some((key, value)) = line.split_once('=') {
            let value = value.trim();
            match key {
                "TITLE" => {
                    builder.raw_title = value.to_string();
                    match self.title_parser.parse_title(value) {
                        Some(title) => builder.title = Some(title),
                        None => {
                            let expected = self.title_parser.expected();
                            return Err(self.fail(MGFError::MalformedTitle {
                                line_number: self.line_number,
                                title: value.to_string(),
                                expected,
                            }));
                        }
                    }
                }
                "PEPMASS" => builder.precursor_mz = Some(self.parse_pepmass(value)?),
                "CHARGE" => builder.precursor_charge = Some(self.parse_charge(value)?),
                _ => {
                    trace!("Ignoring header {key} on line {}", self.line_number);
                }
            }
            Ok(true)
        } else {
            Err(self.fail(MGFError::MalformedHeaderLine {
                line_number: self.line_number,
                message: format!("No '=' in header line {line:?}"),
            }))
        }
    }

    fn handle_peak(&mut self, line: &str, builder: &mut PeakListBuilder) -> Result<bool, MGFError> {
        if self.parse_peak_from_line(line, builder)? {
            Ok(true)
        } else if line == "END IONS" {
            self.state = MGFParserState::Between;
            Ok(false)
        } else {
            Err(self.fail(MGFError::MalformedPeakLine {
                line_number: self.line_number,
                line: line.to_string(),
            }))
        }
    }

    /// Outside of a record, wait for `BEGIN IONS` or a `TITLE=` line to open the next one.
    fn handle_between(
        &mut self,
        line: &str,
        builder: &mut PeakListBuilder,
    ) -> Result<bool, MGFError> {
        if line == "BEGIN IONS" {
            self.state = MGFParserState::ScanHeaders;
            builder.start_line = self.line_number;
            Ok(true)
        } else if line.starts_with("TITLE=") {
            self.state = MGFParserState::ScanHeaders;
            builder.start_line = self.line_number;
            self.handle_scan_header(line, builder)
        } else {
            if self.state == MGFParserState::Start && line.contains('=') {
                self.state = MGFParserState::FileHeader;
            }
            trace!("Skipping line {} outside of a record", self.line_number);
            Ok(true)
        }
    }

    fn read_line(&mut self, buffer: &mut String) -> io::Result<usize> {
        let b = self.handle.read_line(buffer)?;
        if b > 0 {
            self.line_number += 1;
        }
        Ok(b)
    }

    /// Read the next record's contents into `builder`, returning the number of bytes
    /// consumed and whether a record was opened.
    fn parse_into(&mut self, builder: &mut PeakListBuilder) -> Result<(usize, bool), MGFError> {
        let mut buffer = String::new();
        let mut work = true;
        let mut offset: usize = 0;
        let mut started = false;

        while work {
            buffer.clear();
            let b = match self.read_line(&mut buffer) {
                Ok(b) => b,
                Err(err) => return Err(self.fail(err.into())),
            };

            offset += b;
            if b == 0 {
                if matches!(
                    self.state,
                    MGFParserState::ScanHeaders | MGFParserState::Peaks
                ) {
                    let start_line = builder.start_line;
                    return Err(self.fail(MGFError::UnterminatedRecord {
                        line_number: start_line,
                    }));
                }
                self.state = MGFParserState::Done;
                break;
            }

            let line = buffer.trim();
            if line.is_empty() {
                continue;
            }

            work = match self.state {
                MGFParserState::Start | MGFParserState::FileHeader | MGFParserState::Between => {
                    self.handle_between(line, builder)?
                }
                MGFParserState::ScanHeaders => self.handle_scan_header(line, builder)?,
                MGFParserState::Peaks => self.handle_peak(line, builder)?,
                MGFParserState::Done | MGFParserState::Error => false,
            };
            if matches!(self.state, MGFParserState::ScanHeaders) {
                started = true;
            }
        }
        Ok((offset, started))
    }

    /// Read the next record from the stream, if there is one.
    ///
    /// Returns `None` once the stream is exhausted or after an error has been reported.
    pub fn read_next(&mut self) -> Option<Result<PeakList, MGFError>> {
        if matches!(self.state, MGFParserState::Done | MGFParserState::Error) {
            return None;
        }
        let mut builder = PeakListBuilder::default();
        match self.parse_into(&mut builder) {
            Ok((_, true)) => {
                let line_number = self.line_number;
                Some(builder.build(line_number).map_err(|e| self.fail(e)))
            }
            Ok((_, false)) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<R: io::Read, T: TitleParser> Iterator for MGFReaderType<R, T> {
    type Item = Result<PeakList, MGFError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next()
    }
}

impl<R: SeekRead, T: TitleParser> MGFReaderType<R, T> {
    /// Construct a new reader and build an offset index using [`Self::build_index`]
    pub fn new_indexed(file: R, title_parser: T) -> Result<Self, MGFError> {
        let mut reader = Self::with_title_parser(file, title_parser);
        reader.build_index()?;
        Ok(reader)
    }

    pub fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.handle.seek(pos)
    }

    /// Builds an offset index to each `BEGIN IONS` line, keyed by the spectrum
    /// identifier of its title, by doing a fast pre-scan of the text file.
    pub fn build_index(&mut self) -> Result<u64, MGFError> {
        let mut offset: u64 = 0;
        let mut last_start: u64 = 0;
        let mut found_start = false;

        let start = self.handle.stream_position()?;
        self.seek(SeekFrom::Start(0))?;

        let mut buffer: Vec<u8> = Vec::new();
        loop {
            buffer.clear();
            let b = self.handle.read_until(b'\n', &mut buffer)?;
            if b == 0 {
                break;
            }
            if buffer.starts_with(b"BEGIN IONS") {
                found_start = true;
                last_start = offset;
            } else if found_start && buffer.starts_with(b"TITLE=") {
                match str::from_utf8(&buffer[6..]) {
                    Ok(text) => match self.title_parser.parse_title(text.trim()) {
                        Some(title) => {
                            if let Some(previous) =
                                self.index.insert(title.spectrum_id.as_str(), last_start)
                            {
                                warn!(
                                    "Spectrum {} appears more than once, using the record at byte {last_start} over the one at {previous}",
                                    title.spectrum_id
                                );
                            }
                        }
                        None => warn!("Skipping unparsable title {:?} while indexing", text.trim()),
                    },
                    Err(err) => warn!("Skipping non-UTF8 title while indexing: {err}"),
                };
                found_start = false;
                last_start = 0;
            }
            offset += b as u64;
        }
        self.seek(SeekFrom::Start(start))?;
        self.index.mark_built();
        if self.index.is_empty() {
            warn!("An index was built but no entries were found")
        }
        Ok(offset)
    }

    /// The number of indexed records
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn read_at(&mut self, offset: u64) -> Result<Option<PeakList>, MGFError> {
        let start = self.handle.stream_position()?;
        let saved_state = self.state;
        let saved_line = self.line_number;
        self.seek(SeekFrom::Start(offset))?;
        self.state = MGFParserState::Between;
        let result = self.read_next().transpose();
        self.seek(SeekFrom::Start(start))?;
        self.state = saved_state;
        self.line_number = saved_line;
        result
    }

    /// Retrieve a record by its spectrum identifier
    pub fn get_by_id(&mut self, id: &str) -> Result<Option<PeakList>, MGFError> {
        if !self.index.is_built() {
            warn!("Looking up {id} before the offset index was built");
        }
        match self.index.get(id) {
            Some(offset) => self.read_at(offset),
            None => Ok(None),
        }
    }
}

impl<R: SeekRead, T: TitleParser> PeakListSource for MGFReaderType<R, T> {
    fn get_peak_list_by_id(&mut self, id: &str) -> Option<PeakList> {
        match self.get_by_id(id) {
            Ok(peak_list) => peak_list,
            Err(e) => {
                warn!("Failed to read spectrum {id}: {e}");
                None
            }
        }
    }
}

impl MGFReaderType<fs::File, ClusteredTitle> {
    pub fn open_path<P: AsRef<path::Path>>(path: P) -> io::Result<Self> {
        Ok(Self::new(fs::File::open(path)?))
    }
}

pub type MGFReader<R> = MGFReaderType<R, ClusteredTitle>;
