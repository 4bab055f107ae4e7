use std::fs;
use std::io::{self, prelude::*};
use std::path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

pub fn is_gzipped(header: &[u8]) -> bool {
    header.starts_with(b"\x1f\x8b")
}

pub fn is_gzipped_extension(path: path::PathBuf) -> (bool, path::PathBuf) {
    if let Some(ext) = path.extension() {
        if ext.to_ascii_lowercase() == "gz" {
            (true, path.with_extension(""))
        } else {
            (false, path)
        }
    } else {
        (false, path)
    }
}

/// Open `path` for reading, transparently decompressing it if it starts with the
/// gzip magic bytes.
pub fn open_input<P: AsRef<path::Path>>(path: P) -> io::Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    let mut handle = io::BufReader::new(fs::File::open(path)?);
    let gzipped = is_gzipped(handle.fill_buf()?);
    if gzipped {
        log::debug!("Reading {} as gzip-compressed", path.display());
        Ok(Box::new(MultiGzDecoder::new(handle)))
    } else {
        Ok(Box::new(handle))
    }
}

/// A file to write output to, optionally gzip-compressed
pub enum OutputSink {
    Plain(fs::File),
    Gzip(GzEncoder<fs::File>),
}

impl OutputSink {
    /// Complete the stream, writing the gzip trailer if there is one
    pub fn finish(self) -> io::Result<fs::File> {
        match self {
            Self::Plain(mut handle) => {
                handle.flush()?;
                Ok(handle)
            }
            Self::Gzip(encoder) => encoder.finish(),
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(handle) => handle.write(buf),
            Self::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(handle) => handle.flush(),
            Self::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Create `path` for writing. A `.gz` extension selects gzip compression.
pub fn create_output<P: AsRef<path::Path>>(path: P) -> io::Result<OutputSink> {
    let path = path.as_ref();
    let handle = fs::File::create(path)?;
    let (gzipped, _) = is_gzipped_extension(path.to_path_buf());
    if gzipped {
        Ok(OutputSink::Gzip(GzEncoder::new(handle, Compression::default())))
    } else {
        Ok(OutputSink::Plain(handle))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_gzip_round_trip() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("peaks.mgf.gz");
        let mut sink = create_output(&path)?;
        assert!(matches!(sink, OutputSink::Gzip(_)));
        sink.write_all(b"BEGIN IONS\nEND IONS\n")?;
        sink.finish()?;

        let mut header = [0u8; 2];
        fs::File::open(&path)?.read_exact(&mut header)?;
        assert!(is_gzipped(&header));

        let mut text = String::new();
        open_input(&path)?.read_to_string(&mut text)?;
        assert_eq!(text, "BEGIN IONS\nEND IONS\n");
        Ok(())
    }

    #[test]
    fn test_plain_passthrough() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("peaks.mgf");
        let mut sink = create_output(&path)?;
        assert!(matches!(sink, OutputSink::Plain(_)));
        sink.write_all(b"TITLE=1;a\n")?;
        sink.finish()?;

        let mut text = String::new();
        open_input(&path)?.read_to_string(&mut text)?;
        assert_eq!(text, "TITLE=1;a\n");
        Ok(())
    }

    #[test]
    fn test_extension_detection() {
        let (gz, stem) = is_gzipped_extension("merged.mgf.GZ".into());
        assert!(gz);
        assert_eq!(stem, path::PathBuf::from("merged.mgf"));
        let (gz, _) = is_gzipped_extension("merged.mgf".into());
        assert!(!gz);
    }
}
