//! Data source abstraction with transparent gzip decompression
//!
//! Compression is detected from content, not file extension: the reader
//! peeks at the first two bytes and looks for the gzip magic. Plain text
//! passes through untouched.

use crate::error::Result;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Where the bytes come from.
///
/// Sources opened by path are owned (and closed) by the reader built on
/// top of them; externally supplied streams stay with the caller.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A local file path
    Local(PathBuf),
}

impl DataSource {
    /// Create a local file data source.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        DataSource::Local(path.as_ref().to_path_buf())
    }

    /// Open the data source as a buffered reader.
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            DataSource::Local(path) => {
                let file = File::open(path)?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

/// A buffered reader with automatic gzip detection.
///
/// # Examples
///
/// ```no_run
/// use gbstream::io::{CompressedReader, DataSource};
///
/// # fn main() -> gbstream::Result<()> {
/// let source = DataSource::from_path("records.gb.gz");
/// let reader = CompressedReader::new(source)?;
/// // reader implements BufRead, hand it to the scanner
/// # Ok(())
/// # }
/// ```
pub struct CompressedReader {
    inner: Box<dyn BufRead + Send>,
}

impl CompressedReader {
    /// Open a data source, sniffing the gzip magic bytes.
    pub fn new(source: DataSource) -> Result<Self> {
        let mut reader = source.open()?;
        let magic = {
            let buffered = reader.fill_buf()?;
            (
                buffered.first().copied().unwrap_or(0),
                buffered.get(1).copied().unwrap_or(0),
            )
        };
        let inner: Box<dyn BufRead + Send> = if magic == (31, 139) {
            Box::new(BufReader::new(GzDecoder::new(reader)))
        } else {
            reader
        };
        Ok(CompressedReader { inner })
    }
}

impl Read for CompressedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for CompressedReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}
