//! Streaming record iterator over GenBank files
//!
//! One record is held in memory at a time; files with thousands of records
//! parse in constant memory.

use crate::consumer::RecordBuilder;
use crate::error::{GbStreamError, Result};
use crate::io::{CompressedReader, DataSource};
use crate::record::Sequence;
use crate::scanner::GenBankScanner;
use std::io::BufRead;
use std::path::Path;

/// Streaming GenBank parser.
///
/// Yields one [`Sequence`] per record until EOF. A failed record is
/// yielded as an error and the iterator stays usable: the next call
/// resynchronizes at the next `LOCUS` line.
///
/// # Examples
///
/// ```no_run
/// use gbstream::GenBankStream;
///
/// # fn main() -> gbstream::Result<()> {
/// let stream = GenBankStream::from_path("sequences.gb.gz")?;
/// for record in stream {
///     let record = record?;
///     println!("{}: {} bp, {} features", record.name, record.len(), record.features.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct GenBankStream<R: BufRead> {
    scanner: GenBankScanner<R>,
    do_features: bool,
    finished: bool,
}

impl GenBankStream<CompressedReader> {
    /// Open a GenBank file by path.
    ///
    /// The file handle is owned by the stream; gzip-compressed files are
    /// detected from their magic bytes and decompressed transparently.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = CompressedReader::new(DataSource::from_path(path))?;
        Ok(Self::from_reader(reader))
    }
}

impl<R: BufRead> GenBankStream<R> {
    /// Parse records from an already-open reader.
    ///
    /// The reader is borrowed for the stream's lifetime and is never
    /// closed by the stream.
    pub fn from_reader(reader: R) -> Self {
        GenBankStream {
            scanner: GenBankScanner::new(reader),
            do_features: true,
            finished: false,
        }
    }

    /// Toggle feature-table parsing.
    ///
    /// With features off, blocks are still counted (the record's
    /// `feature_blocks` metadata is conserved) but locations and
    /// qualifiers are not parsed, which speeds up header-only scans.
    pub fn do_features(mut self, enabled: bool) -> Self {
        self.do_features = enabled;
        self
    }

    /// The number of the most recently consumed input line.
    pub fn line_number(&self) -> usize {
        self.scanner.line_number()
    }
}

impl<R: BufRead> Iterator for GenBankStream<R> {
    type Item = Result<Sequence>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let mut builder = RecordBuilder::new();
        match self.scanner.feed(&mut builder, self.do_features) {
            Ok(true) => Some(builder.into_record()),
            Ok(false) => {
                self.finished = true;
                None
            }
            Err(GbStreamError::Io(e)) => {
                // a broken stream will not recover
                self.finished = true;
                Some(Err(GbStreamError::Io(e)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
