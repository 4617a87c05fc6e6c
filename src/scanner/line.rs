//! Pull-based line reader with one line of look-ahead

use crate::error::Result;
use std::io::BufRead;

/// A line-oriented cursor over a text source.
///
/// Buffers at most one line of look-ahead so section-boundary decisions
/// (`peek`) never lose input. Line endings (`\n`, `\r\n`) are stripped;
/// everything else is preserved, including trailing spaces that carry
/// column information in fixed-width formats.
pub struct LineScanner<R: BufRead> {
    reader: R,
    peeked: Option<Option<String>>,
    line_number: usize,
}

impl<R: BufRead> LineScanner<R> {
    /// Create a scanner over a buffered reader.
    pub fn new(reader: R) -> Self {
        LineScanner {
            reader,
            peeked: None,
            line_number: 0,
        }
    }

    /// The number of the most recently consumed line (1-based).
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Look at the next line without consuming it.
    ///
    /// Returns `None` at EOF.
    pub fn peek(&mut self) -> Result<Option<&str>> {
        if self.peeked.is_none() {
            self.peeked = Some(self.read_raw()?);
        }
        Ok(self.peeked.as_ref().and_then(|line| line.as_deref()))
    }

    /// Consume and return the next line.
    ///
    /// Returns `None` at EOF.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        let line = match self.peeked.take() {
            Some(buffered) => buffered,
            None => self.read_raw()?,
        };
        if line.is_some() {
            self.line_number += 1;
        }
        Ok(line)
    }

    fn read_raw(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(Some(buf))
    }
}
