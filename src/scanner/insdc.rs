//! Shared scanner skeleton for INSDC-style flat files
//!
//! GenBank and EMBL files share one large-scale shape: a record-start
//! keyword, a fixed-width header, a feature table with keys at one column
//! and qualifiers at another, then a footer and a sequence block. The
//! [`InsdcScanner`] implements everything that shape determines; a
//! format-specific layer supplies an [`InsdcLayout`] and interprets the
//! extracted chunks.

use crate::error::{GbStreamError, Result};
use crate::record::Qualifier;
use crate::scanner::LineScanner;
use std::io::BufRead;

/// Fixed-column layout parameters of one INSDC flavor.
pub struct InsdcLayout {
    /// Exact prefix of a record's first line (`"LOCUS       "`)
    pub record_start: &'static str,
    /// Width of the header keyword column
    pub header_width: usize,
    /// Lines that open the feature table
    pub feature_start_markers: &'static [&'static str],
    /// Lines that close the feature table (empty for GenBank)
    pub feature_end_markers: &'static [&'static str],
    /// Column where feature qualifiers begin
    pub feature_qualifier_indent: usize,
    /// Keywords that open the footer / sequence section
    pub sequence_headers: &'static [&'static str],
}

/// A feature block as extracted from the table: key, raw location text and
/// assembled qualifiers. Location and qualifiers stay empty in skip mode.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    /// Feature key (`source`, `CDS`, ...)
    pub key: String,
    /// The location expression, continuation lines concatenated
    pub location: String,
    /// The qualifiers, multi-line values assembled
    pub qualifiers: Vec<Qualifier>,
}

/// The shared INSDC scanning skeleton.
pub struct InsdcScanner<R: BufRead> {
    lines: LineScanner<R>,
    layout: &'static InsdcLayout,
    saw_record: bool,
}

impl<R: BufRead> InsdcScanner<R> {
    /// Create a scanner over a buffered reader with a format layout.
    pub fn new(reader: R, layout: &'static InsdcLayout) -> Self {
        InsdcScanner {
            lines: LineScanner::new(reader),
            layout,
            saw_record: false,
        }
    }

    /// The layout this scanner was built with.
    pub fn layout(&self) -> &'static InsdcLayout {
        self.layout
    }

    /// The number of the most recently consumed line.
    pub fn line_number(&self) -> usize {
        self.lines.line_number()
    }

    pub(crate) fn lines(&mut self) -> &mut LineScanner<R> {
        &mut self.lines
    }

    /// Skip to the first line of the next record.
    ///
    /// Blank lines, `//` terminators and preamble text are skipped. Before
    /// the first record, content whose first non-blank character is a digit
    /// fails with [`NotText`](GbStreamError::NotText). Returns `None` at
    /// EOF.
    pub fn find_start(&mut self) -> Result<Option<String>> {
        loop {
            let line = match self.lines.next_line()? {
                Some(line) => line,
                None => return Ok(None),
            };
            if line.starts_with(self.layout.record_start) {
                self.saw_record = true;
                return Ok(Some(line));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed == "//" {
                continue;
            }
            if !self.saw_record
                && trimmed
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit())
            {
                return Err(GbStreamError::NotText {
                    line: self.lines.line_number(),
                });
            }
            log::debug!(
                "skipping preamble line {}: {}",
                self.lines.line_number(),
                trimmed
            );
        }
    }

    /// Accumulate header lines up to the feature table or footer.
    ///
    /// The record's first line has already been consumed by
    /// [`find_start`](InsdcScanner::find_start). EOF or a stray `//` inside
    /// the header fail with [`PrematureEnd`](GbStreamError::PrematureEnd).
    pub fn parse_header(&mut self) -> Result<Vec<String>> {
        let mut header = Vec::new();
        loop {
            let line_number = self.lines.line_number();
            let (terminator, boundary) = match self.lines.peek()? {
                None => {
                    return Err(GbStreamError::PrematureEnd { line: line_number });
                }
                Some(line) => (
                    line.trim() == "//",
                    self.layout
                        .feature_start_markers
                        .iter()
                        .any(|m| line.starts_with(m))
                        || self
                            .layout
                            .sequence_headers
                            .iter()
                            .any(|h| line.starts_with(h)),
                ),
            };
            if terminator {
                return Err(GbStreamError::PrematureEnd { line: line_number });
            }
            if boundary {
                return Ok(header);
            }
            if let Some(line) = self.lines.next_line()? {
                header.push(line);
            }
        }
    }

    /// Read the feature table.
    ///
    /// Consumes the feature-start marker if present, then one block per
    /// feature key until a sequence header, a feature-end marker or the
    /// record terminator. With `skip` set the blocks are walked but neither
    /// location assembly nor qualifier parsing happens.
    pub fn parse_features(&mut self, skip: bool) -> Result<Vec<RawFeature>> {
        let at_marker = self
            .lines
            .peek()?
            .map(|line| {
                self.layout
                    .feature_start_markers
                    .iter()
                    .any(|m| line.starts_with(m))
            })
            .unwrap_or(false);
        if !at_marker {
            return Ok(Vec::new());
        }
        self.lines.next_line()?;

        let indent = self.layout.feature_qualifier_indent;
        let mut features = Vec::new();

        loop {
            let line_number = self.lines.line_number();
            let line = match self.lines.peek()? {
                Some(line) => line,
                None => return Err(GbStreamError::PrematureEnd { line: line_number }),
            };
            if line.trim() == "//"
                || self
                    .layout
                    .sequence_headers
                    .iter()
                    .any(|h| line.starts_with(h))
            {
                return Ok(features);
            }
            if self
                .layout
                .feature_end_markers
                .iter()
                .any(|m| line.starts_with(m))
            {
                self.lines.next_line()?;
                return Ok(features);
            }
            if line.trim().is_empty() {
                log::warn!(
                    "blank line inside feature table at line {}",
                    self.lines.line_number() + 1
                );
                self.lines.next_line()?;
                continue;
            }

            // a feature block opens with a key left of the qualifier column
            let head = self.lines.next_line()?.unwrap_or_default();
            let key_field = &head[..head.len().min(indent)];
            let key = key_field.trim().to_string();
            if key.is_empty() || key.starts_with('/') {
                log::warn!(
                    "stray feature-table line {} without a key: {}",
                    self.lines.line_number(),
                    head.trim()
                );
                continue;
            }
            let leading = key_field.len() - key_field.trim_start().len();
            if leading != 5 {
                log::warn!(
                    "feature key '{}' at line {} is indented {} columns, expected 5",
                    key,
                    self.lines.line_number(),
                    leading
                );
            }

            let mut block = Vec::new();
            if head.len() > indent {
                block.push(head[indent..].trim_end().to_string());
            }
            loop {
                let continues = self
                    .lines
                    .peek()?
                    .map(|line| {
                        !line.trim().is_empty()
                            && line.len() > indent
                            && line[..indent].trim().is_empty()
                    })
                    .unwrap_or(false);
                if !continues {
                    break;
                }
                let line = self.lines.next_line()?.unwrap_or_default();
                block.push(line[indent..].trim_end().to_string());
            }

            if skip {
                features.push(RawFeature {
                    key,
                    location: String::new(),
                    qualifiers: Vec::new(),
                });
            } else {
                features.push(self.parse_feature(key, &block)?);
            }
        }
    }

    /// Assemble one feature block into its location string and qualifiers.
    ///
    /// The location may continue over several lines (after a trailing comma
    /// or while parentheses stay unbalanced); quoted qualifier values may
    /// span lines and are joined with `\n`, surrounding quotes retained.
    pub fn parse_feature(&self, key: String, block: &[String]) -> Result<RawFeature> {
        let mut cursor = block.iter().peekable();

        let mut location = String::new();
        while let Some(next) = cursor.peek() {
            if next.starts_with('/') {
                break;
            }
            if !location.is_empty()
                && paren_balance(&location) == 0
                && !location.ends_with(',')
            {
                log::warn!(
                    "location for '{}' wraps without a comma break: {}",
                    key,
                    next.trim()
                );
            }
            location.push_str(cursor.next().map(|s| s.trim()).unwrap_or(""));
        }
        if paren_balance(&location) != 0 {
            log::warn!("unbalanced parentheses in location for '{}': {}", key, location);
        }

        let mut qualifiers: Vec<Qualifier> = Vec::new();
        let mut in_quoted = false;
        for line in cursor {
            if !in_quoted && line.starts_with('/') {
                let content = &line[1..];
                match content.split_once('=') {
                    None => qualifiers.push(Qualifier::new(content.trim(), None)),
                    Some((qkey, value)) => {
                        let qkey = qkey.trim();
                        if value.is_empty() {
                            qualifiers.push(Qualifier::new(qkey, None));
                        } else if value.starts_with('"') {
                            let closed = value.len() > 1 && value.ends_with('"');
                            qualifiers.push(Qualifier::new(qkey, Some(value.to_string())));
                            in_quoted = !closed;
                        } else {
                            qualifiers.push(Qualifier::new(qkey, Some(value.to_string())));
                        }
                    }
                }
            } else {
                // continuation of the current qualifier value
                let open = match qualifiers.last_mut() {
                    Some(qualifier) => qualifier,
                    None => {
                        return Err(GbStreamError::OrphanContinuation {
                            line: self.lines.line_number(),
                        })
                    }
                };
                match &mut open.value {
                    Some(value) => {
                        value.push('\n');
                        value.push_str(line);
                    }
                    None => open.value = Some(line.clone()),
                }
                if in_quoted && line.ends_with('"') {
                    in_quoted = false;
                }
            }
        }
        if in_quoted {
            log::warn!("unterminated quoted value in feature '{}'", key);
        }

        Ok(RawFeature {
            key,
            location,
            qualifiers,
        })
    }
}

fn paren_balance(text: &str) -> i32 {
    let mut balance = 0;
    for c in text.chars() {
        match c {
            '(' => balance += 1,
            ')' => balance -= 1,
            _ => {}
        }
    }
    balance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::GENBANK_LAYOUT;
    use std::io::{BufReader, Cursor};

    fn scanner(text: &str) -> InsdcScanner<BufReader<Cursor<Vec<u8>>>> {
        InsdcScanner::new(
            BufReader::new(Cursor::new(text.as_bytes().to_vec())),
            &GENBANK_LAYOUT,
        )
    }

    const FEATURES: &str = "\
FEATURES             Location/Qualifiers
     source          1..100
                     /organism=\"Yersinia pestis\"
                     /mol_type=\"genomic DNA\"
     CDS             join(1..50,
                     60..100)
                     /gene=\"sucA\"
                     /pseudo
                     /note=\"a note that
                     spans two lines\"
ORIGIN
";

    #[test]
    fn test_find_start_skips_preamble() {
        let mut s = scanner("Submitted to GenBank\n\nLOCUS       ABC\n");
        let line = s.find_start().unwrap().unwrap();
        assert!(line.starts_with("LOCUS"));
    }

    #[test]
    fn test_find_start_skips_previous_terminator() {
        let mut s = scanner("//\nLOCUS       ABC\n");
        assert!(s.find_start().unwrap().is_some());
    }

    #[test]
    fn test_find_start_eof() {
        let mut s = scanner("junk\n");
        assert!(s.find_start().unwrap().is_none());
    }

    #[test]
    fn test_find_start_not_text() {
        let mut s = scanner("123 binary-looking content\n");
        assert!(matches!(
            s.find_start().unwrap_err(),
            GbStreamError::NotText { .. }
        ));
    }

    #[test]
    fn test_parse_header_stops_at_features() {
        let text = "\
LOCUS       ABC
DEFINITION  Something.
ACCESSION   ABC
FEATURES             Location/Qualifiers
";
        let mut s = scanner(text);
        s.find_start().unwrap().unwrap();
        let header = s.parse_header().unwrap();
        assert_eq!(header.len(), 2);
        assert!(header[0].starts_with("DEFINITION"));
    }

    #[test]
    fn test_parse_header_stops_at_sequence_header() {
        let text = "LOCUS       ABC\nDEFINITION  X.\nORIGIN\n";
        let mut s = scanner(text);
        s.find_start().unwrap().unwrap();
        let header = s.parse_header().unwrap();
        assert_eq!(header.len(), 1);
    }

    #[test]
    fn test_parse_header_premature_end() {
        let mut s = scanner("LOCUS       ABC\nDEFINITION  X.\n");
        s.find_start().unwrap().unwrap();
        assert!(matches!(
            s.parse_header().unwrap_err(),
            GbStreamError::PrematureEnd { .. }
        ));

        let mut s = scanner("LOCUS       ABC\n//\n");
        s.find_start().unwrap().unwrap();
        assert!(matches!(
            s.parse_header().unwrap_err(),
            GbStreamError::PrematureEnd { .. }
        ));
    }

    #[test]
    fn test_parse_features() {
        let mut s = scanner(FEATURES);
        let features = s.parse_features(false).unwrap();
        assert_eq!(features.len(), 2);

        let source = &features[0];
        assert_eq!(source.key, "source");
        assert_eq!(source.location, "1..100");
        assert_eq!(source.qualifiers.len(), 2);
        assert_eq!(
            source.qualifiers[0].value.as_deref(),
            Some("\"Yersinia pestis\"")
        );

        let cds = &features[1];
        assert_eq!(cds.key, "CDS");
        assert_eq!(cds.location, "join(1..50,60..100)");
        assert_eq!(cds.qualifiers.len(), 3);
        assert_eq!(cds.qualifiers[0].value.as_deref(), Some("\"sucA\""));
        assert_eq!(cds.qualifiers[1].key, "pseudo");
        assert_eq!(cds.qualifiers[1].value, None);
        assert_eq!(
            cds.qualifiers[2].value.as_deref(),
            Some("\"a note that\nspans two lines\"")
        );
    }

    #[test]
    fn test_parse_features_skip_mode_counts_blocks() {
        let mut s = scanner(FEATURES);
        let features = s.parse_features(true).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].key, "source");
        assert!(features[0].location.is_empty());
        assert!(features[1].qualifiers.is_empty());
    }

    #[test]
    fn test_parse_features_without_table() {
        let mut s = scanner("ORIGIN\n");
        let features = s.parse_features(false).unwrap();
        assert!(features.is_empty());
    }

    #[test]
    fn test_parse_feature_bare_and_empty_values() {
        let s = scanner("");
        let block = vec![
            "1..10".to_string(),
            "/pseudo".to_string(),
            "/partial=".to_string(),
            "/number=2".to_string(),
        ];
        let feature = s.parse_feature("gene".to_string(), &block).unwrap();
        assert_eq!(feature.qualifiers[0], Qualifier::new("pseudo", None));
        assert_eq!(feature.qualifiers[1], Qualifier::new("partial", None));
        assert_eq!(
            feature.qualifiers[2],
            Qualifier::new("number", Some("2".to_string()))
        );
    }

    #[test]
    fn test_parse_feature_wrap_without_comma() {
        let s = scanner("");
        // line-wrapped location with no trailing comma is tolerated
        let block = vec!["1..10".to_string(), "0..200".to_string()];
        let feature = s.parse_feature("gene".to_string(), &block).unwrap();
        assert_eq!(feature.location, "1..100..200");
    }

    #[test]
    fn test_parse_feature_qualifier_only_block() {
        let s = scanner("");
        let block = vec!["/pseudo".to_string()];
        let feature = s.parse_feature("gene".to_string(), &block).unwrap();
        assert!(feature.location.is_empty());
        assert_eq!(feature.qualifiers[0].key, "pseudo");
    }

    #[test]
    fn test_quoted_value_with_slash_continuation() {
        let s = scanner("");
        let block = vec![
            "1..10".to_string(),
            "/note=\"contains /special".to_string(),
            "characters\"".to_string(),
        ];
        let feature = s.parse_feature("misc".to_string(), &block).unwrap();
        assert_eq!(
            feature.qualifiers[0].value.as_deref(),
            Some("\"contains /special\ncharacters\"")
        );
    }
}
