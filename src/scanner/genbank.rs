//! GenBank specialization of the INSDC scanner
//!
//! Handles the parts of the format the shared skeleton cannot: the LOCUS
//! line and its many historical layouts, the fixed-width header sections,
//! and the footer with its ORIGIN sequence block.
//!
//! # LOCUS dialects
//!
//! The LOCUS line has changed shape over the decades and tools emit their
//! own variants. Detection is attempted in order; the first match wins:
//!
//! 1. old fixed-column (pre-1999 releases)
//! 2. new fixed-column (current NCBI layout)
//! 3. truncated (`LOCUS       U00096` and nothing else)
//! 4. mis-spaced eight-token lines
//! 5. EnsEMBL-style seven-token lines
//! 6. EMBOSS output
//! 7. pseudo-GenBank with the residue unit last

use crate::consumer::RecordConsumer;
use crate::error::{GbStreamError, Result};
use crate::scanner::{InsdcLayout, InsdcScanner};
use std::io::BufRead;

/// Fixed-column parameters of the GenBank flavor.
pub static GENBANK_LAYOUT: InsdcLayout = InsdcLayout {
    record_start: "LOCUS       ",
    header_width: 12,
    feature_start_markers: &["FEATURES             Location/Qualifiers", "FEATURES"],
    feature_end_markers: &[],
    feature_qualifier_indent: 21,
    sequence_headers: &["CONTIG", "ORIGIN", "BASE COUNT", "WGS", "TSA", "TLS"],
};

const RESIDUE_UNITS: [&str; 3] = [" bp ", " aa ", " rc "];

/// Safe column slice; short lines yield what they have.
fn col(line: &str, start: usize, end: usize) -> &str {
    let len = line.len();
    &line[start.min(len)..end.min(len)]
}

/// The GenBank record scanner.
///
/// Drives the scanning state machine over one stream, emitting typed
/// callbacks into a [`RecordConsumer`] per record. One scanner instance
/// serves the whole stream; [`feed`](GenBankScanner::feed) returns `false`
/// at clean EOF.
pub struct GenBankScanner<R: BufRead> {
    insdc: InsdcScanner<R>,
}

impl<R: BufRead> GenBankScanner<R> {
    /// Create a scanner over a buffered reader.
    pub fn new(reader: R) -> Self {
        GenBankScanner {
            insdc: InsdcScanner::new(reader, &GENBANK_LAYOUT),
        }
    }

    /// The number of the most recently consumed line.
    pub fn line_number(&self) -> usize {
        self.insdc.line_number()
    }

    /// Scan one record, emitting callbacks into `consumer`.
    ///
    /// Returns `Ok(false)` at clean EOF, `Ok(true)` after a complete
    /// record. With `do_features` unset, feature blocks are still walked
    /// (the consumer sees every `feature_key`) but locations and
    /// qualifiers are not parsed.
    pub fn feed(&mut self, consumer: &mut dyn RecordConsumer, do_features: bool) -> Result<bool> {
        let first = match self.insdc.find_start()? {
            Some(line) => line,
            None => return Ok(false),
        };
        self.feed_first_line(consumer, &first)?;

        let header = self.insdc.parse_header()?;
        self.feed_header_lines(consumer, &header)?;

        let features = self.insdc.parse_features(!do_features)?;
        for feature in features {
            consumer.feature_key(&feature.key)?;
            if !do_features {
                continue;
            }
            if feature.location.is_empty() {
                log::warn!("feature '{}' has no location", feature.key);
            } else {
                consumer.location(&feature.location)?;
            }
            for qualifier in &feature.qualifiers {
                consumer.feature_qualifier(&qualifier.key, qualifier.value.as_deref())?;
            }
        }

        self.parse_footer(consumer)?;
        consumer.record_end()?;
        Ok(true)
    }

    /// Dispatch the LOCUS line through the dialect table.
    fn feed_first_line(&mut self, consumer: &mut dyn RecordConsumer, line: &str) -> Result<()> {
        let line_number = self.insdc.line_number();

        if RESIDUE_UNITS.contains(&col(line, 29, 33)) && col(line, 55, 62).trim().is_empty() {
            return self.feed_locus_old(consumer, line, line_number);
        }

        let topology_field = col(line, 54, 64).trim();
        if RESIDUE_UNITS.contains(&col(line, 40, 44))
            && matches!(topology_field, "" | "linear" | "circular")
        {
            return self.feed_locus_new(consumer, line, line_number);
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() == 2 {
            // truncated: a name and nothing else
            return consumer.locus(tokens[1]);
        }

        if tokens.len() == 8
            && matches!(tokens[3], "bp" | "aa")
            && matches!(tokens[5], "linear" | "circular")
        {
            log::warn!("LOCUS line at {} has non-standard spacing", line_number);
            consumer.locus(tokens[1])?;
            consumer.size(tokens[2])?;
            consumer.residue_unit(tokens[3])?;
            consumer.residue_type(&format!("{} {}", tokens[4], tokens[5]))?;
            consumer.molecule_type(tokens[4])?;
            consumer.topology(tokens[5])?;
            consumer.data_file_division(tokens[6])?;
            return consumer.date(tokens[7]);
        }

        if tokens.len() == 7 && matches!(tokens[3], "bp" | "aa") {
            log::debug!("EnsEMBL-style LOCUS line at {}", line_number);
            consumer.locus(tokens[1])?;
            consumer.size(tokens[2])?;
            consumer.residue_unit(tokens[3])?;
            consumer.residue_type(tokens[4])?;
            consumer.molecule_type(tokens[4])?;
            consumer.data_file_division(tokens[5])?;
            return consumer.date(tokens[6]);
        }

        if tokens.len() >= 4 && matches!(tokens[3], "bp" | "aa") {
            log::warn!("EMBOSS-style LOCUS line at {}", line_number);
            consumer.locus(tokens[1])?;
            consumer.size(tokens[2])?;
            consumer.residue_unit(tokens[3])?;
            if tokens.len() >= 5 {
                consumer.residue_type(tokens[4])?;
                consumer.molecule_type(tokens[4])?;
            }
            if tokens.len() >= 6 && matches!(tokens[5], "linear" | "circular") {
                consumer.topology(tokens[5])?;
            }
            return Ok(());
        }

        if tokens.len() >= 4 && matches!(tokens[tokens.len() - 1], "bp" | "aa") {
            log::warn!("pseudo-GenBank LOCUS line at {}", line_number);
            consumer.locus(tokens[1])?;
            consumer.size(tokens[tokens.len() - 2])?;
            return consumer.residue_unit(tokens[tokens.len() - 1]);
        }

        Err(GbStreamError::UnrecognizedLocus {
            line: line_number,
            text: line.to_string(),
        })
    }

    /// Pre-1999 fixed columns: name+length in [12..29), unit at [29..33),
    /// molecule and topology in [33..52), division at [52..55), date at
    /// [62..73).
    fn feed_locus_old(
        &mut self,
        consumer: &mut dyn RecordConsumer,
        line: &str,
        line_number: usize,
    ) -> Result<()> {
        let name_and_length: Vec<&str> = col(line, 12, 29).split_whitespace().collect();
        let (name, size) = match name_and_length.as_slice() {
            [name, size] => (*name, *size),
            _ => {
                return Err(GbStreamError::BadHeaderField {
                    line: line_number,
                    msg: format!("cannot split name and length from '{}'", col(line, 12, 29)),
                })
            }
        };
        consumer.locus(name)?;
        consumer.size(size)?;
        consumer.residue_unit(col(line, 29, 33).trim())?;

        let residue = col(line, 33, 52).trim();
        if !residue.is_empty() {
            consumer.residue_type(residue)?;
        }
        if residue.contains("circular") {
            consumer.topology("circular")?;
        } else if residue.contains("linear") {
            consumer.topology("linear")?;
        }
        let molecule = residue.replace("circular", "").replace("linear", "");
        let molecule = molecule.trim();
        if !molecule.is_empty() {
            consumer.molecule_type(molecule)?;
        }

        let division = col(line, 52, 55).trim();
        if !division.is_empty() {
            consumer.data_file_division(division)?;
        }
        let date = col(line, 62, 73).trim();
        if !date.is_empty() {
            consumer.date(date)?;
        }
        Ok(())
    }

    /// Current fixed columns: name+length in [12..40), unit at [40..44),
    /// molecule at [44..54), topology at [54..64), division at [64..67),
    /// date at [68..79).
    fn feed_locus_new(
        &mut self,
        consumer: &mut dyn RecordConsumer,
        line: &str,
        line_number: usize,
    ) -> Result<()> {
        let name_and_length: Vec<&str> = col(line, 12, 40).split_whitespace().collect();
        let (name, size) = match name_and_length.as_slice() {
            [name, size] => (*name, *size),
            _ => {
                return Err(GbStreamError::BadHeaderField {
                    line: line_number,
                    msg: format!("cannot split name and length from '{}'", col(line, 12, 40)),
                })
            }
        };
        consumer.locus(name)?;
        consumer.size(size)?;
        consumer.residue_unit(col(line, 40, 44).trim())?;

        let residue = col(line, 44, 64).trim();
        if !residue.is_empty() {
            consumer.residue_type(residue)?;
        }
        let molecule = col(line, 44, 54).trim();
        if !molecule.is_empty() {
            consumer.molecule_type(molecule)?;
        }
        let topology = col(line, 54, 64).trim();
        if !topology.is_empty() {
            consumer.topology(topology)?;
        }
        let division = col(line, 64, 67).trim();
        if !division.is_empty() {
            consumer.data_file_division(division)?;
        }
        let date = col(line, 68, 79).trim();
        if !date.is_empty() {
            consumer.date(date)?;
        }
        Ok(())
    }

    /// Walk the accumulated header lines, dispatching each section.
    fn feed_header_lines(
        &mut self,
        consumer: &mut dyn RecordConsumer,
        lines: &[String],
    ) -> Result<()> {
        let width = GENBANK_LAYOUT.header_width;
        let keyword_of = |line: &str| col(line, 0, width).trim().to_string();
        let data_of = |line: &str| col(line, width, line.len()).trim_end().to_string();

        let mut i = 0;
        while i < lines.len() {
            let keyword = keyword_of(&lines[i]);
            let data = data_of(&lines[i]);
            i += 1;

            let mut continuations = Vec::new();
            // sections consume their own continuation lines
            while i < lines.len() && keyword_of(&lines[i]).is_empty() {
                continuations.push(data_of(&lines[i]));
                i += 1;
            }

            match keyword.as_str() {
                "DEFINITION" => {
                    let mut text = data.trim().to_string();
                    for line in &continuations {
                        if !text.is_empty() {
                            text.push(' ');
                        }
                        text.push_str(line.trim());
                    }
                    consumer.definition(&text)?;
                }
                "ACCESSION" => {
                    consumer.accession(data.trim())?;
                    for line in &continuations {
                        consumer.accession(line.trim())?;
                    }
                }
                "VERSION" => {
                    for token in data.split_whitespace() {
                        if let Some(gi) = token.strip_prefix("GI:") {
                            consumer.gi(gi)?;
                        } else {
                            consumer.version(token)?;
                        }
                    }
                }
                "NID" => consumer.nid(data.trim())?,
                "PID" => consumer.pid(data.trim())?,
                "PROJECT" => {
                    consumer.project(data.trim())?;
                    for line in &continuations {
                        consumer.project(line.trim())?;
                    }
                }
                "DBLINK" => {
                    consumer.dblink(data.trim())?;
                    for line in &continuations {
                        consumer.dblink(line.trim())?;
                    }
                }
                "KEYWORDS" => {
                    let mut text = data.trim().to_string();
                    for line in &continuations {
                        if !text.is_empty() {
                            text.push(' ');
                        }
                        text.push_str(line.trim());
                    }
                    consumer.keywords(&text)?;
                }
                "SEGMENT" => consumer.segment(data.trim())?,
                "SOURCE" => {
                    let mut text = data.trim().to_string();
                    for line in &continuations {
                        if !text.is_empty() {
                            text.push(' ');
                        }
                        text.push_str(line.trim());
                    }
                    consumer.source(&text)?;
                }
                "ORGANISM" => {
                    consumer.organism(data.trim())?;
                    if !continuations.is_empty() {
                        let lineage = continuations
                            .iter()
                            .map(|line| line.trim())
                            .collect::<Vec<_>>()
                            .join("\n");
                        consumer.taxonomy(&lineage)?;
                    }
                }
                "REFERENCE" => {
                    let mut text = data.trim().to_string();
                    for line in &continuations {
                        if !text.is_empty() {
                            text.push(' ');
                        }
                        text.push_str(line.trim());
                    }
                    let (number, bases) = match text.split_once(char::is_whitespace) {
                        Some((number, rest)) => (number, rest.trim()),
                        None => (text.as_str(), ""),
                    };
                    let number =
                        number
                            .parse::<usize>()
                            .map_err(|_| GbStreamError::BadHeaderField {
                                line: self.insdc.line_number(),
                                msg: format!("cannot parse reference number '{}'", number),
                            })?;
                    consumer.reference_num(number)?;
                    if !bases.is_empty() {
                        consumer.reference_bases(bases)?;
                    }
                }
                "AUTHORS" => {
                    consumer.authors(data.trim())?;
                    for line in &continuations {
                        consumer.authors(line.trim())?;
                    }
                }
                "CONSRTM" => {
                    consumer.consortium(data.trim())?;
                    for line in &continuations {
                        consumer.consortium(line.trim())?;
                    }
                }
                "TITLE" => {
                    consumer.title(data.trim())?;
                    for line in &continuations {
                        consumer.title(line.trim())?;
                    }
                }
                "JOURNAL" => {
                    consumer.journal(data.trim())?;
                    for line in &continuations {
                        consumer.journal(line.trim())?;
                    }
                }
                "MEDLINE" => consumer.medline_id(data.trim())?,
                "PUBMED" => consumer.pubmed_id(data.trim())?,
                "REMARK" => {
                    consumer.remark(data.trim())?;
                    for line in &continuations {
                        consumer.remark(line.trim())?;
                    }
                }
                "COMMENT" => {
                    let mut text = data;
                    for line in &continuations {
                        text.push('\n');
                        text.push_str(line);
                    }
                    consumer.comment(&text)?;
                }
                "PRIMARY" | "DBSOURCE" => {
                    log::debug!("skipping {} section", keyword);
                }
                "" => {
                    log::warn!(
                        "stray header continuation before line {}: {}",
                        self.insdc.line_number(),
                        data.trim()
                    );
                }
                other => {
                    log::warn!("unhandled header keyword '{}'", other);
                }
            }
        }
        Ok(())
    }

    /// Read the footer sections and the sequence block, through `//`.
    fn parse_footer(&mut self, consumer: &mut dyn RecordConsumer) -> Result<()> {
        loop {
            let line_number = self.insdc.line_number();
            let line = match self.insdc.lines().peek()? {
                Some(line) => line.to_string(),
                None => return Err(GbStreamError::PrematureEnd { line: line_number }),
            };
            if line.trim() == "//" {
                self.insdc.lines().next_line()?;
                return Ok(());
            }
            if line.starts_with("ORIGIN") {
                self.insdc.lines().next_line()?;
                return self.parse_sequence_block(consumer);
            }
            if line.starts_with("CONTIG") {
                self.parse_contig(consumer)?;
                continue;
            }
            if line.starts_with("BASE COUNT") {
                self.insdc.lines().next_line()?;
                consumer.base_count(col(&line, 12, line.len()).trim())?;
                continue;
            }
            if line.starts_with("WGS") || line.starts_with("TSA") || line.starts_with("TLS") {
                self.insdc.lines().next_line()?;
                log::debug!("skipping footer line: {}", line.trim());
                continue;
            }
            if line.starts_with(' ') || line.trim().is_empty() {
                self.insdc.lines().next_line()?;
                log::debug!("skipping indented footer line");
                continue;
            }
            log::warn!(
                "unexpected footer line {}: {}",
                self.insdc.line_number() + 1,
                line.trim()
            );
            self.insdc.lines().next_line()?;
        }
    }

    /// Accumulate a (possibly multi-line) CONTIG join expression.
    fn parse_contig(&mut self, consumer: &mut dyn RecordConsumer) -> Result<()> {
        let first = self.insdc.lines().next_line()?.unwrap_or_default();
        let mut text = col(&first, 12, first.len()).trim().to_string();
        loop {
            let continues = self
                .insdc
                .lines()
                .peek()?
                .map(|line| !line.trim().is_empty() && col(line, 0, 12).trim().is_empty())
                .unwrap_or(false);
            if !continues {
                break;
            }
            let line = self.insdc.lines().next_line()?.unwrap_or_default();
            text.push_str(col(&line, 12, line.len()).trim());
        }
        consumer.contig(&text)
    }

    /// Read ORIGIN sequence lines until `//` (or a CONTIG section).
    ///
    /// Each line carries a right-aligned base number in columns 1..9, a
    /// space, then blank-separated residue groups from column 11. A line
    /// that fails this layout is repaired once by dropping its first
    /// character; a second failure is fatal.
    fn parse_sequence_block(&mut self, consumer: &mut dyn RecordConsumer) -> Result<()> {
        loop {
            let line_number = self.insdc.line_number();
            let line = match self.insdc.lines().peek()? {
                Some(line) => line.to_string(),
                None => return Err(GbStreamError::PrematureEnd { line: line_number }),
            };
            if line.trim() == "//" {
                self.insdc.lines().next_line()?;
                return Ok(());
            }
            if line.starts_with("CONTIG") {
                self.parse_contig(consumer)?;
                continue;
            }
            if line.trim().is_empty() {
                log::warn!(
                    "blank line inside sequence block at line {}",
                    self.insdc.line_number() + 1
                );
                self.insdc.lines().next_line()?;
                continue;
            }
            self.insdc.lines().next_line()?;

            let parsed = split_sequence_line(&line).or_else(|| {
                log::warn!(
                    "malformed sequence line {}, dropping one leading character",
                    self.insdc.line_number()
                );
                split_sequence_line(&line[1.min(line.len())..])
            });
            let (number, payload) = parsed.ok_or_else(|| GbStreamError::MalformedSequenceLine {
                line: self.insdc.line_number(),
                msg: line.trim().to_string(),
            })?;
            consumer.base_number(number)?;
            let residues: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            consumer.sequence(&residues)?;
        }
    }
}

/// Split one sequence line into its leading base number and residue payload.
fn split_sequence_line(line: &str) -> Option<(usize, &str)> {
    if line.len() < 10 {
        return None;
    }
    let number = line[..9].trim().parse::<usize>().ok()?;
    if line.as_bytes()[9] != b' ' {
        return None;
    }
    Some((number, &line[10..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::io::{BufReader, Cursor};

    /// Records every callback as (name, payload) for dialect assertions.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, String)>,
    }

    impl Recorder {
        fn get(&self, name: &str) -> Option<&str> {
            self.calls
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        }

        fn all(&self, name: &str) -> Vec<&str> {
            self.calls
                .iter()
                .filter(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
                .collect()
        }
    }

    macro_rules! record_call {
        ($($method:ident),*) => {
            $(fn $method(&mut self, text: &str) -> Result<()> {
                self.calls.push((stringify!($method).to_string(), text.to_string()));
                Ok(())
            })*
        };
    }

    impl RecordConsumer for Recorder {
        record_call!(
            locus,
            size,
            residue_type,
            residue_unit,
            molecule_type,
            topology,
            data_file_division,
            date,
            definition,
            accession,
            version,
            gi,
            keywords,
            source,
            organism,
            taxonomy,
            authors,
            comment,
            contig,
            base_count,
            feature_key,
            location,
            sequence
        );

        fn reference_num(&mut self, number: usize) -> Result<()> {
            self.calls
                .push(("reference_num".to_string(), number.to_string()));
            Ok(())
        }

        fn reference_bases(&mut self, text: &str) -> Result<()> {
            self.calls
                .push(("reference_bases".to_string(), text.to_string()));
            Ok(())
        }

        fn base_number(&mut self, number: usize) -> Result<()> {
            self.calls
                .push(("base_number".to_string(), number.to_string()));
            Ok(())
        }

        fn feature_qualifier(&mut self, key: &str, value: Option<&str>) -> Result<()> {
            self.calls.push((
                "feature_qualifier".to_string(),
                format!("{}={}", key, value.unwrap_or("")),
            ));
            Ok(())
        }

        fn record_end(&mut self) -> Result<()> {
            self.calls.push(("record_end".to_string(), String::new()));
            Ok(())
        }
    }

    fn scan(text: &str) -> Recorder {
        let mut scanner = GenBankScanner::new(BufReader::new(Cursor::new(text.as_bytes().to_vec())));
        let mut recorder = Recorder::default();
        assert!(scanner.feed(&mut recorder, true).unwrap());
        recorder
    }

    fn feed_locus(line: &str) -> Recorder {
        let mut scanner =
            GenBankScanner::new(BufReader::new(Cursor::new(Vec::<u8>::new())));
        let mut recorder = Recorder::default();
        scanner.feed_first_line(&mut recorder, line).unwrap();
        recorder
    }

    /// Build a modern fixed-column LOCUS line.
    fn new_style_locus(
        name: &str,
        size: usize,
        unit: &str,
        molecule: &str,
        topology: &str,
        division: &str,
        date: &str,
    ) -> String {
        let size = size.to_string();
        let mut line = String::from("LOCUS       ");
        line.push_str(name);
        while line.len() < 40 - size.len() {
            line.push(' ');
        }
        line.push_str(&size);
        line.push(' ');
        line.push_str(unit); // unit token fills [40..44)
        line.push(' ');
        line.push_str(&format!("{:<10}", molecule)); // [44..54)
        line.push_str(&format!("{:<10}", topology)); // [54..64)
        line.push_str(&format!("{:<4}", division)); // [64..68)
        line.push_str(date); // [68..)
        line
    }

    /// Build a pre-1999 fixed-column LOCUS line.
    fn old_style_locus(
        name: &str,
        size: usize,
        unit: &str,
        residue: &str,
        division: &str,
        date: &str,
    ) -> String {
        let size = size.to_string();
        let mut line = String::from("LOCUS       ");
        line.push_str(name);
        while line.len() < 29 - size.len() {
            line.push(' ');
        }
        line.push_str(&size);
        line.push(' ');
        line.push_str(unit); // unit token fills [29..33)
        line.push(' ');
        line.push_str(&format!("{:<19}", residue)); // [33..52)
        line.push_str(&format!("{:<3}", division)); // [52..55)
        line.push_str("       "); // [55..62) stays blank
        line.push_str(date); // [62..73)
        line
    }

    #[test]
    fn test_locus_new_fixed() {
        let line = new_style_locus("AJ131352", 1104, "bp", "DNA", "linear", "PLN", "14-NOV-2006");
        let recorder = feed_locus(&line);
        assert_eq!(recorder.get("locus"), Some("AJ131352"));
        assert_eq!(recorder.get("size"), Some("1104"));
        assert_eq!(recorder.get("residue_unit"), Some("bp"));
        assert_eq!(recorder.get("molecule_type"), Some("DNA"));
        assert_eq!(recorder.get("topology"), Some("linear"));
        assert_eq!(recorder.get("data_file_division"), Some("PLN"));
        assert_eq!(recorder.get("date"), Some("14-NOV-2006"));
    }

    #[test]
    fn test_locus_new_fixed_circular_protein() {
        let line = new_style_locus("Q9XYZ1", 348, "aa", "", "circular", "BCT", "01-JAN-1999");
        let recorder = feed_locus(&line);
        assert_eq!(recorder.get("residue_unit"), Some("aa"));
        assert_eq!(recorder.get("topology"), Some("circular"));
        assert_eq!(recorder.get("molecule_type"), None);
    }

    #[test]
    fn test_locus_old_fixed() {
        let line = old_style_locus("YSCSUC2", 3684, "bp", "DNA", "PLN", "26-APR-1993");
        let recorder = feed_locus(&line);
        assert_eq!(recorder.get("locus"), Some("YSCSUC2"));
        assert_eq!(recorder.get("size"), Some("3684"));
        assert_eq!(recorder.get("residue_unit"), Some("bp"));
        assert_eq!(recorder.get("molecule_type"), Some("DNA"));
        assert_eq!(recorder.get("data_file_division"), Some("PLN"));
        assert_eq!(recorder.get("date"), Some("26-APR-1993"));
    }

    #[test]
    fn test_locus_old_fixed_circular() {
        let line = old_style_locus("AB0001", 100, "bp", "ss-DNA   circular", "VRL", "01-JUL-1992");
        let recorder = feed_locus(&line);
        assert_eq!(recorder.get("topology"), Some("circular"));
        assert_eq!(recorder.get("molecule_type"), Some("ss-DNA"));
    }

    #[test]
    fn test_locus_truncated() {
        let recorder = feed_locus("LOCUS       U00096");
        assert_eq!(recorder.get("locus"), Some("U00096"));
        assert_eq!(recorder.get("size"), None);
        assert_eq!(recorder.get("topology"), None);
    }

    #[test]
    fn test_locus_invalid_spacing() {
        let recorder = feed_locus("LOCUS       AC007323 86436 bp DNA linear PRI 19-JAN-2007");
        assert_eq!(recorder.get("locus"), Some("AC007323"));
        assert_eq!(recorder.get("size"), Some("86436"));
        assert_eq!(recorder.get("molecule_type"), Some("DNA"));
        assert_eq!(recorder.get("topology"), Some("linear"));
        assert_eq!(recorder.get("data_file_division"), Some("PRI"));
        assert_eq!(recorder.get("date"), Some("19-JAN-2007"));
    }

    #[test]
    fn test_locus_ensembl() {
        let recorder = feed_locus("LOCUS       HG531_PATCH 1000000 bp DNA HTG 18-JUN-2011");
        assert_eq!(recorder.get("locus"), Some("HG531_PATCH"));
        assert_eq!(recorder.get("size"), Some("1000000"));
        assert_eq!(recorder.get("molecule_type"), Some("DNA"));
        assert_eq!(recorder.get("data_file_division"), Some("HTG"));
        assert_eq!(recorder.get("date"), Some("18-JUN-2011"));
    }

    #[test]
    fn test_locus_emboss() {
        let recorder = feed_locus("LOCUS       X65923 518 bp");
        assert_eq!(recorder.get("locus"), Some("X65923"));
        assert_eq!(recorder.get("size"), Some("518"));
        assert_eq!(recorder.get("residue_unit"), Some("bp"));
    }

    #[test]
    fn test_locus_pseudo_genbank() {
        // residue unit at the last index only
        let recorder = feed_locus("LOCUS       pBAD30 vector dna 4923 bp");
        assert_eq!(recorder.get("locus"), Some("pBAD30"));
        assert_eq!(recorder.get("size"), Some("4923"));
        assert_eq!(recorder.get("residue_unit"), Some("bp"));
    }

    #[test]
    fn test_locus_unrecognized() {
        let mut scanner =
            GenBankScanner::new(BufReader::new(Cursor::new(Vec::<u8>::new())));
        let mut recorder = Recorder::default();
        let err = scanner
            .feed_first_line(&mut recorder, "LOCUS       garbage with no unit anywhere at all")
            .unwrap_err();
        assert!(matches!(err, GbStreamError::UnrecognizedLocus { .. }));
    }

    const RECORD: &str = "\
LOCUS       AB000001                  40 bp    DNA     linear   PRI 01-JAN-2020
DEFINITION  Homo sapiens test gene,
            complete cds.
ACCESSION   AB000001 AB000002
VERSION     AB000001.1  GI:12345
KEYWORDS    alpha; beta.
SOURCE      Homo sapiens (human)
  ORGANISM  Homo sapiens
            Eukaryota; Metazoa; Chordata;
            Mammalia; Primates.
REFERENCE   1  (bases 1 to 40)
  AUTHORS   Smith,J. and Jones,K.
  TITLE     A short test record
  JOURNAL   J. Test. 1:1-2(2020)
  PUBMED    123456
COMMENT     A comment
            on two lines.
FEATURES             Location/Qualifiers
     source          1..40
                     /organism=\"Homo sapiens\"
     gene            5..35
                     /gene=\"TST1\"
ORIGIN
        1 atgcatgcat gcatgcatgc atgcatgcat gcatgcatgc
//
";

    #[test]
    fn test_feed_full_record() {
        let recorder = scan(RECORD);
        assert_eq!(recorder.get("locus"), Some("AB000001"));
        assert_eq!(recorder.get("size"), Some("40"));
        assert_eq!(
            recorder.get("definition"),
            Some("Homo sapiens test gene, complete cds.")
        );
        assert_eq!(recorder.get("accession"), Some("AB000001 AB000002"));
        assert_eq!(recorder.get("version"), Some("AB000001.1"));
        assert_eq!(recorder.get("gi"), Some("12345"));
        assert_eq!(recorder.get("keywords"), Some("alpha; beta."));
        assert_eq!(recorder.get("organism"), Some("Homo sapiens"));
        assert_eq!(
            recorder.get("taxonomy"),
            Some("Eukaryota; Metazoa; Chordata;\nMammalia; Primates.")
        );
        assert_eq!(recorder.get("reference_num"), Some("1"));
        assert_eq!(recorder.get("reference_bases"), Some("(bases 1 to 40)"));
        assert_eq!(recorder.all("authors"), vec!["Smith,J. and Jones,K."]);
        assert_eq!(recorder.get("comment"), Some("A comment\non two lines."));
        assert_eq!(recorder.all("feature_key"), vec!["source", "gene"]);
        assert_eq!(recorder.all("location"), vec!["1..40", "5..35"]);
        assert_eq!(
            recorder.all("sequence").concat(),
            "atgcatgcatgcatgcatgcatgcatgcatgcatgcatgc"
        );
        assert_eq!(recorder.get("base_number"), Some("1"));
        assert!(recorder.get("record_end").is_some());
    }

    #[test]
    fn test_feed_skip_features() {
        let mut scanner =
            GenBankScanner::new(BufReader::new(Cursor::new(RECORD.as_bytes().to_vec())));
        let mut recorder = Recorder::default();
        assert!(scanner.feed(&mut recorder, false).unwrap());
        assert_eq!(recorder.all("feature_key"), vec!["source", "gene"]);
        assert!(recorder.all("location").is_empty());
        assert!(recorder.all("feature_qualifier").is_empty());
        // header and sequence unaffected
        assert_eq!(
            recorder.all("sequence").concat(),
            "atgcatgcatgcatgcatgcatgcatgcatgcatgcatgc"
        );
    }

    #[test]
    fn test_feed_eof_returns_false() {
        let mut scanner =
            GenBankScanner::new(BufReader::new(Cursor::new(Vec::<u8>::new())));
        let mut recorder = Recorder::default();
        assert!(!scanner.feed(&mut recorder, true).unwrap());
    }

    #[test]
    fn test_base_count_and_contig() {
        let text = "\
LOCUS       AB000002                  10 bp    DNA     linear   PRI 01-JAN-2020
BASE COUNT      3 a    2 c    3 g    2 t
ORIGIN
        1 atgcatgcat
//
";
        let recorder = scan(text);
        assert_eq!(recorder.get("base_count"), Some("3 a    2 c    3 g    2 t"));

        let text = "\
LOCUS       AB000003                  10 bp    DNA     linear   CON 01-JAN-2020
CONTIG      join(AB000001.1:1..5,
            AB000002.1:1..5)
//
";
        let recorder = scan(text);
        assert_eq!(
            recorder.get("contig"),
            Some("join(AB000001.1:1..5,AB000002.1:1..5)")
        );
    }

    #[test]
    fn test_sequence_line_repair() {
        // one extra leading character, repaired by dropping it
        let text = "\
LOCUS       AB000004                  10 bp    DNA     linear   PRI 01-JAN-2020
ORIGIN
x        1 atgcatgcat
//
";
        let recorder = scan(text);
        assert_eq!(recorder.all("sequence").concat(), "atgcatgcat");
    }

    #[test]
    fn test_sequence_line_malformed() {
        let text = "\
LOCUS       AB000005                  10 bp    DNA     linear   PRI 01-JAN-2020
ORIGIN
no number here at all
//
";
        let mut scanner =
            GenBankScanner::new(BufReader::new(Cursor::new(text.as_bytes().to_vec())));
        let mut recorder = Recorder::default();
        let err = scanner.feed(&mut recorder, true).unwrap_err();
        assert!(matches!(err, GbStreamError::MalformedSequenceLine { .. }));
    }

    #[test]
    fn test_blank_line_in_sequence_tolerated() {
        let text = "\
LOCUS       AB000006                  20 bp    DNA     linear   PRI 01-JAN-2020
ORIGIN
        1 atgcatgcat

       11 gcatgcatgc
//
";
        let recorder = scan(text);
        assert_eq!(
            recorder.all("sequence").concat(),
            "atgcatgcatgcatgcatgc"
        );
    }

    #[test]
    fn test_premature_end_in_sequence() {
        let text = "\
LOCUS       AB000007                  10 bp    DNA     linear   PRI 01-JAN-2020
ORIGIN
        1 atgcatgcat
";
        let mut scanner =
            GenBankScanner::new(BufReader::new(Cursor::new(text.as_bytes().to_vec())));
        let mut recorder = Recorder::default();
        let err = scanner.feed(&mut recorder, true).unwrap_err();
        assert!(matches!(err, GbStreamError::PrematureEnd { .. }));
    }

    #[test]
    fn test_split_sequence_line() {
        assert_eq!(
            split_sequence_line("        1 atgc atgc"),
            Some((1, "atgc atgc"))
        );
        assert_eq!(
            split_sequence_line("     1021 aaaa"),
            Some((1021, "aaaa"))
        );
        assert_eq!(split_sequence_line("atgc"), None);
        assert_eq!(split_sequence_line("no number atgcatgcat"), None);
    }
}
