//! The scanner/consumer boundary and the bundled record builder
//!
//! The scanner never builds records itself: it emits typed callbacks into a
//! [`RecordConsumer`]. Every callback has a default no-op implementation so
//! alternative consumers (statistics collectors, filters, foreign record
//! models) only override what they need. The bundled [`RecordBuilder`]
//! implements the full set and produces a [`Sequence`].

use crate::alphabet::{Alphabet, DNA, PROTEIN, RNA};
use crate::error::{GbStreamError, LocationError, Result};
use crate::location::{Location, SimpleLocation};
use crate::record::{Annotation, Feature, Qualifier, Reference, Sequence};
use std::collections::HashMap;

/// Typed callbacks emitted while scanning one record.
///
/// Callback order within a record: the LOCUS fields first, then header
/// sections in source order, then per-feature `feature_key` /
/// `location` / `feature_qualifier`, then footer and sequence callbacks,
/// then `record_end`.
#[allow(unused_variables)]
pub trait RecordConsumer {
    /// LOCUS name
    fn locus(&mut self, name: &str) -> Result<()> {
        Ok(())
    }
    /// Declared sequence length (unparsed text)
    fn size(&mut self, size: &str) -> Result<()> {
        Ok(())
    }
    /// Raw residue-type field from the LOCUS line
    fn residue_type(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// Residue unit from the LOCUS line (`bp`, `aa` or `rc`)
    fn residue_unit(&mut self, unit: &str) -> Result<()> {
        Ok(())
    }
    /// Molecule type (`DNA`, `mRNA`, `ss-DNA`, ...)
    fn molecule_type(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// Topology (`linear` or `circular`)
    fn topology(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// GenBank division code (`PLN`, `BCT`, ...)
    fn data_file_division(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// Record date as printed (`14-NOV-2006`)
    fn date(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// DEFINITION text, continuation lines joined
    fn definition(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// One ACCESSION line's worth of accessions
    fn accession(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// VERSION identifier (`ACC.N` or a bare id)
    fn version(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// Numeric version suffix (the `N` of `ACC.N`)
    fn version_suffix(&mut self, suffix: &str) -> Result<()> {
        Ok(())
    }
    /// GI number from the VERSION line
    fn gi(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// NID line (retired nucleotide id)
    fn nid(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// PID line (retired protein id)
    fn pid(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// PROJECT line
    fn project(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// One DBLINK line (`BioProject: PRJNA123`)
    fn dblink(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// KEYWORDS text, continuation lines joined
    fn keywords(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// SEGMENT line (`2 of 6`)
    fn segment(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// SOURCE text
    fn source(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// ORGANISM name
    fn organism(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// Taxonomic lineage lines, joined with `\n`
    fn taxonomy(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// REFERENCE number; closes the previously open reference
    fn reference_num(&mut self, number: usize) -> Result<()> {
        Ok(())
    }
    /// REFERENCE base spans (`(bases 1 to 1104)`)
    fn reference_bases(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// AUTHORS text for the open reference
    fn authors(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// CONSRTM text for the open reference
    fn consortium(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// TITLE text for the open reference
    fn title(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// JOURNAL text for the open reference
    fn journal(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// MEDLINE id for the open reference
    fn medline_id(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// PUBMED id for the open reference
    fn pubmed_id(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// REMARK text for the open reference
    fn remark(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// COMMENT text, lines joined with `\n`
    fn comment(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// CONTIG join expression, continuation lines concatenated
    fn contig(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// BASE COUNT payload
    fn base_count(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// Leading base number of one sequence line
    fn base_number(&mut self, number: usize) -> Result<()> {
        Ok(())
    }
    /// A feature block's key
    fn feature_key(&mut self, key: &str) -> Result<()> {
        Ok(())
    }
    /// The raw location expression of the open feature
    fn location(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// One qualifier of the open feature; `None` for bare flags
    fn feature_qualifier(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        Ok(())
    }
    /// One sequence line's residues, whitespace already stripped
    fn sequence(&mut self, text: &str) -> Result<()> {
        Ok(())
    }
    /// End of record (`//` consumed)
    fn record_end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A qualifier-value cleaner: raw (quote-stripped) value in, stored value out.
pub type QualifierCleaner = fn(&str) -> String;

fn remove_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Strip surrounding quotes and unescape doubled quotes.
fn strip_quotes(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1].replace("\"\"", "\"")
    } else {
        value.to_string()
    }
}

/// The bundled consumer: builds a [`Sequence`] from scanner callbacks.
///
/// # Examples
///
/// ```no_run
/// use gbstream::consumer::RecordBuilder;
/// use gbstream::scanner::GenBankScanner;
/// use std::fs::File;
/// use std::io::BufReader;
///
/// # fn main() -> gbstream::Result<()> {
/// let reader = BufReader::new(File::open("record.gb")?);
/// let mut scanner = GenBankScanner::new(reader);
/// let mut builder = RecordBuilder::new();
/// if scanner.feed(&mut builder, true)? {
///     let record = builder.into_record()?;
///     println!("{}: {} bp", record.name, record.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct RecordBuilder {
    id: String,
    name: String,
    description: String,
    declared_size: Option<usize>,
    residue_unit: Option<String>,
    molecule_type: Option<String>,
    topology: Option<String>,
    annotations: HashMap<String, Annotation>,
    accessions: Vec<String>,
    keywords: Vec<String>,
    taxonomy: Vec<String>,
    dbxrefs: Vec<String>,
    references: Vec<Reference>,
    open_reference: Option<Reference>,
    features: Vec<Feature>,
    pending_feature_key: Option<String>,
    feature_blocks: usize,
    data: Vec<u8>,
    cleaners: HashMap<String, QualifierCleaner>,
    finished: Option<Sequence>,
}

impl RecordBuilder {
    /// Create a builder with the default cleaner registry
    /// (`translation` values lose all internal whitespace).
    pub fn new() -> Self {
        let mut cleaners: HashMap<String, QualifierCleaner> = HashMap::new();
        cleaners.insert("translation".to_string(), remove_whitespace);
        RecordBuilder {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            declared_size: None,
            residue_unit: None,
            molecule_type: None,
            topology: None,
            annotations: HashMap::new(),
            accessions: Vec::new(),
            keywords: Vec::new(),
            taxonomy: Vec::new(),
            dbxrefs: Vec::new(),
            references: Vec::new(),
            open_reference: None,
            features: Vec::new(),
            pending_feature_key: None,
            feature_blocks: 0,
            data: Vec::new(),
            cleaners,
            finished: None,
        }
    }

    /// Register (or replace) a qualifier-value cleaner.
    pub fn with_cleaner(mut self, key: &str, cleaner: QualifierCleaner) -> Self {
        self.cleaners.insert(key.to_string(), cleaner);
        self
    }

    /// Take the finished record. Only valid after `record_end` succeeded.
    pub fn into_record(self) -> Result<Sequence> {
        self.finished.ok_or(GbStreamError::PrematureEnd { line: 0 })
    }

    fn is_protein(&self) -> bool {
        self.residue_unit.as_deref() == Some("aa")
    }

    /// The alphabet for the parsed residues.
    ///
    /// Decided by content for nucleic acids: even records declared `mRNA`
    /// print their sequence as cDNA (with `t`), so only an actual `u`
    /// selects the RNA alphabet.
    fn alphabet(&self) -> &'static Alphabet {
        if self.is_protein() {
            return &PROTEIN;
        }
        let has_u = self.data.iter().any(|&b| b == b'u' || b == b'U');
        let has_t = self.data.iter().any(|&b| b == b't' || b == b'T');
        if has_u && !has_t {
            return &RNA;
        }
        &DNA
    }

    fn circular(&self) -> bool {
        self.topology.as_deref() == Some("circular")
    }

    fn close_reference(&mut self) {
        if let Some(reference) = self.open_reference.take() {
            self.references.push(reference);
        }
    }

    fn reference_mut(&mut self) -> &mut Reference {
        self.open_reference.get_or_insert_with(Reference::default)
    }

    fn append_field(field: &mut String, text: &str) {
        if !field.is_empty() {
            field.push(' ');
        }
        field.push_str(text.trim());
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        RecordBuilder::new()
    }
}

/// Parse `(bases A to B; C to D)` / `(residues A to B)` / `(sites)` into
/// 0-based half-open spans.
fn parse_reference_bases(text: &str) -> std::result::Result<Vec<SimpleLocation>, LocationError> {
    let trimmed = text.trim();
    let interior = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| LocationError::BadReferenceBases(text.to_string()))?;
    let interior = interior.trim();
    if interior == "sites" || interior == "bases" || interior == "residues" {
        return Ok(Vec::new());
    }
    let body = interior
        .strip_prefix("bases")
        .or_else(|| interior.strip_prefix("residues"))
        .ok_or_else(|| LocationError::BadReferenceBases(text.to_string()))?;
    let mut spans = Vec::new();
    for piece in body.split(';') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let (start, end) = piece
            .split_once(" to ")
            .ok_or_else(|| LocationError::BadReferenceBases(text.to_string()))?;
        let start: i64 = start
            .trim()
            .parse()
            .map_err(|_| LocationError::BadReferenceBases(text.to_string()))?;
        let end: i64 = end
            .trim()
            .parse()
            .map_err(|_| LocationError::BadReferenceBases(text.to_string()))?;
        spans.push(SimpleLocation::new(start - 1, end));
    }
    Ok(spans)
}

impl RecordConsumer for RecordBuilder {
    fn locus(&mut self, name: &str) -> Result<()> {
        self.name = name.to_string();
        Ok(())
    }

    fn size(&mut self, size: &str) -> Result<()> {
        let parsed = size.parse::<usize>().map_err(|_| GbStreamError::BadHeaderField {
            line: 0,
            msg: format!("cannot parse sequence length '{}'", size),
        })?;
        self.declared_size = Some(parsed);
        Ok(())
    }

    fn residue_type(&mut self, text: &str) -> Result<()> {
        self.annotations
            .insert("residue_type".to_string(), Annotation::Text(text.to_string()));
        Ok(())
    }

    fn residue_unit(&mut self, unit: &str) -> Result<()> {
        self.residue_unit = Some(unit.trim().to_string());
        Ok(())
    }

    fn molecule_type(&mut self, text: &str) -> Result<()> {
        self.molecule_type = Some(text.to_string());
        Ok(())
    }

    fn topology(&mut self, text: &str) -> Result<()> {
        match text {
            "" | "linear" | "circular" => {
                if !text.is_empty() {
                    self.topology = Some(text.to_string());
                }
                Ok(())
            }
            other => Err(GbStreamError::BadHeaderField {
                line: 0,
                msg: format!("invalid topology '{}'", other),
            }),
        }
    }

    fn data_file_division(&mut self, text: &str) -> Result<()> {
        self.annotations.insert(
            "data_file_division".to_string(),
            Annotation::Text(text.to_string()),
        );
        Ok(())
    }

    fn date(&mut self, text: &str) -> Result<()> {
        self.annotations
            .insert("date".to_string(), Annotation::Text(text.to_string()));
        Ok(())
    }

    fn definition(&mut self, text: &str) -> Result<()> {
        self.description = text.trim_end_matches('.').to_string();
        Ok(())
    }

    fn accession(&mut self, text: &str) -> Result<()> {
        for token in text.split(|c: char| c.is_whitespace() || c == ';') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if self.id.is_empty() {
                self.id = token.to_string();
            }
            if !self.accessions.iter().any(|a| a == token) {
                self.accessions.push(token.to_string());
            }
        }
        Ok(())
    }

    fn version(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if let Some((accession, suffix)) = text.rsplit_once('.') {
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
                self.accession(accession)?;
                return self.version_suffix(suffix);
            }
        }
        self.id = text.to_string();
        Ok(())
    }

    fn version_suffix(&mut self, suffix: &str) -> Result<()> {
        let parsed = suffix
            .parse::<i64>()
            .ok()
            .filter(|&v| v >= 0)
            .ok_or_else(|| GbStreamError::BadHeaderField {
                line: 0,
                msg: format!("invalid version suffix '{}'", suffix),
            })?;
        self.annotations
            .insert("sequence_version".to_string(), Annotation::Int(parsed));
        Ok(())
    }

    fn gi(&mut self, text: &str) -> Result<()> {
        self.annotations
            .insert("gi".to_string(), Annotation::Text(text.to_string()));
        Ok(())
    }

    fn nid(&mut self, text: &str) -> Result<()> {
        self.annotations
            .insert("nid".to_string(), Annotation::Text(text.to_string()));
        Ok(())
    }

    fn pid(&mut self, text: &str) -> Result<()> {
        self.annotations
            .insert("pid".to_string(), Annotation::Text(text.to_string()));
        Ok(())
    }

    fn project(&mut self, text: &str) -> Result<()> {
        self.dblink(text)
    }

    fn dblink(&mut self, text: &str) -> Result<()> {
        // normalize the space after the database name away
        let entry = match text.split_once(':') {
            Some((db, id)) => format!("{}:{}", db.trim(), id.trim()),
            None => text.trim().to_string(),
        };
        if entry.is_empty() {
            return Ok(());
        }
        if !self.dbxrefs.iter().any(|x| x == &entry) {
            self.dbxrefs.push(entry);
        }
        Ok(())
    }

    fn keywords(&mut self, text: &str) -> Result<()> {
        for keyword in text.split(';') {
            let keyword = keyword.trim().trim_end_matches('.').trim();
            if !keyword.is_empty() {
                self.keywords.push(keyword.to_string());
            }
        }
        Ok(())
    }

    fn segment(&mut self, text: &str) -> Result<()> {
        self.annotations
            .insert("segment".to_string(), Annotation::Text(text.to_string()));
        Ok(())
    }

    fn source(&mut self, text: &str) -> Result<()> {
        self.annotations
            .insert("source".to_string(), Annotation::Text(text.trim().to_string()));
        Ok(())
    }

    fn organism(&mut self, text: &str) -> Result<()> {
        self.annotations
            .insert("organism".to_string(), Annotation::Text(text.trim().to_string()));
        Ok(())
    }

    fn taxonomy(&mut self, text: &str) -> Result<()> {
        for part in text.split(|c| c == ';' || c == '\n') {
            let part = part.trim().trim_end_matches('.').trim();
            if !part.is_empty() {
                self.taxonomy.push(part.to_string());
            }
        }
        Ok(())
    }

    fn reference_num(&mut self, number: usize) -> Result<()> {
        self.close_reference();
        self.open_reference = Some(Reference {
            number,
            ..Reference::default()
        });
        Ok(())
    }

    fn reference_bases(&mut self, text: &str) -> Result<()> {
        let spans = parse_reference_bases(text)?;
        self.reference_mut().bases = spans;
        Ok(())
    }

    fn authors(&mut self, text: &str) -> Result<()> {
        let reference = self.reference_mut();
        Self::append_field(&mut reference.authors, text);
        Ok(())
    }

    fn consortium(&mut self, text: &str) -> Result<()> {
        let reference = self.reference_mut();
        Self::append_field(&mut reference.consortium, text);
        Ok(())
    }

    fn title(&mut self, text: &str) -> Result<()> {
        let reference = self.reference_mut();
        Self::append_field(&mut reference.title, text);
        Ok(())
    }

    fn journal(&mut self, text: &str) -> Result<()> {
        let reference = self.reference_mut();
        Self::append_field(&mut reference.journal, text);
        Ok(())
    }

    fn medline_id(&mut self, text: &str) -> Result<()> {
        self.reference_mut().medline_id = text.trim().to_string();
        Ok(())
    }

    fn pubmed_id(&mut self, text: &str) -> Result<()> {
        self.reference_mut().pubmed_id = text.trim().to_string();
        Ok(())
    }

    fn remark(&mut self, text: &str) -> Result<()> {
        let reference = self.reference_mut();
        Self::append_field(&mut reference.remark, text);
        Ok(())
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        let mut plain: Vec<&str> = Vec::new();
        let mut open_tag: Option<String> = None;
        let mut rows: Vec<String> = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if let Some(tag) = trimmed
                .strip_prefix("##")
                .and_then(|rest| rest.strip_suffix("-START##"))
            {
                open_tag = Some(tag.to_string());
                rows.clear();
                continue;
            }
            if trimmed.starts_with("##") && trimmed.ends_with("-END##") {
                if let Some(tag) = open_tag.take() {
                    self.annotations.insert(
                        format!("structured_comment_{}", tag),
                        Annotation::List(std::mem::take(&mut rows)),
                    );
                }
                continue;
            }
            if open_tag.is_some() {
                match trimmed.split_once("::") {
                    Some((key, value)) => {
                        rows.push(format!("{}: {}", key.trim(), value.trim()))
                    }
                    None => rows.push(trimmed.to_string()),
                }
            } else {
                plain.push(line);
            }
        }
        if let Some(tag) = open_tag {
            log::warn!("structured comment '{}' never closed", tag);
            self.annotations.insert(
                format!("structured_comment_{}", tag),
                Annotation::List(rows),
            );
        }
        let plain = plain.join("\n");
        if !plain.trim().is_empty() {
            match self.annotations.get_mut("comment") {
                Some(Annotation::Text(existing)) => {
                    existing.push('\n');
                    existing.push_str(&plain);
                }
                _ => {
                    self.annotations
                        .insert("comment".to_string(), Annotation::Text(plain));
                }
            }
        }
        Ok(())
    }

    fn contig(&mut self, text: &str) -> Result<()> {
        self.annotations
            .insert("contig".to_string(), Annotation::Text(text.to_string()));
        Ok(())
    }

    fn feature_key(&mut self, key: &str) -> Result<()> {
        self.feature_blocks += 1;
        self.pending_feature_key = Some(key.to_string());
        Ok(())
    }

    fn location(&mut self, text: &str) -> Result<()> {
        let key = match self.pending_feature_key.take() {
            Some(key) => key,
            None => {
                log::warn!("location '{}' outside a feature block", text);
                return Ok(());
            }
        };
        let length = self.declared_size.unwrap_or(0) as i64;
        let stranded = !self.is_protein();
        let location = Location::from_genbank(text, length, self.circular(), stranded)?;
        self.features.push(Feature {
            key,
            location,
            qualifiers: Vec::new(),
        });
        Ok(())
    }

    fn feature_qualifier(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        let cleaned = value.map(|raw| {
            let stripped = strip_quotes(raw);
            match self.cleaners.get(key) {
                Some(cleaner) => cleaner(&stripped),
                None => stripped,
            }
        });
        match self.features.last_mut() {
            Some(feature) => feature.qualifiers.push(Qualifier::new(key, cleaned)),
            None => log::warn!("qualifier /{} outside a feature block", key),
        }
        Ok(())
    }

    fn sequence(&mut self, text: &str) -> Result<()> {
        self.data
            .extend(text.bytes().filter(|b| !b.is_ascii_whitespace()));
        Ok(())
    }

    fn record_end(&mut self) -> Result<()> {
        self.close_reference();

        if let Some(declared) = self.declared_size {
            if declared != self.data.len() {
                return Err(GbStreamError::LengthMismatch {
                    declared,
                    actual: self.data.len(),
                });
            }
        }

        let alphabet = self.alphabet();
        let mut record = Sequence::new(alphabet, std::mem::take(&mut self.data), true)?;
        record.id = std::mem::take(&mut self.id);
        record.name = std::mem::take(&mut self.name);
        record.description = std::mem::take(&mut self.description);
        record.annotations = std::mem::take(&mut self.annotations);
        record.dbxrefs = std::mem::take(&mut self.dbxrefs);
        record.features = std::mem::take(&mut self.features);

        if let Some(molecule) = self.molecule_type.take() {
            record
                .annotations
                .insert("molecule_type".to_string(), Annotation::Text(molecule));
        }
        if let Some(topology) = self.topology.take() {
            record
                .annotations
                .insert("topology".to_string(), Annotation::Text(topology));
        }
        if !self.accessions.is_empty() {
            record.annotations.insert(
                "accessions".to_string(),
                Annotation::List(std::mem::take(&mut self.accessions)),
            );
        }
        if !self.keywords.is_empty() {
            record.annotations.insert(
                "keywords".to_string(),
                Annotation::List(std::mem::take(&mut self.keywords)),
            );
        }
        if !self.taxonomy.is_empty() {
            record.annotations.insert(
                "taxonomy".to_string(),
                Annotation::List(std::mem::take(&mut self.taxonomy)),
            );
        }
        if !self.references.is_empty() {
            record.annotations.insert(
                "references".to_string(),
                Annotation::References(std::mem::take(&mut self.references)),
            );
        }
        record.metadata.insert(
            "feature_blocks".to_string(),
            Annotation::Int(self.feature_blocks as i64),
        );

        self.finished = Some(record);
        Ok(())
    }
}
