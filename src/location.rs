//! Feature-location expressions: fuzzy positions, simple and compound spans
//!
//! GenBank feature locations form a small language of their own:
//!
//! ```text
//! 467                        single base
//! 340..565                   contiguous span
//! <345..500                  fuzzy start
//! (102.110)..(123.127)       start/end somewhere within a window
//! 123^124                    between two adjacent bases
//! one-of(1888,1901)..2055    start at one of several bases
//! join(12..78,134..202)      spliced span
//! complement(34..126)        reverse strand
//! J00194.1:100..202          span on another record
//! ```
//!
//! Coordinates in the parsed model are **0-based, half-open** `[start, end)`;
//! the grammar's 1-based inclusive numbers are converted during parsing.
//!
//! # Examples
//!
//! ```
//! use gbstream::location::{Location, Strand};
//!
//! let loc = Location::from_genbank("complement(340..565)", 1000, false, true)?;
//! assert_eq!(loc.bounds(), (339, 565));
//! assert_eq!(loc.strand(), Strand::Reverse);
//! # Ok::<(), gbstream::error::LocationError>(())
//! ```

use crate::error::LocationError;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "J00194.1:" style reference prefix; the tail character class keeps a
    // trailing '.' or '|' out of the captured name
    static ref RE_REFERENCE: Regex =
        Regex::new(r"^([a-zA-Z][a-zA-Z0-9_.|]*[a-zA-Z0-9]?):(.*)$").unwrap();

    // "123^124" between-bases location
    static ref RE_BETWEEN: Regex = Regex::new(r"^(\d+)\^(\d+)$").unwrap();

    // One sub-location inside a compound interior: optional reference,
    // optional complement wrapper, then a pair / between / solo expression
    // over plain, fuzzy, within and one-of positions. Used to split
    // "1..117,240..353" style lists; everything between matches must be
    // separator commas.
    static ref RE_ANY_LOCATION: Regex = {
        let reference = r"[a-zA-Z][a-zA-Z0-9_.|]*[a-zA-Z0-9]?:";
        let oneof = r"one-of\(\d+(?:,\d+)+\)";
        let within = r"\(\d+\.\d+\)";
        let pos = format!(r"(?:[<>]?(?:{oneof}|{within}|\d+)|\?\d*)");
        let pair = format!(r"{pos}\.\.{pos}");
        let between = r"\d+\^\d+";
        Regex::new(&format!(
            r"(?:{reference})?(?:complement\()?(?:{pair}|{between}|{pos})\)?"
        ))
        .unwrap()
    };
}

/// A position on a sequence, possibly fuzzy.
///
/// Every variant exposes a single integer through
/// [`monomer_position`](Position::monomer_position) which is used for
/// ordering and coordinate arithmetic; fuzzy variants report their default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// A known, exact coordinate
    Exact(i64),
    /// Somewhere before the coordinate (`<n`)
    Before(i64),
    /// Somewhere after the coordinate (`>n`)
    After(i64),
    /// Somewhere inside a window (`(low.high)`)
    Within {
        /// Coordinate used for ordering/arithmetic
        default: i64,
        /// Window start
        low: i64,
        /// Window end
        high: i64,
    },
    /// One of several candidate coordinates (`one-of(a,b,...)`)
    OneOf {
        /// Coordinate used for ordering/arithmetic
        default: i64,
        /// The candidate coordinates
        choices: Vec<i64>,
    },
    /// An uncertain but numbered coordinate (`?n`)
    Uncertain(i64),
    /// A completely unknown coordinate (`?`)
    Unknown,
}

impl Position {
    /// The single integer used for ordering and arithmetic.
    ///
    /// `Unknown` reports 0: it sorts first and never trips the
    /// negative-start check.
    pub fn monomer_position(&self) -> i64 {
        match *self {
            Position::Exact(n)
            | Position::Before(n)
            | Position::After(n)
            | Position::Uncertain(n) => n,
            Position::Within { default, .. } | Position::OneOf { default, .. } => default,
            Position::Unknown => 0,
        }
    }

    /// Parse a GenBank position token.
    ///
    /// `offset` is `-1` for start positions and `0` for end positions,
    /// converting the grammar's 1-based inclusive coordinates into the
    /// 0-based half-open model.
    pub fn from_genbank(text: &str, offset: i64) -> Result<Position, LocationError> {
        debug_assert!(offset == 0 || offset == -1);
        let text = text.trim();
        if text == "?" {
            return Ok(Position::Unknown);
        }
        if let Some(digits) = text.strip_prefix('?') {
            let n = parse_int(digits, text)?;
            return Ok(Position::Uncertain(n + offset));
        }
        if let Some(digits) = text.strip_prefix('<') {
            return Ok(Position::Before(parse_position_int(digits, offset, text)?));
        }
        if let Some(digits) = text.strip_prefix('>') {
            return Ok(Position::After(parse_position_int(digits, offset, text)?));
        }
        if let Some(interior) = text
            .strip_prefix("one-of(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let mut choices = Vec::new();
            for part in interior.split(',') {
                choices.push(parse_int(part.trim(), text)? + offset);
            }
            if choices.len() < 2 {
                return Err(LocationError::Syntax(text.to_string()));
            }
            let default = if offset == -1 {
                *choices.iter().min().unwrap()
            } else {
                *choices.iter().max().unwrap()
            };
            return Ok(Position::OneOf { default, choices });
        }
        if let Some(interior) = text
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let (low, high) = interior
                .split_once('.')
                .ok_or_else(|| LocationError::Syntax(text.to_string()))?;
            let low = parse_int(low, text)? + offset;
            let high = parse_int(high, text)? + offset;
            let default = if offset == -1 { low } else { high };
            return Ok(Position::Within { default, low, high });
        }
        Ok(Position::Exact(parse_position_int(text, offset, text)?))
    }
}

fn parse_int(digits: &str, context: &str) -> Result<i64, LocationError> {
    digits
        .trim()
        .parse::<i64>()
        .map_err(|_| LocationError::Syntax(context.to_string()))
}

fn parse_position_int(digits: &str, offset: i64, context: &str) -> Result<i64, LocationError> {
    // one-of as a fuzzy operand of < or > collapses to its default
    if let Some(interior) = digits
        .strip_prefix("one-of(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let mut best: Option<i64> = None;
        for part in interior.split(',') {
            let n = parse_int(part.trim(), context)? + offset;
            best = Some(match best {
                Some(b) if offset == -1 => b.min(n),
                Some(b) => b.max(n),
                None => n,
            });
        }
        return best.ok_or_else(|| LocationError::Syntax(context.to_string()));
    }
    Ok(parse_int(digits, context)? + offset)
}

/// Strand orientation of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strand {
    /// The annotated (forward) strand
    Forward,
    /// The reverse-complement strand (`complement(...)`)
    Reverse,
    /// No strand information (protein records, unstranded molecules)
    Unknown,
}

impl std::ops::Neg for Strand {
    type Output = Strand;
    fn neg(self) -> Strand {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
            Strand::Unknown => Strand::Unknown,
        }
    }
}

/// The operator of a compound location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `join(...)`: parts form one continuous biological sequence
    Join,
    /// `order(...)`: parts are in this order but not necessarily joined
    Order,
    /// `bond(...)`: bonded residue positions (protein records)
    Bond,
}

/// A contiguous span on a sequence, 0-based half-open.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleLocation {
    /// Start position (inclusive)
    pub start: Position,
    /// End position (exclusive)
    pub end: Position,
    /// Strand orientation
    pub strand: Strand,
    /// Name of the record this span lives on, when not the current one
    pub reference: Option<String>,
    /// Database of the referenced record
    pub ref_db: Option<String>,
}

impl SimpleLocation {
    /// Exact span `[start, end)` with no strand information.
    pub fn new(start: i64, end: i64) -> Self {
        SimpleLocation {
            start: Position::Exact(start),
            end: Position::Exact(end),
            strand: Strand::Unknown,
            reference: None,
            ref_db: None,
        }
    }

    /// Exact span with a strand.
    pub fn with_strand(start: i64, end: i64, strand: Strand) -> Self {
        SimpleLocation {
            strand,
            ..SimpleLocation::new(start, end)
        }
    }

    /// `(start, end)` as monomer coordinates.
    pub fn bounds(&self) -> (i64, i64) {
        (self.start.monomer_position(), self.end.monomer_position())
    }

    /// Span length in residues.
    pub fn len(&self) -> i64 {
        let (start, end) = self.bounds();
        end - start
    }

    /// Whether the span covers no residues.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A feature location: either one contiguous span or an operator over spans.
///
/// Compound parts are always simple; operators never nest.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// One contiguous span
    Simple(SimpleLocation),
    /// An operator over two or more spans
    Compound {
        /// The compound operator
        operator: Operator,
        /// The member spans, in source order (reversed for `complement`)
        parts: Vec<SimpleLocation>,
    },
}

impl Location {
    /// Parse a GenBank location expression.
    ///
    /// `length` is the record's declared sequence length (used for origin
    /// wrapping and origin-adjacent between-locations), `circular` whether
    /// the molecule's topology permits origin wrapping, and `stranded`
    /// whether an unmarked location defaults to [`Strand::Forward`].
    ///
    /// # Examples
    ///
    /// ```
    /// use gbstream::location::{Location, SimpleLocation, Operator, Strand};
    ///
    /// let loc = Location::from_genbank("join(1..117,240..353)", 400, false, true)?;
    /// match loc {
    ///     Location::Compound { operator, parts } => {
    ///         assert_eq!(operator, Operator::Join);
    ///         assert_eq!(parts[0].bounds(), (0, 117));
    ///         assert_eq!(parts[1].bounds(), (239, 353));
    ///     }
    ///     _ => panic!("expected a compound location"),
    /// }
    /// # Ok::<(), gbstream::error::LocationError>(())
    /// ```
    pub fn from_genbank(
        text: &str,
        length: i64,
        circular: bool,
        stranded: bool,
    ) -> Result<Location, LocationError> {
        let mut text = text.trim().to_string();
        if text.contains(",)") {
            log::warn!("location '{}' has a trailing comma, dropping it", text);
            text = text.replace(",)", ")");
        }

        let default_strand = if stranded {
            Strand::Forward
        } else {
            Strand::Unknown
        };
        let (outer_strand, body) = match strip_complement(&text) {
            Some(interior) => (Strand::Reverse, interior),
            None => (default_strand, text.as_str()),
        };

        if let Some((operator, interior)) = strip_operator(body) {
            return Self::parse_compound(&text, operator, interior, outer_strand, length, circular);
        }

        // whole expression is one simple location
        match parse_simple(body, length, circular)? {
            Location::Simple(mut span) => {
                if outer_strand == Strand::Reverse {
                    if span.strand == Strand::Reverse {
                        return Err(LocationError::DoubleComplement(text));
                    }
                    span.strand = Strand::Reverse;
                } else if span.strand == Strand::Unknown {
                    span.strand = outer_strand;
                }
                Ok(Location::Simple(span))
            }
            Location::Compound {
                operator,
                mut parts,
            } => {
                // origin wrap produced the parts
                if outer_strand == Strand::Reverse {
                    for part in &mut parts {
                        part.strand = Strand::Reverse;
                    }
                    parts.reverse();
                } else {
                    for part in &mut parts {
                        if part.strand == Strand::Unknown {
                            part.strand = outer_strand;
                        }
                    }
                }
                Ok(Location::Compound { operator, parts })
            }
        }
    }

    fn parse_compound(
        original: &str,
        operator: Operator,
        interior: &str,
        outer_strand: Strand,
        length: i64,
        circular: bool,
    ) -> Result<Location, LocationError> {
        if ["join(", "order(", "bond("]
            .iter()
            .any(|op| interior.contains(op))
        {
            return Err(LocationError::NestedOperators(original.to_string()));
        }

        let pieces = split_locations(interior);
        let mut parts: Vec<SimpleLocation> = Vec::new();
        for (i, piece) in pieces.iter().enumerate() {
            if i % 2 == 0 {
                // separator slot: only commas and whitespace belong here
                if !piece.trim().trim_matches(',').trim().is_empty() {
                    return Err(LocationError::Syntax(original.to_string()));
                }
                continue;
            }
            match parse_simple(piece, length, circular)? {
                Location::Simple(span) => parts.push(span),
                Location::Compound { .. } => {
                    return Err(LocationError::NestedOperators(original.to_string()))
                }
            }
        }
        if parts.is_empty() {
            return Err(LocationError::Syntax(original.to_string()));
        }

        if outer_strand == Strand::Reverse {
            for part in &mut parts {
                if part.strand == Strand::Reverse {
                    return Err(LocationError::DoubleComplement(original.to_string()));
                }
                if part.strand == Strand::Unknown {
                    part.strand = Strand::Reverse;
                }
            }
            parts.reverse();
        } else {
            for part in &mut parts {
                if part.strand == Strand::Unknown {
                    part.strand = outer_strand;
                }
            }
        }

        if parts.len() == 1 {
            return Ok(Location::Simple(parts.pop().unwrap()));
        }
        Ok(Location::Compound { operator, parts })
    }

    /// `(min start, max end)` over all spans, as monomer coordinates.
    pub fn bounds(&self) -> (i64, i64) {
        match self {
            Location::Simple(span) => span.bounds(),
            Location::Compound { parts, .. } => {
                let start = parts
                    .iter()
                    .map(|p| p.start.monomer_position())
                    .min()
                    .unwrap_or(0);
                let end = parts
                    .iter()
                    .map(|p| p.end.monomer_position())
                    .max()
                    .unwrap_or(0);
                (start, end)
            }
        }
    }

    /// Strand of the location.
    ///
    /// A compound with mixed part strands reports [`Strand::Unknown`].
    pub fn strand(&self) -> Strand {
        match self {
            Location::Simple(span) => span.strand,
            Location::Compound { parts, .. } => {
                let first = parts.first().map(|p| p.strand).unwrap_or(Strand::Unknown);
                if parts.iter().all(|p| p.strand == first) {
                    first
                } else {
                    Strand::Unknown
                }
            }
        }
    }
}

fn strip_complement(text: &str) -> Option<&str> {
    text.strip_prefix("complement(")
        .and_then(|rest| rest.strip_suffix(')'))
}

fn strip_operator(text: &str) -> Option<(Operator, &str)> {
    for (prefix, operator) in [
        ("join(", Operator::Join),
        ("order(", Operator::Order),
        ("bond(", Operator::Bond),
    ] {
        if let Some(interior) = text
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(')'))
        {
            // single-operand bond is a qualifier on a simple location, not
            // a compound; leave it to the simple parser
            if operator == Operator::Bond && !interior.contains(',') {
                return None;
            }
            return Some((operator, interior));
        }
    }
    None
}

/// Split a compound interior into alternating separator / sub-location
/// pieces. Odd indices hold the captured sub-locations.
pub(crate) fn split_locations(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut last = 0;
    for found in RE_ANY_LOCATION.find_iter(text) {
        pieces.push(text[last..found.start()].to_string());
        pieces.push(found.as_str().to_string());
        last = found.end();
    }
    pieces.push(text[last..].to_string());
    pieces
}

/// Parse one simple location expression.
///
/// Returns `Location::Compound` only when an origin-wrapping span on a
/// circular molecule is rewritten as `join(start..length, 0..end)`.
fn parse_simple(text: &str, length: i64, circular: bool) -> Result<Location, LocationError> {
    let text = text.trim();

    if let Some(interior) = strip_complement(text) {
        return match parse_simple(interior, length, circular)? {
            Location::Simple(mut span) => {
                if span.strand == Strand::Reverse {
                    return Err(LocationError::DoubleComplement(text.to_string()));
                }
                span.strand = Strand::Reverse;
                Ok(Location::Simple(span))
            }
            Location::Compound {
                operator,
                mut parts,
            } => {
                for part in &mut parts {
                    part.strand = Strand::Reverse;
                }
                parts.reverse();
                Ok(Location::Compound { operator, parts })
            }
        };
    }

    // fast path: plain integer pair
    if let Some((left, right)) = text.split_once("..") {
        if let (Ok(start), Ok(end)) = (left.parse::<i64>(), right.parse::<i64>()) {
            if start >= 1 && start - 1 < end {
                return Ok(Location::Simple(SimpleLocation::new(start - 1, end)));
            }
        }
    }

    let (reference, body) = match RE_REFERENCE.captures(text) {
        Some(caps) => (
            Some(caps.get(1).unwrap().as_str().to_string()),
            caps.get(2).unwrap().as_str(),
        ),
        None => (None, text),
    };

    // single-operand bond qualifier: keep the position, drop the bond
    let body = match body
        .strip_prefix("bond(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(interior) => {
            log::warn!("dropping bond qualifier in location '{}'", text);
            interior
        }
        None => body,
    };

    if let Some(caps) = RE_BETWEEN.captures(body) {
        let low = parse_int(caps.get(1).unwrap().as_str(), text)?;
        let high = parse_int(caps.get(2).unwrap().as_str(), text)?;
        if high != low + 1 && !(low == length && high == 1) {
            return Err(LocationError::Syntax(text.to_string()));
        }
        let mut span = SimpleLocation::new(low, low);
        span.reference = reference;
        return Ok(Location::Simple(span));
    }

    let (start, end) = match body.split_once("..") {
        Some((left, right)) => (
            Position::from_genbank(left, -1)?,
            Position::from_genbank(right, 0)?,
        ),
        None => (
            Position::from_genbank(body, -1)?,
            Position::from_genbank(body, 0)?,
        ),
    };

    if start.monomer_position() < 0 {
        return Err(LocationError::NegativeStart(text.to_string()));
    }

    if start.monomer_position() > end.monomer_position() {
        if !circular {
            return Err(LocationError::OriginWrapNotCircular(text.to_string()));
        }
        log::warn!(
            "location '{}' wraps the origin, rewriting as a join",
            text
        );
        let head = SimpleLocation {
            start,
            end: Position::Exact(length),
            strand: Strand::Unknown,
            reference: reference.clone(),
            ref_db: None,
        };
        let tail = SimpleLocation {
            start: Position::Exact(0),
            end,
            strand: Strand::Unknown,
            reference,
            ref_db: None,
        };
        return Ok(Location::Compound {
            operator: Operator::Join,
            parts: vec![head, tail],
        });
    }

    let mut span = SimpleLocation {
        start,
        end,
        strand: Strand::Unknown,
        reference: None,
        ref_db: None,
    };
    span.reference = reference;
    Ok(Location::Simple(span))
}
