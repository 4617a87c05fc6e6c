//! Error types for gbstream

use thiserror::Error;

/// Result type alias for gbstream operations
pub type Result<T> = std::result::Result<T, GbStreamError>;

/// Error types that can occur in gbstream
#[derive(Debug, Error)]
pub enum GbStreamError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary-looking content before the first record
    #[error("Input does not look like text at line {line}")]
    NotText {
        /// Line number where error occurred
        line: usize,
    },

    /// No LOCUS dialect matched
    #[error("Unrecognized LOCUS line at line {line}: {text}")]
    UnrecognizedLocus {
        /// Line number where error occurred
        line: usize,
        /// The offending line
        text: String,
    },

    /// Malformed header field (date, topology, residue unit, ...)
    #[error("Bad header field at line {line}: {msg}")]
    BadHeaderField {
        /// Line number where error occurred
        line: usize,
        /// Error message
        msg: String,
    },

    /// EOF inside header / feature table / sequence block
    #[error("Premature end of record at line {line}")]
    PrematureEnd {
        /// Line number where error occurred
        line: usize,
    },

    /// Sequence line with broken indentation or missing line number
    #[error("Malformed sequence line at line {line}: {msg}")]
    MalformedSequenceLine {
        /// Line number where error occurred
        line: usize,
        /// Error message
        msg: String,
    },

    /// Declared LOCUS size does not match the parsed residue count
    #[error("Sequence length mismatch: LOCUS declares {declared}, parsed {actual}")]
    LengthMismatch {
        /// Size declared on the LOCUS line
        declared: usize,
        /// Number of residues actually parsed
        actual: usize,
    },

    /// Feature or reference location syntax error
    #[error("Location parse error: {0}")]
    Location(#[from] LocationError),

    /// Sequence contains a symbol the alphabet rejects
    #[error("Invalid symbol '{symbol}' at position {index} for alphabet {alphabet}")]
    InvalidSymbol {
        /// 0-based index of the offending symbol
        index: usize,
        /// The offending symbol
        symbol: char,
        /// Name of the alphabet that rejected it
        alphabet: &'static str,
    },

    /// Qualifier continuation line without an open qualifier
    #[error("Qualifier continuation without an open qualifier at line {line}")]
    OrphanContinuation {
        /// Line number where error occurred
        line: usize,
    },

    /// Operation not supported for the given alphabet
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Indexed access past the end of the sequence
    #[error("Index out of range: {index} (length {len})")]
    OutOfRange {
        /// Requested index (or span end)
        index: usize,
        /// Sequence length
        len: usize,
    },
}

/// Errors from the feature-location expression grammar
#[derive(Debug, Error)]
pub enum LocationError {
    /// `join`/`order`/`bond` nested inside another operator
    #[error("nested location operators in '{0}'")]
    NestedOperators(String),

    /// `complement` applied to an already-complemented sub-location
    #[error("double complement in '{0}'")]
    DoubleComplement(String),

    /// start > end on a non-circular molecule
    #[error("location '{0}' wraps the origin of a non-circular molecule")]
    OriginWrapNotCircular(String),

    /// Resolved start coordinate below zero
    #[error("negative start coordinate in '{0}'")]
    NegativeStart(String),

    /// Unparseable REFERENCE bases span
    #[error("cannot parse reference bases '{0}'")]
    BadReferenceBases(String),

    /// Anything else the grammar rejects
    #[error("cannot parse location '{0}'")]
    Syntax(String),
}
