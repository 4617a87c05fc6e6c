//! Streaming scanners for INSDC flat files
//!
//! Three layers, composed bottom-up:
//! - [`LineScanner`]: pull-based line reader with one line of look-ahead
//! - [`InsdcScanner`]: the shared INSDC skeleton (record start, header
//!   accumulation, feature-table blocks, qualifier assembly), parameterized
//!   by an [`InsdcLayout`]
//! - [`GenBankScanner`]: the GenBank specialization (LOCUS dialects,
//!   header sections, ORIGIN sequence block)

mod genbank;
mod insdc;
mod line;

pub use genbank::{GenBankScanner, GENBANK_LAYOUT};
pub use insdc::{InsdcLayout, InsdcScanner, RawFeature};
pub use line::LineScanner;
