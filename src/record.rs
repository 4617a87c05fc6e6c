//! The in-memory record model: sequences, features, qualifiers, references
//!
//! A [`Sequence`] owns a residue buffer plus the annotation bags a GenBank
//! record carries: free-form annotations, per-letter annotations, database
//! cross-references, literature references and the feature table.
//!
//! # Examples
//!
//! ```
//! use gbstream::alphabet::DNA;
//! use gbstream::record::Sequence;
//!
//! let seq = Sequence::new(&DNA, b"ACGTACGT".to_vec(), true)?;
//! assert_eq!(seq.len(), 8);
//! assert_eq!(seq.get(0)?, b'A');
//!
//! let rc = seq.reverse_complement()?;
//! assert_eq!(rc.data(), b"ACGTACGT"); // palindrome
//! # Ok::<(), gbstream::error::GbStreamError>(())
//! ```

use crate::alphabet::Alphabet;
use crate::error::{GbStreamError, Result};
use crate::location::{Location, SimpleLocation};
use std::collections::HashMap;

/// A value in a record's annotation or metadata bag.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// Free text (definition, organism, comment, ...)
    Text(String),
    /// An integer (sequence version, GI number, ...)
    Int(i64),
    /// A list of strings (accessions, keywords, taxonomy, ...)
    List(Vec<String>),
    /// Literature references
    References(Vec<Reference>),
}

impl Annotation {
    /// The text payload, if this is a [`Annotation::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Annotation::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The integer payload, if this is an [`Annotation::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Annotation::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// The list payload, if this is an [`Annotation::List`].
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Annotation::List(items) => Some(items),
            _ => None,
        }
    }

    /// The references payload, if this is an [`Annotation::References`].
    pub fn as_references(&self) -> Option<&[Reference]> {
        match self {
            Annotation::References(refs) => Some(refs),
            _ => None,
        }
    }
}

/// A `/key=value` annotation attached to a feature.
///
/// A bare flag such as `/pseudo` has no value. At the scanner boundary a
/// quoted value still carries its surrounding quotes; the bundled consumer
/// strips them when it builds the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qualifier {
    /// Qualifier key (without the leading `/`)
    pub key: String,
    /// Qualifier value, `None` for bare flags
    pub value: Option<String>,
}

impl Qualifier {
    /// Create a qualifier.
    pub fn new(key: impl Into<String>, value: Option<String>) -> Self {
        Qualifier {
            key: key.into(),
            value,
        }
    }
}

/// An annotated region of the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature key (`source`, `gene`, `CDS`, `exon`, ...)
    pub key: String,
    /// Parsed location of the feature
    pub location: Location,
    /// Feature qualifiers, in source order
    pub qualifiers: Vec<Qualifier>,
}

impl Feature {
    /// Look up the first qualifier value for a key.
    ///
    /// Bare flags report `None` even when present; use
    /// [`has_qualifier`](Feature::has_qualifier) to test for those.
    pub fn qualifier(&self, key: &str) -> Option<&str> {
        self.qualifiers
            .iter()
            .find(|q| q.key == key)
            .and_then(|q| q.value.as_deref())
    }

    /// Whether a qualifier with the key exists, valued or bare.
    pub fn has_qualifier(&self, key: &str) -> bool {
        self.qualifiers.iter().any(|q| q.key == key)
    }
}

/// A literature reference or direct submission.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reference {
    /// Reference number within the record
    pub number: usize,
    /// Base spans this reference applies to, 0-based half-open
    pub bases: Vec<SimpleLocation>,
    /// Author list as printed
    pub authors: String,
    /// Consortium author, if any
    pub consortium: String,
    /// Publication title
    pub title: String,
    /// Journal or submission information
    pub journal: String,
    /// MEDLINE identifier
    pub medline_id: String,
    /// PubMed identifier
    pub pubmed_id: String,
    /// Free-form remark
    pub remark: String,
}

/// An annotated biological sequence.
///
/// Invariants:
/// - every symbol in the data buffer satisfies `alphabet.valid`
///   (when constructed with validation),
/// - every per-letter annotation list has exactly one entry per symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    /// Record identifier (accession, or accession.version)
    pub id: String,
    /// Locus name
    pub name: String,
    /// Definition line
    pub description: String,
    /// The residue alphabet of the data buffer
    pub alphabet: &'static Alphabet,
    data: Vec<u8>,
    /// Parse-level metadata (shallow-copied into subsequences)
    pub metadata: HashMap<String, Annotation>,
    /// Record annotations (molecule type, topology, references, ...)
    pub annotations: HashMap<String, Annotation>,
    letter_annotations: HashMap<String, Vec<String>>,
    /// Database cross-references (`DBLINK` / `PROJECT` entries)
    pub dbxrefs: Vec<String>,
    /// The feature table, in source order
    pub features: Vec<Feature>,
}

impl Sequence {
    /// Create a sequence over a residue buffer.
    ///
    /// With `validate` set, fails with
    /// [`InvalidSymbol`](GbStreamError::InvalidSymbol) on the first symbol
    /// the alphabet rejects.
    pub fn new(alphabet: &'static Alphabet, data: Vec<u8>, validate: bool) -> Result<Self> {
        if validate {
            if let Some(index) = data.iter().position(|&sym| !alphabet.valid(sym)) {
                return Err(GbStreamError::InvalidSymbol {
                    index,
                    symbol: data[index] as char,
                    alphabet: alphabet.name,
                });
            }
        }
        Ok(Sequence {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            alphabet,
            data,
            metadata: HashMap::new(),
            annotations: HashMap::new(),
            letter_annotations: HashMap::new(),
            dbxrefs: Vec::new(),
            features: Vec::new(),
        })
    }

    /// The residue buffer.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of residues.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the sequence holds no residues.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Indexed access to one residue.
    pub fn get(&self, index: usize) -> Result<u8> {
        self.data
            .get(index)
            .copied()
            .ok_or(GbStreamError::OutOfRange {
                index,
                len: self.data.len(),
            })
    }

    /// A new sequence over `[start, start + length)`.
    ///
    /// The subsequence inherits the id, the alphabet and a shallow copy of
    /// the metadata map; annotations, features and per-letter annotations
    /// stay with the parent.
    pub fn subsequence(&self, start: usize, length: usize) -> Result<Sequence> {
        let end = start
            .checked_add(length)
            .filter(|&end| end <= self.data.len())
            .ok_or(GbStreamError::OutOfRange {
                index: start.saturating_add(length),
                len: self.data.len(),
            })?;
        let mut sub = Sequence::new(self.alphabet, self.data[start..end].to_vec(), false)?;
        sub.id = self.id.clone();
        sub.metadata = self.metadata.clone();
        Ok(sub)
    }

    /// A new sequence with the residues reversed.
    pub fn reverse(&self) -> Sequence {
        let mut reversed = self.clone();
        reversed.data.reverse();
        reversed.letter_annotations.clear();
        reversed
    }

    /// A new sequence with every residue complemented.
    ///
    /// Fails with [`Unsupported`](GbStreamError::Unsupported) when the
    /// alphabet defines no complement (proteins).
    pub fn complement(&self) -> Result<Sequence> {
        if !self.alphabet.complement_supported {
            return Err(GbStreamError::Unsupported("alphabet complement"));
        }
        let mut complemented = self.clone();
        for sym in &mut complemented.data {
            // membership was checked at construction, the table covers it
            if let Some(c) = self.alphabet.complement(*sym) {
                *sym = c;
            }
        }
        complemented.letter_annotations.clear();
        Ok(complemented)
    }

    /// A new sequence with the residues reverse-complemented.
    pub fn reverse_complement(&self) -> Result<Sequence> {
        let mut rc = self.complement()?;
        rc.data.reverse();
        Ok(rc)
    }

    /// Index of the first non-gap residue at or after `from`.
    ///
    /// Returns `-1` when every remaining residue is a gap.
    pub fn index_of_non_gap(&self, from: usize) -> isize {
        let gaps = self.alphabet.gap_symbols();
        for (i, &sym) in self.data.iter().enumerate().skip(from) {
            if !gaps.contains(&sym) {
                return i as isize;
            }
        }
        -1
    }

    /// Index of the last non-gap residue at or before `to`.
    ///
    /// Returns `-1` when every preceding residue is a gap.
    pub fn last_index_of_non_gap(&self, to: usize) -> isize {
        if self.data.is_empty() {
            return -1;
        }
        let gaps = self.alphabet.gap_symbols();
        let mut i = to.min(self.data.len() - 1) as isize;
        while i >= 0 {
            if !gaps.contains(&self.data[i as usize]) {
                return i;
            }
            i -= 1;
        }
        -1
    }

    /// Attach a per-letter annotation list.
    ///
    /// The list must have exactly one entry per residue.
    pub fn set_letter_annotation(&mut self, key: impl Into<String>, values: Vec<String>) -> Result<()> {
        if values.len() != self.data.len() {
            return Err(GbStreamError::OutOfRange {
                index: values.len(),
                len: self.data.len(),
            });
        }
        self.letter_annotations.insert(key.into(), values);
        Ok(())
    }

    /// Look up a per-letter annotation list.
    pub fn letter_annotation(&self, key: &str) -> Option<&[String]> {
        self.letter_annotations.get(key).map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{DNA, PROTEIN, RNA};

    #[test]
    fn test_new_validates() {
        assert!(Sequence::new(&DNA, b"ACGTacgtN-".to_vec(), true).is_ok());

        let err = Sequence::new(&DNA, b"ACGET".to_vec(), true).unwrap_err();
        match err {
            GbStreamError::InvalidSymbol {
                index,
                symbol,
                alphabet,
            } => {
                assert_eq!(index, 3);
                assert_eq!(symbol, 'E');
                assert_eq!(alphabet, "DNA");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_new_unvalidated_accepts_anything() {
        let seq = Sequence::new(&DNA, b"XYZ123".to_vec(), false).unwrap();
        assert_eq!(seq.len(), 6);
    }

    #[test]
    fn test_get() {
        let seq = Sequence::new(&DNA, b"ACGT".to_vec(), true).unwrap();
        assert_eq!(seq.get(0).unwrap(), b'A');
        assert_eq!(seq.get(3).unwrap(), b'T');
        assert!(matches!(
            seq.get(4),
            Err(GbStreamError::OutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_subsequence() {
        let mut seq = Sequence::new(&DNA, b"ACGTACGT".to_vec(), true).unwrap();
        seq.id = "X001".to_string();
        seq.metadata
            .insert("parsed_from".to_string(), Annotation::Text("test".into()));

        let sub = seq.subsequence(2, 4).unwrap();
        assert_eq!(sub.data(), b"GTAC");
        assert_eq!(sub.id, "X001");
        assert_eq!(
            sub.metadata.get("parsed_from").and_then(|a| a.as_text()),
            Some("test")
        );
        assert!(sub.annotations.is_empty());

        assert!(seq.subsequence(5, 4).is_err());
        assert!(seq.subsequence(9, 0).is_err());
    }

    #[test]
    fn test_subsequence_composition() {
        let seq = Sequence::new(&DNA, b"ACGTACGTAC".to_vec(), true).unwrap();
        let a = seq.subsequence(2, 6).unwrap().subsequence(1, 3).unwrap();
        let b = seq.subsequence(3, 3).unwrap();
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_reverse() {
        let seq = Sequence::new(&DNA, b"ACGT".to_vec(), true).unwrap();
        assert_eq!(seq.reverse().data(), b"TGCA");
        assert_eq!(seq.reverse().reverse().data(), seq.data());
    }

    #[test]
    fn test_complement() {
        let seq = Sequence::new(&DNA, b"ACGTn".to_vec(), true).unwrap();
        assert_eq!(seq.complement().unwrap().data(), b"TGCAn");

        let rna = Sequence::new(&RNA, b"ACGU".to_vec(), true).unwrap();
        assert_eq!(rna.complement().unwrap().data(), b"UGCA");
    }

    #[test]
    fn test_reverse_complement() {
        let seq = Sequence::new(&DNA, b"AACGT".to_vec(), true).unwrap();
        assert_eq!(seq.reverse_complement().unwrap().data(), b"ACGTT");
        // duality with complement-then-reverse
        assert_eq!(
            seq.reverse_complement().unwrap().data(),
            seq.complement().unwrap().reverse().data()
        );
    }

    #[test]
    fn test_protein_complement_unsupported() {
        let seq = Sequence::new(&PROTEIN, b"MEDY".to_vec(), true).unwrap();
        assert!(matches!(
            seq.complement(),
            Err(GbStreamError::Unsupported(_))
        ));
        assert!(matches!(
            seq.reverse_complement(),
            Err(GbStreamError::Unsupported(_))
        ));
    }

    #[test]
    fn test_gap_scans() {
        let seq = Sequence::new(&DNA, b"--AC--G-".to_vec(), true).unwrap();
        assert_eq!(seq.index_of_non_gap(0), 2);
        assert_eq!(seq.index_of_non_gap(3), 3);
        assert_eq!(seq.index_of_non_gap(4), 6);
        assert_eq!(seq.index_of_non_gap(7), -1);
        assert_eq!(seq.last_index_of_non_gap(7), 6);
        assert_eq!(seq.last_index_of_non_gap(5), 3);
        assert_eq!(seq.last_index_of_non_gap(1), -1);

        let all_gaps = Sequence::new(&DNA, b"----".to_vec(), true).unwrap();
        assert_eq!(all_gaps.index_of_non_gap(0), -1);
        assert_eq!(all_gaps.last_index_of_non_gap(3), -1);
    }

    #[test]
    fn test_letter_annotations_length_invariant() {
        let mut seq = Sequence::new(&DNA, b"ACGT".to_vec(), true).unwrap();
        assert!(seq
            .set_letter_annotation(
                "quality",
                vec!["1".into(), "2".into(), "3".into(), "4".into()]
            )
            .is_ok());
        assert_eq!(seq.letter_annotation("quality").map(|v| v.len()), Some(4));

        assert!(seq
            .set_letter_annotation("quality", vec!["1".into()])
            .is_err());
    }

    #[test]
    fn test_feature_qualifier_lookup() {
        let feature = Feature {
            key: "CDS".to_string(),
            location: Location::Simple(SimpleLocation::new(0, 10)),
            qualifiers: vec![
                Qualifier::new("gene", Some("sucA".to_string())),
                Qualifier::new("pseudo", None),
            ],
        };
        assert_eq!(feature.qualifier("gene"), Some("sucA"));
        assert_eq!(feature.qualifier("pseudo"), None);
        assert!(feature.has_qualifier("pseudo"));
        assert!(!feature.has_qualifier("product"));
    }

    proptest::proptest! {
        /// subsequence composition law
        #[test]
        fn prop_subsequence_composition(
            data in proptest::collection::vec(
                proptest::sample::select(b"ACGT".to_vec()), 1..200),
            a in 0usize..50, n in 0usize..100, b in 0usize..50, m in 0usize..50,
        ) {
            let seq = Sequence::new(&DNA, data, true).unwrap();
            let outer = seq.subsequence(a, n);
            let inner = outer.as_ref().ok().and_then(|s| s.subsequence(b, m).ok());
            let direct = seq.subsequence(a + b, m).ok();
            if let (Some(inner), Some(direct)) = (inner, direct) {
                proptest::prop_assert_eq!(inner.data(), direct.data());
            }
        }

        /// double reverse is the identity
        #[test]
        fn prop_double_reverse(
            data in proptest::collection::vec(
                proptest::sample::select(b"ACGTN-".to_vec()), 0..200),
        ) {
            let seq = Sequence::new(&DNA, data, true).unwrap();
            let double_reversed = seq.reverse().reverse();
            proptest::prop_assert_eq!(double_reversed.data(), seq.data());
        }

        /// reverse_complement == complement then reverse
        #[test]
        fn prop_reverse_complement_duality(
            data in proptest::collection::vec(
                proptest::sample::select(b"ACGTacgtNn".to_vec()), 0..200),
        ) {
            let seq = Sequence::new(&DNA, data, true).unwrap();
            let rev_comp = seq.reverse_complement().unwrap();
            let comp_rev = seq.complement().unwrap().reverse();
            proptest::prop_assert_eq!(rev_comp.data(), comp_rev.data());
        }
    }
}
