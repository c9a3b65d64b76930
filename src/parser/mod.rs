//! Identifier parsing.
//!
//! Two paths produce the same [`Identifier`] shape:
//!
//! - [`compact`]: dotted machine identifiers and DOIs (`NIST.SP.800-57pt1r4`)
//! - [`descriptive`]: human text (`SP 800-57 Part 1 Rev. 4`)
//!
//! Subdivisions (part, volume, version, revision, addendum, stage, update)
//! are recognized by the single rule table in [`grammar`].
//!
//! ```
//! use nist_resolver::parser::parse;
//!
//! let long = parse("SP 800-57 Part 1 Rev. 4").unwrap();
//! let short = parse("NIST.SP.800-57pt1r4").unwrap();
//! assert_eq!(long, short);
//! assert_eq!(long.to_string(), "NIST SP 800-57pt1r4");
//! ```

mod compact;
mod descriptive;
pub mod grammar;

pub use compact::DOI_PREFIX;

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::models::Identifier;

static PSEUDO_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(?:RES|EP)$").expect("pseudo suffix pattern must compile"));

/// Errors raised while parsing a reference
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty reference")]
    Empty,

    /// Trailing `RES` or `EP` marks a reference that cannot be resolved
    #[error("not a resolvable reference: {0}")]
    PseudoReference(String),

    #[error("no series and code found in {0:?}")]
    NoSeriesCode(String),

    #[error("unexpected input {rest:?} in {input:?}")]
    UnexpectedInput { input: String, rest: String },

    #[error("{field} given more than once")]
    DuplicateField { field: String },
}

/// Parse a reference into a structured [`Identifier`]
pub fn parse(raw: &str) -> Result<Identifier, ParseError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(ParseError::Empty);
    }
    if PSEUDO_SUFFIX.is_match(input) {
        return Err(ParseError::PseudoReference(input.to_string()));
    }

    if compact::is_compact(input) {
        compact::parse(input)
    } else {
        descriptive::parse(input)
    }
}

/// Parse a reference, degrading to an opaque code when it is not
/// recognizable.
///
/// Only [`ParseError::PseudoReference`] and [`ParseError::Empty`] are
/// returned; every other failure yields [`ParsedRef::Opaque`].
pub fn parse_lenient(raw: &str) -> Result<ParsedRef, ParseError> {
    match parse(raw) {
        Ok(id) => Ok(ParsedRef::Structured(id)),
        Err(err @ (ParseError::PseudoReference(_) | ParseError::Empty)) => Err(err),
        Err(err) => {
            tracing::debug!(reference = raw, error = %err, "falling back to opaque code");
            Ok(ParsedRef::Opaque(raw.trim().to_string()))
        }
    }
}

/// Outcome of lenient parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRef {
    Structured(Identifier),
    /// Unparseable text, compared by substring only
    Opaque(String),
}

impl ParsedRef {
    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            ParsedRef::Structured(id) => Some(id),
            ParsedRef::Opaque(_) => None,
        }
    }

    /// Lower-confidence result of a failed parse
    pub fn is_degraded(&self) -> bool {
        matches!(self, ParsedRef::Opaque(_))
    }

    /// Canonical rendering, or the raw text when opaque
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ParsedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedRef::Structured(id) => write!(f, "{}", id),
            ParsedRef::Opaque(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Iteration, Series, Stage, StageKind};

    #[test]
    fn test_short_and_long_forms_agree() {
        let long = parse("SP 800-57 Part 1 Rev. 4").unwrap();
        let short = parse("SP 800-57pt1r4").unwrap();
        assert_eq!(long.part, short.part);
        assert_eq!(long.revision, short.revision);
        assert_eq!(long, short);

        let long = parse("NIST SP 800-63-3 Version 1.1").unwrap();
        let short = parse("NIST SP 800-63-3ver1.1").unwrap();
        assert_eq!(long, short);

        let long = parse("NISTIR 8011 Vol. 2").unwrap();
        let short = parse("NIST IR 8011v2").unwrap();
        assert_eq!(long, short);
    }

    #[test]
    fn test_compact_and_descriptive_agree() {
        assert_eq!(
            parse("NIST.SP.800-53r5").unwrap(),
            parse("NIST SP 800-53 Rev. 5").unwrap()
        );
        assert_eq!(
            parse("10.6028/NIST.IR.8200").unwrap(),
            parse("NISTIR 8200").unwrap()
        );
    }

    #[test]
    fn test_canonical_round_trip() {
        let samples = [
            "NIST SP 800-57pt1r4",
            "NIST SP 800-57pt1v2ver1.1r4-add1 ipd/Upd1-2020",
            "NIST FIPS 140-2/Upd1-2002",
            "NIST SP 800-38A-add",
            "NIST SP 800-37r2 fpd",
            "NIST SP 800-53r5 2pd",
            "NIST CSWP 04162018",
            "NIST ITL Bulletin 2019-05",
            "NBS FIPS 46",
            "NIST AMS 100-1",
            "NIST SP 800-53r5/Upd1",
        ];
        for sample in samples {
            let id = parse(sample).unwrap_or_else(|e| panic!("{sample}: {e}"));
            assert_eq!(id.to_string(), sample);
            assert_eq!(parse(&id.to_string()).unwrap(), id);
        }
    }

    #[test]
    fn test_other_series_round_trip() {
        let id = Identifier::new(Series::Other("AMS".to_string()), "100-1");
        assert_eq!(id.to_string(), "NIST AMS 100-1");
        assert_eq!(parse(&id.to_string()).unwrap(), id);
        assert_eq!(parse("NIST.AMS.100-1").unwrap(), id);
    }

    #[test]
    fn test_spaced_update_and_lowercase_letter() {
        let id = parse("NIST SP 800-53 Rev. 5 upd1").unwrap();
        assert_eq!(id.revision.as_deref(), Some("5"));
        assert_eq!(id.update.map(|u| u.number), Some(1));
        assert_eq!(id.to_string(), "NIST SP 800-53r5/Upd1");

        let id = parse("NIST SP 800-38a").unwrap();
        assert_eq!(id.code, "800-38A");
        assert_eq!(parse("NIST.SP.800-38a").unwrap(), id);
    }

    #[test]
    fn test_stage_markers() {
        let initial = Stage::new(Some(Iteration::Initial), StageKind::PublicDraft);
        assert_eq!(parse("SP 800-57 (IPD)").unwrap().stage, Some(initial));
        assert_eq!(parse("SP 800-57 ipd").unwrap().stage, Some(initial));
        assert_eq!(
            parse("SP 800-57 Initial Public Draft").unwrap().stage,
            Some(initial)
        );
        assert_eq!(
            parse("SP 800-57 (FPD)").unwrap().stage.unwrap().iteration,
            Some(Iteration::Final)
        );
        assert_eq!(
            parse("SP 800-57 (3PD)").unwrap().stage.unwrap().iteration,
            Some(Iteration::Numbered(3))
        );
        assert!(parse("SP 800-57 (PD)").unwrap().is_draft());
        assert!(!parse("SP 800-57").unwrap().is_draft());
    }

    #[test]
    fn test_addendum_forms() {
        let bare = parse("SP 800-38A-add").unwrap();
        assert_eq!(bare.addendum.as_ref().unwrap().number, None);
        let numbered = parse("SP 800-38A-add2").unwrap();
        assert_eq!(numbered.addendum.unwrap().number.as_deref(), Some("2"));
        assert_eq!(parse("SP 800-38A Addendum").unwrap(), bare);
        assert_eq!(parse("SP 800-38A/Add").unwrap(), bare);
    }

    #[test]
    fn test_pseudo_references() {
        assert!(matches!(
            parse("NIST SP 800-53 RES"),
            Err(ParseError::PseudoReference(_))
        ));
        assert!(matches!(
            parse_lenient("FIPS 201 EP"),
            Err(ParseError::PseudoReference(_))
        ));
    }

    #[test]
    fn test_year_and_status_annotations_are_ignored() {
        let id = parse("NISTIR 8200:2018").unwrap();
        assert_eq!(id.series, Series::Ir);
        assert_eq!(id.code, "8200");
        let id = parse("NIST SP 800-90 (Withdrawn)").unwrap();
        assert_eq!(id.code, "800-90");
        assert!(!id.is_draft());
    }

    #[test]
    fn test_lenient_fallback() {
        let parsed = parse_lenient("Handbook of nothing").unwrap();
        assert!(parsed.is_degraded());
        assert_eq!(parsed.canonical(), "Handbook of nothing");
        assert_eq!(parse_lenient("  "), Err(ParseError::Empty));
    }
}
