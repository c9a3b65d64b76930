//! Query and option types for search and resolution.

use chrono::NaiveDate;

use crate::parser::{parse_lenient, ParseError, ParsedRef};

/// Options accepted by `search`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Stage marker such as `PD`, `IPD` or `2PD`; any value containing `PD`
    /// restricts candidates to drafts
    pub stage: Option<String>,
}

impl SearchOptions {
    pub fn with_stage(stage: impl Into<String>) -> Self {
        Self {
            stage: Some(stage.into()),
        }
    }

    /// True when drafts rather than final publications are wanted
    pub fn wants_drafts(&self) -> bool {
        self.stage
            .as_deref()
            .is_some_and(|s| s.to_ascii_uppercase().contains("PD"))
    }
}

/// Options accepted by `get`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Match any part of a multi-part document
    pub all_parts: bool,
    /// Explicit stage marker; overrides one embedded in the reference
    pub stage: Option<String>,
    /// Required issued date (year and month are compared)
    pub issued_date: Option<NaiveDate>,
    /// Required updated date (compared exactly)
    pub updated_date: Option<NaiveDate>,
}

impl GetOptions {
    pub fn all_parts() -> Self {
        Self {
            all_parts: true,
            ..Self::default()
        }
    }
}

/// A parsed search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Reference text as given
    pub text: String,
    pub parsed: ParsedRef,
    pub year: Option<i32>,
    pub options: SearchOptions,
}

impl SearchQuery {
    /// Parse `text` leniently; pseudo references are rejected
    pub fn new(text: &str, year: Option<i32>, options: SearchOptions) -> Result<Self, ParseError> {
        Ok(Self {
            text: text.trim().to_string(),
            parsed: parse_lenient(text)?,
            year,
            options,
        })
    }

    /// Query text with a leading publisher and series removed, for title
    /// substring comparison
    pub fn bare_text(&self) -> &str {
        let mut text = self.text.as_str();
        for prefix in ["NIST ", "NBS "] {
            if let Some(rest) = text.strip_prefix(prefix) {
                text = rest;
            }
        }
        if let Some(id) = self.parsed.identifier() {
            if let Some(rest) = text.strip_prefix(id.series.abbreviation()) {
                text = rest;
            }
        }
        text.trim()
    }
}
