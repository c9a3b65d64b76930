//! Dotted machine identifiers: `NIST.SP.800-57pt1r4`, `NIST.IR.8200`,
//! `10.6028/NIST.SP.800-53r5`, `NIST.SP.IPD.800-218A`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{grammar, ParseError};
use crate::models::{Identifier, Iteration, Publisher, Series, Stage};

/// DOI registrant prefix for NIST publications
pub const DOI_PREFIX: &str = "10.6028/";

static COMPACT_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://(?:dx\.)?doi\.org/)?(?:10\.6028/)?(?:NIST|NBS)\.")
        .expect("compact start pattern must compile")
});

static STAGE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?P<it>i|f|\d+)pd|pd-(?P<n>i|f|\d+)|pd)$")
        .expect("stage token pattern must compile")
});

static CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(?:-\d+)*[A-Z]?").expect("code pattern must compile")
});

/// True when `input` looks like a dotted or DOI identifier
pub(super) fn is_compact(input: &str) -> bool {
    COMPACT_START.is_match(input)
}

pub(super) fn parse(input: &str) -> Result<Identifier, ParseError> {
    let stripped = input
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("dx.")
        .trim_start_matches("doi.org/");
    let stripped = stripped.strip_prefix(DOI_PREFIX).unwrap_or(stripped);

    let mut tokens = stripped.split('.');
    let prefix = tokens
        .next()
        .and_then(Publisher::from_token)
        .ok_or_else(|| ParseError::NoSeriesCode(input.to_string()))?;
    let series = tokens
        .next()
        .and_then(Series::from_token)
        .ok_or_else(|| ParseError::NoSeriesCode(input.to_string()))?;

    let mut stage = None;
    let mut code_token = tokens
        .next()
        .ok_or_else(|| ParseError::NoSeriesCode(input.to_string()))?;
    loop {
        if let Some(caps) = STAGE_TOKEN.captures(code_token) {
            let iteration = caps
                .name("it")
                .or_else(|| caps.name("n"))
                .and_then(|m| Iteration::parse(m.as_str()));
            stage = Some(Stage::public_draft(iteration));
        } else if !code_token.eq_ignore_ascii_case("PUB") {
            break;
        }
        code_token = tokens
            .next()
            .ok_or_else(|| ParseError::NoSeriesCode(input.to_string()))?;
    }

    let code = CODE
        .find(code_token)
        .ok_or_else(|| ParseError::NoSeriesCode(input.to_string()))?;
    let mut code_text = code.as_str().to_string();
    let mut rest_start = code.end();
    rest_start += grammar::take_code_letter(&mut code_text, &code_token[rest_start..]);
    let mut id = Identifier::new(series, code_text);
    id.prefix = prefix;

    let mut rest = code_token[rest_start..].to_string();
    for token in tokens {
        rest.push('.');
        rest.push_str(token);
    }
    grammar::apply_suffix(input, &rest, &mut id)?;

    if let Some(stage) = stage {
        if id.stage.is_some() {
            return Err(ParseError::DuplicateField {
                field: "stage".to_string(),
            });
        }
        id.stage = Some(stage);
    }
    Ok(id)
}
