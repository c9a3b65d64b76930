//! Human-readable references: `SP 800-57 Part 1 Rev. 4`, `NISTIR 8200`,
//! `FIPS PUB 140-2`, `NIST SP 800-37r2 (FPD)`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{grammar, ParseError};
use crate::models::{Identifier, Publisher, Series};

static HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:(?P<prefix>NIST|NBS)\s?)?",
        r"(?P<series>NISTIR|FIPS(?:\s+PUB)?|ITL\s+Bulletin|White\s+Paper|[A-Z]+)",
        r"[\s.]+(?P<code>\d+(?:-\d+)*[A-Z]?)",
    ))
    .expect("descriptive head pattern must compile")
});

pub(super) fn parse(input: &str) -> Result<Identifier, ParseError> {
    let caps = HEAD
        .captures(input)
        .ok_or_else(|| ParseError::NoSeriesCode(input.to_string()))?;

    // A bare publisher is not a series: `NIST 800-53`
    let series = Series::from_token(&caps["series"])
        .filter(|series| Publisher::from_token(series.abbreviation()).is_none())
        .ok_or_else(|| ParseError::NoSeriesCode(input.to_string()))?;

    let mut code = caps["code"].to_string();
    let mut consumed = caps.get(0).map_or(0, |m| m.end());
    consumed += grammar::take_code_letter(&mut code, &input[consumed..]);

    let mut id = Identifier::new(series, code);
    if let Some(prefix) = caps.name("prefix").and_then(|m| Publisher::from_token(m.as_str())) {
        id.prefix = prefix;
    }
    grammar::apply_suffix(input, &input[consumed..], &mut id)?;
    Ok(id)
}
