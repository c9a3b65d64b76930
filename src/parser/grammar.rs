//! Ordered grammar table for identifier subdivisions.
//!
//! Every rule is anchored at the start of the remaining input and recognizes
//! one field in either its short (code-adjacent) or long (human readable)
//! form. Rules are tried in table order; the first match wins. Version rules
//! precede volume rules because `ver1` also starts with `v`.
//!
//! Named captures:
//! - `v`: field value
//! - `it`: stage iteration
//! - `kind`: stage kind (`pd`, `prd`, `wd`)
//! - `year`: update year

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::ParseError;
use crate::models::{Addendum, Identifier, Iteration, Stage, StageKind, Update};

/// Identifier field a rule populates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Part,
    Volume,
    Version,
    Revision,
    Addendum,
    Stage,
    Update,
    /// `:YYYY` suffix; consumed without populating a field
    Year,
    /// `(Draft)`, `(Withdrawn)` and similar status notes; consumed only
    Annotation,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Part => "part",
            Field::Volume => "volume",
            Field::Version => "version",
            Field::Revision => "revision",
            Field::Addendum => "addendum",
            Field::Stage => "stage",
            Field::Update => "update",
            Field::Year => "year",
            Field::Annotation => "annotation",
        }
    }
}

/// Textual form a rule recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Short,
    Long,
}

/// One `(field, form, pattern)` entry
#[derive(Debug)]
pub struct Rule {
    pub field: Field,
    pub form: Form,
    pub pattern: &'static str,
    /// The match must not be followed by an alphanumeric character
    pub bounded: bool,
}

const fn rule(field: Field, form: Form, pattern: &'static str, bounded: bool) -> Rule {
    Rule {
        field,
        form,
        pattern,
        bounded,
    }
}

/// The grammar, in precedence order
pub const RULES: &[Rule] = &[
    rule(Field::Year, Form::Short, r"^:(?P<v>\d{4})", true),
    rule(
        Field::Update,
        Form::Short,
        r"(?i)^[\s.]*/?upd-?(?P<v>\d+)(?:-(?P<year>\d{4}))?",
        true,
    ),
    rule(
        Field::Update,
        Form::Long,
        r"(?i)^,?\s*/?\s*update\s+(?P<v>\d+)(?:\s*\((?P<year>\d{4})\))?",
        false,
    ),
    rule(Field::Part, Form::Short, r"^\.?pt-?(?P<v>[0-9A-Z]+)", false),
    rule(Field::Part, Form::Long, r"^,?\s+Part\s+(?P<v>[0-9A-Z]+)", true),
    rule(
        Field::Version,
        Form::Short,
        r"^\.?ver-?(?P<v>\d+(?:[.-]\d+)*)",
        false,
    ),
    rule(
        Field::Version,
        Form::Long,
        r"^,?\s+(?:Ver\.|Version)\s*(?P<v>\d+(?:\.\d+)*)",
        true,
    ),
    rule(Field::Volume, Form::Short, r"^\.?v-?(?P<v>\d+)", false),
    rule(
        Field::Volume,
        Form::Long,
        r"^,?\s+(?:Vol\.|Volume)\s*(?P<v>\d+)",
        true,
    ),
    rule(Field::Revision, Form::Short, r"^\.?r-?(?P<v>\d+)", false),
    rule(
        Field::Revision,
        Form::Long,
        r"^,?\s+(?:Rev\.|Revision)\s*(?P<v>\d+)",
        true,
    ),
    rule(
        Field::Addendum,
        Form::Short,
        r"^[.-]?add(?:-?(?P<v>\d+))?",
        false,
    ),
    rule(
        Field::Addendum,
        Form::Long,
        r"^(?:/Add|\s+Addendum)(?:\s*(?P<v>\d+))?",
        true,
    ),
    rule(
        Field::Stage,
        Form::Short,
        r"(?i)^[.\s]*\(?(?P<it>i|f|\d+)?(?P<kind>pd|prd|wd)\)?",
        true,
    ),
    rule(
        Field::Stage,
        Form::Long,
        concat!(
            r"(?i)^[.,\s]*\(?\s*",
            r"(?P<it>initial|final|second|third|fourth|\d+(?:st|nd|rd|th))?",
            r"\s*public\s+draft\s*\)?",
        ),
        true,
    ),
    rule(
        Field::Annotation,
        Form::Long,
        r"(?i)^\s*\((?:[a-z ]*\s)?(?:draft|withdrawn|retired)[a-z ]*\)",
        false,
    ),
];

static COMPILED: Lazy<Vec<(&'static Rule, Regex)>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|rule| (rule, Regex::new(rule.pattern).expect("grammar rule must compile")))
        .collect()
});

/// Find the first rule matching at the start of `input`.
///
/// Returns the rule, its captures and the matched length.
pub fn match_rule(input: &str) -> Option<(&'static Rule, Captures<'_>, usize)> {
    COMPILED.iter().find_map(|(rule, regex)| {
        let caps = regex.captures(input)?;
        let len = caps.get(0)?.end();
        if len == 0 {
            return None;
        }
        if rule.bounded && input[len..].starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some((*rule, caps, len))
    })
}

/// Move a lone lowercase letter suffix from `rest` onto `code`.
///
/// `800-38a` becomes `800-38A`. The letter must not be followed by another
/// letter or digit, so `r5`, `v2` and `add` stay with the subdivision rules.
/// Returns the number of bytes taken from `rest`.
pub fn take_code_letter(code: &mut String, rest: &str) -> usize {
    if code.ends_with(|c: char| c.is_ascii_alphabetic()) {
        return 0;
    }
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), next)
            if letter.is_ascii_lowercase() && !next.is_some_and(|c| c.is_ascii_alphanumeric()) =>
        {
            code.push(letter.to_ascii_uppercase());
            1
        }
        _ => 0,
    }
}

/// Apply subdivision rules to `rest` until it is consumed.
///
/// Each field may be populated once; a second occurrence is a
/// [`ParseError::DuplicateField`]. Unrecognized leftovers are reported as
/// [`ParseError::UnexpectedInput`].
pub fn apply_suffix(input: &str, rest: &str, id: &mut Identifier) -> Result<(), ParseError> {
    let mut rest = rest.trim_end();
    loop {
        let trimmed = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        if trimmed.is_empty() {
            return Ok(());
        }
        let Some((rule, caps, len)) = match_rule(rest) else {
            return Err(ParseError::UnexpectedInput {
                input: input.to_string(),
                rest: trimmed.to_string(),
            });
        };
        assign(rule.field, &caps, id)?;
        rest = &rest[len..];
    }
}

fn assign(field: Field, caps: &Captures<'_>, id: &mut Identifier) -> Result<(), ParseError> {
    let value = caps.name("v").map(|m| m.as_str().to_string());
    let duplicate = || ParseError::DuplicateField {
        field: field.name().to_string(),
    };

    match field {
        Field::Year | Field::Annotation => {}
        Field::Part => set_once(&mut id.part, value, duplicate)?,
        Field::Volume => set_once(&mut id.volume, value, duplicate)?,
        Field::Version => {
            set_once(&mut id.version, value.map(|v| v.replace('-', ".")), duplicate)?
        }
        Field::Revision => set_once(&mut id.revision, value, duplicate)?,
        Field::Addendum => {
            set_once(&mut id.addendum, Some(Addendum { number: value }), duplicate)?
        }
        Field::Stage => {
            let kind = caps
                .name("kind")
                .and_then(|m| StageKind::from_code(m.as_str()))
                .unwrap_or_default();
            let iteration = caps.name("it").and_then(|m| Iteration::parse(m.as_str()));
            set_once(&mut id.stage, Some(Stage::new(iteration, kind)), duplicate)?
        }
        Field::Update => {
            let number = value.and_then(|v| v.parse().ok()).unwrap_or(1);
            let year = caps.name("year").and_then(|m| m.as_str().parse().ok());
            set_once(&mut id.update, Some(Update { number, year }), duplicate)?
        }
    }
    Ok(())
}

fn set_once<T>(
    slot: &mut Option<T>,
    value: Option<T>,
    duplicate: impl Fn() -> ParseError,
) -> Result<(), ParseError> {
    if slot.is_some() {
        return Err(duplicate());
    }
    *slot = value;
    Ok(())
}
