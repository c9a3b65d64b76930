//! Canonical structured identifier for NIST publications.
//!
//! An [`Identifier`] is the normalized form of a reference such as
//! `SP 800-57 Part 1 Rev. 4` or `NIST.SP.800-57pt1r4`. Both spellings produce the
//! same value, which renders canonically as `NIST SP 800-57pt1r4`.

use std::cmp::Ordering;
use std::fmt;

/// Issuing body prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Publisher {
    #[default]
    Nist,
    Nbs,
}

impl Publisher {
    /// Parse a prefix token (`NIST` or `NBS`)
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "NIST" => Some(Publisher::Nist),
            "NBS" => Some(Publisher::Nbs),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Publisher::Nist => "NIST",
            Publisher::Nbs => "NBS",
        }
    }
}

impl fmt::Display for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication family
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Series {
    /// Special Publication
    Sp,
    /// Federal Information Processing Standards
    Fips,
    /// Interagency/Internal Report (historically `NISTIR`)
    Ir,
    /// Cybersecurity White Paper
    Cswp,
    ItlBulletin,
    WhitePaper,
    /// Technical Note
    Tn,
    /// Handbook
    Hb,
    /// Grant/Contract Report
    Gcr,
    Other(String),
}

impl Series {
    /// Normalize a series token from free text or a compact identifier.
    ///
    /// Accepts historical spellings such as `NISTIR` and `FIPS PUB`.
    pub fn from_token(token: &str) -> Option<Self> {
        let normalized = token.split_whitespace().collect::<Vec<_>>().join(" ");
        let series = match normalized.to_ascii_uppercase().as_str() {
            "SP" => Series::Sp,
            "FIPS" | "FIPS PUB" => Series::Fips,
            "IR" | "NISTIR" => Series::Ir,
            "CSWP" => Series::Cswp,
            "ITL BULLETIN" => Series::ItlBulletin,
            "WHITE PAPER" => Series::WhitePaper,
            "TN" => Series::Tn,
            "HB" => Series::Hb,
            "GCR" => Series::Gcr,
            "" => return None,
            other => {
                if other.chars().all(|c| c.is_ascii_alphabetic()) {
                    Series::Other(other.to_string())
                } else {
                    return None;
                }
            }
        };
        Some(series)
    }

    /// Short abbreviation used in canonical identifiers
    pub fn abbreviation(&self) -> &str {
        match self {
            Series::Sp => "SP",
            Series::Fips => "FIPS",
            Series::Ir => "IR",
            Series::Cswp => "CSWP",
            Series::ItlBulletin => "ITL Bulletin",
            Series::WhitePaper => "White Paper",
            Series::Tn => "TN",
            Series::Hb => "HB",
            Series::Gcr => "GCR",
            Series::Other(s) => s,
        }
    }

    /// Full series title, when known
    pub fn title(&self) -> Option<&'static str> {
        match self {
            Series::Sp => Some("NIST Special Publication"),
            Series::Fips => Some("NIST Federal Information Processing Standards"),
            Series::Ir => Some("NIST Interagency/Internal Report"),
            Series::Cswp => Some("NIST Cybersecurity White Paper"),
            Series::ItlBulletin => Some("ITL Bulletin"),
            Series::WhitePaper => Some("NIST White Paper"),
            Series::Tn => Some("NIST Technical Note"),
            Series::Hb => Some("NIST Handbook"),
            Series::Gcr => Some("NIST Grant/Contract Report"),
            Series::Other(_) => None,
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Review round of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Iteration {
    Initial,
    Final,
    /// Second and later numbered drafts
    Numbered(u32),
}

impl Iteration {
    /// Parse an iteration marker.
    ///
    /// Accepts `I`/`F` stage letters, `initial`/`final`, ordinal words and
    /// plain numbers. `1` is the initial draft.
    pub fn parse(value: &str) -> Option<Self> {
        let lower = value.trim().to_ascii_lowercase();
        let lower = lower.strip_suffix("pd").unwrap_or(&lower);
        let lower = lower.trim_end_matches(|c: char| c == '-' || c.is_whitespace());
        match lower {
            "i" | "initial" | "first" | "1st" => return Some(Iteration::Initial),
            "f" | "final" => return Some(Iteration::Final),
            "second" => return Some(Iteration::Numbered(2)),
            "third" => return Some(Iteration::Numbered(3)),
            "fourth" => return Some(Iteration::Numbered(4)),
            _ => {}
        }
        let digits = lower.trim_end_matches(|c: char| c.is_ascii_alphabetic());
        match digits.parse::<u32>().ok()? {
            0 => None,
            1 => Some(Iteration::Initial),
            n => Some(Iteration::Numbered(n)),
        }
    }

    /// Code used in canonical stage markers (`i`, `f`, `2`)
    pub fn short_code(&self) -> String {
        match self {
            Iteration::Initial => "i".to_string(),
            Iteration::Final => "f".to_string(),
            Iteration::Numbered(n) => n.to_string(),
        }
    }
}

impl fmt::Display for Iteration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Iteration::Initial => f.write_str("initial"),
            Iteration::Final => f.write_str("final"),
            Iteration::Numbered(n) => write!(f, "{}", n),
        }
    }
}

/// Kind of pre-publication stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StageKind {
    #[default]
    PublicDraft,
    PreliminaryDraft,
    WorkInProgress,
}

impl StageKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "pd" => Some(StageKind::PublicDraft),
            "prd" => Some(StageKind::PreliminaryDraft),
            "wd" => Some(StageKind::WorkInProgress),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            StageKind::PublicDraft => "pd",
            StageKind::PreliminaryDraft => "prd",
            StageKind::WorkInProgress => "wd",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::PublicDraft => f.write_str("public draft"),
            StageKind::PreliminaryDraft => f.write_str("preliminary draft"),
            StageKind::WorkInProgress => f.write_str("work in progress"),
        }
    }
}

/// Draft status marker, e.g. `ipd` or `2pd`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Stage {
    pub iteration: Option<Iteration>,
    pub kind: StageKind,
}

impl Stage {
    pub fn new(iteration: Option<Iteration>, kind: StageKind) -> Self {
        Self { iteration, kind }
    }

    pub fn public_draft(iteration: Option<Iteration>) -> Self {
        Self::new(iteration, StageKind::PublicDraft)
    }

    /// A stage subsumes another when kinds agree and the iteration is either
    /// unspecified or equal.
    fn subsumes(&self, other: &Stage) -> bool {
        self.kind == other.kind
            && self
                .iteration
                .map_or(true, |it| other.iteration == Some(it))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(iteration) = &self.iteration {
            f.write_str(&iteration.short_code())?;
        }
        f.write_str(self.kind.code())
    }
}

/// Post-publication update marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Update {
    pub number: u32,
    pub year: Option<i32>,
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/Upd{}", self.number)?;
        if let Some(year) = self.year {
            write!(f, "-{}", year)?;
        }
        Ok(())
    }
}

/// Addendum marker, optionally numbered
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Addendum {
    pub number: Option<String>,
}

impl fmt::Display for Addendum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("-add")?;
        if let Some(number) = &self.number {
            f.write_str(number)?;
        }
        Ok(())
    }
}

/// Parsed NIST document identifier
///
/// `series` and `code` are always present. Every other field is optional and
/// acts as a wildcard on the query side of [`Identifier::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub prefix: Publisher,
    pub series: Series,
    pub code: String,
    pub part: Option<String>,
    pub volume: Option<String>,
    pub version: Option<String>,
    pub revision: Option<String>,
    pub addendum: Option<Addendum>,
    pub stage: Option<Stage>,
    pub update: Option<Update>,
}

impl Identifier {
    /// Create an identifier with only series and code set
    pub fn new(series: Series, code: impl Into<String>) -> Self {
        Self {
            prefix: Publisher::default(),
            series,
            code: code.into(),
            part: None,
            volume: None,
            version: None,
            revision: None,
            addendum: None,
            stage: None,
            update: None,
        }
    }

    pub fn with_part(mut self, part: impl Into<String>) -> Self {
        self.part = Some(part.into());
        self
    }

    pub fn with_volume(mut self, volume: impl Into<String>) -> Self {
        self.volume = Some(volume.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_addendum(mut self, number: Option<String>) -> Self {
        self.addendum = Some(Addendum { number });
        self
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_update(mut self, number: u32, year: Option<i32>) -> Self {
        self.update = Some(Update { number, year });
        self
    }

    /// True when the identifier denotes a draft
    pub fn is_draft(&self) -> bool {
        self.stage.is_some()
    }

    /// `SP 800-57` style base reference without prefix or subdivisions
    pub fn base_ref(&self) -> String {
        format!("{} {}", self.series, self.code)
    }

    /// Query-subsumes-candidate relation.
    ///
    /// `series`, `code` and the publisher prefix must always agree. Any other
    /// field set on `self` must equal the candidate's; unset fields match
    /// anything. The relation is not symmetric.
    pub fn matches(&self, candidate: &Identifier) -> bool {
        fn field<T: PartialEq>(query: &Option<T>, candidate: &Option<T>) -> bool {
            query.as_ref().map_or(true, |q| candidate.as_ref() == Some(q))
        }

        self.prefix == candidate.prefix
            && self.series == candidate.series
            && self.code.eq_ignore_ascii_case(&candidate.code)
            && field(&self.part, &candidate.part)
            && field(&self.volume, &candidate.volume)
            && field(&self.version, &candidate.version)
            && field(&self.revision, &candidate.revision)
            && field(&self.addendum, &candidate.addendum)
            && field(&self.update, &candidate.update)
            && self.stage.as_ref().map_or(true, |q| {
                candidate.stage.as_ref().is_some_and(|c| q.subsumes(c))
            })
    }
}

impl fmt::Display for Identifier {
    /// Canonical rendering: prefix, series, code, part, volume, version,
    /// revision, addendum, stage, update.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.prefix, self.series, self.code)?;
        if let Some(part) = &self.part {
            write!(f, "pt{}", part)?;
        }
        if let Some(volume) = &self.volume {
            write!(f, "v{}", volume)?;
        }
        if let Some(version) = &self.version {
            write!(f, "ver{}", version)?;
        }
        if let Some(revision) = &self.revision {
            write!(f, "r{}", revision)?;
        }
        if let Some(addendum) = &self.addendum {
            write!(f, "{}", addendum)?;
        }
        if let Some(stage) = &self.stage {
            write!(f, " {}", stage)?;
        }
        if let Some(update) = &self.update {
            write!(f, "{}", update)?;
        }
        Ok(())
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    /// Lexicographic over the canonical rendering
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}
