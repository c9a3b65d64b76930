//! Resolution engine: from a loose reference to one bibliographic item.
//!
//! [`NistBibliography::resolve`] normalizes the reference, gathers and
//! narrows candidates through [`HitCollection`], then materializes them in
//! bounded batches and applies the date, stage and year checks in candidate
//! order. A reference that matches nothing is a [`Resolution::NotFound`]
//! value, never an error.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use crate::config::Config;
use crate::models::{
    DateType, GetOptions, Hit, HitCollection, Iteration, NistItem, SearchOptions, SearchQuery,
    Stage,
};
use crate::parser::{parse_lenient, ParseError, ParsedRef};
use crate::sources::{DataSource, IndexSource, PubsExportSource, SourceError};
use crate::utils::date::{parse_loose, Precision};
use crate::utils::{run_group, HttpClient};

/// Target of the diagnostics emitted while resolving
const LOG_TARGET: &str = "nist_resolver";

/// Default number of concurrent materializations per batch
pub const DEFAULT_WORKERS: usize = 3;

static DATE_PAREN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\((?P<date>[A-Za-z]+\.?\s+(?:\d{1,2},\s*)?\d{4})\)")
        .expect("date parenthetical pattern must compile")
});

static STAGE_PAREN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\((?P<marker>(?:i|f|\d+)?pd)\)")
        .expect("stage parenthetical pattern must compile")
});

static STAGE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?P<it>i|f|\d+)?pd|pd-(?P<n>i|f|\d+))$")
        .expect("stage marker pattern must compile")
});

static CODE_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<code>[^:]+):(?P<year>\d{4})$").expect("code:year pattern must compile")
});

static PART_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d-\d").expect("part hint pattern must compile"));

/// Errors that abort a search or resolution
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Transport failure reaching a data source
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Search text that cannot name a document
    #[error("invalid query: {0}")]
    Query(#[from] ParseError),

    /// A materialization task panicked or was cancelled
    #[error("fetch task failed: {0}")]
    Worker(String),
}

/// Outcome of [`NistBibliography::resolve`]
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Box<NistItem>),
    NotFound(NotFound),
}

impl Resolution {
    pub fn into_item(self) -> Option<NistItem> {
        match self {
            Resolution::Found(item) => Some(*item),
            Resolution::NotFound(_) => None,
        }
    }
}

/// Why nothing was returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// Trailing `EP` or `RES`; no lookup was made
    PseudoReference,
    /// No candidate survived matching and filtering
    NoMatch,
}

/// Structured not-found report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    /// Query key: the normalized code, with `:year` when a year was given
    pub query: String,
    pub year: Option<i32>,
    /// Years present on candidates that failed the year check
    pub missed_years: Vec<i32>,
    pub reason: MissReason,
}

/// A reference after stripping embedded dates, stage markers and years
#[derive(Debug, Clone, PartialEq, Eq)]
struct Normalized {
    /// Code as shown in diagnostics
    code: String,
    parsed: ParsedRef,
    year: Option<i32>,
    stage: Option<Stage>,
    issued: Option<NaiveDate>,
    updated: Option<NaiveDate>,
}

impl Normalized {
    fn key(&self) -> String {
        match self.year {
            Some(year) => format!("{}:{}", self.code, year),
            None => self.code.clone(),
        }
    }

    /// Search text; stage and (with `all_parts`) part live outside it
    fn search_text(&self) -> String {
        match &self.parsed {
            ParsedRef::Structured(id) => id.to_string(),
            ParsedRef::Opaque(text) => text.clone(),
        }
    }

    fn search_options(&self) -> SearchOptions {
        match self.stage {
            Some(stage) => SearchOptions::with_stage(stage.to_string().to_uppercase()),
            None => SearchOptions::default(),
        }
    }
}

/// Stage from a marker such as `IPD`, `2PD`, `PD` or `PD-1`
fn stage_from_marker(marker: &str) -> Option<Stage> {
    let caps = STAGE_MARKER.captures(marker.trim())?;
    let iteration = caps
        .name("it")
        .or_else(|| caps.name("n"))
        .and_then(|m| Iteration::parse(m.as_str()));
    Some(Stage::public_draft(iteration))
}

fn normalize(
    code: &str,
    year: Option<i32>,
    options: &GetOptions,
) -> Result<Normalized, ParseError> {
    let mut text = code.trim().to_string();
    let mut issued = options.issued_date;
    let mut updated = options.updated_date;

    if let Some(caps) = DATE_PAREN.captures(&text) {
        match parse_loose(&caps["date"]) {
            Some((date, Precision::Day)) => updated = updated.or(Some(date)),
            Some((date, _)) => issued = issued.or(Some(date)),
            None => {}
        }
        text = DATE_PAREN.replace(&text, "").into_owned();
    }

    let mut stage = None;
    if let Some(caps) = STAGE_PAREN.captures(&text) {
        stage = stage_from_marker(&caps["marker"]);
        text = STAGE_PAREN.replace(&text, "").into_owned();
    }

    let mut year = year;
    if year.is_none() {
        if let Some(caps) = CODE_YEAR.captures(&text) {
            year = caps["year"].parse().ok();
            text = caps["code"].trim().to_string();
        }
    }
    let text = text.trim().to_string();

    let parsed = match parse_lenient(&text)? {
        ParsedRef::Structured(mut id) => {
            if let Some(embedded) = id.stage.take() {
                stage = stage.or(Some(embedded));
            }
            if options.all_parts {
                id.part = None;
            }
            ParsedRef::Structured(id)
        }
        opaque => opaque,
    };

    if let Some(explicit) = options.stage.as_deref() {
        if let Some(explicit) = stage_from_marker(explicit) {
            stage = Some(explicit);
        }
    }

    Ok(Normalized {
        code: text,
        parsed,
        year,
        stage,
        issued,
        updated,
    })
}

/// Entry point for searching and resolving NIST references
#[derive(Debug, Clone)]
pub struct NistBibliography {
    primary: Arc<dyn DataSource>,
    fallback: Option<Arc<dyn DataSource>>,
    workers: usize,
}

impl NistBibliography {
    pub fn new(primary: Arc<dyn DataSource>) -> Self {
        Self {
            primary,
            fallback: None,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Source consulted when the primary has no candidates
    pub fn with_fallback(mut self, fallback: Arc<dyn DataSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Feed-backed resolver with the index as fallback
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::from_config(&config.http)?;
        let primary: Arc<dyn DataSource> =
            Arc::new(PubsExportSource::from_config(config, client.clone()));
        let fallback: Arc<dyn DataSource> = Arc::new(IndexSource::from_config(config, client));
        Ok(Self::new(primary)
            .with_fallback(fallback)
            .with_workers(config.resolver.workers))
    }

    /// Candidates for `text`, sorted but not narrowed
    pub async fn search(
        &self,
        text: &str,
        year: Option<i32>,
        options: SearchOptions,
    ) -> Result<HitCollection, RequestError> {
        let query = SearchQuery::new(text, year, options)?;
        let hits = HitCollection::search(&self.primary, self.fallback.as_ref(), query).await?;
        Ok(hits)
    }

    /// The item `code` names, or `None` after emitting diagnostics
    pub async fn get(
        &self,
        code: &str,
        year: Option<i32>,
        options: GetOptions,
    ) -> Result<Option<NistItem>, RequestError> {
        Ok(self.resolve(code, year, options).await?.into_item())
    }

    /// Resolve `code` to a single item, reporting misses as a value
    pub async fn resolve(
        &self,
        code: &str,
        year: Option<i32>,
        options: GetOptions,
    ) -> Result<Resolution, RequestError> {
        let normalized = match normalize(code, year, &options) {
            Ok(normalized) => normalized,
            Err(err @ (ParseError::PseudoReference(_) | ParseError::Empty)) => {
                let query = match year {
                    Some(year) => format!("{}:{}", code.trim(), year),
                    None => code.trim().to_string(),
                };
                let reason = match err {
                    ParseError::PseudoReference(_) => MissReason::PseudoReference,
                    _ => MissReason::NoMatch,
                };
                return Ok(self.not_found(query, code.trim(), year, Vec::new(), reason));
            }
            Err(other) => return Err(other.into()),
        };
        let key = normalized.key();
        tracing::info!(target: LOG_TARGET, query = %key, "fetching...");

        let hits = self
            .search(&normalized.search_text(), normalized.year, normalized.search_options())
            .await?
            .search_filter();
        tracing::debug!(
            target: LOG_TARGET,
            query = %key,
            candidates = hits.len(),
            "narrowed candidates"
        );

        let mut missed_years = Vec::new();
        let candidates: Vec<Hit> = hits.into_iter().collect();
        // One group per batch; later batches are never fetched once a match is found
        for batch in candidates.chunks(self.workers) {
            let fetched =
                run_group(batch.to_vec(), |hit: Hit| async move { hit.fetch().await }).await;

            for result in fetched {
                let item = match result {
                    Ok(Ok(item)) => item,
                    Ok(Err(err)) if err.is_not_found() => {
                        tracing::debug!(
                            target: LOG_TARGET,
                            query = %key,
                            error = %err,
                            "candidate vanished, skipping"
                        );
                        continue;
                    }
                    Ok(Err(err)) => return Err(err.into()),
                    Err(join) => return Err(RequestError::Worker(join.to_string())),
                };

                if !passes_constraints(&item, &normalized) {
                    continue;
                }
                let Some(year) = normalized.year else {
                    return Ok(self.found(&key, item));
                };
                let years = item.release_years();
                if years.contains(&year) {
                    return Ok(self.found(&key, item));
                }
                for y in years {
                    if !missed_years.contains(&y) {
                        missed_years.push(y);
                    }
                }
            }
        }

        if let (Some(year), true) = (normalized.year, missed_years.is_empty()) {
            missed_years = self
                .near_miss_years(&normalized)
                .await?
                .into_iter()
                .filter(|y| *y != year)
                .collect();
        }

        Ok(self.not_found(
            key,
            &normalized.code,
            normalized.year,
            missed_years,
            MissReason::NoMatch,
        ))
    }

    /// Release years of matching hits the year filter dropped
    async fn near_miss_years(&self, normalized: &Normalized) -> Result<Vec<i32>, RequestError> {
        let hits = self
            .search(&normalized.search_text(), None, normalized.search_options())
            .await?
            .search_filter();
        let mut years: Vec<i32> = hits
            .iter()
            .filter_map(|hit| hit.release_date)
            .map(|date| date.year())
            .collect();
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    fn found(&self, key: &str, item: NistItem) -> Resolution {
        tracing::info!(
            target: LOG_TARGET,
            query = %key,
            "found {}",
            item.primary_id().unwrap_or("?")
        );
        Resolution::Found(Box::new(item))
    }

    fn not_found(
        &self,
        key: String,
        code: &str,
        year: Option<i32>,
        missed_years: Vec<i32>,
        reason: MissReason,
    ) -> Resolution {
        tracing::warn!(
            target: LOG_TARGET,
            query = %key,
            "no match found online for {}. \
             The code must be exactly like it is on the standards website.",
            key
        );
        if let (Some(year), false) = (year, missed_years.is_empty()) {
            let years: Vec<String> = missed_years.iter().map(i32::to_string).collect();
            tracing::warn!(
                target: LOG_TARGET,
                query = %key,
                "There was no match for {}, though there were matches found for {}.",
                year,
                years.join(", ")
            );
        }
        if PART_HINT.is_match(code) {
            tracing::warn!(
                target: LOG_TARGET,
                query = %key,
                "The provided document part may not exist, \
                 or the document may no longer be published in parts."
            );
        }
        Resolution::NotFound(NotFound {
            query: key,
            year,
            missed_years,
            reason,
        })
    }
}

/// Date and stage checks applied after materialization
fn passes_constraints(item: &NistItem, normalized: &Normalized) -> bool {
    if let Some(issued) = normalized.issued {
        let hit = item
            .dates_of(&[DateType::Issued])
            .filter_map(|d| d.on())
            .any(|d| d.year() == issued.year() && d.month() == issued.month());
        if !hit {
            return false;
        }
    } else if let Some(updated) = normalized.updated {
        let hit = item
            .dates_of(&[DateType::Updated, DateType::Published])
            .filter_map(|d| d.on())
            .any(|d| d == updated);
        if !hit {
            return false;
        }
    }

    if let Some(iteration) = normalized.stage.and_then(|s| s.iteration) {
        if item.iteration() != Some(iteration.to_string().as_str()) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BibDate, DocumentId, DocumentStatus, RawCandidate, Title};
    use crate::sources::{IndexRow, MockSource};
    use async_trait::async_trait;

    fn item(id: &str, dates: &[(DateType, &str)]) -> NistItem {
        NistItem {
            docidentifier: vec![DocumentId::primary(id)],
            title: vec![Title::new("main", id)],
            date: dates.iter().map(|(kind, value)| BibDate::new(*kind, *value)).collect(),
            ..NistItem::default()
        }
    }

    fn draft(id: &str, iteration: &str, published: &str) -> NistItem {
        NistItem {
            docstatus: Some(DocumentStatus::from_feed("draft", Some(iteration.to_string()))),
            ..item(id, &[(DateType::Published, published)])
        }
    }

    fn resolver(items: Vec<NistItem>) -> (NistBibliography, Arc<MockSource>) {
        let mock = Arc::new(MockSource::with_items(items));
        (NistBibliography::new(mock.clone()), mock)
    }

    #[test]
    fn test_normalize_date_parentheticals() {
        let n = normalize("SP 800-53 Rev. 4 (April 2013)", None, &GetOptions::default()).unwrap();
        assert_eq!(n.code, "SP 800-53 Rev. 4");
        assert_eq!(n.issued, NaiveDate::from_ymd_opt(2013, 4, 1));
        assert!(n.updated.is_none());

        let n = normalize("SP 800-53 (January 22, 2015)", None, &GetOptions::default()).unwrap();
        assert_eq!(n.updated, NaiveDate::from_ymd_opt(2015, 1, 22));
        assert!(n.issued.is_none());
    }

    #[test]
    fn test_normalize_stage_markers() {
        let n = normalize("SP 800-57 (IPD)", None, &GetOptions::default()).unwrap();
        assert_eq!(n.stage, Some(Stage::public_draft(Some(Iteration::Initial))));
        assert_eq!(n.search_text(), "NIST SP 800-57");
        assert!(n.search_options().wants_drafts());

        let n = normalize("NIST.SP.PD-2.800-57", None, &GetOptions::default()).unwrap();
        assert_eq!(n.stage, Some(Stage::public_draft(Some(Iteration::Numbered(2)))));
        assert_eq!(n.search_text(), "NIST SP 800-57");

        let n = normalize("SP 800-57 (PD)", None, &GetOptions::default()).unwrap();
        assert_eq!(n.stage, Some(Stage::public_draft(None)));
    }

    #[test]
    fn test_normalize_code_year_and_all_parts() {
        let n = normalize("SP 800-57pt1:2016", None, &GetOptions::all_parts()).unwrap();
        assert_eq!(n.year, Some(2016));
        assert_eq!(n.key(), "SP 800-57pt1:2016");
        assert_eq!(n.search_text(), "NIST SP 800-57");

        let n = normalize("SP 800-57:2016", Some(2020), &GetOptions::default()).unwrap();
        assert_eq!(n.year, Some(2020));
    }

    #[tokio::test]
    async fn test_ep_short_circuits_without_lookup() {
        let (bib, mock) = resolver(vec![item("NIST SP 800-53r5", &[])]);
        let resolution = bib
            .resolve("SP 800-53 EP", None, GetOptions::default())
            .await
            .unwrap();
        assert!(matches!(
            resolution,
            Resolution::NotFound(NotFound { reason: MissReason::PseudoReference, .. })
        ));
        assert_eq!(mock.candidate_calls(), 0);
    }

    #[tokio::test]
    async fn test_res_reference_is_none_without_lookup() {
        let (bib, mock) = resolver(vec![item("NIST SP 800-53r5", &[])]);
        let found = bib
            .get("NIST SP 800-53 RES", None, GetOptions::default())
            .await
            .unwrap();
        assert!(found.is_none());
        assert_eq!(mock.candidate_calls(), 0);
        assert_eq!(mock.materialize_calls(), 0);
    }

    #[tokio::test]
    async fn test_year_mismatch_reports_missed_years() {
        let bib = NistBibliography::new(Arc::new(RowSource::new(vec![
            (
                "NIST SP 800-53r4",
                Some(item("NIST SP 800-53r4", &[(DateType::Published, "2013-04-30")])),
            ),
            (
                "NIST SP 800-53r5",
                Some(item("NIST SP 800-53r5", &[(DateType::Published, "2020-09-23")])),
            ),
        ])));
        let resolution = bib.resolve("SP 800-53", Some(2017), GetOptions::default()).await.unwrap();
        let Resolution::NotFound(miss) = resolution else {
            panic!("expected a miss");
        };
        assert_eq!(miss.query, "SP 800-53:2017");
        assert_eq!(miss.missed_years, vec![2013, 2020]);
        assert_eq!(miss.reason, MissReason::NoMatch);
    }

    #[tokio::test]
    async fn test_dated_hits_outside_year_are_near_misses() {
        let (bib, _) = resolver(vec![item("NIST IR 8200", &[(DateType::Published, "2018-11-29")])]);
        let resolution = bib
            .resolve("NISTIR 8200", Some(2017), GetOptions::default())
            .await
            .unwrap();
        let Resolution::NotFound(miss) = resolution else {
            panic!("expected a miss");
        };
        assert_eq!(miss.missed_years, vec![2018]);
    }

    #[tokio::test]
    async fn test_year_match_picks_candidate() {
        let (bib, _) = resolver(vec![
            item("NIST SP 800-53r4", &[(DateType::Published, "2013-04-30")]),
            item("NIST SP 800-53r5", &[(DateType::Published, "2020-09-23")]),
        ]);
        let found = bib.get("SP 800-53", Some(2020), GetOptions::default()).await.unwrap();
        assert_eq!(found.unwrap().primary_id(), Some("NIST SP 800-53r5"));
    }

    #[tokio::test]
    async fn test_stage_iteration_must_match_exactly() {
        let (bib, _) = resolver(vec![
            draft("NIST SP 800-57 ipd", "initial", "2019-10-31"),
            draft("NIST SP 800-57 2pd", "2", "2020-02-01"),
        ]);
        let found = bib.get("SP 800-57 (IPD)", None, GetOptions::default()).await.unwrap();
        assert_eq!(found.unwrap().iteration(), Some("initial"));

        let found = bib.get("SP 800-57 (2PD)", None, GetOptions::default()).await.unwrap();
        assert_eq!(found.unwrap().iteration(), Some("2"));

        let missing = bib.get("SP 800-57 (FPD)", None, GetOptions::default()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_issued_date_constraint() {
        let (bib, _) = resolver(vec![
            item("NIST SP 800-53r4", &[(DateType::Issued, "2013-04")]),
            item("NIST SP 800-53r5", &[(DateType::Issued, "2020-09")]),
        ]);
        let found = bib
            .get("SP 800-53 (September 2020)", None, GetOptions::default())
            .await
            .unwrap();
        assert_eq!(found.unwrap().primary_id(), Some("NIST SP 800-53r5"));
    }

    #[tokio::test]
    async fn test_all_parts_ignores_part() {
        let (bib, _) = resolver(vec![
            item("NIST SP 800-57pt1r4", &[]),
            item("NIST SP 800-57pt2r1", &[]),
        ]);
        let exact = bib.get("SP 800-57pt2", None, GetOptions::default()).await.unwrap();
        assert_eq!(exact.unwrap().primary_id(), Some("NIST SP 800-57pt2r1"));

        let any = bib.get("SP 800-57pt2", None, GetOptions::all_parts()).await.unwrap();
        assert_eq!(any.unwrap().primary_id(), Some("NIST SP 800-57pt1r4"));
    }

    #[tokio::test]
    async fn test_transport_errors_propagate() {
        let (bib, mock) = resolver(vec![]);
        mock.fail_with("connection reset");
        let err = bib.get("SP 800-53", None, GetOptions::default()).await.unwrap_err();
        assert!(matches!(err, RequestError::Source(SourceError::Network(_))));
    }

    /// Index-like source: rows carry no dates, documents may be gone
    #[derive(Debug)]
    struct RowSource {
        rows: Vec<(String, Option<NistItem>)>,
    }

    impl RowSource {
        fn new(rows: Vec<(&str, Option<NistItem>)>) -> Self {
            Self {
                rows: rows.into_iter().map(|(id, item)| (id.to_string(), item)).collect(),
            }
        }
    }

    #[async_trait]
    impl DataSource for RowSource {
        fn id(&self) -> &str {
            "rows"
        }

        async fn candidates(&self, _query: &SearchQuery) -> Result<Vec<RawCandidate>, SourceError> {
            Ok(self
                .rows
                .iter()
                .enumerate()
                .map(|(i, (id, _))| {
                    RawCandidate::IndexRow(IndexRow {
                        id: id.clone(),
                        file: i.to_string(),
                    })
                })
                .collect())
        }

        async fn materialize(&self, raw: &RawCandidate) -> Result<NistItem, SourceError> {
            let RawCandidate::IndexRow(row) = raw else {
                return Err(SourceError::Parse("unexpected candidate".into()));
            };
            row.file
                .parse::<usize>()
                .ok()
                .and_then(|i| self.rows.get(i))
                .and_then(|(_, item)| item.clone())
                .ok_or_else(|| SourceError::NotFound(row.file.clone()))
        }
    }

    #[tokio::test]
    async fn test_missing_documents_are_skipped() {
        let bib = NistBibliography::new(Arc::new(RowSource::new(vec![
            ("NIST IR 8200", None),
            ("NIST IR 8200", Some(item("NIST IR 8200", &[(DateType::Published, "2018-11-29")]))),
        ])))
        .with_workers(1);
        let found = bib.get("NISTIR 8200", Some(2018), GetOptions::default()).await.unwrap();
        assert_eq!(found.unwrap().release_years(), vec![2018]);
    }
}
