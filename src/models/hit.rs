//! Candidate records and the hit collection matcher.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::{NistItem, SearchQuery};
use crate::parser::{parse_lenient, ParsedRef};
use crate::sources::{DataSource, FeedRecord, IndexRow, SourceError};
use crate::utils::date::in_year;

/// Raw payload a candidate was built from
#[derive(Debug, Clone, PartialEq)]
pub enum RawCandidate {
    /// Record from the bulk pubs-export feed
    Feed(FeedRecord),
    /// Row of the precomputed index; the document is fetched on demand
    IndexRow(IndexRow),
    /// Already materialized document
    Document(Box<NistItem>),
}

impl RawCandidate {
    pub fn title(&self) -> Option<String> {
        match self {
            RawCandidate::Feed(record) => record.title(),
            RawCandidate::IndexRow(_) => None,
            RawCandidate::Document(item) => item.main_title().map(str::to_string),
        }
    }

    pub fn url(&self) -> Option<String> {
        match self {
            RawCandidate::Feed(record) => record.uri.clone(),
            RawCandidate::IndexRow(_) => None,
            RawCandidate::Document(item) => item.link.first().map(|l| l.content.clone()),
        }
    }

    pub fn status(&self) -> Option<String> {
        match self {
            RawCandidate::Feed(record) => record.status.clone(),
            RawCandidate::IndexRow(_) => None,
            RawCandidate::Document(item) => item.docstatus.as_ref().map(|s| s.stage.clone()),
        }
    }

    /// Issued date, else published date
    pub fn release_date(&self) -> Option<NaiveDate> {
        match self {
            RawCandidate::Feed(record) => record.release_date(),
            RawCandidate::IndexRow(_) => None,
            RawCandidate::Document(item) => {
                use super::DateType::{Issued, Published};
                item.dates_of(&[Issued])
                    .chain(item.dates_of(&[Published]))
                    .find_map(|d| d.on())
            }
        }
    }
}

/// Parse the identifier a raw candidate carries.
///
/// Feed records prefer their DOI over the human-readable identifier.
/// Unparseable identifiers degrade to [`ParsedRef::Opaque`].
pub fn extract_identifier(raw: &RawCandidate) -> ParsedRef {
    match raw {
        RawCandidate::Feed(record) => record.identifier(),
        RawCandidate::IndexRow(row) => lenient(&row.id),
        RawCandidate::Document(item) => lenient(item.primary_id().unwrap_or_default()),
    }
}

pub(crate) fn lenient(text: &str) -> ParsedRef {
    parse_lenient(text).unwrap_or_else(|_| ParsedRef::Opaque(text.trim().to_string()))
}

/// One candidate record for a query
#[derive(Debug, Clone)]
pub struct Hit {
    pub code: ParsedRef,
    pub raw: Arc<RawCandidate>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub release_date: Option<NaiveDate>,
    source: Arc<dyn DataSource>,
    fetched: Arc<OnceCell<NistItem>>,
}

impl Hit {
    pub fn new(raw: RawCandidate, source: Arc<dyn DataSource>) -> Self {
        Self {
            code: extract_identifier(&raw),
            title: raw.title(),
            url: raw.url(),
            status: raw.status(),
            release_date: raw.release_date(),
            raw: Arc::new(raw),
            source,
            fetched: Arc::new(OnceCell::new()),
        }
    }

    /// Materialize the full item, once per hit
    pub async fn fetch(&self) -> Result<NistItem, SourceError> {
        self.fetched
            .get_or_try_init(|| self.source.materialize(&self.raw))
            .await
            .cloned()
    }

    /// Id of the data source the hit came from
    pub fn source_id(&self) -> &str {
        self.source.id()
    }

    fn sort_cmp(&self, other: &Hit) -> Ordering {
        let by_code = match (&self.code, &other.code) {
            (ParsedRef::Structured(a), ParsedRef::Structured(b)) => a.cmp(b),
            (a, b) => a.canonical().cmp(&b.canonical()),
        };
        by_code.then_with(|| match (self.release_date, other.release_date) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    }

    /// Query-subsumes-hit check, with title substring fallback when either
    /// side is opaque
    fn matches(&self, query: &SearchQuery) -> bool {
        if let (ParsedRef::Structured(q), ParsedRef::Structured(c)) = (&query.parsed, &self.code) {
            return q.matches(c);
        }
        let needle = query.bare_text().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        let in_title = self
            .title
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(&needle));
        in_title || self.code.canonical().to_lowercase().contains(&needle)
    }
}

/// Ordered candidates for one query
#[derive(Debug, Clone)]
pub struct HitCollection {
    pub query: SearchQuery,
    hits: Vec<Hit>,
}

impl HitCollection {
    /// Gather, year-filter and sort candidates.
    ///
    /// The fallback source is consulted only when the primary yields no
    /// records; its 404s count as no candidates. Transport errors from
    /// either source propagate.
    pub async fn search(
        primary: &Arc<dyn DataSource>,
        fallback: Option<&Arc<dyn DataSource>>,
        query: SearchQuery,
    ) -> Result<Self, SourceError> {
        let mut source = primary;
        let mut raws = primary.candidates(&query).await?;
        tracing::debug!(
            query = %query.text,
            source = primary.id(),
            count = raws.len(),
            "primary candidates"
        );

        if raws.is_empty() {
            if let Some(fallback) = fallback {
                source = fallback;
                raws = match fallback.candidates(&query).await {
                    Ok(raws) => raws,
                    Err(err) if err.is_not_found() => Vec::new(),
                    Err(err) => return Err(err),
                };
                tracing::debug!(
                    query = %query.text,
                    source = fallback.id(),
                    count = raws.len(),
                    "fallback candidates"
                );
            }
        }

        let mut hits: Vec<Hit> = raws
            .into_iter()
            .map(|raw| Hit::new(raw, Arc::clone(source)))
            .filter(|hit| match (query.year, hit.release_date) {
                (Some(year), Some(date)) => in_year(date, year),
                _ => true,
            })
            .collect();
        hits.sort_by(Hit::sort_cmp);

        Ok(Self { query, hits })
    }

    /// Build a collection from hits already at hand, sorting them
    pub fn from_hits(query: SearchQuery, mut hits: Vec<Hit>) -> Self {
        hits.sort_by(Hit::sort_cmp);
        Self { query, hits }
    }

    /// New collection narrowed to hits the query subsumes.
    ///
    /// The receiver is left untouched.
    pub fn search_filter(&self) -> HitCollection {
        let hits = self
            .hits
            .iter()
            .filter(|hit| hit.matches(&self.query))
            .cloned()
            .collect();
        HitCollection {
            query: self.query.clone(),
            hits,
        }
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hit> {
        self.hits.iter()
    }
}

impl IntoIterator for HitCollection {
    type Item = Hit;
    type IntoIter = std::vec::IntoIter<Hit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BibDate, DateType, DocumentId, SearchOptions, Title};
    use crate::sources::MockSource;

    fn item(id: &str, title: &str, published: &str) -> NistItem {
        NistItem {
            docidentifier: vec![DocumentId::primary(id)],
            title: vec![Title::new("main", title)],
            date: vec![BibDate::new(DateType::Published, published)],
            ..NistItem::default()
        }
    }

    fn source(items: Vec<NistItem>) -> Arc<dyn DataSource> {
        Arc::new(MockSource::with_items(items))
    }

    fn query(text: &str, year: Option<i32>) -> SearchQuery {
        SearchQuery::new(text, year, SearchOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_year_filter_boundaries() {
        let src = source(vec![
            item("NIST SP 800-57pt1r4", "Key Management", "2018-01-01"),
            item("NIST SP 800-57pt1r3", "Key Management", "2018-12-31"),
            item("NIST SP 800-57pt1r5", "Key Management", "2019-01-01"),
        ]);

        let hits = HitCollection::search(&src, None, query("SP 800-57", Some(2018)))
            .await
            .unwrap();
        let codes: Vec<String> = hits.iter().map(|h| h.code.canonical()).collect();
        assert_eq!(codes, vec!["NIST SP 800-57pt1r3", "NIST SP 800-57pt1r4"]);
    }

    #[tokio::test]
    async fn test_sort_ties_by_newest_release() {
        let src = source(vec![
            item("NIST SP 800-53r5", "Old", "2017-08-15"),
            item("NIST SP 800-53r5", "New", "2020-09-23"),
            item("NIST SP 800-53r4", "Rev 4", "2013-04-30"),
        ]);

        let hits = HitCollection::search(&src, None, query("SP 800-53", None))
            .await
            .unwrap();
        let titles: Vec<&str> = hits.iter().filter_map(|h| h.title.as_deref()).collect();
        assert_eq!(titles, vec!["Rev 4", "New", "Old"]);
    }

    #[tokio::test]
    async fn test_search_filter_does_not_mutate_receiver() {
        let src = source(vec![
            item("NIST SP 800-57pt1r4", "Part 1", "2016-01-28"),
            item("NIST SP 800-57pt2r1", "Part 2", "2019-05-23"),
            item("NIST SP 800-57pt3r1", "Part 3", "2015-01-22"),
        ]);

        let hits = HitCollection::search(&src, None, query("SP 800-57 Part 2", None))
            .await
            .unwrap();
        let filtered = hits.search_filter();

        assert_eq!(hits.len(), 3);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.hits()[0].title.as_deref(), Some("Part 2"));
    }

    #[tokio::test]
    async fn test_fallback_only_when_primary_is_empty() {
        let primary = source(vec![item("NIST SP 800-53r5", "Controls", "2020-09-23")]);
        let fallback = Arc::new(MockSource::with_items(vec![item(
            "NIST SP 800-53r4",
            "Fallback",
            "2013-04-30",
        )]));
        let fallback_dyn: Arc<dyn DataSource> = fallback.clone();

        let hits = HitCollection::search(&primary, Some(&fallback_dyn), query("SP 800-53", None))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(fallback.candidate_calls(), 0);

        let empty = source(vec![]);
        let hits = HitCollection::search(&empty, Some(&fallback_dyn), query("SP 800-53", None))
            .await
            .unwrap();
        assert_eq!(hits.hits()[0].title.as_deref(), Some("Fallback"));
        assert_eq!(fallback.candidate_calls(), 1);
    }

    #[tokio::test]
    async fn test_opaque_query_matches_title() {
        let src = source(vec![
            item(
                "NIST CSWP 04162018",
                "Framework for Improving Critical Infrastructure Cybersecurity",
                "2018-04-16",
            ),
            item("NIST SP 800-53r5", "Security and Privacy Controls", "2020-09-23"),
        ]);

        let hits = HitCollection::search(&src, None, query("Critical Infrastructure", None))
            .await
            .unwrap();
        let filtered = hits.search_filter();
        assert!(filtered.query.parsed.is_degraded());
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.hits()[0].code.canonical(), "NIST CSWP 04162018");
    }

    #[tokio::test]
    async fn test_fetch_is_memoized() {
        let mock = Arc::new(MockSource::with_items(vec![item(
            "NIST IR 8200",
            "Interagency Report",
            "2018-11-15",
        )]));
        let src: Arc<dyn DataSource> = mock.clone();
        let hits = HitCollection::search(&src, None, query("NISTIR 8200", None))
            .await
            .unwrap();
        let hit = &hits.hits()[0];

        let first = hit.fetch().await.unwrap();
        let second = hit.clone().fetch().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(mock.materialize_calls(), 1);
    }
}
