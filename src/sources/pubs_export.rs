//! Bulk metadata feed published by the NIST CSRC.
//!
//! The feed is a zip archive holding one JSON array of document records.
//! It is cached on disk through [`DataCache`] and searched in memory.

use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use crate::cache::{DataCache, HttpArchive, Payload};
use crate::config::Config;
use crate::models::hit::lenient;
use crate::models::{
    Affiliation, BibDate, CommentPeriod, Contributor, DateType, DocumentId, DocumentStatus, Ext,
    Iteration, LocalizedString, Link, NistItem, Organization, Person, PersonName, RawCandidate,
    RelatedItem, Relation, SearchQuery, SeriesInfo, Stage, Title,
};
use crate::parser::ParsedRef;
use crate::sources::{DataSource, SourceError};
use crate::utils::date::{format_with_precision, parse_date, parse_loose};
use crate::utils::HttpClient;

/// File name of the cached feed archive
pub const FEED_FILE: &str = "pubs-export.zip";

/// Statuses eligible when drafts are requested
const DRAFT_STATUSES: &[&str] = &["draft-public", "draft-prelim"];

/// One record of the pubs-export feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FeedRecord {
    pub docidentifier: String,
    pub doi: Option<String>,
    pub series: Option<String>,
    pub title_main: Option<String>,
    pub title_sub: Option<String>,
    pub uri: Option<String>,
    pub status: Option<String>,
    pub published_date: Option<String>,
    pub issued_date: Option<String>,
    pub updated_date: Option<String>,
    pub iteration: Option<String>,
    #[serde(deserialize_with = "nullable_vec")]
    pub authors: Vec<FeedPerson>,
    #[serde(deserialize_with = "nullable_vec")]
    pub editors: Vec<FeedPerson>,
    #[serde(deserialize_with = "nullable_vec")]
    pub keywords: Vec<String>,
    #[serde(deserialize_with = "nullable_vec")]
    pub supersedes: Vec<FeedRelation>,
    #[serde(deserialize_with = "nullable_vec")]
    pub superseded_by: Vec<FeedRelation>,
    pub comment_from: Option<String>,
    pub comment_to: Option<String>,
    pub comment_extended: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

/// Author or editor as exported: either a plain name or its parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedPerson {
    Name(String),
    Detailed(FeedPersonName),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedPersonName {
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
    pub affiliation: Option<String>,
}

/// Reference to a superseding or superseded document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedRelation {
    pub docidentifier: String,
    pub uri: Option<String>,
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl FeedRecord {
    /// Main and sub title joined with ` - `
    pub fn title(&self) -> Option<String> {
        let parts: Vec<&str> = [self.title_main.as_deref(), self.title_sub.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" - "))
    }

    /// Issued date, else published date
    pub fn release_date(&self) -> Option<chrono::NaiveDate> {
        self.issued_date
            .as_deref()
            .and_then(parse_date)
            .or_else(|| self.published_date.as_deref().and_then(parse_date))
    }

    /// Status mapped onto a document stage
    pub fn stage(&self) -> String {
        DocumentStatus::from_feed(self.status.as_deref().unwrap_or("final"), None).stage
    }

    pub fn is_draft(&self) -> bool {
        self.stage().starts_with("draft")
    }

    /// Series suffix, e.g. `SP` for `nist-sp`
    pub fn series_code(&self) -> Option<String> {
        let series = self.series.as_deref()?.trim();
        let code = series.rsplit(['-', ' ']).next().unwrap_or(series);
        (!code.is_empty()).then(|| code.to_uppercase())
    }

    /// Identifier of the record, preferring the DOI.
    ///
    /// Drafts whose identifier carries no stage get a public-draft stage
    /// with the exported iteration.
    pub fn identifier(&self) -> ParsedRef {
        let parsed = self
            .doi
            .as_deref()
            .map(lenient)
            .filter(|p| !p.is_degraded())
            .unwrap_or_else(|| lenient(&self.docidentifier));

        match parsed {
            ParsedRef::Structured(id) if self.is_draft() && id.stage.is_none() => {
                let iteration = self.iteration.as_deref().and_then(Iteration::parse);
                ParsedRef::Structured(id.with_stage(Stage::public_draft(iteration)))
            }
            other => other,
        }
    }

    /// Map the record onto a bibliographic item
    pub fn to_item(&self) -> NistItem {
        let parsed = self.identifier();
        let identifier = parsed.identifier();

        let mut docidentifier = vec![DocumentId::primary(parsed.canonical())];
        if let Some(doi) = &self.doi {
            docidentifier.push(DocumentId::doi(doi));
        }

        let mut title = Vec::new();
        if let Some(main) = &self.title_main {
            title.push(Title::new("title-main", main));
        }
        if let Some(sub) = &self.title_sub {
            title.push(Title::new("title-part", sub));
        }
        if let Some(full) = self.title() {
            title.push(Title::new("main", full));
        }

        let mut link = Vec::new();
        if let Some(uri) = &self.uri {
            link.push(Link::new("src", uri));
        }
        if let Some(doi) = &self.doi {
            link.push(Link::new("doi", format!("https://doi.org/{}", doi)));
        }

        let date = [
            (DateType::Published, &self.published_date),
            (DateType::Issued, &self.issued_date),
            (DateType::Updated, &self.updated_date),
        ]
        .into_iter()
        .filter_map(|(kind, value)| {
            let (on, precision) = parse_loose(value.as_deref()?)?;
            Some(BibDate::new(kind, format_with_precision(on, precision)))
        })
        .collect();

        let mut contributor = vec![Contributor::organization(Organization::nist(), "publisher")];
        contributor.extend(
            self.authors
                .iter()
                .map(|p| Contributor::person(p.to_person(), "author")),
        );
        contributor.extend(
            self.editors
                .iter()
                .map(|p| Contributor::person(p.to_person(), "editor")),
        );

        let iteration = identifier
            .and_then(|id| id.stage)
            .and_then(|stage| stage.iteration)
            .or_else(|| self.iteration.as_deref().and_then(Iteration::parse))
            .filter(|_| self.is_draft())
            .map(|it| it.to_string());
        let status = self.status.as_deref().unwrap_or("final");
        let docstatus = DocumentStatus::from_feed(status, iteration);

        let mut relation: Vec<Relation> = self
            .supersedes
            .iter()
            .map(|r| r.to_relation("obsoletes"))
            .collect();
        relation.extend(self.superseded_by.iter().map(|r| r.to_relation("obsoletedBy")));

        let series = identifier
            .map(|id| SeriesInfo {
                kind: Some("main".to_string()),
                title: id
                    .series
                    .title()
                    .map(str::to_string)
                    .unwrap_or_else(|| id.series.abbreviation().to_string()),
                abbreviation: Some(id.series.abbreviation().to_string()),
                number: Some(id.base_ref()),
            })
            .into_iter()
            .collect();

        let commentperiod = self
            .comment_from
            .as_deref()
            .and_then(parse_date)
            .map(|from| CommentPeriod {
                from,
                to: self.comment_to.as_deref().and_then(parse_date),
                extended: self.comment_extended.as_deref().and_then(parse_date),
            });

        NistItem {
            fetched: Some(Local::now().date_naive()),
            docidentifier,
            title,
            link,
            item_type: Some("standard".to_string()),
            date,
            contributor,
            edition: identifier
                .and_then(|id| id.revision.as_deref())
                .map(|rev| format!("Revision {}", rev)),
            language: vec!["en".to_string()],
            script: vec!["Latn".to_string()],
            abstract_text: self
                .abstract_text
                .iter()
                .map(|content| LocalizedString {
                    content: content.clone(),
                    language: Some("en".to_string()),
                    script: Some("Latn".to_string()),
                })
                .collect(),
            docstatus: Some(docstatus),
            relation,
            series,
            keyword: self.keywords.clone(),
            ext: Ext {
                doctype: Some("standard".to_string()),
                commentperiod,
            },
        }
    }

    /// Whether the exported status is eligible for a draft or final lookup.
    ///
    /// Only the exact statuses qualify; `withdrawn` records never do.
    fn selectable(&self, drafts: bool) -> bool {
        let status = self
            .status
            .as_deref()
            .map(|s| s.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if drafts {
            DRAFT_STATUSES.contains(&status.as_str())
        } else {
            status == "final"
        }
    }

    /// Cheap pre-filter before the structured match in `search_filter`
    fn may_match(&self, query: &SearchQuery) -> bool {
        match &query.parsed {
            ParsedRef::Structured(q) => match self.identifier() {
                ParsedRef::Structured(c) => {
                    q.series == c.series && q.code.eq_ignore_ascii_case(&c.code)
                }
                ParsedRef::Opaque(text) => text.contains(&q.code),
            },
            ParsedRef::Opaque(_) => {
                let needle = query.bare_text().to_lowercase();
                !needle.is_empty()
                    && (self.docidentifier.to_lowercase().contains(&needle)
                        || self.title().is_some_and(|t| t.to_lowercase().contains(&needle)))
            }
        }
    }
}

impl FeedPerson {
    fn to_person(&self) -> Person {
        match self {
            FeedPerson::Name(name) => Person {
                name: PersonName {
                    completename: Some(name.trim().to_string()),
                    ..PersonName::default()
                },
                affiliation: Vec::new(),
            },
            FeedPerson::Detailed(parts) => Person {
                name: PersonName {
                    completename: parts.full_name.clone(),
                    forename: [&parts.first_name, &parts.middle_name]
                        .into_iter()
                        .flatten()
                        .cloned()
                        .collect(),
                    surname: parts.last_name.clone(),
                    addition: parts.suffix.iter().cloned().collect(),
                },
                affiliation: parts
                    .affiliation
                    .iter()
                    .map(|name| Affiliation {
                        organization: Organization {
                            name: name.clone(),
                            ..Organization::default()
                        },
                    })
                    .collect(),
            },
        }
    }
}

impl FeedRelation {
    fn to_relation(&self, kind: &str) -> Relation {
        Relation {
            kind: kind.to_string(),
            bibitem: RelatedItem {
                formattedref: self.docidentifier.clone(),
                link: self.uri.clone(),
            },
        }
    }
}

/// Primary data source backed by the cached feed
#[derive(Debug, Clone)]
pub struct PubsExportSource {
    cache: Arc<DataCache<Vec<FeedRecord>>>,
}

impl PubsExportSource {
    pub fn new(cache: Arc<DataCache<Vec<FeedRecord>>>) -> Self {
        Self { cache }
    }

    pub fn from_config(config: &Config, client: HttpClient) -> Self {
        let remote = HttpArchive::new(client, &config.data.feed_url)
            .with_meta_url(&config.data.feed_meta_url);
        let cache = DataCache::new(
            config.data.directory.join(FEED_FILE),
            Arc::new(remote),
            Payload::Json,
        );
        Self::new(Arc::new(cache))
    }

    pub fn cache(&self) -> &Arc<DataCache<Vec<FeedRecord>>> {
        &self.cache
    }
}

#[async_trait]
impl DataSource for PubsExportSource {
    fn id(&self) -> &str {
        "pubs-export"
    }

    async fn candidates(&self, query: &SearchQuery) -> Result<Vec<RawCandidate>, SourceError> {
        let records = self.cache.get().await?;
        let drafts = query.options.wants_drafts();

        let selected: Vec<RawCandidate> = records
            .iter()
            .filter(|record| record.selectable(drafts))
            .filter(|record| record.may_match(query))
            .cloned()
            .map(RawCandidate::Feed)
            .collect();

        tracing::debug!(
            query = %query.text,
            total = records.len(),
            selected = selected.len(),
            "feed lookup"
        );
        Ok(selected)
    }

    async fn materialize(&self, raw: &RawCandidate) -> Result<NistItem, SourceError> {
        match raw {
            RawCandidate::Feed(record) => Ok(record.to_item()),
            RawCandidate::Document(item) => Ok(item.as_ref().clone()),
            RawCandidate::IndexRow(row) => Err(SourceError::Parse(format!(
                "pubs-export cannot materialize index row {}",
                row.id
            ))),
        }
    }
}
