//! Resolved bibliographic record for a NIST publication.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::date::parse_date;

/// Fully materialized bibliographic item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NistItem {
    /// Date the record was produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub docidentifier: Vec<DocumentId>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub title: Vec<Title>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<Link>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub date: Vec<BibDate>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contributor: Vec<Contributor>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub language: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub script: Vec<String>,

    #[serde(rename = "abstract", skip_serializing_if = "Vec::is_empty")]
    pub abstract_text: Vec<LocalizedString>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstatus: Option<DocumentStatus>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relation: Vec<Relation>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<SeriesInfo>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keyword: Vec<String>,

    #[serde(skip_serializing_if = "Ext::is_empty")]
    pub ext: Ext,
}

impl NistItem {
    /// The primary identifier, falling back to the first one
    pub fn primary_id(&self) -> Option<&str> {
        self.docidentifier
            .iter()
            .find(|id| id.primary == Some(true))
            .or_else(|| self.docidentifier.first())
            .map(|id| id.id.as_str())
    }

    /// DOI identifier, if any
    pub fn doi(&self) -> Option<&str> {
        self.docidentifier
            .iter()
            .find(|id| id.kind.eq_ignore_ascii_case("doi"))
            .map(|id| id.id.as_str())
    }

    /// First title marked `main`, else the first title
    pub fn main_title(&self) -> Option<&str> {
        self.title
            .iter()
            .find(|t| t.kind.as_deref() == Some("main"))
            .or_else(|| self.title.first())
            .map(|t| t.content.as_str())
    }

    /// Dates of the given kinds, in record order
    pub fn dates_of<'a>(&'a self, kinds: &'a [DateType]) -> impl Iterator<Item = &'a BibDate> + 'a {
        self.date.iter().filter(move |d| kinds.contains(&d.kind))
    }

    /// Distinct years of published and issued dates, ascending
    pub fn release_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .dates_of(&[DateType::Published, DateType::Issued])
            .filter_map(BibDate::year)
            .collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    /// Draft iteration recorded in the status
    pub fn iteration(&self) -> Option<&str> {
        self.docstatus.as_ref()?.iteration.as_deref()
    }

    /// BibXML anchor: primary id with spaces replaced by single dots
    pub fn ref_anchor(&self) -> Option<String> {
        let id = self
            .docidentifier
            .iter()
            .find(|id| id.primary == Some(true))?;
        let mut anchor = String::with_capacity(id.id.len());
        for c in id.id.chars() {
            let c = if c == ' ' { '.' } else { c };
            if !(c == '.' && anchor.ends_with('.')) {
                anchor.push(c);
            }
        }
        Some(anchor)
    }

    pub fn comment_period(&self) -> Option<&CommentPeriod> {
        self.ext.commentperiod.as_ref()
    }
}

/// Document identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentId {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

impl DocumentId {
    pub fn primary(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "NIST".to_string(),
            primary: Some(true),
        }
    }

    pub fn doi(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "DOI".to_string(),
            primary: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub content: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl Title {
    pub fn new(kind: &str, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: Some(kind.to_string()),
            language: Some("en".to_string()),
            script: Some("Latn".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

impl Link {
    pub fn new(kind: &str, content: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            content: content.into(),
        }
    }
}

/// Kind of bibliographic date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateType {
    Published,
    Issued,
    Updated,
    Confirmed,
    Obsoleted,
}

impl DateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateType::Published => "published",
            DateType::Issued => "issued",
            DateType::Updated => "updated",
            DateType::Confirmed => "confirmed",
            DateType::Obsoleted => "obsoleted",
        }
    }
}

impl fmt::Display for DateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed date; `value` keeps the precision it was given with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BibDate {
    #[serde(rename = "type")]
    pub kind: DateType,
    pub value: String,
}

impl BibDate {
    pub fn new(kind: DateType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn on(&self) -> Option<NaiveDate> {
        parse_date(&self.value)
    }

    pub fn year(&self) -> Option<i32> {
        self.on().map(|d| d.year())
    }
}

/// Person or organization with roles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role: Vec<Role>,
}

impl Contributor {
    pub fn organization(organization: Organization, role: &str) -> Self {
        Self {
            organization: Some(organization),
            role: vec![Role::new(role)],
            ..Self::default()
        }
    }

    pub fn person(person: Person, role: &str) -> Self {
        Self {
            person: Some(person),
            role: vec![Role::new(role)],
            ..Self::default()
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role.iter().any(|r| r.kind == role)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Role {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: PersonName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affiliation: Vec<Affiliation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completename: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forename: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addition: Vec<String>,
}

impl PersonName {
    /// Display form: complete name, else forenames and surname
    pub fn display(&self) -> String {
        if let Some(complete) = &self.completename {
            return complete.clone();
        }
        let mut parts: Vec<&str> = self.forename.iter().map(String::as_str).collect();
        if let Some(surname) = &self.surname {
            parts.push(surname);
        }
        parts.extend(self.addition.iter().map(String::as_str));
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Affiliation {
    pub organization: Organization,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl Organization {
    /// National Institute of Standards and Technology
    pub fn nist() -> Self {
        Self {
            name: "National Institute of Standards and Technology".to_string(),
            abbreviation: Some("NIST".to_string()),
            uri: Some("www.nist.gov".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizedString {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// Publication stage of the document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStatus {
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<String>,
}

impl DocumentStatus {
    /// Map a feed status string onto stage and substage.
    pub fn from_feed(status: &str, iteration: Option<String>) -> Self {
        let status = status.trim().to_lowercase();
        let (stage, substage) = match status.as_str() {
            "draft (withdrawn)" => ("draft-public", "withdrawn"),
            "retired draft" => ("draft-public", "retired"),
            "withdrawn" => ("final", "withdrawn"),
            "draft" => ("draft-public", "active"),
            other => (other, "active"),
        };
        Self {
            stage: stage.to_string(),
            substage: Some(substage.to_string()),
            iteration,
        }
    }
}

/// Relation to another document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "type")]
    pub kind: String,
    pub bibitem: RelatedItem,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedItem {
    pub formattedref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesInfo {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

/// Open public review window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentPeriod {
    pub from: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended: Option<NaiveDate>,
}

/// NIST-specific extension block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commentperiod: Option<CommentPeriod>,
}

impl Ext {
    pub fn is_empty(&self) -> bool {
        self.doctype.is_none() && self.commentperiod.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let s = DocumentStatus::from_feed("Draft (Withdrawn)", None);
        assert_eq!((s.stage.as_str(), s.substage.as_deref()), ("draft-public", Some("withdrawn")));
        let s = DocumentStatus::from_feed("retired draft", None);
        assert_eq!(s.substage.as_deref(), Some("retired"));
        let s = DocumentStatus::from_feed("withdrawn", None);
        assert_eq!((s.stage.as_str(), s.substage.as_deref()), ("final", Some("withdrawn")));
        let s = DocumentStatus::from_feed("draft", Some("initial".into()));
        assert_eq!(s.stage, "draft-public");
        assert_eq!(s.iteration.as_deref(), Some("initial"));
        let s = DocumentStatus::from_feed("final", None);
        assert_eq!((s.stage.as_str(), s.substage.as_deref()), ("final", Some("active")));
    }

    #[test]
    fn test_ref_anchor_squeezes_dots() {
        let item = NistItem {
            docidentifier: vec![
                DocumentId::primary("NIST SP 800-57pt1r4 ipd"),
                DocumentId::doi("10.6028/NIST.SP.800-57pt1r4"),
            ],
            ..NistItem::default()
        };
        assert_eq!(item.ref_anchor().as_deref(), Some("NIST.SP.800-57pt1r4.ipd"));

        let item = NistItem {
            docidentifier: vec![DocumentId::primary("NIST  SP 800-53")],
            ..NistItem::default()
        };
        assert_eq!(item.ref_anchor().as_deref(), Some("NIST.SP.800-53"));
    }

    #[test]
    fn test_release_years() {
        let item = NistItem {
            date: vec![
                BibDate::new(DateType::Published, "2018-07"),
                BibDate::new(DateType::Updated, "2020-01-02"),
                BibDate::new(DateType::Issued, "2018"),
            ],
            ..NistItem::default()
        };
        assert_eq!(item.release_years(), vec![2018]);

        let reissued = NistItem {
            date: vec![
                BibDate::new(DateType::Published, "2020-09-23"),
                BibDate::new(DateType::Issued, "2013-04"),
                BibDate::new(DateType::Published, "2020-12-10"),
            ],
            ..NistItem::default()
        };
        assert_eq!(reissued.release_years(), vec![2013, 2020]);
    }

    #[test]
    fn test_person_display_name() {
        let name = PersonName {
            forename: vec!["Elaine".into()],
            surname: Some("Barker".into()),
            ..PersonName::default()
        };
        assert_eq!(name.display(), "Elaine Barker");
    }
}
