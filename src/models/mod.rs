//! Core data models: identifiers, resolved items, queries and hits.

pub mod hit;
mod identifier;
mod item;
mod query;

pub use hit::{extract_identifier, Hit, HitCollection, RawCandidate};
pub use identifier::{
    Addendum, Identifier, Iteration, Publisher, Series, Stage, StageKind, Update,
};
pub use item::{
    Affiliation, BibDate, CommentPeriod, Contributor, DateType, DocumentId, DocumentStatus, Ext,
    Link, LocalizedString, NistItem, Organization, Person, PersonName, RelatedItem, Relation,
    Role, SeriesInfo, Title,
};
pub use query::{GetOptions, SearchOptions, SearchQuery};
