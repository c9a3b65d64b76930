//! # NIST Resolver
//!
//! Resolve loosely written NIST publication references such as
//! `SP 800-57 Part 1 Rev. 4`, `NISTIR 8200:2018` or `NIST.SP.800-53r5` to
//! full bibliographic records.
//!
//! ## Architecture
//!
//! - [`parser`]: reference text to a structured [`Identifier`]
//! - [`models`]: identifiers, resolved items, queries and hit collections
//! - [`sources`]: the pubs-export feed and the precomputed index
//! - [`cache`]: on-disk snapshots of the remote archives
//! - [`bibliography`]: search and resolution engine
//! - [`output`]: XML, hash/YAML and asciibib serializers
//! - [`utils`]: HTTP client, retry, bounded task groups, dates
//! - [`config`]: configuration management
//!
//! ```rust,no_run
//! use nist_resolver::{config::Config, GetOptions, NistBibliography};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bib = NistBibliography::from_config(&Config::default())?;
//! if let Some(item) = bib.get("NISTIR 8200", Some(2018), GetOptions::default()).await? {
//!     println!("{}", item.primary_id().unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod bibliography;
pub mod cache;
pub mod config;
pub mod models;
pub mod output;
pub mod parser;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use bibliography::{MissReason, NistBibliography, NotFound, RequestError, Resolution};
pub use models::{GetOptions, HitCollection, Identifier, NistItem, SearchOptions};
pub use parser::{parse, parse_lenient, ParseError, ParsedRef};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
