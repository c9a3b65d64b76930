//! Serializers for resolved items.
//!
//! - [`to_xml`]: `bibitem` XML, or `bibdata` with the NIST extension block
//! - [`to_hash`] / [`from_hash`]: JSON-compatible key-value tree
//! - [`to_yaml`] / [`from_yaml`]: the same tree as YAML
//! - [`to_asciibib`]: line-oriented plain text

mod asciibib;
mod hash;
mod xml;

pub use asciibib::to_asciibib;
pub use hash::{from_hash, from_yaml, to_hash, to_yaml};
pub use xml::{to_xml, XmlOptions};

/// Errors raised while rendering or reading an item
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<quick_xml::Error> for OutputError {
    fn from(err: quick_xml::Error) -> Self {
        OutputError::Xml(err.to_string())
    }
}
