//! Key-value tree form of an item.
//!
//! The tree is the serde form of [`NistItem`]: the comment period sits under
//! `ext`, empty fields are omitted.

use serde_json::Value;

use super::OutputError;
use crate::models::NistItem;

pub fn to_hash(item: &NistItem) -> Result<Value, OutputError> {
    Ok(serde_json::to_value(item)?)
}

pub fn from_hash(hash: Value) -> Result<NistItem, OutputError> {
    Ok(serde_json::from_value(hash)?)
}

pub fn to_yaml(item: &NistItem) -> Result<String, OutputError> {
    Ok(serde_yaml::to_string(item)?)
}

/// Read a YAML document, e.g. one fetched through the index
pub fn from_yaml(yaml: &str) -> Result<NistItem, OutputError> {
    let hash: Value = serde_yaml::from_str(yaml)?;
    from_hash(hash)
}
