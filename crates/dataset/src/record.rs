use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One node as delivered by `GET /api/v1/nodes`.
///
/// Every field is optional at this level; [`crate::Node::from_record`] decides
/// which ones are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default, rename = "adv_name")]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub category: Option<u8>,
    #[serde(default, rename = "adv_lat")]
    pub lat: Option<f64>,
    #[serde(default, rename = "adv_lon")]
    pub lon: Option<f64>,
    #[serde(default)]
    pub inserted_date: Option<String>,
    #[serde(default)]
    pub updated_date: Option<String>,
    /// Older servers report the update instant under this name.
    #[serde(default)]
    pub last_advert: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub params: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub link: Option<String>,
}

impl NodeRecord {
    pub fn updated(&self) -> Option<&str> {
        self.updated_date.as_deref().or(self.last_advert.as_deref())
    }
}

/// A record that cannot become a [`crate::Node`]. Dropped during ingest.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataFormatError {
    #[error("record {index}: not a node object: {reason}")]
    Malformed { index: usize, reason: String },
    #[error("record {index}: missing {field}")]
    MissingField { index: usize, field: &'static str },
    #[error("record {index}: invalid {field}: {value}")]
    InvalidField {
        index: usize,
        field: &'static str,
        value: String,
    },
}

impl DataFormatError {
    pub fn index(&self) -> usize {
        match self {
            DataFormatError::Malformed { index, .. }
            | DataFormatError::MissingField { index, .. }
            | DataFormatError::InvalidField { index, .. } => *index,
        }
    }
}

/// Parses a response body into per-record results.
///
/// Only a body that is not a JSON array fails as a whole; an element that does
/// not fit [`NodeRecord`] becomes a [`DataFormatError::Malformed`] entry.
pub fn records_from_json(
    body: &str,
) -> Result<Vec<Result<NodeRecord, DataFormatError>>, serde_json::Error> {
    let values: Vec<Value> = serde_json::from_str(body)?;
    Ok(records_from_values(values))
}

pub fn records_from_values(values: Vec<Value>) -> Vec<Result<NodeRecord, DataFormatError>> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            NodeRecord::deserialize(value).map_err(|e| DataFormatError::Malformed {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}
