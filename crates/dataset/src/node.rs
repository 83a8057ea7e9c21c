use std::collections::BTreeMap;

use foundation::{LatLon, MarkerHandle, Timestamp, parse_timestamp};
use serde_json::Value;

use crate::category::Category;
use crate::record::{DataFormatError, NodeRecord};

/// A validated mesh node.
///
/// Immutable once ingested, except for the marker back-reference which is
/// maintained by the map synchronization layer. The handle is a lookup key
/// only; the marker itself is owned elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    public_key: String,
    name: String,
    category: Category,
    position: LatLon,
    params: BTreeMap<String, Value>,
    link: Option<String>,
    inserted_at: Timestamp,
    updated_at: Option<Timestamp>,
    coords: String,
    marker: Option<MarkerHandle>,
}

impl Node {
    /// Validates `record` (the `index`-th element of its batch).
    ///
    /// Required: public key, category, both coordinates and an inserted
    /// timestamp. A missing name becomes the empty string.
    pub fn from_record(index: usize, record: NodeRecord) -> Result<Self, DataFormatError> {
        let missing = |field| DataFormatError::MissingField { index, field };

        let public_key = record
            .public_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| missing("public_key"))?
            .to_string();
        let category = Category::from_code(record.category.ok_or_else(|| missing("type"))?);
        let lat = record.lat.ok_or_else(|| missing("adv_lat"))?;
        let lon = record.lon.ok_or_else(|| missing("adv_lon"))?;
        let position = LatLon::new(lat, lon);
        if !position.is_finite() {
            return Err(DataFormatError::InvalidField {
                index,
                field: "position",
                value: format!("{lat}, {lon}"),
            });
        }

        let inserted_raw = record
            .inserted_date
            .as_deref()
            .ok_or_else(|| missing("inserted_date"))?;
        let inserted_at =
            parse_timestamp(inserted_raw).ok_or_else(|| DataFormatError::InvalidField {
                index,
                field: "inserted_date",
                value: inserted_raw.to_string(),
            })?;
        let updated_at = match record.updated() {
            None => None,
            Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
                DataFormatError::InvalidField {
                    index,
                    field: "updated_date",
                    value: raw.to_string(),
                }
            })?),
        };

        Ok(Self {
            public_key,
            name: record.name.unwrap_or_default(),
            category,
            coords: position.format_coords(),
            position,
            params: record.params.unwrap_or_default(),
            link: record.link,
            inserted_at,
            updated_at,
            marker: None,
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn position(&self) -> LatLon {
        self.position
    }

    /// `"lat, lon"` with four decimals.
    pub fn coords(&self) -> &str {
        &self.coords
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    pub fn inserted_at(&self) -> Timestamp {
        self.inserted_at
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }

    /// Updated timestamp if present, else inserted. Used for recency filtering.
    pub fn activity_instant(&self) -> Timestamp {
        self.updated_at.unwrap_or(self.inserted_at)
    }

    pub fn marker(&self) -> Option<MarkerHandle> {
        self.marker
    }

    pub fn set_marker(&mut self, marker: Option<MarkerHandle>) {
        self.marker = marker;
    }

    /// `key=value` pairs joined with `", "`, e.g. `"bw=250, freq=869.525"`.
    pub fn params_summary(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{k}={s}"),
                other => format!("{k}={other}"),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn record(value: Value) -> NodeRecord {
        serde_json::from_value(value).unwrap()
    }

    fn full() -> Value {
        json!({
            "adv_name": "Bob",
            "type": 1,
            "adv_lat": 50.08804,
            "adv_lon": 14.42076,
            "inserted_date": "2024-01-10T08:00:00Z",
            "public_key": "pk-bob",
            "params": { "freq": 869.525, "cr": "5" }
        })
    }

    #[test]
    fn builds_node_with_derived_fields() {
        let node = Node::from_record(0, record(full())).unwrap();
        assert_eq!(node.public_key(), "pk-bob");
        assert_eq!(node.category(), Category::Client);
        assert_eq!(node.coords(), "50.0880, 14.4208");
        assert_eq!(node.params_summary(), "cr=5, freq=869.525");
        assert_eq!(node.marker(), None);
        assert_eq!(
            node.activity_instant(),
            Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn updated_timestamp_is_authoritative() {
        let mut v = full();
        v["updated_date"] = json!("2024-02-01T00:00:00Z");
        let node = Node::from_record(0, record(v)).unwrap();
        assert_eq!(
            node.activity_instant(),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_required_fields_are_reported() {
        for (field, expected) in [
            ("adv_lat", "adv_lat"),
            ("adv_lon", "adv_lon"),
            ("type", "type"),
            ("public_key", "public_key"),
            ("inserted_date", "inserted_date"),
        ] {
            let mut v = full();
            v.as_object_mut().unwrap().remove(field);
            let err = Node::from_record(3, record(v)).unwrap_err();
            assert_eq!(
                err,
                DataFormatError::MissingField {
                    index: 3,
                    field: expected
                }
            );
        }
    }

    #[test]
    fn unknown_category_is_kept() {
        let mut v = full();
        v["type"] = json!(7);
        let node = Node::from_record(0, record(v)).unwrap();
        assert_eq!(node.category(), Category::Unknown(7));
    }

    #[test]
    fn unparseable_timestamp_is_invalid() {
        let mut v = full();
        v["inserted_date"] = json!("last tuesday");
        assert!(matches!(
            Node::from_record(1, record(v)),
            Err(DataFormatError::InvalidField {
                field: "inserted_date",
                ..
            })
        ));
    }
}
