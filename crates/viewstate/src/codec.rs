//! Query-string form of the view state.
//!
//! Keys: `lat`, `lon`, `zoom`, `nodes`, `date`, `cluster`. Decoding never
//! fails; anything unusable is dropped field by field.

use dataset::{Category, CategorySet, FilterCriteria};
use foundation::{Timestamp, Viewport, format_timestamp, parse_timestamp, round_coord};
use layers::ClusteringConfig;

/// View fields that were set explicitly, by the URL or by the user.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PartialViewState {
    pub viewport: Option<Viewport>,
    pub categories: Option<CategorySet>,
    pub since: Option<Timestamp>,
    pub cluster_zoom: Option<u8>,
}

impl PartialViewState {
    pub fn is_empty(&self) -> bool {
        self.viewport.is_none()
            && self.categories.is_none()
            && self.since.is_none()
            && self.cluster_zoom.is_none()
    }

    /// Fields of `other` override fields of `self`.
    pub fn merge(&mut self, other: &PartialViewState) {
        self.viewport = other.viewport.or(self.viewport);
        self.categories = other.categories.or(self.categories);
        self.since = other.since.or(self.since);
        self.cluster_zoom = other.cluster_zoom.or(self.cluster_zoom);
    }
}

/// Complete effective view: defaults with explicit fields applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub viewport: Viewport,
    pub criteria: FilterCriteria,
    pub clustering: ClusteringConfig,
}

impl ViewState {
    pub fn apply(&mut self, partial: &PartialViewState) {
        if let Some(viewport) = partial.viewport {
            self.viewport = viewport;
        }
        if let Some(categories) = partial.categories {
            self.criteria.categories = categories;
        }
        if let Some(since) = partial.since {
            self.criteria.since = since;
        }
        if let Some(zoom) = partial.cluster_zoom {
            self.clustering = ClusteringConfig::new(zoom);
        }
    }
}

pub fn decode(query: &str) -> PartialViewState {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut out = PartialViewState::default();
    let (mut lat, mut lon, mut zoom) = (None, None, None);

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let mut kv = pair.splitn(2, '=');
        let key = unescape(kv.next().unwrap_or(""));
        let value = unescape(kv.next().unwrap_or(""));
        let value = value.trim();
        match key.as_str() {
            "lat" => lat = value.parse::<f64>().ok(),
            "lon" => lon = value.parse::<f64>().ok(),
            "zoom" => zoom = value.parse::<f64>().ok(),
            "nodes" => out.categories = decode_categories(value),
            "date" => out.since = parse_timestamp(value),
            "cluster" => out.cluster_zoom = value.parse::<u8>().ok(),
            _ => {}
        }
    }

    if let (Some(lat), Some(lon), Some(zoom)) = (lat, lon, zoom) {
        let viewport = Viewport::new(lat, lon, zoom);
        if viewport.is_valid() {
            out.viewport = Some(viewport);
        }
    }
    out
}

/// An empty value is an explicit empty selection. A non-empty value with no
/// usable code is ignored.
fn decode_categories(value: &str) -> Option<CategorySet> {
    if value.is_empty() {
        return Some(CategorySet::empty());
    }
    let mut set = CategorySet::empty();
    let mut any = false;
    for token in value.split(',') {
        let Ok(code) = token.trim().parse::<u8>() else {
            continue;
        };
        let category = Category::from_code(code);
        if category.is_known() {
            set.insert(category);
            any = true;
        }
    }
    any.then_some(set)
}

/// Query string without the leading `?`; empty when nothing is set.
pub fn encode(partial: &PartialViewState) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(v) = partial.viewport {
        parts.push(format!("lat={}", round_coord(v.center.lat)));
        parts.push(format!("lon={}", round_coord(v.center.lon)));
        parts.push(format!("zoom={}", round_coord(v.zoom)));
    }
    if let Some(categories) = partial.categories {
        let codes: Vec<String> = categories.codes().iter().map(u8::to_string).collect();
        parts.push(format!("nodes={}", codes.join(",")));
    }
    if let Some(since) = partial.since {
        parts.push(format!("date={}", format_timestamp(since)));
    }
    if let Some(zoom) = partial.cluster_zoom {
        parts.push(format!("cluster={zoom}"));
    }
    parts.join("&")
}

/// Percent-decoding with `+` as space. Malformed escapes pass through.
fn unescape(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_full_query() {
        let got = decode("?lat=48.1486&lon=17.1077&zoom=10&nodes=1,3&date=2024-03-01&cluster=14");
        assert_eq!(
            got,
            PartialViewState {
                viewport: Some(Viewport::new(48.1486, 17.1077, 10.0)),
                categories: Some([Category::Client, Category::RoomServer].into_iter().collect()),
                since: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
                cluster_zoom: Some(14),
            }
        );
    }

    #[test]
    fn viewport_is_all_or_nothing() {
        assert_eq!(decode("lat=48&lon=17").viewport, None);
        assert_eq!(decode("lat=91&lon=17&zoom=3").viewport, None);
        assert_eq!(decode("lat=48&lon=17&zoom=-1").viewport, None);
        assert_eq!(decode("lat=48&lon=inf&zoom=3").viewport, None);
        assert_eq!(decode("lat=x&lon=17&zoom=3").viewport, None);
        assert_eq!(
            decode("zoom=3&lon=-17.5&lat=-90").viewport,
            Some(Viewport::new(-90.0, -17.5, 3.0))
        );
    }

    #[test]
    fn nodes_field_edge_cases() {
        assert_eq!(decode("nodes=").categories, Some(CategorySet::empty()));
        assert_eq!(decode("nodes=x,9").categories, None);
        assert_eq!(
            decode("nodes=2,x,9,4").categories,
            Some([Category::Repeater, Category::Sensor].into_iter().collect())
        );
        assert_eq!(
            decode("nodes=1%2C2").categories,
            Some([Category::Client, Category::Repeater].into_iter().collect())
        );
    }

    #[test]
    fn malformed_values_are_dropped_individually() {
        let got = decode("date=yesterday&cluster=300&nodes=4&foo=bar&&=x");
        assert_eq!(got.since, None);
        assert_eq!(got.cluster_zoom, None);
        assert_eq!(got.categories, Some([Category::Sensor].into_iter().collect()));
    }

    #[test]
    fn rfc3339_dates_with_escapes() {
        let got = decode("date=2024-03-01T12%3A30%3A00%2B02%3A00");
        assert_eq!(got.since, Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()));
    }

    #[test]
    fn encode_emits_only_set_fields() {
        assert_eq!(encode(&PartialViewState::default()), "");
        let partial = PartialViewState {
            categories: Some(CategorySet::empty()),
            cluster_zoom: Some(9),
            ..PartialViewState::default()
        };
        assert_eq!(encode(&partial), "nodes=&cluster=9");
    }

    #[test]
    fn encode_rounds_viewport() {
        let partial = PartialViewState {
            viewport: Some(Viewport::new(48.148_612, -0.000_01, 7.5)),
            since: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 5).unwrap()),
            ..PartialViewState::default()
        };
        assert_eq!(
            encode(&partial),
            "lat=48.1486&lon=0&zoom=7.5&date=2024-03-01T10:30:05Z"
        );
    }

    #[test]
    fn round_trip_preserves_state() {
        let partial = PartialViewState {
            viewport: Some(Viewport::new(-33.8688, 151.2093, 12.25)),
            categories: Some([Category::Client, Category::Sensor].into_iter().collect()),
            since: Some(Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap()),
            cluster_zoom: Some(0),
        };
        assert_eq!(decode(&encode(&partial)), partial);
        assert_eq!(decode(&format!("?{}", encode(&partial))), partial);
    }

    #[test]
    fn unescape_handles_plus_and_bad_escapes() {
        assert_eq!(unescape("a+b%20c"), "a b c");
        assert_eq!(unescape("100%"), "100%");
        assert_eq!(unescape("%zz"), "%zz");
        assert_eq!(unescape("%C3%BC"), "ü");
    }

    #[test]
    fn apply_overrides_defaults() {
        let mut state = ViewState {
            viewport: Viewport::default(),
            criteria: FilterCriteria::default(),
            clustering: ClusteringConfig::default(),
        };
        state.apply(&decode("nodes=2&cluster=5"));
        assert_eq!(state.viewport, Viewport::default());
        assert_eq!(
            state.criteria.categories,
            [Category::Repeater].into_iter().collect::<CategorySet>()
        );
        assert_eq!(state.clustering, ClusteringConfig::new(5));
    }
}
