//! The published dataset and date filtering over it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// A GeoJSON feature. Geometry is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Value,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn feature_type() -> String {
    "Feature".into()
}

impl Feature {
    /// Property by name, if the feature has properties at all.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.as_ref().and_then(|props| props.get(name))
    }
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn feature_collection_type() -> String {
    "FeatureCollection".into()
}

impl FeatureCollection {
    /// Copy of the collection holding only the features `keep` accepts.
    fn retain_copy(&self, mut keep: impl FnMut(&Feature) -> bool) -> Self {
        Self {
            kind: self.kind.clone(),
            features: self.features.iter().filter(|f| keep(*f)).cloned().collect(),
            extra: self.extra.clone(),
        }
    }
}

/// Layer name to feature collection, serialized in name order.
pub type Layers = BTreeMap<String, FeatureCollection>;

/// One computed state of the dataset. Never mutated after publish.
#[derive(Debug, Clone)]
pub struct LayerSnapshot {
    pub layers: Layers,
    pub meta: Value,
    pub computed_at: OffsetDateTime,
}

impl LayerSnapshot {
    pub fn new(layers: Layers, meta: Value) -> Self {
        Self {
            layers,
            meta,
            computed_at: OffsetDateTime::now_utc(),
        }
    }

    /// The state served before the first successful refresh.
    pub fn empty() -> Self {
        Self::new(Layers::new(), Value::Object(Map::new()))
    }

    pub fn feature_count(&self) -> usize {
        self.layers.values().map(|c| c.features.len()).sum()
    }

    /// Independent copy of the layers, optionally filtered by date.
    ///
    /// Without a filter the copy equals the published layers. With one, every
    /// layer keeps only the features [`DateFilter::includes`] accepts; layers
    /// themselves are never dropped.
    pub fn filter_by_date(&self, filter: Option<&DateFilter>) -> Layers {
        match filter {
            None => self.layers.clone(),
            Some(filter) => self
                .layers
                .iter()
                .map(|(name, collection)| {
                    (name.clone(), collection.retain_copy(|f| filter.includes(f)))
                })
                .collect(),
        }
    }
}

/// Cumulative date filter: keeps features observed on or before `day`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFilter {
    day: Date,
    property: String,
}

impl DateFilter {
    pub fn new(day: Date, property: impl Into<String>) -> Self {
        Self {
            day,
            property: property.into(),
        }
    }

    pub fn day(&self) -> Date {
        self.day
    }

    /// A feature passes iff its date property parses as `YYYY-MM-DD` or an
    /// RFC 3339 date-time whose calendar date is on or before the filter day.
    /// Features without a parseable date never pass.
    pub fn includes(&self, feature: &Feature) -> bool {
        feature
            .property(&self.property)
            .and_then(Value::as_str)
            .and_then(parse_feature_date)
            .is_some_and(|date| date <= self.day)
    }
}

fn parse_feature_date(value: &str) -> Option<Date> {
    let value = value.trim();
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| OffsetDateTime::parse(value, &Rfc3339).ok().map(|dt| dt.date()))
}

/// The `date` query parameter could not be read as a date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date '{0}': expected YYYY-MM-DD or an ISO 8601 date-time")]
pub struct DateParseError(pub String);

/// Parses the `date` query parameter into the calendar day it names.
///
/// Accepts RFC 3339 date-times (the day in their own offset), naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` date-times, and plain `YYYY-MM-DD` dates.
pub fn parse_request_date(value: &str) -> Result<Date, DateParseError> {
    let trimmed = value.trim();

    if let Ok(dt) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(dt.date());
    }
    if let Ok(dt) = PrimitiveDateTime::parse(
        trimmed,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Ok(dt.date());
    }
    if let Ok(dt) = PrimitiveDateTime::parse(
        trimmed,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    ) {
        return Ok(dt.date());
    }
    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map_err(|_| DateParseError(value.to_string()))
}
