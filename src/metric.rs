use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field the store uses for the per-rollup average.
pub const AVERAGE_FIELD: &str = "average";
/// Field the store uses for per-category counts of enumerated metrics.
pub const ENUM_VALUES_FIELD: &str = "enum_values";

/// A single sample as returned by the store. Samples within a record
/// carry no ordering guarantee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    // Milliseconds since the epoch.
    pub timestamp: i64,
    #[serde(rename = "numPoints", default)]
    pub num_points: u64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Everything the store returned for one metric identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub metric: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    // Required. A record without it carries no usable data.
    pub data: Vec<RawSample>,
}

impl MetricRecord {
    // Whether any sample carries the nested category `key` under `field`.
    pub fn has_category(&self, field: &str, key: &str) -> bool {
        self.data.iter().any(|s| {
            s.fields
                .get(field)
                .and_then(|v| v.get(key))
                .is_some()
        })
    }
}

/// Strategy for pulling a numeric value out of a [`RawSample`].
///
/// Built once per metric when a node is resolved, so samples are never
/// probed for their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataKey {
    /// `sample[field]`
    Flat(String),
    /// `sample[field][key]`
    Nested(String, String),
}

impl DataKey {
    pub fn extract(&self, sample: &RawSample) -> Option<f64> {
        match self {
            DataKey::Flat(field) => sample.fields.get(field)?.as_f64(),
            DataKey::Nested(field, key) => sample.fields.get(field)?.get(key)?.as_f64(),
        }
    }

    /// Top-level field the store has to be asked to select.
    pub fn field(&self) -> &str {
        match self {
            DataKey::Flat(field) => field,
            DataKey::Nested(field, _) => field,
        }
    }
}

/// A queryable metric as exposed by the browsing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    pub path: String,
    // Selected value of an enumerated metric, if any.
    pub category: Option<String>,
}

impl LeafNode {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            category: None,
        }
    }

    pub fn with_category(path: &str, category: &str) -> Self {
        Self {
            path: path.to_string(),
            category: Some(category.to_string()),
        }
    }
}

/// A node resolved against the configuration: the identifier the store
/// knows it by, and how to read its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricTarget {
    pub path: String,
    pub metric: String,
    pub data_key: DataKey,
}

#[cfg(test)]
pub mod tests {
    use serde_json::json;

    use super::{DataKey, MetricRecord, RawSample};

    fn sample(value: serde_json::Value) -> RawSample {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_flat_key() {
        let s = sample(json!({"timestamp": 1000, "numPoints": 1, "average": 4.5}));
        assert_eq!(s.num_points, 1);
        assert_eq!(DataKey::Flat("average".into()).extract(&s), Some(4.5));
        assert_eq!(DataKey::Flat("max".into()).extract(&s), None);
    }

    #[test]
    fn test_nested_key() {
        let s = sample(json!({
            "timestamp": 1000,
            "numPoints": 20,
            "enum_values": {"v1": 13, "v2": 7}
        }));
        let key = DataKey::Nested("enum_values".into(), "v2".into());
        assert_eq!(key.extract(&s), Some(7.0));
        assert_eq!(key.field(), "enum_values");
        assert_eq!(
            DataKey::Nested("enum_values".into(), "v3".into()).extract(&s),
            None
        );
        // A flat read of a nested field is not a number.
        assert_eq!(DataKey::Flat("enum_values".into()).extract(&s), None);
    }

    #[test]
    fn test_record_defaults() {
        let record: MetricRecord =
            serde_json::from_value(json!({"metric": "a.b.c", "data": []})).unwrap();
        assert_eq!(record.metric, "a.b.c");
        assert!(record.data.is_empty());
        assert!(record.unit.is_none());
        assert!(record.kind.is_none());

        assert!(serde_json::from_value::<MetricRecord>(json!({"unit": "ms"})).is_err());
        assert!(serde_json::from_value::<MetricRecord>(json!({
            "metric": "a.b.c",
            "type": "number",
            "unit": "unknown"
        }))
        .is_err());
    }

    #[test]
    fn test_has_category() {
        let record: MetricRecord = serde_json::from_value(json!({
            "metric": "x.y.z",
            "type": "number",
            "data": [{"timestamp": 1, "enum_values": {"v1": 3}}]
        }))
        .unwrap();
        assert_eq!(record.kind.as_deref(), Some("number"));
        assert!(record.has_category("enum_values", "v1"));
        assert!(!record.has_category("enum_values", "v2"));
    }
}
