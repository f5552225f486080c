//! Forgiving field deserializers for upstream rank payloads.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

use crate::bucket::Bucket;

pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose<V> {
        Value(V),
        Other(IgnoredAny),
    }

    Ok(match Loose::<T>::deserialize(deserializer)? {
        Loose::Value(value) => Some(value),
        Loose::Other(_) => None,
    })
}

pub(crate) fn skip_malformed<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose<V> {
        Value(V),
        Other(IgnoredAny),
    }

    let items = Option::<Vec<Loose<T>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Loose::Value(value) => Some(value),
            Loose::Other(_) => None,
        })
        .collect())
}

// Non-negative finite numbers only; numeric strings are accepted.
pub(crate) fn rank<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRank {
        Number(f64),
        Text(String),
        Other(IgnoredAny),
    }

    let value = match RawRank::deserialize(deserializer)? {
        RawRank::Number(n) => Some(n),
        RawRank::Text(s) => s.trim().parse::<f64>().ok(),
        RawRank::Other(_) => None,
    };
    Ok(value.filter(|n| n.is_finite() && *n >= 0.0))
}

// Whole-valued floats count as epoch millis.
pub(crate) fn bucket<'de, D>(deserializer: D) -> Result<Option<Bucket>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawBucket {
        Millis(i64),
        Float(f64),
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match RawBucket::deserialize(deserializer)? {
        RawBucket::Millis(ms) => Some(Bucket::Millis(ms)),
        RawBucket::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
            Some(Bucket::Millis(f as i64))
        }
        RawBucket::Float(_) | RawBucket::Other(_) => None,
        RawBucket::Text(text) => Some(Bucket::Text(text)),
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use crate::bucket::Bucket;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Record {
        #[serde(deserialize_with = "super::rank")]
        rank: Option<f64>,
        #[serde(deserialize_with = "super::bucket")]
        bucket: Option<Bucket>,
        #[serde(deserialize_with = "super::or_default")]
        volume: f64,
        #[serde(deserialize_with = "super::skip_malformed")]
        items: Vec<u32>,
    }

    fn record(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn ranks_keep_fractions_and_drop_nonsense() {
        assert_eq!(record(json!({ "rank": 12.5 })).rank, Some(12.5));
        assert_eq!(record(json!({ "rank": 7 })).rank, Some(7.0));
        assert_eq!(record(json!({ "rank": "9" })).rank, Some(9.0));
        assert_eq!(record(json!({ "rank": -3 })).rank, None);
        assert_eq!(record(json!({ "rank": "n/a" })).rank, None);
        assert_eq!(record(json!({ "rank": [1] })).rank, None);
        assert_eq!(record(json!({ "rank": null })).rank, None);
        assert_eq!(record(json!({})).rank, None);
    }

    #[test]
    fn buckets_accept_whole_float_millis() {
        assert_eq!(
            record(json!({ "bucket": 1_709_251_200_000.0 })).bucket,
            Some(Bucket::Millis(1_709_251_200_000))
        );
        assert_eq!(
            record(json!({ "bucket": "2024-03-01" })).bucket,
            Some(Bucket::Text("2024-03-01".to_string()))
        );
        assert_eq!(record(json!({ "bucket": 1.5 })).bucket, None);
        assert_eq!(record(json!({ "bucket": { "ts": 1 } })).bucket, None);
    }

    #[test]
    fn nulls_default_and_bad_list_items_are_dropped() {
        let parsed = record(json!({ "volume": null, "items": [1, "x", null, 3] }));
        assert_eq!(parsed.volume, 0.0);
        assert_eq!(parsed.items, vec![1, 3]);
        assert!(record(json!({ "items": null })).items.is_empty());
    }
}
