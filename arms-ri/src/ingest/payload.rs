//! Parsing gateway payloads
//!
//! The parser emits two JSON documents: an array of per-student result
//! records and a scheme array whose first element maps subject codes to
//! reference metadata. Numeric fields arrive as numbers, numeric strings or
//! not at all, so they are coerced leniently (anything unreadable counts as 0).

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// One student's extracted results for one semester
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResultRecord {
    pub enrollment: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub sid: Option<String>,
    #[serde(rename = "schemeID", default, deserialize_with = "lenient::opt_string")]
    pub scheme_id: Option<String>,
    #[serde(default)]
    pub institute: Institute,
    #[serde(deserialize_with = "lenient::string")]
    pub batch: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub prg_code: Option<String>,
    pub programme: String,
    pub result_header: ResultHeader,
    /// Raw subject key → marks, in document order
    #[serde(default)]
    pub subjects: OrderedMap<RawSubjectMarks>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institute {
    #[serde(default, deserialize_with = "lenient::opt_integer")]
    pub inst_code: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultHeader {
    #[serde(deserialize_with = "lenient::count")]
    pub sem: u32,
}

/// Marks observed for one subject, before normalization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSubjectMarks {
    #[serde(default, deserialize_with = "lenient::number")]
    pub internal: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub external: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub total: f64,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub total_grade: Option<String>,
}

/// One element of the scheme payload
#[derive(Debug, Clone, Deserialize)]
pub struct SchemeDocument {
    #[serde(default)]
    pub subjects: OrderedMap<SchemeSubject>,
}

/// Reference metadata for one subject of a scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeSubject {
    #[serde(rename = "paperID", default, deserialize_with = "lenient::string")]
    pub paper_id: String,
    #[serde(rename = "paperName", default, deserialize_with = "lenient::string")]
    pub paper_name: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub credits: u32,
    #[serde(rename = "maxMarks", default = "default_max_marks", deserialize_with = "lenient::max_marks")]
    pub max_marks: u32,
    #[serde(rename = "type", default, deserialize_with = "lenient::opt_string")]
    pub kind: Option<String>,
}

fn default_max_marks() -> u32 {
    lenient::DEFAULT_MAX_MARKS
}

/// JSON object kept as an ordered list of entries
///
/// Subject order in a semester follows the extracted document, so objects are
/// read entry by entry instead of into a hash map.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, V)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    // Repeated keys keep their first position, last value wins
                    match entries.iter_mut().find(|(k, _)| *k == key) {
                        Some(entry) => entry.1 = value,
                        None => entries.push((key, value)),
                    }
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Coerce a loosely typed JSON value to a number (unreadable → 0)
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };

    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// `deserialize_with` helpers for loosely typed parser output
pub(crate) mod lenient {
    use super::coerce_number;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Max marks assumed when the scheme omits them (or reports 0)
    pub const DEFAULT_MAX_MARKS: u32 = 100;

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(coerce_number(&value))
    }

    /// Non-negative integer (credits, semester numbers)
    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(to_count(coerce_number(&value)))
    }

    pub fn max_marks<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match to_count(coerce_number(&value)) {
            0 => Ok(DEFAULT_MAX_MARKS),
            n => Ok(n),
        }
    }

    pub fn opt_integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Null => None,
            other => Some(coerce_number(&other) as i64),
        })
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(to_text(value).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(to_text(value))
    }

    fn to_text(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    fn to_count(n: f64) -> u32 {
        if n <= 0.0 {
            0
        } else {
            n.min(f64::from(u32::MAX)) as u32
        }
    }
}
