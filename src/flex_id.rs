use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An identifier that remote services send as either a number or a string.
/// Riven returns item ids as integers and TMDB ids as strings; TMDB itself
/// uses integers. Comparisons go through the canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FlexId {
    Number(i64),
    Text(String),
    #[default]
    Missing,
}

impl FlexId {
    /// Canonical string form, `None` for missing or blank ids
    pub fn canonical(&self) -> Option<String> {
        match self {
            FlexId::Number(n) => Some(n.to_string()),
            FlexId::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            FlexId::Missing => None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.canonical().is_some()
    }

    /// True when both sides are present and equal in canonical form
    pub fn same_as(&self, other: &FlexId) -> bool {
        match (self.canonical(), other.canonical()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Compare against a plain string id ("tt0111161", "603")
    pub fn matches_str(&self, other: &str) -> bool {
        self.same_as(&FlexId::from(other))
    }
}

impl From<i64> for FlexId {
    fn from(n: i64) -> Self {
        FlexId::Number(n)
    }
}

impl From<&str> for FlexId {
    fn from(s: &str) -> Self {
        FlexId::Text(s.to_string())
    }
}

impl From<String> for FlexId {
    fn from(s: String) -> Self {
        FlexId::Text(s)
    }
}

impl fmt::Display for FlexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlexId::Number(n) => write!(f, "{}", n),
            FlexId::Text(s) => write!(f, "{}", s),
            FlexId::Missing => write!(f, "N/A"),
        }
    }
}

impl Serialize for FlexId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FlexId::Number(n) => serializer.serialize_i64(*n),
            FlexId::Text(s) => serializer.serialize_str(s),
            FlexId::Missing => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for FlexId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct FlexIdVisitor;

        impl<'de> Visitor<'de> for FlexIdVisitor {
            type Value = FlexId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer id, a string id, or null")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<FlexId, E> {
                Ok(FlexId::Number(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<FlexId, E> {
                i64::try_from(v)
                    .map(FlexId::Number)
                    .or_else(|_| Ok(FlexId::Text(v.to_string())))
            }

            // Ids are never fractional; keep the text so nothing is lost
            fn visit_f64<E: de::Error>(self, v: f64) -> Result<FlexId, E> {
                Ok(FlexId::Text(v.to_string()))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FlexId, E> {
                Ok(FlexId::Text(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<FlexId, E> {
                Ok(FlexId::Text(v))
            }

            fn visit_none<E: de::Error>(self) -> Result<FlexId, E> {
                Ok(FlexId::Missing)
            }

            fn visit_unit<E: de::Error>(self) -> Result<FlexId, E> {
                Ok(FlexId::Missing)
            }

            fn visit_some<D2>(self, deserializer: D2) -> Result<FlexId, D2::Error>
            where
                D2: Deserializer<'de>,
            {
                FlexId::deserialize(deserializer)
            }
        }

        deserializer.deserialize_any(FlexIdVisitor)
    }
}

/// Deserialize a rating that may arrive as a number, a string, or null
pub fn deserialize_rating<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
