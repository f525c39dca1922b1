use std::fmt::Display;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Canonical participant identity.
///
/// The backend is not consistent about id encoding: depending on the
/// endpoint, participant and sender ids arrive as JSON numbers or as numeric
/// strings. Every id is normalized to an `i64` here, at the deserialization
/// boundary, so the rest of the crate compares ids with plain `==`.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(pub i64);

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Id {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_flexible_i64(deserializer).map(Id)
    }
}

pub(crate) fn deserialize_flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlexibleI64;

    impl Visitor<'_> for FlexibleI64 {
        type Value = i64;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("an integer or a numeric string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::custom("id out of range"))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            if v.fract() == 0.0 {
                Ok(v as i64)
            } else {
                Err(E::custom("id is not an integer"))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.trim().parse().map_err(|_| E::custom("id is not numeric"))
        }
    }

    deserializer.deserialize_any(FlexibleI64)
}
