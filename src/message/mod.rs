use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod model;
pub mod service;

pub use service::Conversation;

/// Message identity as the server sends it.
///
/// Integer ids are the norm and the only kind eligible for read-receipt
/// batching; anything else (string, fractional) is kept verbatim so dedup
/// still works, but never enters a `read` frame.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Id {
    Int(i64),
    Other(Value),
}

impl Id {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Id::Int(id) => Some(*id),
            Id::Other(_) => None,
        }
    }
}

impl From<i64> for Id {
    fn from(id: i64) -> Self {
        Id::Int(id)
    }
}
