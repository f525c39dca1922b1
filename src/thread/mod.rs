use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::user;

pub mod api;
pub mod model;
pub mod service;

pub use api::ThreadApi;
pub use service::Inbox;

type Result<T> = std::result::Result<T, Error>;

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
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        user::deserialize_flexible_i64(deserializer).map(Id)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Non-2xx response, or a transport failure normalized to status 500.
    #[error("{user_message}")]
    Api {
        status: u16,
        errors: Value,
        user_message: String,
    },
    /// Raised before any I/O when no usable token is stored.
    #[error("authentication required")]
    MissingToken,
    #[error("invalid response format")]
    InvalidResponse,

    #[error(transparent)]
    _Url(#[from] url::ParseError),
}

impl Error {
    /// The display-ready description for this failure.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
