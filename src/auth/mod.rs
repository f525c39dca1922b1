pub mod model;
pub mod service;

pub use service::{CredentialProvider, TokenStore};

/// Key of the structured account record in the host's credential store.
pub const ACCOUNT_KEY: &str = "auth_user";

/// Flat fallback keys, tried in order after the account record.
pub const TOKEN_KEYS: [&str; 3] = ["access_token", "token", "jwt"];
