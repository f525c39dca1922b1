use std::sync::Arc;

use log::debug;

use super::model::StoredAccount;
use super::{ACCOUNT_KEY, TOKEN_KEYS};

/// String key-value lookup over whatever persistence the host app has.
///
/// Injected into both the REST client and the connection manager so the
/// messaging core never touches ambient global state.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl TokenStore for std::collections::HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        std::collections::HashMap::get(self, key).cloned()
    }
}

#[derive(Clone)]
pub struct CredentialProvider {
    store: Arc<dyn TokenStore>,
}

impl CredentialProvider {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }
}

impl CredentialProvider {
    /// Resolve the bearer token: the structured account record first, then
    /// the flat fallback keys in a fixed order.
    pub fn bearer_token(&self) -> Option<String> {
        if let Some(raw) = self.store.get(ACCOUNT_KEY) {
            match serde_json::from_str::<StoredAccount>(&raw) {
                Ok(account) => {
                    if let Some(token) = account.token.as_deref().and_then(sanitize_token) {
                        return Some(token);
                    }
                }
                Err(e) => debug!("stored account record is not valid JSON: {e}"),
            }
        }

        TOKEN_KEYS
            .iter()
            .find_map(|key| self.store.get(key).as_deref().and_then(sanitize_token))
    }
}

/// A usable token is a trimmed non-empty string that is not a serialized
/// null/undefined literal and does not look like a JSON document.
pub fn sanitize_token(raw: &str) -> Option<String> {
    let token = raw.trim();
    if token.is_empty()
        || token == "null"
        || token == "undefined"
        || token.starts_with('{')
        || token.starts_with('[')
    {
        return None;
    }
    Some(token.to_owned())
}
