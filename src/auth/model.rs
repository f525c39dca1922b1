use serde::Deserialize;

use crate::user;

/// The persisted account record some hosts keep under [`super::ACCOUNT_KEY`].
///
/// Only the fields the messaging core needs are deserialized; the record
/// usually carries a full profile alongside them.
#[derive(Clone, Debug, Deserialize)]
pub struct StoredAccount {
    #[serde(default)]
    pub id: Option<user::Id>,
    #[serde(default)]
    pub token: Option<String>,
}
