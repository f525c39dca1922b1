use log::warn;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::auth::CredentialProvider;
use crate::message::model::Message;

use super::model::Thread;
use super::{Error, Id, Result};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub message: String,
    pub data: Vec<Thread>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Deserialize)]
pub struct ThreadResponse {
    #[serde(default)]
    pub message: String,
    pub data: Thread,
}

#[derive(Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<Id>,
    pub data: Vec<Message>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Outcome of a create call; the server answers 200 for a pre-existing
/// thread between the pair and 201 for a fresh one.
#[derive(Debug)]
pub struct Created {
    pub status: u16,
    pub thread: Thread,
}

impl Created {
    pub fn pre_existing(&self) -> bool {
        self.status == 200
    }
}

/// Stateless wrapper over the thread REST endpoints. No caching, no
/// retries; the token is resolved per call and its absence fails before
/// any I/O.
#[derive(Clone)]
pub struct ThreadApi {
    http: reqwest::Client,
    base: Url,
    credentials: CredentialProvider,
}

impl ThreadApi {
    pub fn new(http: reqwest::Client, api_base: Url, credentials: CredentialProvider) -> Self {
        let mut base = api_base;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Self {
            http,
            base,
            credentials,
        }
    }
}

impl ThreadApi {
    /// Threads as the server orders them; sorting is the caller's job.
    pub async fn list(&self) -> Result<Vec<Thread>> {
        let token = self.token()?;
        let url = self.base.join("threads/")?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        parse_body::<ListResponse>(response).await.map(|r| r.data)
    }

    pub async fn create(&self, client_id: i64) -> Result<Created> {
        let token = self.token()?;
        let url = self.base.join("threads/")?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "client_id": client_id }))
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        let body = parse_body::<ThreadResponse>(response).await?;

        Ok(Created {
            status,
            thread: body.data,
        })
    }

    /// One history page, newest-first as the server serves it. Limits are
    /// clamped before the query string is built.
    pub async fn messages(&self, thread_id: Id, limit: i64, offset: i64) -> Result<MessagePage> {
        let token = self.token()?;
        let (limit, offset) = clamp_page(limit, offset);

        let mut url = self.base.join(&format!("threads/{thread_id}/messages/"))?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        parse_body::<MessagePage>(response).await
    }
}

impl ThreadApi {
    fn token(&self) -> Result<String> {
        self.credentials.bearer_token().ok_or(Error::MissingToken)
    }
}

/// Clamp pagination input to what the server accepts: `limit` in
/// `[1, MAX_PAGE_SIZE]`, `offset` non-negative.
pub fn clamp_page(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
}

async fn parse_body<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(transport)?;

    if !(200..300).contains(&status) {
        let errors: Value = serde_json::from_str(&body).unwrap_or_else(|_| json!({}));
        let user_message = user_message(status, &errors);
        return Err(Error::Api {
            status,
            errors,
            user_message,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        warn!("response body did not match the expected shape: {e}");
        Error::InvalidResponse
    })
}

fn transport(e: reqwest::Error) -> Error {
    warn!("request failed before a response arrived: {e}");
    Error::Api {
        status: 500,
        errors: json!({}),
        user_message: "Could not reach the server. Please try again.".to_owned(),
    }
}

fn user_message(status: u16, errors: &Value) -> String {
    let detail = errors
        .get("detail")
        .or_else(|| errors.get("message"))
        .or_else(|| errors.get("error"))
        .and_then(Value::as_str);

    let message = match status {
        401 => "Authentication required. Please sign in again.",
        403 => detail.unwrap_or("You do not have permission to do that."),
        404 => detail.unwrap_or("The requested conversation was not found."),
        400 => detail.unwrap_or("The request was invalid."),
        _ => detail.unwrap_or("Something went wrong. Please try again."),
    };

    message.to_owned()
}
