use url::Url;

use super::{Error, Result};

/// Routing namespace the chat endpoint lives under. Only appended when the
/// configured base does not already carry it, so a base like
/// `https://host/ws` is not double-prefixed.
const ROUTING_PREFIX: &str = "ws";

const CHAT_PATH: &str = "chat/";

/// Derive the chat socket URL from the configured API base.
///
/// The document scheme maps 1:1 to the socket scheme (`https` → `wss`,
/// `http` → `ws`), a trailing `/api` segment is stripped, and the token is
/// appended as a query parameter when one is available.
pub fn socket_url(api_base: &Url, token: Option<&str>) -> Result<Url> {
    let scheme = match api_base.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(Error::UnsupportedScheme(other.to_owned())),
    };

    let host = api_base
        .host_str()
        .ok_or_else(|| Error::MissingHost(api_base.clone()))?;
    let port = api_base
        .port()
        .map(|p| format!(":{p}"))
        .unwrap_or_default();

    let mut path = api_base.path().trim_end_matches('/').to_owned();
    if let Some(stripped) = path.strip_suffix("/api") {
        path = stripped.to_owned();
    }
    if !path.split('/').any(|segment| segment == ROUTING_PREFIX) {
        path.push('/');
        path.push_str(ROUTING_PREFIX);
    }
    path.push('/');
    path.push_str(CHAT_PATH);

    let mut url = Url::parse(&format!("{scheme}://{host}{port}{path}"))?;
    if let Some(token) = token {
        url.query_pairs_mut().append_pair("token", token);
    }

    Ok(url)
}
