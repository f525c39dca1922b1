use std::time::Duration;

pub mod model;
pub mod service;
pub mod session;
pub mod url;

pub use service::Connection;
pub use session::Status;

type Result<T> = std::result::Result<T, Error>;

/// WebSocket close code for an intentional disconnect. Anything else is
/// treated as abnormal and feeds the reconnect policy.
pub const NORMAL_CLOSURE: u16 = 1000;

pub const MAX_RECONNECT_ATTEMPTS: u8 = 5;

pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);

#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    #[error("endpoint has no host: {0}")]
    MissingHost(::url::Url),
    #[error("endpoint scheme is not http(s) or ws(s): {0}")]
    UnsupportedScheme(String),

    _Url(#[from] ::url::ParseError),
}
