//! Media websocket URL derivation
//!
//! The answer instructions must point Vonage at a `ws(s)://` URL it can reach. The URL is
//! built from the configured public base URL, or from the request `Host` header when no
//! public URL is configured.

use thiserror::Error;
use url::Url;

/// Path the media websocket is served on.
pub const MEDIA_SOCKET_PATH: &str = "/ws";

/// Errors that can occur while deriving the media socket URL
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL must have a host")]
    MissingHost,

    #[error("Invalid Host header: {0}")]
    InvalidHostHeader(String),
}

/// Builds the media websocket URL announced in the answer instructions.
///
/// `http`/`https` base URLs become `ws`/`wss`; any base path is kept as a prefix. Without a
/// public URL the request host is used over `wss`, since Vonage only reaches public
/// endpoints through TLS-terminating ingress.
pub fn media_socket_url(
    public_url: Option<&str>,
    host_header: Option<&str>,
) -> Result<String, UrlValidationError> {
    match public_url {
        Some(public_url) => from_public_url(public_url),
        None => from_host_header(host_header.ok_or(UrlValidationError::MissingHost)?),
    }
}

fn from_public_url(public_url: &str) -> Result<String, UrlValidationError> {
    let mut url = Url::parse(public_url)?;
    if url.host_str().is_none() {
        return Err(UrlValidationError::MissingHost);
    }

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(UrlValidationError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| UrlValidationError::UnsupportedScheme(scheme.to_string()))?;

    let path = format!("{}{}", url.path().trim_end_matches('/'), MEDIA_SOCKET_PATH);
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

fn from_host_header(host: &str) -> Result<String, UrlValidationError> {
    let host = host.trim();
    if host.is_empty()
        || host
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@'))
    {
        return Err(UrlValidationError::InvalidHostHeader(host.to_string()));
    }

    let url = Url::parse(&format!("wss://{host}{MEDIA_SOCKET_PATH}"))
        .map_err(|_| UrlValidationError::InvalidHostHeader(host.to_string()))?;
    Ok(url.to_string())
}
