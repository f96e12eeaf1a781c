//! Retrieval of remote requirements files.
//!
//! The parser never touches the network itself: include directives that name
//! a URL are resolved through a [`Fetch`] implementation supplied by the
//! caller. [`HttpFetcher`] is the production implementation, [`NoFetch`]
//! refuses every URL.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::consts::APP_NAME;

/// Errors that can occur while fetching a remote requirements file.
#[derive(Debug, Error)]
pub enum FetchError {
  /// Remote includes are not available in this context.
  #[error("fetching '{0}' is not supported here")]
  Unsupported(String),

  /// The HTTP client could not be built.
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  /// The request failed before a response was received.
  #[error("failed to fetch '{url}': {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  /// The server answered with a non-success status.
  #[error("failed to fetch '{url}': HTTP {status}")]
  Status { url: String, status: u16 },

  /// A `file://` URL could not be read.
  #[error("failed to read '{}': {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The URL could not be interpreted.
  #[error("invalid URL '{0}'")]
  InvalidUrl(String),
}

/// Something that can turn a URL into text content.
pub trait Fetch {
  fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

impl<F> Fetch for F
where
  F: Fn(&str) -> Result<String, FetchError>,
{
  fn fetch(&self, url: &str) -> Result<String, FetchError> {
    self(url)
  }
}

/// A fetcher that rejects every URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFetch;

impl Fetch for NoFetch {
  fn fetch(&self, url: &str) -> Result<String, FetchError> {
    Err(FetchError::Unsupported(url.to_string()))
  }
}

/// Blocking HTTP(S) fetcher; `file://` URLs are read from disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  client: reqwest::blocking::Client,
}

impl HttpFetcher {
  /// Default timeout applied to every request.
  pub const TIMEOUT: Duration = Duration::from_secs(30);

  pub fn new() -> Result<Self, FetchError> {
    let client = reqwest::blocking::Client::builder()
      .timeout(Self::TIMEOUT)
      .user_agent(format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(FetchError::Client)?;
    Ok(Self { client })
  }
}

impl Fetch for HttpFetcher {
  fn fetch(&self, url: &str) -> Result<String, FetchError> {
    let parsed = url::Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

    if parsed.scheme() == "file" {
      let path = parsed
        .to_file_path()
        .map_err(|()| FetchError::InvalidUrl(url.to_string()))?;
      debug!(path = %path.display(), "reading file URL");
      return fs::read_to_string(&path).map_err(|source| FetchError::Read { path, source });
    }

    debug!(url, "fetching remote requirements file");
    let response = self.client.get(parsed).send().map_err(|source| FetchError::Request {
      url: url.to_string(),
      source,
    })?;

    if !response.status().is_success() {
      return Err(FetchError::Status {
        url: url.to_string(),
        status: response.status().as_u16(),
      });
    }

    response.text().map_err(|source| FetchError::Request {
      url: url.to_string(),
      source,
    })
  }
}
