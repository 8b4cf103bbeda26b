//! Remote cookiecutter context retrieval.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use portal_spec::{Schema, normalize};

use crate::config::PortalConfig;

/// Asks the contents API for the raw file instead of a base64 envelope.
pub const GITHUB_RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";

const CLIENT_USER_AGENT: &str = concat!("devops-portal/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

/// Anything that can produce the raw cookiecutter context behind a URL.
pub trait ContextFetcher {
    fn fetch(&self, url: &str) -> Result<Value, FetchError>;
}

/// Where a wizard's context document comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ContextSource {
    Github { url: String },
}

impl ContextSource {
    pub fn github(url: impl Into<String>) -> Self {
        Self::Github { url: url.into() }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Github { url } => url,
        }
    }
}

/// GitHub contents API client.
pub struct GithubFetcher {
    client: Client,
    token: Option<String>,
}

impl GithubFetcher {
    pub fn new(config: &PortalConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            token: config.github_token.clone(),
        })
    }

    pub fn request(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url).header(ACCEPT, GITHUB_RAW_MEDIA_TYPE);
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("token {token}")),
            None => request,
        }
    }
}

impl ContextFetcher for GithubFetcher {
    fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        debug!(url, authenticated = self.token.is_some(), "fetching cookiecutter context");
        let response = self
            .request(url)
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        parse_body(&body)
    }
}

pub fn parse_body(body: &str) -> Result<Value, FetchError> {
    serde_json::from_str(body).map_err(FetchError::InvalidJson)
}

/// Fetches the context behind `source` and normalizes it into a schema.
pub fn generate_context(
    source: &ContextSource,
    name: &str,
    label: &str,
    fetcher: &impl ContextFetcher,
) -> Result<Schema, FetchError> {
    let raw = fetcher.fetch(source.url())?;
    Ok(normalize(&raw, name, label))
}
