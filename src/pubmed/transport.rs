//! Single-request HTTP transport for E-utilities endpoints

use std::fmt;

use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{PubMedError, Result};
use crate::pubmed::params::QueryParameters;

/// ESearch endpoint path
pub const ESEARCH_PATH: &str = "esearch.fcgi";
/// EFetch endpoint path
pub const EFETCH_PATH: &str = "efetch.fcgi";

/// Response format requested through `retmode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Xml,
}

impl OutputFormat {
    pub fn as_api_param(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_param())
    }
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),
    Text(String),
}

impl Payload {
    pub fn into_json(self) -> Result<serde_json::Value> {
        match self {
            Payload::Json(value) => Ok(value),
            Payload::Text(text) => Ok(serde_json::from_str(&text)?),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Payload::Text(text) => text,
            Payload::Json(value) => value.to_string(),
        }
    }
}

/// Issues GET requests against one base URL
///
/// `Transport` does not rate-limit or retry; callers acquire a rate-limit slot
/// right before each [`send`](Self::send).
#[derive(Clone, Debug)]
pub struct Transport {
    client: Client,
    base_url: String,
}

impl Transport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full request URL for `path` with `params` as query string
    pub fn url_for(&self, path: &str, params: &QueryParameters) -> String {
        let mut url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.to_query_string());
        }
        url
    }

    /// Send one GET request
    ///
    /// Sets `retmode` to `format` before sending. JSON responses are decoded into a
    /// [`serde_json::Value`]; any other format is returned as raw text.
    ///
    /// # Errors
    ///
    /// * `PubMedError::Transport` - for any non-2xx status, carrying status and body
    /// * `PubMedError::RequestError` - if the request could not be sent
    /// * `PubMedError::JsonError` - if a JSON body does not parse
    pub async fn send(
        &self,
        path: &str,
        mut params: QueryParameters,
        format: OutputFormat,
    ) -> Result<Payload> {
        params.set("retmode", format);
        let url = self.url_for(path, &params);

        debug!(url = %url, "Making API request");
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "API request failed");
            return Err(PubMedError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        match format {
            OutputFormat::Json => Ok(Payload::Json(serde_json::from_str(&text)?)),
            OutputFormat::Xml => Ok(Payload::Text(text)),
        }
    }
}
