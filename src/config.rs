//! Client configuration
//!
//! [`ClientConfig`] carries everything a [`PubMedClient`](crate::PubMedClient) needs:
//! the identifying parameters NCBI asks for on every request, the rate ceiling,
//! the retry policy and HTTP settings.

use std::time::Duration;

use reqwest::Url;

use crate::error::{PubMedError, Result};
use crate::pubmed::params::QueryParameters;
use crate::rate_limit::RateLimiter;
use crate::retry::RetryConfig;

/// Default E-utilities endpoint
pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Tool name sent when none is configured
pub const DEFAULT_TOOL: &str = "pubmed-history-client";

/// Configuration for the PubMed history client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// NCBI API key, raises the default rate ceiling to 10 requests/second
    pub api_key: Option<String>,
    /// Contact email, kindly requested by NCBI
    pub email: Option<String>,
    /// Tool name, kindly requested by NCBI
    pub tool: Option<String>,
    /// Target Entrez database
    pub database: String,
    /// Explicit rate ceiling in requests per second
    pub rate_limit: Option<u32>,
    /// Override for the E-utilities base URL (used by tests and mirrors)
    pub base_url: Option<String>,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Custom User-Agent header
    pub user_agent: Option<String>,
    /// Retry policy for transient failures
    pub retry_config: RetryConfig,
    /// Deadline for a single wait on the rate limiter
    pub max_rate_wait: Option<Duration>,
}

impl ClientConfig {
    /// Create a configuration with NCBI defaults
    ///
    /// # Example
    ///
    /// ```
    /// use pubmed_history_client::ClientConfig;
    ///
    /// let config = ClientConfig::new()
    ///     .with_api_key("your_api_key_here")
    ///     .with_email("researcher@university.edu")
    ///     .with_tool("MyResearchTool");
    ///
    /// assert_eq!(config.effective_rate_limit(), 10);
    /// ```
    pub fn new() -> Self {
        Self {
            api_key: None,
            email: None,
            tool: None,
            database: "pubmed".to_string(),
            rate_limit: None,
            base_url: None,
            timeout: Duration::from_secs(30),
            user_agent: None,
            retry_config: RetryConfig::default(),
            max_rate_wait: None,
        }
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_tool<S: Into<String>>(mut self, tool: S) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_database<S: Into<String>>(mut self, database: S) -> Self {
        self.database = database.into();
        self
    }

    /// Set the rate ceiling (requests per trailing second)
    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Bound how long a single request may wait for a rate-limit slot
    pub fn with_max_rate_wait(mut self, max_rate_wait: Duration) -> Self {
        self.max_rate_wait = Some(max_rate_wait);
        self
    }

    /// Rate ceiling in effect: explicit value, else 10 with an API key, else 3
    pub fn effective_rate_limit(&self) -> u32 {
        self.rate_limit.unwrap_or_else(|| {
            if self.api_key.is_some() { 10 } else { 3 }
        })
    }

    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("{}/{}", DEFAULT_TOOL, env!("CARGO_PKG_VERSION")))
    }

    pub fn effective_tool(&self) -> &str {
        self.tool.as_deref().unwrap_or(DEFAULT_TOOL)
    }

    /// Parameters sent on every request: `tool`, `email`, `db` and the optional `api_key`
    pub fn build_api_params(&self) -> QueryParameters {
        let mut params = QueryParameters::new();
        params.set("tool", self.effective_tool());
        if let Some(email) = &self.email {
            params.set("email", email);
        }
        params.set("db", &self.database);
        if let Some(api_key) = &self.api_key {
            params.set("api_key", api_key);
        }
        params
    }

    /// Check the configuration, reporting the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.effective_rate_limit() == 0 {
            return Err(PubMedError::Configuration(
                "rate limit must be at least 1 request per second".to_string(),
            ));
        }

        if self.database.trim().is_empty() {
            return Err(PubMedError::Configuration(
                "database name cannot be empty".to_string(),
            ));
        }

        let base_url = self.effective_base_url();
        let parsed = Url::parse(base_url).map_err(|e| {
            PubMedError::Configuration(format!("invalid base URL {}: {}", base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(PubMedError::Configuration(format!(
                "base URL must be http(s) with a host: {}",
                base_url
            )));
        }

        Ok(())
    }

    pub fn create_rate_limiter(&self) -> Result<RateLimiter> {
        RateLimiter::new(self.effective_rate_limit())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
