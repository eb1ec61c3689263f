mod history;
mod search;

pub use history::DecodedRecords;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::error::{PubMedError, Result};
use crate::pubmed::params::QueryParameters;
use crate::pubmed::responses::ESearchResult;
use crate::pubmed::transport::{ESEARCH_PATH, OutputFormat, Payload, Transport};
use crate::rate_limit::RateLimiter;
use crate::retry::with_retry;

/// Client for paging through PubMed search results
///
/// Every request goes through one shared [`RateLimiter`]; clones of a client
/// share the limiter, the HTTP connection pool and the cancellation token.
#[derive(Clone)]
pub struct PubMedClient {
    transport: Transport,
    rate_limiter: RateLimiter,
    default_params: QueryParameters,
    config: ClientConfig,
    cancel: CancellationToken,
}

impl PubMedClient {
    /// Create a new PubMed client with default configuration
    ///
    /// Uses default NCBI rate limiting (3 requests/second) and no API key.
    ///
    /// # Example
    ///
    /// ```
    /// use pubmed_history_client::PubMedClient;
    ///
    /// let client = PubMedClient::new().unwrap();
    /// ```
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::new())
    }

    /// Create a new PubMed client with custom configuration
    ///
    /// # Errors
    ///
    /// * `PubMedError::Configuration` - if the configuration does not validate
    /// * `PubMedError::RequestError` - if the HTTP client cannot be built
    ///
    /// # Example
    ///
    /// ```
    /// use pubmed_history_client::{ClientConfig, PubMedClient};
    ///
    /// let config = ClientConfig::new()
    ///     .with_api_key("your_api_key_here")
    ///     .with_email("researcher@university.edu");
    ///
    /// let client = PubMedClient::with_config(config).unwrap();
    /// ```
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.effective_user_agent())
            .timeout(config.timeout)
            .build()?;

        Self::with_client(client, config)
    }

    /// Create a new PubMed client around an existing reqwest client
    ///
    /// The `timeout` and `user_agent` settings of `config` are not applied; they
    /// belong to the given client.
    pub fn with_client(client: Client, config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let rate_limiter = config.create_rate_limiter()?;
        let transport = Transport::new(client, config.effective_base_url());
        let default_params = config.build_api_params();

        Ok(Self {
            transport,
            rate_limiter,
            default_params,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Get a reference to the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get a reference to the rate limiter
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Token that aborts pending rate-limit waits of this client and its clones
    ///
    /// Cancelling it makes every later request fail with `PubMedError::Cancelled`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fresh copy of the parameters sent on every request
    pub(crate) fn params(&self) -> QueryParameters {
        self.default_params.clone()
    }

    /// Get the total number of results matching a query
    ///
    /// Sends one ESearch request with `retmax=1` and returns the `count` reported by
    /// the service, without fetching any records.
    ///
    /// # Errors
    ///
    /// * `PubMedError::Transport` - if the service answers with a non-success status
    /// * `PubMedError::Protocol` - if the response carries an error or no count
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pubmed_history_client::PubMedClient;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new()?;
    ///     let total = client.total_results_count("cancer").await?;
    ///     println!("{} matching records", total);
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self), fields(query = %query))]
    pub async fn total_results_count(&self, query: &str) -> Result<usize> {
        let params = self.params().with("term", query).with("retmax", 1);

        let value = self
            .request(ESEARCH_PATH, params, OutputFormat::Json)
            .await?
            .into_json()?;
        let search_result: ESearchResult = serde_json::from_value(value)?;

        if let Some(error_msg) = &search_result.esearchresult.error {
            return Err(PubMedError::Protocol(format!(
                "NCBI ESearch API error: {}",
                error_msg
            )));
        }

        let total = search_result.esearchresult.total_count().ok_or_else(|| {
            PubMedError::Protocol("ESearch response has no count".to_string())
        })?;

        info!(total_count = total, "Result count retrieved");
        Ok(total)
    }

    /// Send one request: acquire a rate-limit slot, then hand off to the transport
    ///
    /// Transient failures are retried according to the configured retry policy;
    /// each attempt takes its own rate-limit slot.
    pub(crate) async fn request(
        &self,
        path: &str,
        params: QueryParameters,
        format: OutputFormat,
    ) -> Result<Payload> {
        with_retry(
            || {
                let params = params.clone();
                async move {
                    self.rate_limiter
                        .acquire_with(self.config.max_rate_wait, &self.cancel)
                        .await?;
                    debug!(path = path, "Rate limit slot acquired, sending");
                    self.transport.send(path, params, format).await
                }
            },
            &self.config.retry_config,
            path,
        )
        .await
    }
}
