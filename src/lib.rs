//! # PubMed History Client
//!
//! A Rust client for retrieving large PubMed result sets through the NCBI
//! E-utilities history server. A query is run once with ESearch, which stores the
//! result set on the server, then paged through with EFetch in windows of at most
//! 10,000 records.
//!
//! ## Features
//!
//! - **Windowed paging**: one history session per query, windows fetched in order
//! - **Streaming**: records are decoded and yielded one at a time
//! - **Rate limiting**: a shared sliding-window limiter keeps requests under the
//!   NCBI ceiling (3/s, or 10/s with an API key)
//! - **Pluggable decoding**: any [`RecordDecoder`] can turn raw record nodes into records
//! - **Retry**: transient server errors are retried with exponential backoff
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use pubmed_history_client::{ClientConfig, PubMedClient};
//! use std::pin::pin;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new()
//!         .with_email("researcher@university.edu")
//!         .with_tool("MyResearchTool");
//!     let client = PubMedClient::with_config(config)?;
//!
//!     let total = client.total_results_count("cancer").await?;
//!     println!("{} matching records", total);
//!
//!     let mut records = pin!(client.query("cancer", 25_000));
//!     while let Some(record) = records.next().await {
//!         let record = record?;
//!         println!("{}: {}", record.pmid, record.title);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Custom decoders
//!
//! ```no_run
//! use futures_util::TryStreamExt;
//! use pubmed_history_client::{PubMedClient, RawRecord, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = PubMedClient::new()?;
//!
//!     // Keep the raw XML of every record
//!     let decoder = |raw: RawRecord| -> Result<String> { Ok(raw.xml) };
//!     let nodes: Vec<String> = client.query_with("asthma", 100, decoder).try_collect().await?;
//!
//!     println!("{} records", nodes.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod pubmed;
pub mod rate_limit;
pub mod retry;

// Re-export main types for convenience
pub use config::ClientConfig;
pub use error::{PubMedError, Result};
pub use pubmed::{
    DecodedRecords, MAX_WINDOW_SIZE, PubMedClient, PubMedRecord, PubMedRecordDecoder, RawRecord,
    RecordDecoder, RecordKind, SessionHandle, Window, Windows,
};
pub use rate_limit::RateLimiter;
pub use retry::RetryConfig;
