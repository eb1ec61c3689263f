//! PubMed client for paging through search results via the history server
//!
//! The client functionality is split across focused modules under [`client`]:
//! - `client/mod.rs` - Core client struct, constructors, request plumbing, result counts
//! - `client/history` - Session establishment, windowed fetches, the streaming query
//! - `client/search` - Plain id-list search and fetch-by-id

pub mod client;
pub mod decoder;
pub mod models;
pub mod params;
pub mod parser;
pub(crate) mod responses;
pub mod session;
pub mod transport;
pub mod window;

// Re-export public types
pub use client::{DecodedRecords, PubMedClient};
pub use decoder::{PubMedRecordDecoder, RecordDecoder};
pub use models::{PubMedRecord, RawRecord, RecordKind};
pub use params::QueryParameters;
pub use session::SessionHandle;
pub use transport::{OutputFormat, Payload, Transport};
pub use window::{MAX_WINDOW_SIZE, Window, Windows};
