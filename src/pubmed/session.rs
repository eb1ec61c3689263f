//! History server session handles

use serde::{Deserialize, Serialize};

/// Token pair naming a result set stored on the NCBI history server
///
/// Returned by an ESearch with `usehistory=y` and passed unchanged as
/// `query_key`/`WebEnv` on every EFetch that pages through the same result set.
/// A handle belongs to exactly one query; the client establishes a fresh one per
/// [`query`](crate::PubMedClient::query) call and never persists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub query_key: String,
    pub webenv: String,
}

impl SessionHandle {
    pub fn new(query_key: impl Into<String>, webenv: impl Into<String>) -> Self {
        Self {
            query_key: query_key.into(),
            webenv: webenv.into(),
        }
    }
}
