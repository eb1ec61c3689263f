//! Id-list searches and fetches by explicit PMID

use tracing::{debug, info, instrument};

use crate::error::{PubMedError, Result};
use crate::pubmed::client::PubMedClient;
use crate::pubmed::decoder::{PubMedRecordDecoder, RecordDecoder};
use crate::pubmed::models::PubMedRecord;
use crate::pubmed::parser::scan_records;
use crate::pubmed::responses::ESearchResult;
use crate::pubmed::transport::{EFETCH_PATH, ESEARCH_PATH, OutputFormat};

/// Largest `retmax` ESearch accepts for an id list
const ESEARCH_PAGE_SIZE: usize = 50_000;

/// NCBI recommends batches of up to 200 IDs per EFetch request
const FETCH_BATCH_SIZE: usize = 200;

impl PubMedClient {
    /// Get the PMIDs matching a query
    ///
    /// Pages through the JSON ESearch id list, at most 50,000 ids per request, until
    /// `max_results` ids were collected or the reported count is exhausted. `None`
    /// retrieves every matching id.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pubmed_history_client::PubMedClient;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new()?;
    ///     let pmids = client.article_ids("crispr off-target", Some(20)).await?;
    ///     println!("{:?}", pmids);
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self), fields(query = %query, max_results = ?max_results))]
    pub async fn article_ids(&self, query: &str, max_results: Option<usize>) -> Result<Vec<String>> {
        let mut ids: Vec<String> = Vec::new();

        loop {
            let wanted = match max_results {
                Some(max) => max.saturating_sub(ids.len()),
                None => ESEARCH_PAGE_SIZE,
            };
            if wanted == 0 {
                break;
            }

            let params = self
                .params()
                .with("term", query)
                .with("retstart", ids.len())
                .with("retmax", wanted.min(ESEARCH_PAGE_SIZE));

            let value = self
                .request(ESEARCH_PATH, params, OutputFormat::Json)
                .await?
                .into_json()?;
            let search_result: ESearchResult = serde_json::from_value(value)?;
            let data = search_result.esearchresult;

            if let Some(error_msg) = data.error {
                return Err(PubMedError::Protocol(format!(
                    "NCBI ESearch API error: {}",
                    error_msg
                )));
            }

            let total = data.total_count().ok_or_else(|| {
                PubMedError::Protocol("ESearch response has no count".to_string())
            })?;

            let received = data.idlist.len();
            ids.extend(data.idlist);
            debug!(received, collected = ids.len(), total, "ESearch page received");

            if received == 0 || ids.len() >= total {
                break;
            }
        }

        if let Some(max) = max_results {
            ids.truncate(max);
        }

        info!(ids_found = ids.len(), "Id search completed");
        Ok(ids)
    }

    /// Fetch and decode records by PMID
    ///
    /// Ids are sent in batches of 200. Within each batch, articles come before books.
    /// An empty slice returns immediately without any request.
    ///
    /// # Errors
    ///
    /// * `PubMedError::InvalidPmid` - if any id is not a positive integer
    /// * `PubMedError::Decode` - if a returned record cannot be decoded
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pubmed_history_client::PubMedClient;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new()?;
    ///     let records = client.fetch_by_ids(&["31978945", "33515491"]).await?;
    ///     for record in &records {
    ///         println!("{}: {}", record.pmid, record.title);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self), fields(pmids_count = pmids.len()))]
    pub async fn fetch_by_ids(&self, pmids: &[&str]) -> Result<Vec<PubMedRecord>> {
        if pmids.is_empty() {
            return Ok(Vec::new());
        }

        let validated: Vec<u64> = pmids
            .iter()
            .map(|pmid| parse_pmid(pmid))
            .collect::<Result<Vec<_>>>()?;

        let decoder = PubMedRecordDecoder;
        let mut records = Vec::with_capacity(validated.len());

        for chunk in validated.chunks(FETCH_BATCH_SIZE) {
            let id_list = chunk
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");

            let params = self.params().with("id", id_list);
            let body = self
                .request(EFETCH_PATH, params, OutputFormat::Xml)
                .await?
                .into_text();

            if body.trim().is_empty() {
                continue;
            }

            let raw = scan_records(&body)?;
            let parsed = raw.len();
            for record in raw {
                records.push(decoder.decode(record)?);
            }

            info!(requested = chunk.len(), parsed, "Batch fetch completed");
        }

        Ok(records)
    }
}

fn parse_pmid(pmid: &str) -> Result<u64> {
    let trimmed = pmid.trim();
    match trimmed.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(PubMedError::InvalidPmid {
            pmid: pmid.to_string(),
        }),
    }
}
