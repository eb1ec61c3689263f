//! History-server paging: session establishment and windowed fetches

use std::vec;

use futures_util::{Stream, TryStreamExt, stream};
use tracing::{debug, info, instrument};

use crate::error::{PubMedError, Result};
use crate::pubmed::client::PubMedClient;
use crate::pubmed::decoder::{PubMedRecordDecoder, RecordDecoder};
use crate::pubmed::models::{PubMedRecord, RawRecord};
use crate::pubmed::parser::{first_element_text, scan_records};
use crate::pubmed::session::SessionHandle;
use crate::pubmed::transport::{EFETCH_PATH, ESEARCH_PATH, OutputFormat};
use crate::pubmed::window::{Window, Windows};

/// Decoded records of one fetched window, produced one at a time
///
/// Each call to `next` hands the next raw record node to the decoder. Article
/// records come before book records.
pub struct DecodedRecords<'d, D> {
    raw: vec::IntoIter<RawRecord>,
    decoder: &'d D,
}

impl<D: RecordDecoder> Iterator for DecodedRecords<'_, D> {
    type Item = Result<D::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.raw.next().map(|raw| self.decoder.decode(raw))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<D: RecordDecoder> ExactSizeIterator for DecodedRecords<'_, D> {}

/// Progress of one `query_with` stream
struct QueryCursor<D> {
    query: String,
    max_results: usize,
    decoder: D,
    windows: Windows,
    session: Option<SessionHandle>,
    pending: vec::IntoIter<RawRecord>,
    done: bool,
}

impl PubMedClient {
    /// Run an ESearch that stores its result set on the history server
    ///
    /// Sends one request with `usehistory=y` and `retmax=max_results` and reads the
    /// first `<QueryKey>` and `<WebEnv>` of the XML response. The request itself is
    /// retried on transient transport failures, but a response missing either token
    /// fails immediately.
    ///
    /// # Errors
    ///
    /// * `PubMedError::Protocol` - if the response lacks a query key or WebEnv
    /// * `PubMedError::Transport` - if the service answers with a non-success status
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pubmed_history_client::PubMedClient;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new()?;
    ///     let session = client.establish_session("asthma", 500).await?;
    ///     println!("WebEnv: {}", session.webenv);
    ///     Ok(())
    /// }
    /// ```
    #[instrument(skip(self), fields(query = %query, max_results = max_results))]
    pub async fn establish_session(&self, query: &str, max_results: usize) -> Result<SessionHandle> {
        let params = self
            .params()
            .with("term", query)
            .with("usehistory", "y")
            .with("retmax", max_results);

        let body = self
            .request(ESEARCH_PATH, params, OutputFormat::Xml)
            .await?
            .into_text();

        let query_key = first_element_text(&body, "QueryKey")?
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                PubMedError::Protocol("ESearch response has no QueryKey".to_string())
            })?;
        let webenv = first_element_text(&body, "WebEnv")?
            .filter(|env| !env.is_empty())
            .ok_or_else(|| PubMedError::Protocol("ESearch response has no WebEnv".to_string()))?;

        info!(query_key = %query_key, "History session established");
        Ok(SessionHandle::new(query_key, webenv))
    }

    /// Fetch one window of a stored result set as raw record nodes
    #[instrument(skip(self, session), fields(window = %window))]
    pub(crate) async fn fetch_raw_window(
        &self,
        session: &SessionHandle,
        window: Window,
    ) -> Result<Vec<RawRecord>> {
        let params = self
            .params()
            .with("query_key", &session.query_key)
            .with("WebEnv", &session.webenv)
            .with("retstart", window.start)
            .with("retmax", window.len());

        let body = self
            .request(EFETCH_PATH, params, OutputFormat::Xml)
            .await?
            .into_text();

        let records = scan_records(&body)?;
        debug!(records = records.len(), "Window fetched");
        Ok(records)
    }

    /// Fetch one window of a stored result set and decode it lazily
    ///
    /// Sends a single EFetch with `retstart = window.start` and
    /// `retmax = window.end - window.start`. The returned iterator decodes each
    /// record only when it is pulled.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use pubmed_history_client::{PubMedClient, PubMedRecordDecoder, Window};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new()?;
    ///     let session = client.establish_session("asthma", 100).await?;
    ///
    ///     let window = Window { start: 0, end: 100 };
    ///     for record in client.fetch_window(&session, window, &PubMedRecordDecoder).await? {
    ///         println!("{}", record?.title);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub async fn fetch_window<'d, D: RecordDecoder>(
        &self,
        session: &SessionHandle,
        window: Window,
        decoder: &'d D,
    ) -> Result<DecodedRecords<'d, D>> {
        let raw = self.fetch_raw_window(session, window).await?;
        Ok(DecodedRecords {
            raw: raw.into_iter(),
            decoder,
        })
    }

    /// Stream up to `max_results` records matching `query`
    ///
    /// Records are decoded with [`PubMedRecordDecoder`]. See
    /// [`query_with`](Self::query_with) for paging and error behavior.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use futures_util::StreamExt;
    /// use pubmed_history_client::PubMedClient;
    /// use std::pin::pin;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = PubMedClient::new()?;
    ///
    ///     let mut stream = pin!(client.query("cancer", 5));
    ///     while let Some(record) = stream.next().await {
    ///         let record = record?;
    ///         println!("{}: {}", record.pmid, record.title);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn query<'a>(
        &'a self,
        query: &str,
        max_results: usize,
    ) -> impl Stream<Item = Result<PubMedRecord>> + use<'a> {
        self.query_with(query, max_results, PubMedRecordDecoder)
    }

    /// Stream up to `max_results` records matching `query`, decoded by `decoder`
    ///
    /// Nothing is sent until the stream is first polled. The first poll establishes a
    /// history session, then `[0, max_results)` is fetched in windows of at most
    /// [`MAX_WINDOW_SIZE`](crate::pubmed::MAX_WINDOW_SIZE) records, one window at a
    /// time in ascending order, all with the same session. Only the current window
    /// is held in memory.
    ///
    /// A record that fails to decode is yielded as an `Err` and the stream moves on
    /// to the next record. Any request or response failure is yielded as an `Err`
    /// and ends the stream; records already yielded stay delivered.
    ///
    /// With `max_results == 0` the stream is empty and no request is made.
    pub fn query_with<'a, D>(
        &'a self,
        query: &str,
        max_results: usize,
        decoder: D,
    ) -> impl Stream<Item = Result<D::Record>> + use<'a, D>
    where
        D: RecordDecoder,
    {
        let cursor = QueryCursor {
            query: query.to_string(),
            max_results,
            decoder,
            windows: Windows::new(max_results),
            session: None,
            pending: Vec::new().into_iter(),
            done: false,
        };

        stream::unfold(cursor, move |mut cursor| async move {
            let item = self.next_record(&mut cursor).await?;
            Some((item, cursor))
        })
    }

    /// Collect up to `max_results` records matching `query`
    ///
    /// Stops at the first error, including a record that fails to decode.
    pub async fn query_collect(&self, query: &str, max_results: usize) -> Result<Vec<PubMedRecord>> {
        let records: Vec<PubMedRecord> = self.query(query, max_results).try_collect().await?;
        info!(
            query = %query,
            collected = records.len(),
            "Query completed"
        );
        Ok(records)
    }

    /// Advance a query cursor by one record, fetching the next window when needed
    async fn next_record<D: RecordDecoder>(
        &self,
        cursor: &mut QueryCursor<D>,
    ) -> Option<Result<D::Record>> {
        loop {
            if cursor.done {
                return None;
            }

            if let Some(raw) = cursor.pending.next() {
                return Some(cursor.decoder.decode(raw));
            }

            let Some(window) = cursor.windows.next() else {
                cursor.done = true;
                return None;
            };

            let session = match &cursor.session {
                Some(session) => session.clone(),
                None => match self
                    .establish_session(&cursor.query, cursor.max_results)
                    .await
                {
                    Ok(session) => {
                        cursor.session = Some(session.clone());
                        session
                    }
                    Err(e) => {
                        cursor.done = true;
                        return Some(Err(e));
                    }
                },
            };

            debug!(
                window = %window,
                remaining_windows = cursor.windows.len(),
                "Fetching next window"
            );

            match self.fetch_raw_window(&session, window).await {
                Ok(records) => cursor.pending = records.into_iter(),
                Err(e) => {
                    cursor.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
