//! Integration tests for the windowed history query using mocked HTTP responses
//!
//! A mock ESearch hands out a fixed session, and mock EFetch endpoints answer per
//! window, so these tests check exactly which requests the client sends.

mod common;

use futures_util::{StreamExt, TryStreamExt};
use pubmed_history_client::{PubMedError, RawRecord, RecordKind, Result};
use std::pin::pin;
use tracing_test::traced_test;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{
    TEST_QUERY_KEY, TEST_WEBENV, article_xml, book_xml, create_mock_client, efetch_document,
    history_search_response,
};

async fn mount_history_search(mock_server: &MockServer, max_results: usize) {
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("usehistory", "y"))
        .and(query_param("retmax", max_results.to_string()))
        .and(query_param("retmode", "xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(history_search_response(
            max_results,
            TEST_QUERY_KEY,
            TEST_WEBENV,
        )))
        .expect(1)
        .mount(mock_server)
        .await;
}

async fn mount_window(mock_server: &MockServer, retstart: usize, retmax: usize, body: String) {
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("query_key", TEST_QUERY_KEY))
        .and(query_param("WebEnv", TEST_WEBENV))
        .and(query_param("retstart", retstart.to_string()))
        .and(query_param("retmax", retmax.to_string()))
        .and(query_param("retmode", "xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(mock_server)
        .await;
}

/// Query parameter value of a received request
fn param(request: &wiremock::Request, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
#[traced_test]
async fn test_small_query_sends_one_search_and_one_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("term", "cancer"))
        .and(query_param("usehistory", "y"))
        .and(query_param("retmax", "5"))
        .and(query_param("db", "pubmed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(history_search_response(
            5,
            TEST_QUERY_KEY,
            TEST_WEBENV,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let nodes: Vec<String> = (1..=5)
        .map(|i| article_xml(&format!("1000{}", i), &format!("Cancer study {}", i)))
        .collect();
    mount_window(&mock_server, 0, 5, efetch_document(&nodes)).await;

    let client = create_mock_client(&mock_server);
    let records = client.query_collect("cancer", 5).await.unwrap();

    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.kind == RecordKind::Article));
    assert_eq!(records[0].pmid, "10001");
    assert_eq!(records[0].title, "Cancer study 1");
    assert_eq!(records[0].source.as_deref(), Some("Journal of Testing"));
    assert_eq!(records[0].doi.as_deref(), Some("10.1000/test.10001"));
    assert_eq!(records[4].pmid, "10005");

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
#[traced_test]
async fn test_large_query_fetches_windows_in_order_with_one_session() {
    let mock_server = MockServer::start().await;
    mount_history_search(&mock_server, 25_000).await;

    mount_window(&mock_server, 0, 10_000, efetch_document(&[article_xml("1", "first")])).await;
    mount_window(&mock_server, 10_000, 10_000, efetch_document(&[article_xml("2", "second")]))
        .await;
    mount_window(&mock_server, 20_000, 5_000, efetch_document(&[article_xml("3", "third")])).await;

    let client = create_mock_client(&mock_server);
    let records = client.query_collect("cancer", 25_000).await.unwrap();

    let pmids: Vec<&str> = records.iter().map(|r| r.pmid.as_str()).collect();
    assert_eq!(pmids, vec!["1", "2", "3"]);

    let requests = mock_server.received_requests().await.unwrap();
    let fetches: Vec<&wiremock::Request> = requests
        .iter()
        .filter(|r| r.url.path() == "/efetch.fcgi")
        .collect();
    assert_eq!(fetches.len(), 3);

    let starts: Vec<String> = fetches
        .iter()
        .filter_map(|r| param(r, "retstart"))
        .collect();
    assert_eq!(starts, vec!["0", "10000", "20000"]);

    for fetch in &fetches {
        assert_eq!(param(fetch, "WebEnv").as_deref(), Some(TEST_WEBENV));
        assert_eq!(param(fetch, "query_key").as_deref(), Some(TEST_QUERY_KEY));
    }
}

#[tokio::test]
#[traced_test]
async fn test_windows_cover_ranges_beyond_twenty_thousand() {
    let mock_server = MockServer::start().await;
    mount_history_search(&mock_server, 45_000).await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(efetch_document(&[article_xml("7", "x")])),
        )
        .expect(5)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let records = client.query_collect("cancer", 45_000).await.unwrap();
    assert_eq!(records.len(), 5);

    let requests = mock_server.received_requests().await.unwrap();
    let last = requests
        .iter()
        .filter(|r| r.url.path() == "/efetch.fcgi")
        .last()
        .unwrap();
    assert_eq!(param(last, "retstart").as_deref(), Some("40000"));
    assert_eq!(param(last, "retmax").as_deref(), Some("5000"));
}

#[tokio::test]
#[traced_test]
async fn test_articles_precede_books_within_a_window() {
    let mock_server = MockServer::start().await;
    mount_history_search(&mock_server, 4).await;

    let document = efetch_document(&[
        book_xml("501", "Book one"),
        article_xml("502", "Article one"),
        book_xml("503", "Book two"),
        article_xml("504", "Article two"),
    ]);
    mount_window(&mock_server, 0, 4, document).await;

    let client = create_mock_client(&mock_server);
    let records = client.query_collect("mixed", 4).await.unwrap();

    let order: Vec<(&str, RecordKind)> = records.iter().map(|r| (r.pmid.as_str(), r.kind)).collect();
    assert_eq!(
        order,
        vec![
            ("502", RecordKind::Article),
            ("504", RecordKind::Article),
            ("501", RecordKind::Book),
            ("503", RecordKind::Book),
        ]
    );
    assert_eq!(records[2].title, "Book one");
    assert_eq!(records[2].source.as_deref(), Some("Test Press"));
}

#[tokio::test]
#[traced_test]
async fn test_zero_max_results_sends_no_requests() {
    let mock_server = MockServer::start().await;
    let client = create_mock_client(&mock_server);

    let records = client.query_collect("cancer", 0).await.unwrap();
    assert!(records.is_empty());

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_stream_is_lazy_until_polled() {
    let mock_server = MockServer::start().await;
    mount_history_search(&mock_server, 2).await;
    mount_window(
        &mock_server,
        0,
        2,
        efetch_document(&[article_xml("11", "a"), article_xml("12", "b")]),
    )
    .await;

    let client = create_mock_client(&mock_server);
    let mut stream = pin!(client.query("cancer", 2));

    assert!(mock_server.received_requests().await.unwrap().is_empty());

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.pmid, "11");
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);

    let second = stream.next().await.unwrap().unwrap();
    assert_eq!(second.pmid, "12");
    assert!(stream.next().await.is_none());
}

#[tokio::test]
#[traced_test]
async fn test_decode_failure_is_yielded_and_stream_continues() {
    let mock_server = MockServer::start().await;
    mount_history_search(&mock_server, 2).await;

    let broken = "<PubmedArticle><MedlineCitation><Article><ArticleTitle>No id</ArticleTitle></Article></MedlineCitation></PubmedArticle>".to_string();
    mount_window(
        &mock_server,
        0,
        2,
        efetch_document(&[broken, article_xml("21", "ok")]),
    )
    .await;

    let client = create_mock_client(&mock_server);
    let results: Vec<Result<_>> = client.query("cancer", 2).collect().await;

    assert_eq!(results.len(), 2);
    assert!(matches!(
        results[0],
        Err(PubMedError::Decode {
            kind: RecordKind::Article,
            ..
        })
    ));
    assert_eq!(results[1].as_ref().unwrap().pmid, "21");
}

#[tokio::test]
#[traced_test]
async fn test_failed_window_ends_stream_after_earlier_records() {
    let mock_server = MockServer::start().await;
    mount_history_search(&mock_server, 30_000).await;

    mount_window(&mock_server, 0, 10_000, efetch_document(&[article_xml("31", "kept")])).await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("retstart", "10000"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("retstart", "20000"))
        .respond_with(ResponseTemplate::new(200).set_body_string(efetch_document(&[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let results: Vec<Result<_>> = client.query("cancer", 30_000).collect().await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().pmid, "31");
    assert!(matches!(
        results[1],
        Err(PubMedError::Transport { status: 404, .. })
    ));
}

#[tokio::test]
#[traced_test]
async fn test_window_past_result_count_is_empty() {
    let mock_server = MockServer::start().await;
    mount_history_search(&mock_server, 15_000).await;

    mount_window(&mock_server, 0, 10_000, efetch_document(&[article_xml("51", "only")])).await;
    mount_window(
        &mock_server,
        10_000,
        5_000,
        r#"<?xml version="1.0" encoding="UTF-8" ?>
<eFetchResult>
    <ERROR>Empty result - nothing to do</ERROR>
</eFetchResult>"#
            .to_string(),
    )
    .await;

    let client = create_mock_client(&mock_server);
    let records = client.query_collect("rare disease", 15_000).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].pmid, "51");
}

#[tokio::test]
#[traced_test]
async fn test_expired_session_error_ends_stream() {
    let mock_server = MockServer::start().await;
    mount_history_search(&mock_server, 3).await;
    mount_window(
        &mock_server,
        0,
        3,
        "<eFetchResult><ERROR>Unable to obtain query #1</ERROR></eFetchResult>".to_string(),
    )
    .await;

    let client = create_mock_client(&mock_server);
    let result = client.query_collect("cancer", 3).await;

    assert!(matches!(result, Err(PubMedError::Protocol(_))));
}

#[tokio::test]
#[traced_test]
async fn test_query_with_custom_decoder() {
    let mock_server = MockServer::start().await;
    mount_history_search(&mock_server, 2).await;
    mount_window(
        &mock_server,
        0,
        2,
        efetch_document(&[book_xml("41", "b"), article_xml("42", "a")]),
    )
    .await;

    let client = create_mock_client(&mock_server);
    let decoder = |raw: RawRecord| -> Result<(RecordKind, usize)> { Ok((raw.kind, raw.xml.len())) };
    let decoded: Vec<(RecordKind, usize)> = client
        .query_with("cancer", 2, decoder)
        .try_collect()
        .await
        .unwrap();

    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[0].0, RecordKind::Article);
    assert_eq!(decoded[1].0, RecordKind::Book);
    assert!(decoded.iter().all(|(_, len)| *len > 0));
}
