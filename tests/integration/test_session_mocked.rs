//! Integration tests for history session establishment and single-window fetches

mod common;

use pubmed_history_client::{PubMedError, PubMedRecordDecoder, SessionHandle, Window};
use tracing_test::traced_test;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{article_xml, book_xml, create_mock_client, efetch_document, history_search_response};

#[tokio::test]
#[traced_test]
async fn test_establish_session_returns_tokens() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("term", "asthma"))
        .and(query_param("usehistory", "y"))
        .and(query_param("retmax", "250"))
        .and(query_param("retmode", "xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(history_search_response(
            1234,
            "3",
            "MCID_session_token",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let session = client.establish_session("asthma", 250).await.unwrap();

    assert_eq!(session, SessionHandle::new("3", "MCID_session_token"));
}

#[tokio::test]
#[traced_test]
async fn test_first_token_occurrence_wins() {
    let mock_server = MockServer::start().await;

    let body = r#"<eSearchResult>
        <Count>2</Count>
        <QueryKey>1</QueryKey>
        <WebEnv>MCID_first</WebEnv>
        <QueryKey>9</QueryKey>
        <WebEnv>MCID_second</WebEnv>
    </eSearchResult>"#;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let session = client.establish_session("asthma", 2).await.unwrap();

    assert_eq!(session.query_key, "1");
    assert_eq!(session.webenv, "MCID_first");
}

#[tokio::test]
#[traced_test]
async fn test_missing_webenv_is_protocol_error() {
    let mock_server = MockServer::start().await;

    let body = r#"<eSearchResult><Count>0</Count><QueryKey>1</QueryKey></eSearchResult>"#;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let result = client.establish_session("asthma", 10).await;

    match result {
        Err(PubMedError::Protocol(message)) => assert!(message.contains("WebEnv")),
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
#[traced_test]
async fn test_service_error_payload_is_protocol_error() {
    let mock_server = MockServer::start().await;

    let body = r#"<eSearchResult><ERROR>Invalid query syntax</ERROR></eSearchResult>"#;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let result = client.establish_session("((", 10).await;

    assert!(matches!(result, Err(PubMedError::Protocol(_))));
}

#[tokio::test]
#[traced_test]
async fn test_fetch_window_passes_session_unchanged() {
    let mock_server = MockServer::start().await;
    let webenv = "MCID_with+special/chars";

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("query_key", "7"))
        .and(query_param("WebEnv", webenv))
        .and(query_param("retstart", "300"))
        .and(query_param("retmax", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_string(efetch_document(&[
            book_xml("61", "A book"),
            article_xml("62", "An article"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let session = SessionHandle::new("7", webenv);
    let window = Window {
        start: 300,
        end: 500,
    };

    let records = client
        .fetch_window(&session, window, &PubMedRecordDecoder)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);

    let pmids: Vec<String> = records.map(|r| r.unwrap().pmid).collect();
    assert_eq!(pmids, vec!["62", "61"]);
}

#[tokio::test]
#[traced_test]
async fn test_fetch_window_error_document_is_protocol_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<eFetchResult><ERROR>Unable to obtain query #1</ERROR></eFetchResult>",
        ))
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server);
    let session = SessionHandle::new("1", "MCID_expired");
    let result = client
        .fetch_window(&session, Window { start: 0, end: 10 }, &PubMedRecordDecoder)
        .await;

    assert!(matches!(result, Err(PubMedError::Protocol(_))));
}
