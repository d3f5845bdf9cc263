//! Stream provider tests
//!
//! Each provider against a mocked upstream: ordering, media types and the
//! outcome taxonomy for every way a lookup can go wrong.

use std::sync::Arc;

use autocast::models::{MediaMetadata, MediaRequest, OutcomeCode};
use autocast::providers::{PrimeboxProvider, PrimenetProvider, StreamProvider};
use mockito::{Matcher, Server};

fn inception() -> (MediaMetadata, Arc<MediaRequest>) {
    let request = MediaRequest::new(Some("Inception".into()), None, Some(2010), None).unwrap();
    let metadata = MediaMetadata {
        confirmed_title: "Inception".to_string(),
        catalog_id: Some(27205),
        external_id: Some("tt1375666".to_string()),
        year: Some(2010),
        ..Default::default()
    };
    (metadata, Arc::new(request))
}

fn mock_primebox_response() -> &'static str {
    r#"{
        "status": "ok",
        "streams": {
            "360P": "https://cdn.example.com/inception_360.mp4",
            "4K": "https://cdn.example.com/inception_4k.mkv?token=abc",
            "1080P": "https://cdn.example.com/inception_1080.m3u8",
            "720P": "https://cdn.example.com/inception_720.mp4"
        }
    }"#
}

// =============================================================================
// Primebox
// =============================================================================

#[tokio::test]
async fn test_primebox_orders_by_quality_preference() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/primebox")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("name".into(), "Inception".into()),
            Matcher::UrlEncoded("fallback_year".into(), "2010".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(mock_primebox_response())
        .create_async()
        .await;

    let provider = PrimeboxProvider::with_base_url(format!("{}/primebox", server.url()));
    let (metadata, request) = inception();
    let search = provider.search_streams(&metadata, &request).await.unwrap();

    mock.assert_async().await;

    assert!(search.outcome.success);
    assert_eq!(search.outcome.streams_found, 4);
    assert_eq!(search.outcome.status, Some(OutcomeCode::Ok));

    let qualities: Vec<&str> = search.candidates.iter().map(|c| c.quality()).collect();
    assert_eq!(qualities, vec!["1080P", "720P", "360P", "4K"]);

    let types: Vec<&str> = search.candidates.iter().map(|c| c.media_type()).collect();
    assert_eq!(types, vec!["m3u8", "mp4", "mp4", "mkv"]);

    // Every candidate carries the provider name and the originating request
    for candidate in &search.candidates {
        assert_eq!(candidate.source(), provider.name());
        assert_eq!(candidate.request().title(), Some("Inception"));
    }
}

#[tokio::test]
async fn test_primebox_omits_year_when_unknown() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/primebox")
        .match_query(Matcher::Exact("name=Blade+Runner".into()))
        .with_status(200)
        .with_body(r#"{"status":"ok","streams":{"720P":"https://cdn.example.com/br.mp4"}}"#)
        .create_async()
        .await;

    let provider = PrimeboxProvider::with_base_url(format!("{}/primebox", server.url()));
    let request = Arc::new(MediaRequest::from_title("Blade Runner").unwrap());
    let metadata = MediaMetadata::titled("Blade Runner");

    let search = provider.search_streams(&metadata, &request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(search.candidates.len(), 1);
}

/// HTTP 429 is a distinct outcome with a back-off advisory
#[tokio::test]
async fn test_primebox_rate_limited() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/primebox")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body("Too Many Requests")
        .create_async()
        .await;

    let provider = PrimeboxProvider::with_base_url(format!("{}/primebox", server.url()));
    let (metadata, request) = inception();
    let search = provider.search_streams(&metadata, &request).await.unwrap();

    assert!(search.candidates.is_empty());
    assert!(!search.outcome.success);
    assert_eq!(search.outcome.streams_found, 0);
    assert_eq!(search.outcome.status, Some(OutcomeCode::Http(429)));
    assert!(search.outcome.message.contains("Rate limited"));

    let details = search.outcome.error_details.unwrap();
    assert!(details.contains("Too Many Requests"));
    assert!(details.to_lowercase().contains("wait"));
}

#[tokio::test]
async fn test_primebox_server_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/primebox")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let provider = PrimeboxProvider::with_base_url(format!("{}/primebox", server.url()));
    let (metadata, request) = inception();
    let search = provider.search_streams(&metadata, &request).await.unwrap();

    assert_eq!(search.outcome.status, Some(OutcomeCode::Http(503)));
    assert_eq!(search.outcome.status.unwrap().to_string(), "HTTP_503");
}

#[tokio::test]
async fn test_primebox_status_not_ok_is_no_results() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/primebox")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"status":"error","message":"title not indexed"}"#)
        .create_async()
        .await;

    let provider = PrimeboxProvider::with_base_url(format!("{}/primebox", server.url()));
    let (metadata, request) = inception();
    let search = provider.search_streams(&metadata, &request).await.unwrap();

    assert!(!search.outcome.success);
    assert_eq!(search.outcome.status, Some(OutcomeCode::NoResults));
    assert!(search.outcome.message.contains("title not indexed"));
}

#[tokio::test]
async fn test_primebox_empty_streams_is_no_results() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/primebox")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"status":"ok","streams":{}}"#)
        .create_async()
        .await;

    let provider = PrimeboxProvider::with_base_url(format!("{}/primebox", server.url()));
    let (metadata, request) = inception();
    let search = provider.search_streams(&metadata, &request).await.unwrap();

    assert_eq!(search.outcome.status, Some(OutcomeCode::NoResults));
    assert_eq!(search.outcome.streams_found, 0);
}

/// A body that isn't JSON is contained as a failed outcome, not an error
#[tokio::test]
async fn test_primebox_malformed_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/primebox")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let provider = PrimeboxProvider::with_base_url(format!("{}/primebox", server.url()));
    let (metadata, request) = inception();
    let search = provider.search_streams(&metadata, &request).await.unwrap();

    assert!(!search.outcome.success);
    assert_eq!(search.outcome.status, Some(OutcomeCode::UnknownError));
    assert!(search.outcome.error_details.unwrap().contains("maintenance"));
}

#[tokio::test]
async fn test_primebox_connection_refused() {
    // Nothing listens on port 1
    let provider = PrimeboxProvider::with_base_url("http://127.0.0.1:1/primebox");
    let (metadata, request) = inception();
    let search = provider.search_streams(&metadata, &request).await.unwrap();

    assert!(!search.outcome.success);
    assert_eq!(search.outcome.status, Some(OutcomeCode::RequestError));
}

// =============================================================================
// Primenet
// =============================================================================

#[tokio::test]
async fn test_primenet_returns_single_hd_stream() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/primenet")
        .match_query(Matcher::UrlEncoded("id".into(), "27205".into()))
        .with_status(200)
        .with_body(r#"{"url":"https://cdn.example.com/27205/master.m3u8"}"#)
        .create_async()
        .await;

    let provider = PrimenetProvider::with_base_url(format!("{}/primenet", server.url()));
    let (metadata, request) = inception();
    let search = provider.search_streams(&metadata, &request).await.unwrap();

    mock.assert_async().await;

    assert!(search.outcome.success);
    assert_eq!(search.outcome.api_name, "Primenet");
    assert_eq!(search.candidates.len(), 1);
    assert_eq!(search.candidates[0].quality(), "HD");
    assert_eq!(search.candidates[0].media_type(), "m3u8");
    assert_eq!(search.candidates[0].source(), "Primenet");
}

/// Without a catalog ID the provider must not touch the network
#[tokio::test]
async fn test_primenet_requires_catalog_id() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/primenet")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let provider = PrimenetProvider::with_base_url(format!("{}/primenet", server.url()));
    let request = Arc::new(MediaRequest::from_title("Inception").unwrap());
    let metadata = MediaMetadata::titled("Inception");

    let search = provider.search_streams(&metadata, &request).await.unwrap();

    mock.assert_async().await;
    assert!(!search.outcome.success);
    assert_eq!(search.outcome.status, Some(OutcomeCode::MissingPrecondition));
    assert_eq!(search.outcome.streams_found, 0);
}

#[tokio::test]
async fn test_primenet_not_found() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/primenet")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":"not found"}"#)
        .create_async()
        .await;

    let provider = PrimenetProvider::with_base_url(format!("{}/primenet", server.url()));
    let (metadata, request) = inception();
    let search = provider.search_streams(&metadata, &request).await.unwrap();

    assert_eq!(search.outcome.status, Some(OutcomeCode::Http(404)));
    assert!(search.outcome.message.contains("27205"));
}

#[tokio::test]
async fn test_primenet_missing_url_is_no_results() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/primenet")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"url":""}"#)
        .create_async()
        .await;

    let provider = PrimenetProvider::with_base_url(format!("{}/primenet", server.url()));
    let (metadata, request) = inception();
    let search = provider.search_streams(&metadata, &request).await.unwrap();

    assert_eq!(search.outcome.status, Some(OutcomeCode::NoResults));
    assert!(search.candidates.is_empty());
}
