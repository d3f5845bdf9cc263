//! TMDB API client tests
//!
//! Metadata resolution against a mocked TMDB: IMDb lookup, title search,
//! detail parsing, authentication and error handling.

use autocast::api::{MetadataResolver, TmdbClient, TmdbError};
use autocast::config::TmdbAuth;
use autocast::models::MediaRequest;
use mockito::{Matcher, Server};

fn api_key() -> TmdbAuth {
    TmdbAuth::ApiKey("test_key".to_string())
}

fn inception_detail() -> &'static str {
    r#"{
        "id": 27205,
        "title": "Inception",
        "release_date": "2010-07-15",
        "runtime": 148,
        "overview": "Cobb steals secrets from the subconscious.",
        "poster_path": "/9gk7adHYeDvHkCSEqAvQNLV5Uge.jpg",
        "genres": [
            {"id": 28, "name": "Action"},
            {"id": 878, "name": "Science Fiction"}
        ],
        "credits": {
            "cast": [
                {"name": "Leonardo DiCaprio"},
                {"name": "Joseph Gordon-Levitt"},
                {"name": "Elliot Page"},
                {"name": "Tom Hardy"},
                {"name": "Ken Watanabe"},
                {"name": "Cillian Murphy"}
            ],
            "crew": [
                {"name": "Christopher Nolan", "job": "Director"},
                {"name": "Hans Zimmer", "job": "Original Music Composer"}
            ]
        },
        "external_ids": {"imdb_id": "tt1375666"}
    }"#
}

async fn mock_detail(server: &mut Server) -> mockito::Mock {
    server
        .mock("GET", "/movie/27205")
        .match_query(Matcher::UrlEncoded(
            "append_to_response".into(),
            "credits,external_ids".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(inception_detail())
        .create_async()
        .await
}

// =============================================================================
// Resolution Tests
// =============================================================================

/// An IMDb ID is looked up directly; no title search happens
#[tokio::test]
async fn test_resolve_by_imdb_id() {
    let mut server = Server::new_async().await;

    let find = server
        .mock("GET", "/find/tt1375666")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("external_source".into(), "imdb_id".into()),
            Matcher::UrlEncoded("api_key".into(), "test_key".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"movie_results":[{"id":27205}],"tv_results":[]}"#)
        .create_async()
        .await;
    let search = server
        .mock("GET", "/search/movie")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let detail = mock_detail(&mut server).await;

    let client = TmdbClient::with_base_url(api_key(), server.url());
    let request = MediaRequest::new(None, Some("tt1375666".into()), None, None).unwrap();
    let metadata = client.resolve(&request).await.unwrap().unwrap();

    find.assert_async().await;
    search.assert_async().await;
    detail.assert_async().await;

    assert_eq!(metadata.confirmed_title, "Inception");
    assert_eq!(metadata.catalog_id, Some(27205));
    assert_eq!(metadata.external_id.as_deref(), Some("tt1375666"));
    assert_eq!(metadata.year, Some(2010));
    assert_eq!(metadata.runtime.as_deref(), Some("2h 28m"));
    assert_eq!(metadata.director.as_deref(), Some("Christopher Nolan"));
    assert_eq!(metadata.genre.as_deref(), Some("Action, Science Fiction"));
    assert_eq!(
        metadata.actors.as_deref(),
        Some("Leonardo DiCaprio, Joseph Gordon-Levitt, Elliot Page, Tom Hardy, Ken Watanabe")
    );
    assert_eq!(
        metadata.poster_url.as_deref(),
        Some("https://image.tmdb.org/t/p/w500/9gk7adHYeDvHkCSEqAvQNLV5Uge.jpg")
    );
}

#[tokio::test]
async fn test_resolve_by_title_and_year() {
    let mut server = Server::new_async().await;

    let search = server
        .mock("GET", "/search/movie")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), "Inception".into()),
            Matcher::UrlEncoded("year".into(), "2010".into()),
            Matcher::UrlEncoded("include_adult".into(), "false".into()),
            Matcher::UrlEncoded("api_key".into(), "test_key".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"page":1,"results":[{"id":27205},{"id":64956}]}"#)
        .create_async()
        .await;
    let detail = mock_detail(&mut server).await;

    let client = TmdbClient::with_base_url(api_key(), server.url());
    let request = MediaRequest::new(Some("Inception".into()), None, Some(2010), None).unwrap();
    let metadata = client.resolve(&request).await.unwrap().unwrap();

    search.assert_async().await;
    detail.assert_async().await;
    assert_eq!(metadata.catalog_id, Some(27205));
}

/// An IMDb ID the catalog doesn't know falls back to the title
#[tokio::test]
async fn test_resolve_falls_back_to_title() {
    let mut server = Server::new_async().await;

    let find = server
        .mock("GET", "/find/tt0000001")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"movie_results":[]}"#)
        .create_async()
        .await;
    let search = server
        .mock("GET", "/search/movie")
        .match_query(Matcher::UrlEncoded("query".into(), "Inception".into()))
        .with_status(200)
        .with_body(r#"{"results":[{"id":27205}]}"#)
        .create_async()
        .await;
    let _detail = mock_detail(&mut server).await;

    let client = TmdbClient::with_base_url(api_key(), server.url());
    let request = MediaRequest::new(
        Some("Inception".into()),
        Some("tt0000001".into()),
        None,
        None,
    )
    .unwrap();
    let metadata = client.resolve(&request).await.unwrap().unwrap();

    find.assert_async().await;
    search.assert_async().await;
    assert_eq!(metadata.confirmed_title, "Inception");
}

#[tokio::test]
async fn test_resolve_nothing_found() {
    let mut server = Server::new_async().await;

    let _search = server
        .mock("GET", "/search/movie")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"page":1,"results":[]}"#)
        .create_async()
        .await;
    let detail = server
        .mock("GET", Matcher::Regex(r"^/movie/".into()))
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url(api_key(), server.url());
    let request = MediaRequest::from_title("Nonexistent Film 9999").unwrap();

    assert!(client.resolve(&request).await.unwrap().is_none());
    detail.assert_async().await;
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_bearer_token_sent_as_header() {
    let mut server = Server::new_async().await;

    let search = server
        .mock("GET", "/search/movie")
        .match_header("authorization", "Bearer token")
        .match_query(Matcher::UrlEncoded("query".into(), "Inception".into()))
        .with_status(200)
        .with_body(r#"{"results":[{"id":27205}]}"#)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url(TmdbAuth::Bearer("token".into()), server.url());
    let id = client.search_movie("Inception", None).await.unwrap();

    search.assert_async().await;
    assert_eq!(id, Some(27205));
}

// =============================================================================
// Error Handling
// =============================================================================

/// Persistent 429s are retried, then reported as rate limiting
#[tokio::test]
async fn test_rate_limit_retries_then_fails() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/search/movie")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_header("Retry-After", "0")
        .expect(3)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url(api_key(), server.url());
    let result = client.search_movie("Inception", None).await;

    mock.assert_async().await;
    assert!(matches!(result, Err(TmdbError::RateLimited)));
}

#[tokio::test]
async fn test_detail_server_error() {
    let mut server = Server::new_async().await;

    let _search = server
        .mock("GET", "/search/movie")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"results":[{"id":27205}]}"#)
        .create_async()
        .await;
    let _detail = server
        .mock("GET", "/movie/27205")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = TmdbClient::with_base_url(api_key(), server.url());

    let err = client.movie_detail(27205).await.unwrap_err();
    assert!(matches!(err, TmdbError::ServerError(500)));

    let request = MediaRequest::from_title("Inception").unwrap();
    assert!(client.resolve(&request).await.is_err());
}

#[tokio::test]
async fn test_invalid_json() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/search/movie")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let client = TmdbClient::with_base_url(api_key(), server.url());
    let err = client.search_movie("Inception", None).await.unwrap_err();
    assert!(matches!(err, TmdbError::InvalidResponse(_)));
}
