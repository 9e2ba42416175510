use super::*;

fn settings(base_url: &str) -> ClientSettings {
    ClientSettings {
        api_key: "test-key".to_owned(),
        base_url: base_url.to_owned(),
        language: "ko".to_owned(),
        timeout_secs: 5,
        user_agent: "boxfinder-test".to_owned(),
        call_delay: Duration::ZERO,
        page_token_delay: Duration::ZERO,
        backoff: Backoff::new(3, Duration::ZERO),
    }
}

#[test]
fn endpoint_url_appends_to_base_path() {
    let client = PlacesClient::new(
        settings("https://maps.example.com/maps/api/place"),
        ApiCallCounter::new(),
    )
    .unwrap();
    let url = client
        .endpoint_url("textsearch/json", &[("query", "크로스핏 서울")])
        .unwrap();
    assert_eq!(url.path(), "/maps/api/place/textsearch/json");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("query".to_owned(), "크로스핏 서울".to_owned())));
    assert!(pairs.contains(&("language".to_owned(), "ko".to_owned())));
    assert!(pairs.contains(&("key".to_owned(), "test-key".to_owned())));
}

#[test]
fn trailing_slash_is_normalised() {
    let a = PlacesClient::new(settings("https://h.example/p/"), ApiCallCounter::new()).unwrap();
    let b = PlacesClient::new(settings("https://h.example/p"), ApiCallCounter::new()).unwrap();
    assert_eq!(a.base_url, b.base_url);
}

#[test]
fn invalid_base_url_is_rejected() {
    let result = PlacesClient::new(settings("not a url"), ApiCallCounter::new());
    assert!(matches!(result, Err(PlacesError::InvalidBaseUrl { .. })));
}

#[test]
fn over_query_limit_maps_to_quota_exceeded() {
    let err = status_error(ApiStatus::OverQueryLimit, "OVER_QUERY_LIMIT", None);
    assert!(matches!(err, PlacesError::QuotaExceeded));
}

#[test]
fn unknown_status_keeps_raw_value() {
    let err = status_error(
        ApiStatus::parse("REQUEST_DENIED"),
        "REQUEST_DENIED",
        Some("key invalid".to_owned()),
    );
    match err {
        PlacesError::ApiStatus { status, message } => {
            assert_eq!(status, "REQUEST_DENIED");
            assert_eq!(message, "key invalid");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
