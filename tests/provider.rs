//! Exercises the real HTTP client against a local mock of the WHOIS provider.

use serde_json::json;
use std::time::Duration;
use tokio_test::assert_ok;
use whois_lookup_api::{
    config::Config,
    provider::{WhoisProvider, WhoisXmlClient},
    LookupError,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SERVICE_PATH: &str = "/whoisserver/WhoisService";

fn client_for(server: &MockServer, timeout_seconds: u64) -> WhoisXmlClient {
    let config = Config {
        whois_api_url: format!("{}{}", server.uri(), SERVICE_PATH),
        whois_timeout_seconds: timeout_seconds,
        ..Config::default()
    };
    assert_ok!(WhoisXmlClient::new(&config))
}

async fn server_replying(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SERVICE_PATH))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn sends_expected_query_and_parses_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SERVICE_PATH))
        .and(query_param("apiKey", "test-key"))
        .and(query_param("domainName", "example.com"))
        .and(query_param("outputFormat", "JSON"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "WhoisRecord": { "domainName": "example.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 5);
    let response = assert_ok!(client.fetch_whois("example.com", "test-key").await);
    assert_eq!(response.record().unwrap()["domainName"], "example.com");
}

#[tokio::test]
async fn status_codes_map_to_error_kinds() {
    let server = server_replying(ResponseTemplate::new(429)).await;
    let result = client_for(&server, 5).fetch_whois("example.com", "k").await;
    assert!(matches!(result, Err(LookupError::RateLimited)));

    let server = server_replying(ResponseTemplate::new(401)).await;
    let result = client_for(&server, 5).fetch_whois("example.com", "k").await;
    assert!(matches!(result, Err(LookupError::Authentication)));

    let server = server_replying(ResponseTemplate::new(403)).await;
    let result = client_for(&server, 5).fetch_whois("example.com", "k").await;
    assert!(matches!(result, Err(LookupError::QuotaExceeded)));

    let server = server_replying(ResponseTemplate::new(404)).await;
    let result = client_for(&server, 5).fetch_whois("example.com", "k").await;
    assert!(matches!(result, Err(LookupError::NoDataFound(_))));

    let server = server_replying(ResponseTemplate::new(503)).await;
    let result = client_for(&server, 5).fetch_whois("example.com", "k").await;
    assert!(matches!(result, Err(LookupError::Upstream(_))));
}

#[tokio::test]
async fn unparseable_body_is_invalid_response() {
    let server = server_replying(ResponseTemplate::new(200).set_body_string("")).await;
    let result = client_for(&server, 5).fetch_whois("example.com", "k").await;
    assert!(matches!(result, Err(LookupError::InvalidResponse)));

    let server = server_replying(ResponseTemplate::new(200).set_body_string("<html></html>")).await;
    let result = client_for(&server, 5).fetch_whois("example.com", "k").await;
    assert!(matches!(result, Err(LookupError::InvalidResponse)));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let server = server_replying(
        ResponseTemplate::new(200)
            .set_body_json(json!({ "WhoisRecord": {} }))
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let result = client_for(&server, 1).fetch_whois("example.com", "k").await;
    assert!(matches!(result, Err(LookupError::Timeout)));
}

#[tokio::test]
async fn refused_connection_is_connection_error() {
    // Grab a free port, then close it so nothing is listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = Config {
        whois_api_url: format!("http://{}{}", addr, SERVICE_PATH),
        whois_timeout_seconds: 5,
        ..Config::default()
    };
    let client = assert_ok!(WhoisXmlClient::new(&config));

    let result = client.fetch_whois("example.com", "k").await;
    assert!(matches!(result, Err(LookupError::Connection)), "got {:?}", result.err());
}
