use std::path::PathBuf;
use ratesweep_client::{Client, ClientConfig, IdentityPaths, Scheme};
use ratesweep_common::{ConfigError, ServiceEndpoints, WorkloadError};
use uuid::Uuid;

const COL_UID: &str = "6f1c5f4e-6a37-4b0e-9d4a-2f3b1c0a9e11";
const SEC_UID: &str = "0b8e7d6c-5a4f-4e3d-8c2b-1a0f9e8d7c6b";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn test_identity() -> IdentityPaths {
    IdentityPaths { cert: fixture("client.crt"), key: fixture("client.key") }
}

// Helper: both services served by the same mockito server, plain http.
fn mock_config(server_url: &str, identity: Option<IdentityPaths>) -> ClientConfig {
    let addr = server_url.trim_start_matches("http://").to_string();
    ClientConfig {
        endpoints: ServiceEndpoints { acs_addr: addr.clone(), ss_addr: addr },
        tls: false,
        identity,
    }
}

// Helper: a client for URL tests that never connect.
fn remote_client() -> Client {
    Client::new(ClientConfig {
        endpoints: ServiceEndpoints::from_base("example.net"),
        tls: true,
        identity: None,
    })
    .unwrap()
}

#[test]
fn test_api_urls() {
    let client = remote_client();
    assert_eq!(client.acs_api_url(), "https://acs.example.net/api/v1/");
    assert_eq!(client.ss_api_url(), "https://ss.example.net/api/v1/");
}

#[test]
fn test_api_urls_without_tls() {
    let client = Client::new(ClientConfig {
        endpoints: ServiceEndpoints::from_base("example.net"),
        tls: false,
        identity: None,
    })
    .unwrap();
    assert_eq!(client.acs_api_url(), "http://acs.example.net/api/v1/");
}

#[test]
fn test_site_urls_follow_requested_scheme() {
    let client = remote_client();
    assert_eq!(client.acs_site_url(Scheme::Http), "http://acs.example.net/");
    assert_eq!(client.acs_site_url(Scheme::Https), "https://acs.example.net/");
    assert_eq!(client.ss_site_url(Scheme::Http), "http://ss.example.net/");
    assert_eq!(client.ss_site_url(Scheme::Https), "https://ss.example.net/");
}

#[test]
fn test_authorization_urls() {
    let client = remote_client();
    assert_eq!(client.authorizations_url(), "https://acs.example.net/api/v1/authorizations/");
    assert_eq!(
        client.authorization_url("abc"),
        "https://acs.example.net/api/v1/authorizations/abc/"
    );
}

#[test]
fn test_secret_url() {
    let client = remote_client();
    let col: Uuid = COL_UID.parse().unwrap();
    let sec: Uuid = SEC_UID.parse().unwrap();
    assert_eq!(
        client.secret_url(&col, &sec),
        format!("https://ss.example.net/api/v1/collections/{COL_UID}/secrets/{SEC_UID}/versions/latest/")
    );
}

#[test]
fn test_missing_identity_file_is_config_error() {
    let result = Client::new(ClientConfig {
        endpoints: ServiceEndpoints::default(),
        tls: true,
        identity: Some(IdentityPaths { cert: fixture("absent.crt"), key: fixture("client.key") }),
    });
    assert!(matches!(result, Err(ConfigError::Io { path, .. }) if path.ends_with("absent.crt")));
}

#[test]
fn test_garbage_identity_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let cert = dir.path().join("bad.crt");
    let key = dir.path().join("bad.key");
    std::fs::write(&cert, "not a certificate").unwrap();
    std::fs::write(&key, "not a key").unwrap();

    let result = Client::new(ClientConfig {
        endpoints: ServiceEndpoints::default(),
        tls: true,
        identity: Some(IdentityPaths { cert, key }),
    });
    assert!(matches!(result, Err(ConfigError::InvalidIdentity(_))));
}

#[tokio::test]
async fn test_probe_succeeds_on_200() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("GET", "/api/v1/").with_status(200).expect(2).create_async().await;

    let client = Client::new(mock_config(&server.url(), None)).unwrap();
    client.acs_api_root().await.unwrap();
    client.ss_api_root().await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_probe_maps_status_to_http_error() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/").with_status(503).create_async().await;

    let client = Client::new(mock_config(&server.url(), None)).unwrap();
    let result = client.ss_site_root(Scheme::Http).await;

    assert_eq!(result, Err(WorkloadError::HttpError(503, "Service Unavailable".to_string())));
}

#[tokio::test]
async fn test_probe_maps_connection_failure_to_network_error() {
    // Bind then drop a listener so nothing is accepting on the port.
    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let client = Client::new(mock_config(&format!("http://127.0.0.1:{port}"), None)).unwrap();

    assert!(matches!(client.acs_api_root().await, Err(WorkloadError::NetworkError(_))));
}

#[tokio::test]
async fn test_cert_probe_without_identity_fails() {
    let client = remote_client();
    assert_eq!(client.acs_api_root_with_cert().await, Err(WorkloadError::MissingIdentity));
}

#[tokio::test]
async fn test_cert_probe_with_identity() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("GET", "/api/v1/").with_status(200).create_async().await;

    let client = Client::new(mock_config(&server.url(), Some(test_identity()))).unwrap();
    client.acs_api_root_with_cert().await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_authorization_returns_first_uid() {
    let mut server = mockito::Server::new_async().await;
    let col: Uuid = COL_UID.parse().unwrap();
    let mock = server
        .mock("POST", "/api/v1/authorizations/")
        .match_body(mockito::Matcher::JsonString(format!(
            r#"{{"objperm":"read","objtype":"collection","objuid":"{COL_UID}"}}"#
        )))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"authorizations":["auth-1"]}"#)
        .create_async()
        .await;

    let client = Client::new(mock_config(&server.url(), Some(test_identity()))).unwrap();
    let uid = client.create_authorization("read", "collection", Some(&col)).await.unwrap();

    assert_eq!(uid, "auth-1");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_authorization_without_object_sends_empty_uid() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/authorizations/")
        .match_body(mockito::Matcher::JsonString(
            r#"{"objperm":"create","objtype":"storageserver","objuid":""}"#.to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"authorizations":["auth-2"]}"#)
        .create_async()
        .await;

    let client = Client::new(mock_config(&server.url(), Some(test_identity()))).unwrap();
    let uid = client.create_authorization("create", "storageserver", None).await.unwrap();

    assert_eq!(uid, "auth-2");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_authorization_empty_list_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/v1/authorizations/")
        .with_status(200)
        .with_body(r#"{"authorizations":[]}"#)
        .create_async()
        .await;

    let client = Client::new(mock_config(&server.url(), Some(test_identity()))).unwrap();
    let result = client.create_authorization("create", "storageserver", None).await;

    assert!(matches!(result, Err(WorkloadError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_create_authorization_rejected() {
    let mut server = mockito::Server::new_async().await;
    server.mock("POST", "/api/v1/authorizations/").with_status(401).create_async().await;

    let client = Client::new(mock_config(&server.url(), Some(test_identity()))).unwrap();
    let result = client.create_authorization("create", "storageserver", None).await;

    assert!(matches!(result, Err(WorkloadError::HttpError(401, _))));
}

#[tokio::test]
async fn test_authorization_token() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/authorizations/auth-1/")
        .with_status(200)
        .with_body(r#"{"token":"tok-xyz","status":"approved"}"#)
        .create_async()
        .await;

    let client = Client::new(mock_config(&server.url(), Some(test_identity()))).unwrap();
    assert_eq!(client.authorization_token("auth-1").await.unwrap(), "tok-xyz");
}

#[tokio::test]
async fn test_authorization_token_missing_field() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/authorizations/auth-1/")
        .with_status(200)
        .with_body(r#"{"status":"pending"}"#)
        .create_async()
        .await;

    let client = Client::new(mock_config(&server.url(), Some(test_identity()))).unwrap();
    let result = client.authorization_token("auth-1").await;

    assert!(matches!(result, Err(WorkloadError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_secret_data_sends_token_header() {
    let mut server = mockito::Server::new_async().await;
    let path = format!("/api/v1/collections/{COL_UID}/secrets/{SEC_UID}/versions/latest/");
    let mock = server
        .mock("GET", path.as_str())
        .match_header("tutamen-tokens", "tok-xyz")
        .with_status(200)
        .with_body(r#"{"data":"hunter2"}"#)
        .create_async()
        .await;

    let client = Client::new(mock_config(&server.url(), None)).unwrap();
    let data = client
        .secret_data("tok-xyz", &COL_UID.parse().unwrap(), &SEC_UID.parse().unwrap())
        .await
        .unwrap();

    assert_eq!(data, "hunter2");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_secret_data_forbidden() {
    let mut server = mockito::Server::new_async().await;
    let path = format!("/api/v1/collections/{COL_UID}/secrets/{SEC_UID}/versions/latest/");
    server.mock("GET", path.as_str()).with_status(403).create_async().await;

    let client = Client::new(mock_config(&server.url(), None)).unwrap();
    let result = client
        .secret_data("stale", &COL_UID.parse().unwrap(), &SEC_UID.parse().unwrap())
        .await;

    assert_eq!(result, Err(WorkloadError::HttpError(403, "Forbidden".to_string())));
}
