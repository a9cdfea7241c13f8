//! Platform endpoint tests over a mock HTTP server.

use httpmock::prelude::*;

use mbops::config::PlatformConfig;
use mbops::platform::PlatformClient;
use mbops::store::SessionCredential;

fn platform_config(base_url: &str) -> PlatformConfig {
    PlatformConfig {
        base_url: base_url.to_string(),
        account_email: "owner@example.com".to_string(),
        site_id: "12345".to_string(),
        theme_id: "678".to_string(),
        session_cookie_name: "rack.session".to_string(),
        notification_sender: "help@micro.blog".to_string(),
    }
}

fn client_with_session(base_url: &str) -> PlatformClient {
    let mut client = PlatformClient::new(&platform_config(base_url)).unwrap();
    client.set_credential(SessionCredential::new("abc123"));
    client
}

#[tokio::test]
async fn validate_session_accepts_a_direct_200() {
    let server = MockServer::start_async().await;
    let logs = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/account/logs")
                .header("Cookie", "rack.session=abc123");
            then.status(200).body("<html>logs</html>");
        })
        .await;

    let client = client_with_session(&server.base_url());
    assert!(client.validate_session().await.unwrap());
    logs.assert_async().await;
}

#[tokio::test]
async fn validate_session_rejects_a_redirect_to_signin() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/account/logs");
            then.status(302).header("Location", "/account/signin");
        })
        .await;

    let client = client_with_session(&server.base_url());
    assert!(!client.validate_session().await.unwrap());
}

#[tokio::test]
async fn check_build_status_decodes_the_sample() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/posts/check");
            then.status(200).json_body(serde_json::json!({
                "is_publishing": true,
                "is_processing": false,
                "publishing_status": "Publishing posts..."
            }));
        })
        .await;

    let client = client_with_session(&server.base_url());
    let sample = client.check_build_status().await.unwrap();
    assert!(sample.is_publishing);
    assert!(!sample.is_processing);
    assert_eq!(sample.publishing_status, "Publishing posts...");
}

#[tokio::test]
async fn check_build_status_tolerates_missing_fields() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/posts/check");
            then.status(200).json_body(serde_json::json!({}));
        })
        .await;

    let client = client_with_session(&server.base_url());
    let sample = client.check_build_status().await.unwrap();
    assert!(!sample.is_publishing);
    assert!(sample.publishing_status.is_empty());
}

#[tokio::test]
async fn failed_export_trigger_is_fatal() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/account/export/12345/theme");
            then.status(500);
        })
        .await;

    let client = client_with_session(&server.base_url());
    assert!(client.trigger_export("12345").await.is_err());
}

#[tokio::test]
async fn signin_request_posts_the_account_email() {
    let server = MockServer::start_async().await;
    let signin = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/account/signin")
                .body_contains("owner@example.com");
            then.status(200);
        })
        .await;

    let client = PlatformClient::new(&platform_config(&server.base_url())).unwrap();
    client
        .request_signin_email("owner@example.com")
        .await
        .unwrap();
    signin.assert_async().await;
}
