use fanshop_facebook::{GraphClient, GraphConfig, TokenValidator};
use fanshop_types::TokenStatus;
use mockito::{Matcher, Server};

fn client_for(server: &Server) -> GraphClient {
    let config = GraphConfig::new()
        .with_base_url(server.url())
        .with_api_version("v19.0");
    GraphClient::new(&config).unwrap()
}

#[tokio::test]
async fn test_valid_token_with_scopes() {
    let mut server = Server::new_async().await;
    let _me = server
        .mock("GET", "/v19.0/me")
        .match_query(Matcher::UrlEncoded("access_token".into(), "good-token".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "1029384756", "name": "Shop Thời Trang"}"#)
        .create_async()
        .await;
    let _permissions = server
        .mock("GET", "/v19.0/me/permissions")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data": [
                {"permission": "pages_messaging", "status": "granted"},
                {"permission": "pages_read_engagement", "status": "granted"},
                {"permission": "ads_read", "status": "declined"}
            ]}"#,
        )
        .create_async()
        .await;

    let check = client_for(&server).validate("good-token").await;

    assert_eq!(check.status, TokenStatus::Valid);
    assert_eq!(check.scopes, vec!["pages_messaging", "pages_read_engagement"]);
    assert_eq!(check.account_id.as_deref(), Some("1029384756"));
    assert!(check.message.contains("Shop Thời Trang"));
}

#[tokio::test]
async fn test_expired_token() {
    let mut server = Server::new_async().await;
    let _me = server
        .mock("GET", "/v19.0/me")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"error": {"message": "Error validating access token: Session has expired",
                "type": "OAuthException", "code": 190, "error_subcode": 463}}"#,
        )
        .create_async()
        .await;

    let check = client_for(&server).validate("old-token").await;

    assert_eq!(check.status, TokenStatus::Expired);
    assert!(check.message.contains("Session has expired"));
    assert!(check.scopes.is_empty());
}

#[tokio::test]
async fn test_invalid_token_codes() {
    for code in [102, 2500] {
        let mut server = Server::new_async().await;
        let body = format!(
            r#"{{"error": {{"message": "bad token", "type": "OAuthException", "code": {}}}}}"#,
            code
        );
        let _me = server
            .mock("GET", "/v19.0/me")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let check = client_for(&server).validate("bad-token").await;
        assert_eq!(check.status, TokenStatus::Invalid, "code {}", code);
    }
}

#[tokio::test]
async fn test_network_failure_is_invalid() {
    // Nothing listens on port 1
    let config = GraphConfig::new().with_base_url("http://127.0.0.1:1");
    let client = GraphClient::new(&config).unwrap();

    let check = client.validate("any-token").await;

    assert_eq!(check.status, TokenStatus::Invalid);
    assert!(check.message.contains("Network error"));
}

#[tokio::test]
async fn test_empty_token_skips_network() {
    let config = GraphConfig::new().with_base_url("http://127.0.0.1:1");
    let client = GraphClient::new(&config).unwrap();

    let check = client.validate("   ").await;

    assert_eq!(check.status, TokenStatus::Invalid);
    assert_eq!(check.message, "Token is empty");
}

#[tokio::test]
async fn test_permission_failure_keeps_token_valid() {
    let mut server = Server::new_async().await;
    let _me = server
        .mock("GET", "/v19.0/me")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "42"}"#)
        .create_async()
        .await;
    let _permissions = server
        .mock("GET", "/v19.0/me/permissions")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("oops")
        .create_async()
        .await;

    let check = client_for(&server).validate("token").await;

    assert_eq!(check.status, TokenStatus::Valid);
    assert!(check.scopes.is_empty());
}
