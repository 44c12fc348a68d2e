use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use fanshop_api::{build_router, config::Config, state::AppState};
use fanshop_facebook::{TokenCheck, TokenValidator};
use fanshop_persist::{
    ConversationFilter, ConversationStore, MemoryPersistence, Page, Persistence, RecordStore,
};
use fanshop_types::TokenStatus;

/// Accepts tokens starting with `EAAB-good`
struct StubValidator;

#[async_trait]
impl TokenValidator for StubValidator {
    async fn validate(&self, token: &str) -> TokenCheck {
        if token.starts_with("EAAB-good") {
            TokenCheck {
                status: TokenStatus::Valid,
                message: "Token valid for Shop Mẹ và Bé".to_string(),
                scopes: vec!["pages_messaging".to_string()],
                account_id: Some("1122".to_string()),
                account_name: Some("Shop Mẹ và Bé".to_string()),
                checked_at: Utc::now(),
            }
        } else {
            TokenCheck::invalid("Invalid OAuth access token")
        }
    }
}

fn app() -> (Router, Arc<MemoryPersistence>) {
    let persist = Arc::new(MemoryPersistence::new());
    let mut config = Config::default();
    config.webhook.verify_token = "verify-me".to_string();
    config.webhook.handoff_keywords = vec!["nhân viên".to_string()];

    let state = Arc::new(AppState::new(config, persist.clone(), Arc::new(StubValidator)));
    (build_router(state), persist)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn create(app: &Router, uri: &str, body: Value) -> Value {
    let (status, created) = send(app, "POST", uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}: {}", uri, created);
    created
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

fn messenger(page_id: &str, messaging: Vec<Value>) -> Value {
    json!({
        "object": "page",
        "entry": [{ "id": page_id, "time": 1760000000000i64, "messaging": messaging }]
    })
}

fn inbound(psid: &str, ts: i64, text: &str) -> Value {
    json!({
        "sender": {"id": psid},
        "recipient": {"id": "1122"},
        "timestamp": ts,
        "message": {"mid": format!("m-{}", ts), "text": text}
    })
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["mongodb"], "connected");
}

#[tokio::test]
async fn test_record_crud_lifecycle() {
    let (app, _) = app();

    let product = create(&app, "/products", json!({"name": "Áo thun", "price": 150000, "cost": 60000})).await;
    let id = id_of(&product);
    assert!(!id.is_empty());
    assert_eq!(product["active"], true);

    let (status, fetched) = send(&app, "GET", &format!("/products/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Áo thun");

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/products/{}", id),
        Some(json!({"id": "hijack", "name": "Áo polo", "price": 180000})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], id.as_str());
    assert_eq!(updated["name"], "Áo polo");
    assert_eq!(updated["createdAt"], product["createdAt"]);

    let (status, listed) = send(&app, "GET", "/products?limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/products/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &format!("/products/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("product"));
}

#[tokio::test]
async fn test_validation_errors_name_the_field() {
    let (app, _) = app();

    let (status, body) = send(&app, "POST", "/products", Some(json!({"name": "Mũ", "price": -5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "price");

    let (status, body) = send(&app, "POST", "/orders", Some(json!({"quantity": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, "PUT", "/customers/missing", Some(json!({"name": "Lan"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fanpage_secret_is_masked_and_kept() {
    let (app, persist) = app();
    let fanpage = create(
        &app,
        "/fanpages",
        json!({"pageId": "1122", "name": "Shop Mẹ và Bé", "accessToken": "EAAB-page-token-123456"}),
    )
    .await;
    assert_eq!(fanpage["accessToken"], "EAAB…3456");

    let id = id_of(&fanpage);
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/fanpages/{}", id),
        Some(json!({"pageId": "1122", "name": "Shop Mẹ & Bé", "accessToken": "EAAB…3456"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let stored = persist.fanpages().get(&id).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "EAAB-page-token-123456");
    assert_eq!(stored.name, "Shop Mẹ & Bé");
}

#[tokio::test]
async fn test_webhook_verification() {
    let (app, _) = app();

    let (status, body) = send(
        &app,
        "GET",
        "/webhook/messenger?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=challenge-abc",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "challenge-abc");

    let (status, _) = send(
        &app,
        "GET",
        "/webhook/messenger?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=challenge-abc",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_webhook_ingestion_attribution_and_handoff() {
    let (app, _) = app();
    create(&app, "/fanpages", json!({"pageId": "1122", "name": "Shop", "accessToken": "EAAB-page-token"})).await;

    let mut first = inbound("u1", 1760000000000, "Còn hàng không shop?");
    first["referral"] = json!({"source": "ADS", "ref": "ad_g1"});
    let delivery = messenger(
        "1122",
        vec![first, inbound("u1", 1760000060000, "Cho mình gặp nhân viên")],
    );
    let (status, body) = send(&app, "POST", "/webhook/messenger", Some(delivery)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "EVENT_RECEIVED");

    let (_, conversations) = send(&app, "GET", "/conversations", None).await;
    let conversations = conversations.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    let conversation = &conversations[0];
    assert_eq!(conversation["totalMessages"], 2);
    assert_eq!(conversation["inboundCount"], 2);
    assert_eq!(conversation["lastAdGroupId"], "g1");
    assert_eq!(conversation["state"], "AWAITING_HUMAN");
    assert_eq!(conversation["needsHuman"], true);

    let id = id_of(conversation);
    let (_, messages) = send(&app, "GET", &format!("/conversations/{}/messages", id), None).await;
    let flags: Vec<bool> = messages
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["awaitingHuman"].as_bool().unwrap())
        .collect();
    assert_eq!(flags, vec![false, true]);

    // A person answers from the page inbox
    let echo = json!({
        "sender": {"id": "1122"},
        "recipient": {"id": "u1"},
        "timestamp": 1760000120000i64,
        "message": {"mid": "m-echo", "text": "Dạ em nghe ạ", "is_echo": true}
    });
    let (status, _) = send(&app, "POST", "/webhook/messenger", Some(messenger("1122", vec![echo]))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, conversation) = send(&app, "GET", &format!("/conversations/{}", id), None).await;
    assert_eq!(conversation["state"], "HUMAN_HANDLING");
    assert_eq!(conversation["outboundCount"], 1);
    assert_eq!(conversation["totalMessages"], 3);
    assert_eq!(conversation["lastAdGroupId"], "g1");

    let (_, messages) = send(&app, "GET", &format!("/conversations/{}/messages", id), None).await;
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| m["awaitingHuman"] == false));
    assert_eq!(messages[2]["direction"], "out");
}

#[tokio::test]
async fn test_webhook_referral_without_message_attributes_conversation() {
    let (app, _) = app();
    create(&app, "/fanpages", json!({"pageId": "1122", "name": "Shop"})).await;

    let referral = json!({
        "sender": {"id": "u5"},
        "recipient": {"id": "1122"},
        "timestamp": 1760000000000i64,
        "referral": {"ref": "ad_12345", "source": "ADS", "type": "OPEN_THREAD"}
    });
    let (status, _) = send(&app, "POST", "/webhook/messenger", Some(messenger("1122", vec![referral]))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, conversations) = send(&app, "GET", "/conversations", None).await;
    let conversation = &conversations.as_array().unwrap()[0];
    assert_eq!(conversation["lastAdGroupId"], "12345");
    assert_eq!(conversation["totalMessages"], 0);
    let id = id_of(conversation);

    let (_, messages) = send(&app, "GET", &format!("/conversations/{}/messages", id), None).await;
    assert!(messages.as_array().unwrap().is_empty());

    // The first real message keeps the referral's ad group
    send(
        &app,
        "POST",
        "/webhook/messenger",
        Some(messenger("1122", vec![inbound("u5", 1760000030000, "Còn size M không?")])),
    )
    .await;
    let (_, conversation) = send(&app, "GET", &format!("/conversations/{}", id), None).await;
    assert_eq!(conversation["totalMessages"], 1);
    assert_eq!(conversation["lastAdGroupId"], "12345");
}

#[tokio::test]
async fn test_conversation_list_limit_is_clamped() {
    let (app, _) = app();
    create(&app, "/fanpages", json!({"pageId": "1122", "name": "Shop"})).await;
    let delivery = messenger(
        "1122",
        vec![
            inbound("u1", 1760000000000, "a"),
            inbound("u2", 1760000001000, "b"),
            inbound("u3", 1760000002000, "c"),
        ],
    );
    send(&app, "POST", "/webhook/messenger", Some(delivery)).await;

    let (_, all) = send(&app, "GET", "/conversations", None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, two) = send(&app, "GET", "/conversations?limit=2", None).await;
    let two = two.as_array().unwrap();
    assert_eq!(two.len(), 2);
    assert_eq!(two[0]["senderPsid"], "u3");

    let (status, negative) = send(&app, "GET", "/conversations?limit=-5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(negative.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_webhook_skips_unknown_pages_and_rejects_other_objects() {
    let (app, persist) = app();

    let (status, body) = send(
        &app,
        "POST",
        "/webhook/messenger",
        Some(messenger("999", vec![inbound("u1", 1760000000000, "Hi")])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "EVENT_RECEIVED");
    let listed = persist
        .conversations()
        .list(&ConversationFilter::default())
        .await
        .unwrap();
    assert!(listed.is_empty());

    let (status, _) = send(
        &app,
        "POST",
        "/webhook/messenger",
        Some(json!({"object": "instagram", "entry": []})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_conversation_transition_endpoint() {
    let (app, _) = app();
    create(&app, "/fanpages", json!({"pageId": "1122", "name": "Shop"})).await;
    send(
        &app,
        "POST",
        "/webhook/messenger",
        Some(messenger("1122", vec![inbound("u7", 1760000000000, "Xin chào")])),
    )
    .await;

    let (_, conversations) = send(&app, "GET", "/conversations?state=AI_HANDLING", None).await;
    let id = id_of(&conversations[0]);

    let uri = format!("/conversations/{}/transition", id);
    let (status, body) = send(&app, "POST", &uri, Some(json!({"event": "auto_ai_disabled"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "HUMAN_HANDLING");
    assert_eq!(body["autoAiEnabled"], false);

    let (_, body) = send(&app, "POST", &uri, Some(json!({"event": "agent_released"}))).await;
    assert_eq!(body["state"], "AI_HANDLING");
    assert_eq!(body["autoAiEnabled"], true);

    let (status, _) = send(&app, "POST", &uri, Some(json!({"event": "teleport"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/conversations?state=SLEEPING", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "state");
}

#[tokio::test]
async fn test_ad_group_profit_report() {
    let (app, _) = app();
    let group = create(&app, "/ad-groups", json!({"name": "Áo thun - Tháng 10", "agentId": "agent-1"})).await;
    let group_id = id_of(&group);

    create(
        &app,
        "/orders",
        json!({
            "productId": "p1",
            "adGroupId": group_id,
            "agentId": "agent-1",
            "unitPrice": 200000,
            "cost": 80000,
            "orderDate": "2026-10-01T03:00:00Z"
        }),
    )
    .await;
    // Previous window, feeds growth only
    create(
        &app,
        "/orders",
        json!({
            "productId": "p1",
            "adGroupId": group_id,
            "unitPrice": 100000,
            "cost": 40000,
            "orderDate": "2026-09-29T03:00:00Z"
        }),
    )
    .await;
    create(
        &app,
        "/other-costs",
        json!({"date": "2026-10-02", "amount": 20000, "category": "ads", "adGroupId": group_id}),
    )
    .await;

    let (status, report) = send(
        &app,
        "GET",
        "/ad-group-profit-report?period=custom&fromDate=2026-10-01&toDate=2026-10-02",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert_eq!(report["period"]["previousFromDate"], "2026-09-29");

    let summary = &report["summary"];
    assert_eq!(summary["totalProfit"].as_f64(), Some(100000.0));
    assert_eq!(summary["totalRevenue"].as_f64(), Some(200000.0));
    assert_eq!(summary["totalOrders"], 1);

    let row = &report["adGroups"][0];
    assert_eq!(row["adGroupName"], "Áo thun - Tháng 10");
    assert_eq!(row["dailyProfits"].as_array().unwrap().len(), 2);
    assert_eq!(row["dailyProfits"][1]["profit"].as_f64(), Some(-20000.0));
    assert_eq!(row["profitGrowthRate"].as_f64(), Some(66.67));

    let (_, filtered) = send(
        &app,
        "GET",
        "/ad-group-profit-report?fromDate=2026-10-01&toDate=2026-10-02&agentId=agent-2",
        None,
    )
    .await;
    assert!(filtered["adGroups"].as_array().unwrap().is_empty());
    assert_eq!(filtered["summary"]["totalProfit"].as_f64(), Some(0.0));

    let (status, body) = send(&app, "GET", "/ad-group-profit-report?fromDate=01-10-2026&toDate=2026-10-02", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "fromDate");

    let (status, body) = send(&app, "GET", "/ad-group-profit-report?period=fortnight", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "period");
}

#[tokio::test]
async fn test_agent_summary_and_message_stats() {
    let (app, _) = app();
    for (agent, date) in [("agent-b", "2026-10-01T02:00:00Z"), ("agent-a", "2026-10-01T05:00:00Z"), ("agent-a", "2026-10-02T05:00:00Z")] {
        create(
            &app,
            "/orders",
            json!({"productId": "p1", "agentId": agent, "unitPrice": 100000, "cost": 30000, "orderDate": date}),
        )
        .await;
    }

    let (status, summary) = send(&app, "GET", "/summary2?from=2026-10-01&to=2026-10-02", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["count"], 3);
    let rows = summary["rows"].as_array().unwrap();
    assert_eq!(rows[0]["agentId"], "agent-a");
    assert_eq!(rows[1]["agentId"], "agent-b");
    assert_eq!(rows[2]["date"], "2026-10-02");

    let (_, only_a) = send(&app, "GET", "/summary2?agentId=agent-a&from=2026-10-01&to=2026-10-02", None).await;
    assert_eq!(only_a["count"], 2);

    create(&app, "/fanpages", json!({"pageId": "1122", "name": "Shop"})).await;
    // 2025-10-09T08:53:20Z
    let delivery = messenger(
        "1122",
        vec![
            inbound("u1", 1760000000000, "a"),
            inbound("u2", 1760000001000, "b"),
            inbound("u1", 1760000002000, "c"),
        ],
    );
    send(&app, "POST", "/webhook/messenger", Some(delivery)).await;

    let (status, stats) = send(&app, "GET", "/message-stats?from=2025-10-09&to=2025-10-09", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["count"], 1);
    assert_eq!(stats["rows"][0]["inbound"], 3);
    assert_eq!(stats["rows"][0]["uniqueSenders"], 2);
}

#[tokio::test]
async fn test_token_rotation_and_validation() {
    let (app, persist) = app();
    let token = create(&app, "/api-tokens", json!({"name": "main", "token": "EAAB-old-token-value", "status": "valid"})).await;
    let id = id_of(&token);
    assert_eq!(token["status"], "unknown");
    assert_eq!(token["token"], "EAAB…alue");

    let rotate = format!("/api-tokens/{}/rotate", id);
    let (status, body) = send(&app, "POST", &rotate, Some(json!({"newToken": "EAAB-bad-token"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "newToken");

    let unchanged = persist.api_tokens().get(&id).await.unwrap().unwrap();
    assert_eq!(unchanged.token, "EAAB-old-token-value");
    assert_eq!(unchanged.status, TokenStatus::Unknown);
    assert!(unchanged.rotated_at.is_none());

    let (status, rotated) = send(
        &app,
        "POST",
        &rotate,
        Some(json!({"newToken": "EAAB-good-token-2026", "notes": "yearly"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rotated["status"], "valid");
    assert_eq!(rotated["scopes"], json!(["pages_messaging"]));
    assert_eq!(rotated["notes"], "yearly");

    let stored = persist.api_tokens().get(&id).await.unwrap().unwrap();
    assert_eq!(stored.token, "EAAB-good-token-2026");
    assert!(stored.rotated_at.is_some());

    let (status, validated) = send(&app, "POST", &format!("/api-tokens/{}/validate", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["status"], "valid");

    let (status, _) = send(&app, "POST", "/api-tokens/missing/validate", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openai_default_is_unique_per_scope() {
    let (app, persist) = app();
    let first = create(&app, "/openai-configs", json!({"name": "a", "apiKey": "sk-aaaaaaaaaaaa", "model": "gpt-4o-mini", "isDefault": true})).await;
    let second = create(&app, "/openai-configs", json!({"name": "b", "apiKey": "sk-bbbbbbbbbbbb", "model": "gpt-4o", "isDefault": true})).await;
    assert_eq!(second["isDefault"], true);
    assert_eq!(second["apiKey"], "sk-b…bbbb");

    let first_id = id_of(&first);
    let (status, body) = send(&app, "POST", &format!("/openai-configs/{}/default", first_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isDefault"], true);

    let all = persist
        .openai_configs()
        .list(Page::default())
        .await
        .unwrap();
    let defaults: Vec<&str> = all.iter().filter(|c| c.is_default).map(|c| c.id.as_str()).collect();
    assert_eq!(defaults, vec![first_id.as_str()]);

    let (status, _) = send(&app, "POST", "/openai-configs/missing/default", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_moving_default_config_keeps_one_default_per_scope() {
    let (app, persist) = app();
    let global = create(&app, "/openai-configs", json!({"name": "a", "apiKey": "sk-aaaaaaaaaaaa", "model": "gpt-4o-mini", "isDefault": true})).await;
    let scoped = create(&app, "/openai-configs", json!({"name": "b", "apiKey": "sk-bbbbbbbbbbbb", "model": "gpt-4o", "fanpageId": "fp1", "isDefault": true})).await;
    assert_eq!(global["isDefault"], true);
    assert_eq!(scoped["isDefault"], true);

    let (status, moved) = send(
        &app,
        "PUT",
        &format!("/openai-configs/{}", id_of(&global)),
        Some(json!({"name": "a", "apiKey": "sk-a…aaaa", "model": "gpt-4o-mini", "fanpageId": "fp1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["fanpageId"], "fp1");
    assert_eq!(moved["isDefault"], false);

    let all = persist.openai_configs().list(Page::default()).await.unwrap();
    let fp1_defaults: Vec<&str> = all
        .iter()
        .filter(|c| c.fanpage_id.as_deref() == Some("fp1") && c.is_default)
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(fp1_defaults, vec![id_of(&scoped).as_str()]);
    let moved_config = all.iter().find(|c| c.id == id_of(&global)).unwrap();
    assert_eq!(moved_config.api_key, "sk-aaaaaaaaaaaa");
}
