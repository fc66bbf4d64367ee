//! HTTP API Tests
//!
//! Drives the router end to end with `axum-test`, backed by the in-memory
//! quote port, and checks authentication, role permissions, validation and
//! the status codes each domain error maps to.

use std::str::FromStr;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use core_kernel::{CoverId, ModifierId, PremiumRuleId, ProductId};
use domain_quote::{
    MockQuotePort, ModifierDefinition, ModifierType, PremiumRule, PremiumType, QuotePort,
    ValueType,
};
use interface_api::{auth::create_token, config::ApiConfig, create_router};

const SECRET: &str = "api-test-secret";

struct Fixture {
    server: TestServer,
    product_id: ProductId,
    buildings: CoverId,
    liability: CoverId,
    loading: ModifierId,
}

fn rule(premium_type: PremiumType, base_rate: Option<Decimal>, flat_amount: Option<Decimal>) -> PremiumRule {
    PremiumRule {
        id: PremiumRuleId::new(),
        premium_type,
        base_rate,
        flat_amount,
        min_premium: None,
        is_active: true,
        created_at: Utc::now(),
    }
}

async fn fixture_with(auto_calculate: bool) -> Fixture {
    let port = Arc::new(MockQuotePort::new());
    let product_id = port.add_product("Landlord Insurance").await;
    let buildings = port
        .add_cover("Buildings", vec![rule(PremiumType::RateBased, Some(dec!(0.002)), None)])
        .await;
    let liability = port
        .add_cover("Property Owners Liability", vec![rule(PremiumType::Flat, None, Some(dec!(150)))])
        .await;
    let loading = port
        .add_modifier(ModifierDefinition {
            id: ModifierId::new(),
            name: "Vacancy Loading".to_string(),
            code: "VACANCY".to_string(),
            modifier_type: ModifierType::Loading,
            value_type: ValueType::Percentage,
            min_value: None,
            max_value: None,
            default_value: None,
            is_active: true,
        })
        .await;

    let config = ApiConfig {
        jwt_secret: SECRET.to_string(),
        auto_calculate,
        ..ApiConfig::default()
    };
    let port: Arc<dyn QuotePort> = port;
    let server = TestServer::new(create_router(port, config)).unwrap();

    Fixture {
        server,
        product_id,
        buildings,
        liability,
        loading,
    }
}

async fn fixture() -> Fixture {
    fixture_with(true).await
}

fn token(role: &str) -> String {
    create_token("USR-test", vec![role.to_string()], SECRET, 3600).unwrap()
}

fn create_body(f: &Fixture) -> Value {
    json!({
        "product_id": f.product_id.as_uuid(),
        "insured_name": "Mrs J Patel",
        "insured_email": "j.patel@example.com",
        "currency": "GBP",
        "covers": [
            { "cover_id": f.buildings.as_uuid(), "basis_value": "350000" },
            { "cover_id": f.liability.as_uuid() }
        ],
        "modifiers": [
            { "modifier_id": f.loading.as_uuid(), "applied_value": "10" }
        ]
    })
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

async fn create(f: &Fixture) -> Value {
    let response = f
        .server
        .post("/api/v1/quotes")
        .authorization_bearer(token("broker"))
        .json(&create_body(f))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let f = fixture().await;
    let response = f.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = f.server.get("/health/ready").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "ready");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let f = fixture().await;
    let response = f.server.get("/api/v1/quotes").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_with_wrong_secret_is_unauthorized() {
    let f = fixture().await;
    let forged = create_token("USR-test", vec!["admin".to_string()], "other-secret", 3600).unwrap();
    let response = f.server.get("/api/v1/quotes").authorization_bearer(forged).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_role_is_forbidden() {
    let f = fixture().await;
    let response = f
        .server
        .get("/api/v1/quotes")
        .authorization_bearer(token("auditor"))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

// ============================================================================
// QUOTES
// ============================================================================

#[tokio::test]
async fn test_create_calculates_premium() {
    let f = fixture().await;
    let quote = create(&f).await;

    assert_eq!(quote["status"], "Draft");
    assert_eq!(quote["product_name"], "Landlord Insurance");
    assert_eq!(decimal(&quote["base_premium"]), dec!(850));
    assert_eq!(decimal(&quote["total_premium"]), dec!(935));
    assert_eq!(decimal(&quote["covers"][0]["calculated_premium"]), dec!(700));
    assert_eq!(decimal(&quote["modifiers"][0]["premium_impact"]), dec!(85));
}

#[tokio::test]
async fn test_create_without_auto_calculate_then_calculate() {
    let f = fixture_with(false).await;
    let quote = create(&f).await;
    assert!(quote["total_premium"].is_null());

    let id = quote["id"].as_str().unwrap();
    let response = f
        .server
        .post(&format!("/api/v1/quotes/{}/calculate", id))
        .authorization_bearer(token("broker"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(decimal(&response.json::<Value>()["total_premium"]), dec!(935));
}

#[tokio::test]
async fn test_create_validation_errors() {
    let f = fixture().await;

    let mut body = create_body(&f);
    body["insured_name"] = json!("");
    let response = f
        .server
        .post("/api/v1/quotes")
        .authorization_bearer(token("broker"))
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let mut body = create_body(&f);
    body["covers"][0]["basis_value"] = json!("-1");
    let response = f
        .server
        .post("/api/v1/quotes")
        .authorization_bearer(token("broker"))
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["error"], "validation_error");
}

#[tokio::test]
async fn test_create_with_unknown_cover() {
    let f = fixture().await;
    let mut body = create_body(&f);
    body["covers"][0]["cover_id"] = json!(CoverId::new().as_uuid());

    let response = f
        .server
        .post("/api/v1/quotes")
        .authorization_bearer(token("broker"))
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_create_with_overflowing_premium() {
    let f = fixture().await;
    let mut body = create_body(&f);
    body["modifiers"][0]["applied_value"] = json!(Decimal::MAX.to_string());

    let response = f
        .server
        .post("/api/v1/quotes")
        .authorization_bearer(token("broker"))
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["error"], "validation_error");

    let response = f
        .server
        .get("/api/v1/quotes")
        .authorization_bearer(token("broker"))
        .await;
    assert_eq!(response.json::<Value>()["count"], 0);
}

#[tokio::test]
async fn test_get_quote() {
    let f = fixture().await;
    let created = create(&f).await;
    let id = created["id"].as_str().unwrap();

    let response = f
        .server
        .get(&format!("/api/v1/quotes/{}", id))
        .authorization_bearer(token("broker"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), created);
}

#[tokio::test]
async fn test_get_quote_accepts_prefixed_id() {
    let f = fixture().await;
    let created = create(&f).await;
    let id = created["id"].as_str().unwrap();

    let response = f
        .server
        .get(&format!("/api/v1/quotes/QTE-{}", id))
        .authorization_bearer(token("broker"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_get_unknown_and_malformed_ids() {
    let f = fixture().await;

    let response = f
        .server
        .get(&format!("/api/v1/quotes/{}", uuid::Uuid::new_v4()))
        .authorization_bearer(token("broker"))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = f
        .server
        .get("/api/v1/quotes/not-a-quote")
        .authorization_bearer(token("broker"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_draft_recalculates() {
    let f = fixture().await;
    let created = create(&f).await;
    let id = created["id"].as_str().unwrap();

    let response = f
        .server
        .put(&format!("/api/v1/quotes/{}", id))
        .authorization_bearer(token("broker"))
        .json(&json!({
            "insured_name": "Mrs J Patel",
            "currency": "GBP",
            "covers": [
                { "cover_id": f.liability.as_uuid(), "is_selected": false }
            ]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let quote = response.json::<Value>();
    assert_eq!(decimal(&quote["base_premium"]), dec!(700));
    assert_eq!(decimal(&quote["total_premium"]), dec!(770));
}

#[tokio::test]
async fn test_lifecycle_permissions() {
    let f = fixture().await;
    let created = create(&f).await;
    let id = created["id"].as_str().unwrap();

    let response = f
        .server
        .put(&format!("/api/v1/quotes/{}/submit", id))
        .authorization_bearer(token("broker"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "Submitted");

    // Brokers may not bind
    let response = f
        .server
        .put(&format!("/api/v1/quotes/{}/bind", id))
        .authorization_bearer(token("broker"))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = f
        .server
        .put(&format!("/api/v1/quotes/{}/bind", id))
        .authorization_bearer(token("underwriter"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "Bound");

    let response = f
        .server
        .put(&format!("/api/v1/quotes/{}/revise-bind", id))
        .authorization_bearer(token("admin"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "Draft");
}

#[tokio::test]
async fn test_invalid_transition_and_locked_edit() {
    let f = fixture().await;
    let created = create(&f).await;
    let id = created["id"].as_str().unwrap();

    // Draft cannot be bound directly
    let response = f
        .server
        .put(&format!("/api/v1/quotes/{}/bind", id))
        .authorization_bearer(token("underwriter"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    f.server
        .put(&format!("/api/v1/quotes/{}/submit", id))
        .authorization_bearer(token("broker"))
        .await;

    let response = f
        .server
        .put(&format!("/api/v1/quotes/{}", id))
        .authorization_bearer(token("broker"))
        .json(&json!({ "insured_name": "Someone Else" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = f
        .server
        .put(&format!("/api/v1/quotes/{}/revise", id))
        .authorization_bearer(token("broker"))
        .await;
    assert_eq!(response.json::<Value>()["status"], "Draft");
}

#[tokio::test]
async fn test_list_with_status_filter() {
    let f = fixture().await;
    let first = create(&f).await;
    create(&f).await;

    f.server
        .put(&format!("/api/v1/quotes/{}/submit", first["id"].as_str().unwrap()))
        .authorization_bearer(token("broker"))
        .await;

    let response = f
        .server
        .get("/api/v1/quotes")
        .authorization_bearer(token("broker"))
        .await;
    assert_eq!(response.json::<Value>()["count"], 2);

    let response = f
        .server
        .get("/api/v1/quotes?status=submitted")
        .authorization_bearer(token("broker"))
        .await;
    let body = response.json::<Value>();
    assert_eq!(body["count"], 1);
    assert_eq!(body["quotes"][0]["id"], first["id"]);

    let response = f
        .server
        .get("/api/v1/quotes?status=expired")
        .authorization_bearer(token("broker"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
