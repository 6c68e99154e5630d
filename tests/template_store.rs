//! Template-store client and reconciliation against a mock mail API.

use authgate::mail::{
    EmailService, OtpKind, ReconcileOptions, ReconciliationOutcome, ResendClient, SkipReason,
    TemplateIdCache, TemplateReconciler, TemplateStore,
};
use authgate::Error;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client(server: &MockServer) -> Arc<ResendClient> {
    Arc::new(ResendClient::new("re_test".into(), server.uri()).unwrap())
}

fn reconciler(client: Arc<ResendClient>) -> TemplateReconciler {
    let store: Arc<dyn TemplateStore> = client;
    TemplateReconciler::with_options(
        store,
        Arc::new(TemplateIdCache::new()),
        ReconcileOptions::immediate(),
    )
}

fn listing(names: &[(&str, &str)]) -> Value {
    let data: Vec<Value> = names
        .iter()
        .map(|(id, name)| json!({"id": id, "name": name}))
        .collect();
    json!({"object": "list", "has_more": false, "data": data})
}

#[tokio::test]
async fn restricted_key_only_checks_access() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/templates"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "statusCode": 401,
            "name": "restricted_api_key",
            "message": "This API key is restricted to only send emails"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reconciler = reconciler(client(&server));
    let report = reconciler.run().await;

    assert!(report.degraded);
    assert!(report.outcomes.is_empty());
    assert!(reconciler.cache().is_degraded());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn existing_templates_are_reused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/templates"))
        .and(header("authorization", "Bearer re_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[
            ("t1", "otp-sign-in"),
            ("t2", "otp-email-verification"),
            ("t3", "otp-forget-password"),
            ("t4", "organization-invitation"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/templates"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let reconciler = reconciler(client(&server));
    let report = reconciler.run().await;

    let ids: Vec<&str> = report
        .outcomes
        .iter()
        .filter_map(|(_, o)| match o {
            ReconciliationOutcome::AlreadyExists(id) => Some(id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(ids, vec!["t1", "t2", "t3", "t4"]);
    assert_eq!(reconciler.cache().get("organization-invitation").as_deref(), Some("t4"));
}

#[tokio::test]
async fn missing_template_is_created_and_published() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/templates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[
            ("t1", "otp-sign-in-v2"),
            ("t2", "otp-email-verification"),
            ("t3", "otp-forget-password"),
            ("t4", "organization-invitation"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/templates"))
        .and(body_partial_json(json!({
            "name": "otp-sign-in",
            "variables": [{"key": "OTP", "type": "string", "fallback_value": "000000"}]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "t_new", "object": "template"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/templates/t_new/publish"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "t_new", "object": "template"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let report = reconciler(client(&server)).run().await;

    assert_eq!(
        report.outcomes[0],
        (
            "otp-sign-in".to_string(),
            ReconciliationOutcome::Created("t_new".to_string())
        )
    );
}

#[tokio::test]
async fn draft_template_is_published_not_recreated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/templates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "has_more": false,
            "data": [
                {"id": "t1", "name": "otp-sign-in", "status": "draft"},
                {"id": "t2", "name": "otp-email-verification", "status": "published"},
                {"id": "t3", "name": "otp-forget-password", "status": "published"},
                {"id": "t4", "name": "organization-invitation", "status": "published"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/templates/t1/publish"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "t1", "object": "template"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/templates"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let reconciler = reconciler(client(&server));
    let report = reconciler.run().await;

    assert_eq!(
        report.outcomes[0].1,
        ReconciliationOutcome::AlreadyExists("t1".to_string())
    );
    assert_eq!(reconciler.cache().get("otp-sign-in").as_deref(), Some("t1"));
}

#[tokio::test]
async fn rate_limited_listing_is_retried_once() {
    let server = MockServer::start().await;
    // access check succeeds
    Mock::given(method("GET"))
        .and(path("/templates"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&[])))
        .mount(&server)
        .await;
    // every full listing is rate limited
    Mock::given(method("GET"))
        .and(path("/templates"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "name": "rate_limit_exceeded",
            "message": "Too many requests"
        })))
        .mount(&server)
        .await;

    let report = reconciler(client(&server)).run().await;

    assert!(report
        .outcomes
        .iter()
        .all(|(_, o)| *o == ReconciliationOutcome::Skipped(SkipReason::RateLimited)));
    let listings = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r: &&Request| r.url.query() == Some("limit=100"))
        .count();
    assert_eq!(listings, 8);
}

#[tokio::test]
async fn client_maps_error_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/templates/.+/publish$"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "name": "validation_error",
            "message": "Template not found"
        })))
        .mount(&server)
        .await;

    let err = client(&server).publish_template("missing").await.unwrap_err();
    match err {
        Error::TemplateStore { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Template not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn email_service_sends_by_template_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(body_partial_json(json!({
            "to": ["user@example.com"],
            "template": {"id": "t1", "variables": {"OTP": "123456"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_1"})))
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(TemplateIdCache::new());
    cache.insert("otp-sign-in", "t1");
    let service = EmailService::new(client(&server), cache, "noreply@example.com".into());

    let sent = service
        .send_verification_otp("user@example.com", "123456", OtpKind::SignIn)
        .await
        .unwrap();
    assert_eq!(sent.id, "email_1");
}
