pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ai::handlers as ai;
use crate::premium::handlers as premium;
use crate::state::AppState;
use crate::templates::handlers as templates;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Template gallery
        .route("/api/v1/templates", get(templates::handle_list_templates))
        .route("/api/v1/templates/:id", get(templates::handle_get_template))
        // Premium access
        .route("/api/v1/premium/access", get(premium::handle_check_access))
        // AI assistance
        .route("/api/v1/ai/chat", post(ai::handle_chat))
        .route("/api/v1/ai/suggest", post(ai::handle_suggest))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::test_config;
    use crate::llm_client::LlmClient;
    use crate::premium::tests::FakeLookup;

    fn test_state(lookup: Arc<FakeLookup>) -> AppState {
        let config = test_config();
        let llm = LlmClient::from_parts(
            reqwest::Client::builder().no_proxy().build().unwrap(),
            config.llm_api_url.clone(),
            config.llm_api_key.clone(),
            config.llm_model.clone(),
        );
        AppState::new(llm, config, lookup)
    }

    fn app() -> Router {
        build_router(test_state(Arc::new(FakeLookup::with_purchases(&[]))))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(), get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "cvforge-api");
    }

    #[tokio::test]
    async fn test_list_templates_with_filter() {
        let (status, all) = send(app(), get_req("/api/v1/templates")).await;
        assert_eq!(status, StatusCode::OK);
        let total = all.as_array().unwrap().len();
        assert_eq!(total, crate::templates::catalog::all().len());

        let (_, premium) = send(app(), get_req("/api/v1/templates?premium=true")).await;
        let premium = premium.as_array().unwrap();
        assert!(!premium.is_empty());
        assert!(premium.iter().all(|t| t["premium"] == true && t["price_cents"].as_u64() > Some(0)));
    }

    #[tokio::test]
    async fn test_get_template() {
        let (status, body) = send(app(), get_req("/api/v1/templates/modern")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["style"], "modern");
        assert!(body["palette"]["primary"].as_str().unwrap().starts_with('#'));

        let (status, body) = send(app(), get_req("/api/v1/templates/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_premium_access_for_free_template() {
        let (status, body) = send(
            app(),
            get_req("/api/v1/premium/access?email=ana@example.com&template_id=classic"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["has_access"], true);
        assert_eq!(body["reason"], "free_template");
    }

    #[tokio::test]
    async fn test_premium_access_normalizes_email() {
        let lookup = Arc::new(FakeLookup::with_purchases(&[("ana@example.com", "executive")]));
        let router = build_router(test_state(lookup.clone()));

        let (status, body) = send(
            router,
            get_req("/api/v1/premium/access?email=Ana%40Example.com&template_id=executive"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["has_access"], true);
        assert_eq!(body["reason"], "purchased");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            lookup.queries.lock().unwrap()[0],
            ("ana@example.com".to_string(), "executive".to_string())
        );
    }

    #[tokio::test]
    async fn test_premium_access_rejects_bad_input() {
        let (status, body) = send(
            app(),
            get_req("/api/v1/premium/access?email=not-an-email&template_id=executive"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = send(
            app(),
            get_req("/api/v1/premium/access?email=ana@example.com&template_id=unknown"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_premium_access_database_down_is_503() {
        let lookup = Arc::new(FakeLookup::with_purchases(&[]).failing_first(100));
        let router = build_router(test_state(lookup.clone()));

        let (status, body) = send(
            router,
            get_req("/api/v1/premium/access?email=ana@example.com&template_id=creative"),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chat_validation() {
        let (status, body) = send(app(), post_json("/api/v1/ai/chat", json!({"messages": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_chat_with_unreachable_provider_is_503() {
        let (status, body) = send(
            app(),
            post_json(
                "/api/v1/ai/chat",
                json!({"messages": [{"role": "user", "content": "Rewrite my summary"}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_suggest_falls_back_when_provider_unreachable() {
        let (status, body) = send(
            app(),
            post_json(
                "/api/v1/ai/suggest",
                json!({
                    "section": "objective",
                    "curriculum": {"professionalObjective": {"title": "Data Analyst"}}
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["section"], "objective");
        assert_eq!(body["from_fallback"], true);
        assert_eq!(body["attempts"], 2);
        assert!(body["suggestions"][0].as_str().unwrap().contains("Data Analyst"));
    }

    #[tokio::test]
    async fn test_suggest_accepts_unlisted_levels() {
        let (status, body) = send(
            app(),
            post_json(
                "/api/v1/ai/suggest",
                json!({
                    "section": "skills",
                    "curriculum": {
                        "skills": [{"name": "Excel", "level": ""}],
                        "languages": [{"name": "English", "proficiency": "C1"}]
                    }
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["from_fallback"], true);
        assert!(!body["suggestions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_state_short_circuits() {
        let state = test_state(Arc::new(FakeLookup::with_purchases(&[])));
        state.shutdown.cancel();
        let router = build_router(state);

        let (status, body) = send(
            router,
            post_json("/api/v1/ai/suggest", json!({"section": "skills"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "CANCELLED");
    }
}
