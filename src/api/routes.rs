//! API route definitions
//!
//! - POST /kbanswer - Knowledge base answer
//! - POST /search   - Knowledge base sources
//! - POST /answer   - Chat reply
//! - GET  /health   - Service health

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ApiState};

/// Create all JSON API routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/kbanswer", post(handlers::kb_answer))
        .route("/search", post(handlers::search))
        .route("/answer", post(handlers::chat_answer))
        .route("/health", get(handlers::health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::context::{Document, KnowledgeBase, KnowledgeStore};
    use crate::llm::{ChatModel, ChatRequest, LlmError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct EmptyStore;

    #[async_trait]
    impl KnowledgeStore for EmptyStore {
        async fn similarity_search(&self, _query: &str, _k: usize) -> anyhow::Result<Vec<Document>> {
            Ok(Vec::new())
        }

        fn store_name(&self) -> &'static str {
            "Empty"
        }
    }

    struct StaticModel;

    #[async_trait]
    impl ChatModel for StaticModel {
        async fn chat(&self, _request: &ChatRequest) -> Result<String, LlmError> {
            Ok("ok".into())
        }

        fn chat_model(&self) -> &str {
            "static"
        }
    }

    fn create_test_state() -> ApiState {
        ApiState::new(
            &AppConfig::default(),
            Arc::new(StaticModel),
            Arc::new(KnowledgeBase::with_store(Arc::new(EmptyStore))),
        )
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_api_routes_post_endpoints() {
        for uri in ["/kbanswer", "/search", "/answer"] {
            let app = api_routes(create_test_state());
            let response = app
                .oneshot(post_json(uri, r#"{"message":"hello"}"#))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK, "POST {uri}");
        }
    }

    #[tokio::test]
    async fn test_api_routes_health() {
        let app = api_routes(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_on_post_route_not_allowed() {
        let app = api_routes(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/search").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
