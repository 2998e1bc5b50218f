//! REST API module using Axum
//!
//! Provides the HTTP surface of the assistant:
//! - JSON endpoints for knowledge base answers, source search and chat
//! - The chat page and its assets served via `rust-embed` (compiled into
//!   the binary)

pub mod handlers;
mod routes;

pub use handlers::{ApiState, HealthResponse, MessageRequest, MessageResponse};

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use rust_embed::Embed;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Environment variable listing allowed cross-origin callers
pub const CORS_ORIGINS_ENV: &str = "ZIGGY_CORS_ORIGINS";

/// Chat page assets from `static/`.
#[derive(Embed)]
#[folder = "static/"]
struct StaticAssets;

/// Render the index page with the configured title.
pub fn render_index(title: &str) -> Option<String> {
    let page = StaticAssets::get("index.html")?;
    let html = String::from_utf8_lossy(&page.data);
    Some(html.replace("{{ title }}", title))
}

/// GET / - the chat page
async fn index(State(state): State<ApiState>) -> Response {
    match render_index(&state.page_title) {
        Some(html) => Html(html).into_response(),
        None => (StatusCode::OK, "Ziggy is running. Chat page not bundled.").into_response(),
    }
}

/// Serve a static asset by path, 404 otherwise.
async fn serve_asset(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    match StaticAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `ZIGGY_CORS_ORIGINS` to a comma-separated list of allowed origins
/// when the chat page is hosted elsewhere.
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match std::env::var(CORS_ORIGINS_ENV) {
        Ok(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Create the complete application router with API and page serving.
pub fn create_app(state: ApiState) -> Router {
    let cors = build_cors_layer();
    let body_limit = state.body_limit_bytes;

    let router = Router::new()
        .route("/", get(index).with_state(state.clone()))
        .merge(routes::api_routes(state))
        // Everything else: embedded assets (main.js, style.css) or 404
        .fallback(serve_asset)
        // Any size of message is accepted unless a limit is configured
        .layer(DefaultBodyLimit::disable());

    let router = match body_limit {
        Some(limit) => router.layer(RequestBodyLimitLayer::new(limit)),
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_index_substitutes_title() {
        let html = render_index("Quantum Helper").unwrap();
        assert!(html.contains("<title>Quantum Helper"));
        assert!(!html.contains("{{ title }}"));
    }

    #[test]
    fn test_assets_bundled() {
        assert!(StaticAssets::get("main.js").is_some());
        assert!(StaticAssets::get("style.css").is_some());
    }
}
