//! HTTP route handlers for the render shell and its assets.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};

use super::events;
use crate::assets::Asset;
use crate::SharedState;

/// Build the router serving one session.
pub fn router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/", get(shell_handler))
        .route(
            Asset::Bundle.route(),
            get(|State(state): State<Arc<SharedState>>| serve_asset(state, Asset::Bundle)),
        )
        .route(
            Asset::Styles.route(),
            get(|State(state): State<Arc<SharedState>>| serve_asset(state, Asset::Styles)),
        )
        .route(
            Asset::Mermaid.route(),
            get(|State(state): State<Arc<SharedState>>| serve_asset(state, Asset::Mermaid)),
        )
        .route("/events", get(events::events_handler))
        .with_state(state)
}

/// Handler for GET /
async fn shell_handler(State(state): State<Arc<SharedState>>) -> Html<String> {
    Html(state.shell.clone())
}

async fn serve_asset(state: Arc<SharedState>, asset: Asset) -> Response {
    match state.assets.get(asset).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, asset.content_type())], bytes).into_response(),
        Err(e) => {
            log::warn!(
                "Failed to load asset {} from {}: {}",
                asset.file_name(),
                state.assets.dir().display(),
                e
            );
            (StatusCode::NOT_FOUND, format!("{} not found", asset.file_name())).into_response()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetCache;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use futures::StreamExt;
    use showcase_core::content::ContentPayload;
    use showcase_core::push::PushChannel;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_state(channel: Arc<PushChannel>) -> (Arc<SharedState>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bundle.js"), "console.log('bundle')").unwrap();
        std::fs::write(dir.path().join("styles.css"), "body{margin:0}").unwrap();
        let assets = Arc::new(AssetCache::new(dir.path()));
        (Arc::new(SharedState::new(channel, assets, "Showcase MCP")), dir)
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn root_serves_shell() {
        let (state, _dir) = test_state(Arc::new(PushChannel::new()));
        let response = router(state).oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("<title>Showcase MCP</title>"));
    }

    #[tokio::test]
    async fn asset_has_fixed_content_type() {
        let (state, _dir) = test_state(Arc::new(PushChannel::new()));
        let response = router(state).oneshot(get("/styles.css")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/css; charset=utf-8"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"body{margin:0}");
    }

    #[tokio::test]
    async fn asset_is_shared_through_cache() {
        let (state, _dir) = test_state(Arc::new(PushChannel::new()));
        let app = router(Arc::clone(&state));

        let response = app.oneshot(get("/bundle.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.assets.is_cached(Asset::Bundle));
    }

    #[tokio::test]
    async fn missing_asset_is_not_found() {
        let (state, _dir) = test_state(Arc::new(PushChannel::new()));
        let response = router(state).oneshot(get("/mermaid.min.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (state, _dir) = test_state(Arc::new(PushChannel::new()));
        let response = router(state).oneshot(get("/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn events_replays_current_content() {
        let channel = Arc::new(PushChannel::with_content(
            ContentPayload::new("T1").message("hello"),
        ));
        let (state, _dir) = test_state(Arc::clone(&channel));
        let response = router(state).oneshot(get("/events")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(channel.subscriber_count(), 1);

        let mut body = response.into_body().into_data_stream();
        let frame = body.next().await.unwrap().unwrap();
        let text = String::from_utf8(frame.to_vec()).unwrap();
        assert!(text.contains("event: content\n"));
        assert!(text.contains(r#"data: {"title":"T1","message":"hello"}"#));
    }

    #[tokio::test]
    async fn events_stream_carries_broadcasts_and_ends_on_close() {
        let channel = Arc::new(PushChannel::new());
        let (state, _dir) = test_state(Arc::clone(&channel));
        let response = router(state).oneshot(get("/events")).await.unwrap();
        let mut body = response.into_body().into_data_stream();

        channel.publish(ContentPayload::new("T2"));
        let frame = body.next().await.unwrap().unwrap();
        assert!(String::from_utf8_lossy(&frame).contains(r#"data: {"title":"T2"}"#));

        channel.close();
        assert!(body.next().await.is_none());
    }

    #[tokio::test]
    async fn dropping_stream_unsubscribes() {
        let channel = Arc::new(PushChannel::new());
        let (state, _dir) = test_state(Arc::clone(&channel));
        let response = router(state).oneshot(get("/events")).await.unwrap();
        assert_eq!(channel.subscriber_count(), 1);

        drop(response);
        assert_eq!(channel.subscriber_count(), 0);
    }
}
