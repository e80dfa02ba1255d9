//! Axum router configuration with middleware.
//!
//! All session and messaging routes are under `/api/`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers::{batch, events, send, session};
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Session lifecycle
        .route("/status", get(session::get_status))
        .route("/qr", get(session::get_qr))
        .route("/pair", post(session::pair))
        .route("/logout", post(session::logout))
        .route("/reinitialize", post(session::reinitialize))
        .route("/events", get(events::stream_events))
        // Single sends
        .route("/send/text", post(send::text))
        .route("/send/media", post(send::media))
        .route("/send/buttons/text", post(send::button_text))
        .route("/send/buttons/image", post(send::button_image))
        .route("/send/buttons/video", post(send::button_video))
        .route("/send/interactive", post(send::interactive))
        .route("/send/interactive/image", post(send::interactive_image))
        .route("/send/interactive/video", post(send::interactive_video))
        .route("/send/contact", post(send::contact))
        .route("/send/location", post(send::location))
        .route("/send/reaction", post(send::reaction))
        .route("/send/sticker", post(send::sticker))
        .route("/send/voice", post(send::voice))
        .route("/send/document", post(send::document))
        .route("/send/invoice", post(send::invoice))
        .route("/send/business-card", post(send::business_card))
        .route("/send/catalog", post(send::catalog))
        .route("/send/survey", post(send::survey))
        // Paced batches
        .route("/send/bulk", post(batch::bulk))
        .route("/send/album", post(batch::album));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::sse::{Event, Sse};
    use futures_util::StreamExt;
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use chatgate_types::config::{BridgeConfig, GatewayConfig};

    /// Router plus the state behind it. The tempdir must outlive the test.
    struct TestApp {
        router: Router,
        state: AppState,
        _data_dir: TempDir,
    }

    fn test_app(bridge_url: &str, api_key: Option<&str>) -> TestApp {
        let data_dir = TempDir::new().unwrap();
        let config = GatewayConfig {
            bridge: BridgeConfig {
                base_url: bridge_url.to_string(),
                request_timeout_secs: 5,
            },
            ..GatewayConfig::default()
        };
        let state = AppState::new(
            config,
            data_dir.path().to_path_buf(),
            api_key.map(|k| SecretString::from(k.to_string())),
        )
        .unwrap();
        TestApp {
            router: build_router(state.clone()),
            state,
            _data_dir: data_dir,
        }
    }

    /// Nothing listens here; only routes that never reach the bridge use it.
    const NO_BRIDGE: &str = "http://127.0.0.1:9";

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn call(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    /// A bridge that accepts any session, reports it open and accepts sends.
    async fn spawn_fake_bridge() -> String {
        async fn events() -> Sse<impl futures_util::Stream<Item = Result<Event, Infallible>>> {
            let open = futures_util::stream::iter([Ok::<_, Infallible>(
                Event::default()
                    .event("open")
                    .data(r#"{"jid":"15550009999@s.whatsapp.net"}"#),
            )]);
            Sse::new(open.chain(futures_util::stream::pending()))
        }

        let bridge = Router::new()
            .route("/sessions/{id}/connect", post(|| async { StatusCode::OK }))
            .route("/sessions/{id}/events", get(events))
            .route(
                "/sessions/{id}/messages",
                post(|| async { axum::Json(json!({"messageId": "MSG-1"})) }),
            )
            .route(
                "/sessions/{id}/pairing-code",
                post(|| async { axum::Json(json!({"code": "ABCD1234"})) }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, bridge).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn health_needs_no_auth() {
        let app = test_app(NO_BRIDGE, Some("secret"));
        let (status, body) = call(&app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn status_reports_uninitialized_session() {
        let app = test_app(NO_BRIDGE, None);
        let (status, body) = call(&app, get_req("/api/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["state"], "uninitialized");
        assert_eq!(body["data"]["connected"], false);
        assert_eq!(body["data"]["has_challenge"], false);
        assert!(body["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn api_key_is_enforced_when_configured() {
        let app = test_app(NO_BRIDGE, Some("secret"));

        let (status, body) = call(&app, get_req("/api/status")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["errors"][0]["code"], "UNAUTHORIZED");

        let wrong = Request::builder()
            .uri("/api/status")
            .header("x-api-key", "guess")
            .body(Body::empty())
            .unwrap();
        assert_eq!(call(&app, wrong).await.0, StatusCode::UNAUTHORIZED);

        let bearer = Request::builder()
            .uri("/api/status")
            .header(header::AUTHORIZATION, "Bearer secret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(call(&app, bearer).await.0, StatusCode::OK);

        let header_key = Request::builder()
            .uri("/api/status")
            .header("x-api-key", "secret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(call(&app, header_key).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn qr_without_challenge_is_not_found() {
        let app = test_app(NO_BRIDGE, None);
        let (status, body) = call(&app, get_req("/api/qr")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errors"][0]["code"], "NO_CHALLENGE");

        let (status, _) = call(&app, get_req("/api/qr?format=svg")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&app, get_req("/api/qr?format=gif")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "INVALID_INTENT");
    }

    #[tokio::test]
    async fn send_before_initialize_is_unavailable() {
        let app = test_app(NO_BRIDGE, None);
        let (status, body) = call(
            &app,
            post_json("/api/send/text", json!({"to": "+1 555 123 4567", "text": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["errors"][0]["code"], "NOT_INITIALIZED");
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_intent() {
        let app = test_app(NO_BRIDGE, None);
        let request = Request::builder()
            .method("POST")
            .uri("/api/send/text")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["code"], "INVALID_INTENT");
    }

    #[tokio::test]
    async fn oversized_album_fails_before_connectivity_check() {
        let app = test_app(NO_BRIDGE, None);
        let items: Vec<Value> = (0..11)
            .map(|i| json!({"mediaType": "image", "url": format!("https://example.com/{i}.jpg")}))
            .collect();
        let (status, body) = call(
            &app,
            post_json("/api/send/album", json!({"to": "15551234567", "items": items})),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["errors"][0]["code"], "BATCH_TOO_LARGE");
    }

    #[tokio::test]
    async fn pair_and_logout_without_session() {
        let app = test_app(NO_BRIDGE, None);

        let (status, body) = call(
            &app,
            post_json("/api/pair", json!({"phoneNumber": "+1 555 123 4567"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["errors"][0]["code"], "NOT_INITIALIZED");

        let (status, body) = call(&app, post_json("/api/logout", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["logged_out"], true);
        assert_eq!(body["data"]["had_session"], false);
    }

    #[tokio::test]
    async fn event_stream_starts_with_status_snapshot() {
        let app = test_app(NO_BRIDGE, None);
        let response = app.router.clone().oneshot(get_req("/api/events")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );

        let mut body = response.into_body().into_data_stream();
        let first = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(first.to_vec()).unwrap();
        assert!(text.contains("event: status"), "{text}");
        assert!(text.contains("uninitialized"), "{text}");
    }

    #[tokio::test]
    async fn reinitialize_connects_and_sends_through_bridge() {
        let bridge_url = spawn_fake_bridge().await;
        let app = test_app(&bridge_url, None);

        let (status, _) = call(&app, post_json("/api/reinitialize", json!({}))).await;
        assert_eq!(status, StatusCode::OK);

        let connected = tokio::time::timeout(
            Duration::from_secs(5),
            app.state.session.observer().wait_for(|s| s.connected),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(
            connected.own_identity.as_deref(),
            Some("15550009999@s.whatsapp.net")
        );

        let (status, body) = call(
            &app,
            post_json("/api/send/text", json!({"to": "+1 555 123 4567", "text": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["kind"], "text");
        assert_eq!(body["data"]["message_id"], "MSG-1");
        assert_eq!(body["data"]["jid"], "15551234567@s.whatsapp.net");

        app.state.session.shutdown().await;
    }

    #[tokio::test]
    async fn pair_reports_digits_and_grouped_code() {
        let bridge_url = spawn_fake_bridge().await;
        let app = test_app(&bridge_url, None);
        call(&app, post_json("/api/reinitialize", json!({}))).await;
        tokio::time::timeout(
            Duration::from_secs(5),
            app.state.session.observer().wait_for(|s| s.connected),
        )
        .await
        .unwrap()
        .unwrap();

        let (status, body) = call(
            &app,
            post_json("/api/pair", json!({"phoneNumber": "+1 (555) 010-9999"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["phone_number"], "15550109999");
        assert_eq!(body["data"]["code"], "ABCD-1234");

        app.state.session.shutdown().await;
    }
}
