//! BridgeConnector -- [`TransportConnector`] backed by the protocol bridge
//! sidecar.
//!
//! Every connect opens a `POST /sessions/{id}/connect` followed by a
//! server-sent event stream on `GET /sessions/{id}/events`. A pump task maps
//! stream events to [`TransportEvent`]s for the generation the transport was
//! created for. The stream is never retried here: its end is reported as a
//! transient close and the session manager decides whether to reconnect.

use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Response, StatusCode, Url};
use reqwest_eventsource::{Event, EventSource, retry};
use tokio_util::sync::CancellationToken;

use chatgate_core::transport::{
    ConnectOptions, EventSink, Transport, TransportConnector, TransportEvent,
};
use chatgate_types::config::BridgeConfig;
use chatgate_types::dispatch::MessageReceipt;
use chatgate_types::error::TransportError;
use chatgate_types::payload::CanonicalPayload;
use chatgate_types::session::CloseReason;

use super::types::{
    ConnectRequest, ErrorBody, PairingCodeRequest, PairingCodeResponse, SendRequest, SendResponse,
    encode_credentials, parse_event,
};

/// Opens [`BridgeTransport`]s against one bridge base URL.
#[derive(Debug, Clone)]
pub struct BridgeConnector {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl BridgeConnector {
    pub fn new(config: &BridgeConfig) -> Result<Self, TransportError> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            TransportError::Bridge(format!("invalid bridge url '{}': {e}", config.base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(TransportError::Bridge(format!(
                "bridge url '{}' cannot be used as a base",
                config.base_url
            )));
        }

        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        // No client-wide timeout: it would also cut the long-lived event stream.
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| TransportError::Bridge(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base,
            timeout,
        })
    }
}

/// HTTP calls scoped to one bridge session.
#[derive(Debug, Clone)]
struct SessionEndpoints {
    client: reqwest::Client,
    base: Url,
    session_id: String,
    timeout: Duration,
}

impl SessionEndpoints {
    /// `{base}/sessions/{id}/{tail..}` with every segment percent-encoded.
    fn url(&self, tail: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::Bridge("bridge url cannot be a base".to_string()))?
            .pop_if_empty()
            .push("sessions")
            .push(&self.session_id)
            .extend(tail);
        Ok(url)
    }

    async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        tail: &[&str],
        body: &B,
    ) -> Result<Response, TransportError> {
        let response = self
            .client
            .post(self.url(tail)?)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(request_error)?;
        check_status(response).await
    }
}

fn request_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Bridge(format!("bridge request failed: {e}"))
    }
}

fn status_error(status: StatusCode, body: &str) -> TransportError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string());
    match status.as_u16() {
        401 => TransportError::LoggedOut,
        408 | 504 => TransportError::Timeout,
        400..=499 => TransportError::Rejected(format!("HTTP {status}: {detail}")),
        _ => TransportError::Bridge(format!("HTTP {status}: {detail}")),
    }
}

async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, body = %body, "bridge error response");
    Err(status_error(status, &body))
}

impl TransportConnector for BridgeConnector {
    type Transport = BridgeTransport;

    async fn connect(
        &self,
        options: ConnectOptions,
        events: EventSink,
    ) -> Result<BridgeTransport, TransportError> {
        let endpoints = SessionEndpoints {
            client: self.client.clone(),
            base: self.base.clone(),
            session_id: options.session_id,
            timeout: self.timeout,
        };

        let body = ConnectRequest {
            credentials: options.credentials.as_ref().map(encode_credentials),
        };
        endpoints.post_json(&["connect"], &body).await?;

        let request = self
            .client
            .get(endpoints.url(&["events"])?)
            .header(ACCEPT, "text/event-stream");
        let mut source = EventSource::new(request)
            .map_err(|e| TransportError::Bridge(format!("cannot open event stream: {e}")))?;
        source.set_retry_policy(Box::new(retry::Never));

        let cancel = CancellationToken::new();
        tracing::info!(
            session_id = %endpoints.session_id,
            generation = events.generation(),
            resumed = body.credentials.is_some(),
            "bridge session opened"
        );
        tokio::spawn(pump_events(source, events, cancel.clone()));

        Ok(BridgeTransport { endpoints, cancel })
    }
}

/// Forward bridge stream events to the session until the stream ends, a
/// close is reported, or the transport is dropped.
async fn pump_events(mut source: EventSource, sink: EventSink, cancel: CancellationToken) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = source.next() => next,
        };

        match next {
            Some(Ok(Event::Open)) => {
                tracing::debug!(generation = sink.generation(), "bridge event stream connected");
            }
            Some(Ok(Event::Message(message))) => match parse_event(&message.event, &message.data) {
                Ok(Some(event)) => {
                    let is_close = matches!(event, TransportEvent::Closed(_));
                    if !sink.emit(event) || is_close {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::trace!(event = %message.event, "ignoring bridge event");
                }
                Err(e) => {
                    tracing::warn!(event = %message.event, error = %e, "dropping malformed bridge event");
                }
            },
            Some(Err(reqwest_eventsource::Error::InvalidStatusCode(status, _)))
                if status == StatusCode::UNAUTHORIZED =>
            {
                sink.emit(TransportEvent::Closed(CloseReason::logged_out(
                    "bridge rejected the event stream",
                )));
                break;
            }
            Some(Err(e)) => {
                sink.emit(TransportEvent::Closed(CloseReason::transient(format!(
                    "bridge event stream failed: {e}"
                ))));
                break;
            }
            None => {
                sink.emit(TransportEvent::Closed(CloseReason::transient(
                    "bridge event stream ended",
                )));
                break;
            }
        }
    }
    source.close();
}

/// One bridge session for one connection generation.
#[derive(Debug)]
pub struct BridgeTransport {
    endpoints: SessionEndpoints,
    cancel: CancellationToken,
}

impl Drop for BridgeTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Transport for BridgeTransport {
    async fn send(
        &self,
        jid: &str,
        payload: &CanonicalPayload,
    ) -> Result<MessageReceipt, TransportError> {
        let response = self
            .endpoints
            .post_json(&["messages"], &SendRequest { jid, payload })
            .await?;
        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Bridge(format!("malformed send response: {e}")))?;

        Ok(MessageReceipt {
            message_id: body.message_id,
            jid: jid.to_string(),
            sent_at: Utc::now(),
        })
    }

    async fn request_pairing_code(
        &self,
        phone_number: &str,
        custom_code: Option<&str>,
    ) -> Result<String, TransportError> {
        let request = PairingCodeRequest {
            phone_number,
            custom_code,
        };
        let response = self.endpoints.post_json(&["pairing-code"], &request).await?;
        let body: PairingCodeResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Bridge(format!("malformed pairing response: {e}")))?;
        Ok(body.code)
    }

    async fn logout(&self) -> Result<(), TransportError> {
        self.endpoints
            .post_json(&["logout"], &serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn disconnect(&self) {
        self.cancel.cancel();

        let url = match self.endpoints.url(&[]) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "cannot build bridge session url");
                return;
            }
        };
        let result = self
            .endpoints
            .client
            .delete(url)
            .timeout(self.endpoints.timeout)
            .send()
            .await
            .map_err(request_error);
        match result {
            Ok(response) if response.status().is_success() || response.status() == StatusCode::NOT_FOUND => {}
            Ok(response) => {
                tracing::warn!(status = %response.status(), "bridge refused to close session");
            }
            Err(e) => tracing::warn!(error = %e, "failed to close bridge session"),
        }
    }

    async fn product_exists(&self, retailer_id: &str) -> Result<bool, TransportError> {
        let response = self
            .endpoints
            .client
            .get(self.endpoints.url(&["catalog", retailer_id])?)
            .timeout(self.endpoints.timeout)
            .send()
            .await
            .map_err(request_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(response).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::response::sse::{Event as SseEvent, Sse};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use chatgate_types::credential::CredentialSet;
    use chatgate_types::session::CloseKind;
    use serde_json::{Value, json};

    /// Requests seen by the fake bridge, as `(route, body)`.
    #[derive(Clone, Default)]
    struct FakeBridge {
        seen: Arc<Mutex<Vec<(String, Value)>>>,
        events: Arc<Mutex<Vec<(&'static str, String)>>>,
    }

    impl FakeBridge {
        fn record(&self, route: String, body: Value) {
            self.seen.lock().unwrap().push((route, body));
        }

        fn seen(&self) -> Vec<(String, Value)> {
            self.seen.lock().unwrap().clone()
        }
    }

    async fn connect_route(
        State(bridge): State<FakeBridge>,
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> AxumStatus {
        bridge.record(format!("connect:{id}"), body);
        AxumStatus::OK
    }

    async fn events_route(
        State(bridge): State<FakeBridge>,
    ) -> Sse<impl futures_util::Stream<Item = Result<SseEvent, Infallible>>> {
        let events: Vec<_> = bridge
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, data)| Ok::<_, Infallible>(SseEvent::default().event(*name).data(data.clone())))
            .collect();
        Sse::new(futures_util::stream::iter(events))
    }

    async fn messages_route(
        State(bridge): State<FakeBridge>,
        Json(body): Json<Value>,
    ) -> AxumResponse {
        bridge.record("messages".to_string(), body.clone());
        match body["payload"]["type"].as_str() {
            Some("product") => (
                AxumStatus::UNPROCESSABLE_ENTITY,
                Json(json!({"error": "catalog unavailable"})),
            )
                .into_response(),
            Some("sticker") => AxumStatus::UNAUTHORIZED.into_response(),
            _ => Json(json!({"messageId": "MSG-1"})).into_response(),
        }
    }

    async fn pairing_route(State(bridge): State<FakeBridge>, Json(body): Json<Value>) -> Json<Value> {
        bridge.record("pairing".to_string(), body);
        Json(json!({"code": "ABCD1234"}))
    }

    async fn logout_route(State(bridge): State<FakeBridge>) -> AxumStatus {
        bridge.record("logout".to_string(), Value::Null);
        AxumStatus::OK
    }

    async fn delete_route(State(bridge): State<FakeBridge>, Path(id): Path<String>) -> AxumStatus {
        bridge.record(format!("delete:{id}"), Value::Null);
        AxumStatus::NO_CONTENT
    }

    async fn catalog_route(Path((_id, retailer_id)): Path<(String, String)>) -> AxumStatus {
        if retailer_id == "SKU-1" {
            AxumStatus::OK
        } else {
            AxumStatus::NOT_FOUND
        }
    }

    async fn spawn_bridge(bridge: FakeBridge) -> BridgeConnector {
        let app = Router::new()
            .route("/sessions/{id}/connect", post(connect_route))
            .route("/sessions/{id}/events", get(events_route))
            .route("/sessions/{id}/messages", post(messages_route))
            .route("/sessions/{id}/pairing-code", post(pairing_route))
            .route("/sessions/{id}/logout", post(logout_route))
            .route("/sessions/{id}", delete(delete_route))
            .route("/sessions/{id}/catalog/{retailer_id}", get(catalog_route))
            .with_state(bridge);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        BridgeConnector::new(&BridgeConfig {
            base_url: format!("http://{addr}"),
            request_timeout_secs: 5,
        })
        .unwrap()
    }

    fn options(credentials: Option<CredentialSet>) -> ConnectOptions {
        ConnectOptions {
            session_id: "default".to_string(),
            credentials,
        }
    }

    async fn next_event(
        rx: &mut tokio::sync::mpsc::UnboundedReceiver<(u64, TransportEvent)>,
    ) -> (u64, TransportEvent) {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for a bridge event")
            .expect("event channel closed")
    }

    #[test]
    fn test_connector_rejects_bad_urls() {
        let bad = BridgeConfig {
            base_url: "not a url".to_string(),
            request_timeout_secs: 5,
        };
        assert!(matches!(BridgeConnector::new(&bad), Err(TransportError::Bridge(_))));

        let opaque = BridgeConfig {
            base_url: "mailto:bridge@example.com".to_string(),
            request_timeout_secs: 5,
        };
        assert!(BridgeConnector::new(&opaque).is_err());
    }

    #[test]
    fn test_status_error_mapping() {
        assert_eq!(status_error(StatusCode::UNAUTHORIZED, ""), TransportError::LoggedOut);
        assert_eq!(status_error(StatusCode::REQUEST_TIMEOUT, ""), TransportError::Timeout);
        assert_eq!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, r#"{"error":"no such product"}"#),
            TransportError::Rejected("HTTP 422 Unprocessable Entity: no such product".to_string())
        );
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "upstream down"),
            TransportError::Bridge(msg) if msg.contains("upstream down")
        ));
    }

    #[test]
    fn test_session_urls_are_percent_encoded() {
        let endpoints = SessionEndpoints {
            client: reqwest::Client::new(),
            base: Url::parse("http://bridge:8085/api/").unwrap(),
            session_id: "shop one".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(
            endpoints.url(&["catalog", "SKU/1"]).unwrap().as_str(),
            "http://bridge:8085/api/sessions/shop%20one/catalog/SKU%2F1"
        );
    }

    #[tokio::test]
    async fn connect_sends_credentials_and_pumps_events() {
        let bridge = FakeBridge::default();
        bridge.events.lock().unwrap().extend([
            ("qr", r#"{"qr":"QR-1"}"#.to_string()),
            ("creds", r#"{"credentials":{"creds.json":"YWJj"}}"#.to_string()),
            ("open", r#"{"jid":"15550001111@s.whatsapp.net"}"#.to_string()),
        ]);
        let connector = spawn_bridge(bridge.clone()).await;

        let mut creds = CredentialSet::new();
        creds.insert("creds.json", b"old".to_vec());
        let (sink, mut rx) = EventSink::channel(3);
        let _transport = connector.connect(options(Some(creds)), sink).await.unwrap();

        let seen = bridge.seen();
        assert_eq!(seen[0].0, "connect:default");
        assert_eq!(seen[0].1["credentials"]["creds.json"], "b2xk");

        assert_eq!(next_event(&mut rx).await, (3, TransportEvent::Qr("QR-1".to_string())));
        let (_, creds_event) = next_event(&mut rx).await;
        let TransportEvent::CredentialsUpdated(update) = creds_event else {
            panic!("expected credentials update, got {creds_event:?}");
        };
        assert_eq!(update.get("creds.json"), Some(&b"abc"[..]));
        assert_eq!(
            next_event(&mut rx).await.1,
            TransportEvent::Open {
                own_identity: Some("15550001111@s.whatsapp.net".to_string())
            }
        );

        // The fake stream ends after its last event.
        let (_, closed) = next_event(&mut rx).await;
        let TransportEvent::Closed(reason) = closed else {
            panic!("expected close, got {closed:?}");
        };
        assert_eq!(reason.kind(), CloseKind::Transient);
    }

    #[tokio::test]
    async fn close_event_ends_the_pump() {
        let bridge = FakeBridge::default();
        bridge.events.lock().unwrap().extend([
            ("close", r#"{"statusCode":401,"message":"revoked"}"#.to_string()),
            ("qr", r#"{"qr":"late"}"#.to_string()),
        ]);
        let connector = spawn_bridge(bridge).await;

        let (sink, mut rx) = EventSink::channel(1);
        let _transport = connector.connect(options(None), sink).await.unwrap();

        let (_, event) = next_event(&mut rx).await;
        assert_eq!(
            event,
            TransportEvent::Closed(CloseReason {
                status_code: Some(401),
                message: "revoked".to_string()
            })
        );
        // The pump exits and drops the sink.
        let rest = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert!(rest.is_none());
    }

    #[tokio::test]
    async fn send_maps_receipts_and_rejections() {
        let bridge = FakeBridge::default();
        let connector = spawn_bridge(bridge.clone()).await;
        let (sink, _rx) = EventSink::channel(1);
        let transport = connector.connect(options(None), sink).await.unwrap();

        let receipt = transport
            .send(
                "15551234567@s.whatsapp.net",
                &CanonicalPayload::Text {
                    text: "hi".to_string(),
                    mentions: Vec::new(),
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.message_id, "MSG-1");
        assert_eq!(receipt.jid, "15551234567@s.whatsapp.net");

        let messages: Vec<_> = bridge
            .seen()
            .into_iter()
            .filter(|(route, _)| route == "messages")
            .collect();
        assert_eq!(messages[0].1["jid"], "15551234567@s.whatsapp.net");
        assert_eq!(messages[0].1["payload"]["type"], "text");

        let rejected = transport
            .send(
                "15551234567@s.whatsapp.net",
                &CanonicalPayload::Product {
                    retailer_id: "SKU-1".to_string(),
                    title: "Mug".to_string(),
                    description: None,
                    price_amount_1000: 12_500,
                    currency_code: "USD".to_string(),
                    image_url: None,
                    url: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(rejected, TransportError::Rejected(msg) if msg.contains("catalog unavailable")));

        let logged_out = transport
            .send(
                "15551234567@s.whatsapp.net",
                &CanonicalPayload::Sticker {
                    url: "https://example.com/s.webp".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(logged_out, TransportError::LoggedOut);
    }

    #[tokio::test]
    async fn pairing_logout_catalog_and_disconnect() {
        let bridge = FakeBridge::default();
        let connector = spawn_bridge(bridge.clone()).await;
        let (sink, _rx) = EventSink::channel(1);
        let transport = connector.connect(options(None), sink).await.unwrap();

        let code = transport
            .request_pairing_code("15551234567", Some("WXYZ9876"))
            .await
            .unwrap();
        assert_eq!(code, "ABCD1234");

        assert!(transport.product_exists("SKU-1").await.unwrap());
        assert!(!transport.product_exists("SKU-404").await.unwrap());

        transport.logout().await.unwrap();
        transport.disconnect().await;

        let routes: Vec<String> = bridge.seen().into_iter().map(|(route, _)| route).collect();
        assert_eq!(routes, vec!["connect:default", "pairing", "logout", "delete:default"]);
        let pairing = &bridge.seen()[1].1;
        assert_eq!(pairing["phoneNumber"], "15551234567");
        assert_eq!(pairing["customCode"], "WXYZ9876");
    }

    #[tokio::test]
    async fn unreachable_bridge_fails_connect() {
        // Port 9 (discard) on loopback is not listening in test environments.
        let connector = BridgeConnector::new(&BridgeConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 1,
        })
        .unwrap();
        let (sink, _rx) = EventSink::channel(1);
        let err = connector.connect(options(None), sink).await.unwrap_err();
        assert!(matches!(err, TransportError::Bridge(_) | TransportError::Timeout));
    }
}
