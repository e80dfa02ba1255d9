//! Protocol bridge wire types.
//!
//! Request/response bodies of the bridge sidecar's HTTP API and the payloads
//! of its `events` stream. Field names are camelCase on the wire. Credential
//! blobs travel base64-encoded.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use chatgate_core::transport::TransportEvent;
use chatgate_types::credential::CredentialSet;
use chatgate_types::error::TransportError;
use chatgate_types::payload::CanonicalPayload;
use chatgate_types::session::CloseReason;

/// Body of `POST /sessions/{id}/connect`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<BTreeMap<String, String>>,
}

/// Body of `POST /sessions/{id}/messages`.
#[derive(Debug, Serialize)]
pub struct SendRequest<'a> {
    pub jid: &'a str,
    pub payload: &'a CanonicalPayload,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub message_id: String,
}

/// Body of `POST /sessions/{id}/pairing-code`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingCodeRequest<'a> {
    pub phone_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_code: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairingCodeResponse {
    pub code: String,
}

/// Error body the bridge returns on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Event stream payloads
//
// The SSE `event:` field names the event (`qr`, `open`, `close`, `creds`),
// `data:` carries the JSON payload for that name.
// ---------------------------------------------------------------------------

/// Payload for `event: qr`.
#[derive(Debug, Clone, Deserialize)]
pub struct QrPayload {
    pub qr: String,
}

/// Payload for `event: open`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenPayload {
    #[serde(default)]
    pub jid: Option<String>,
}

/// Payload for `event: close`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosePayload {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: String,
}

/// Payload for `event: creds`: only the entries that changed.
#[derive(Debug, Clone, Deserialize)]
pub struct CredsPayload {
    pub credentials: BTreeMap<String, String>,
}

pub fn encode_credentials(credentials: &CredentialSet) -> BTreeMap<String, String> {
    credentials
        .iter()
        .map(|(name, data)| (name.to_string(), STANDARD.encode(data)))
        .collect()
}

pub fn decode_credentials(
    encoded: BTreeMap<String, String>,
) -> Result<CredentialSet, TransportError> {
    encoded
        .into_iter()
        .map(|(name, value)| {
            STANDARD
                .decode(value.as_bytes())
                .map(|data| (name.clone(), data))
                .map_err(|e| TransportError::Bridge(format!("credential '{name}' is not base64: {e}")))
        })
        .collect()
}

fn parse_json<'a, T: Deserialize<'a>>(name: &str, data: &'a str) -> Result<T, TransportError> {
    serde_json::from_str(data)
        .map_err(|e| TransportError::Bridge(format!("malformed '{name}' event: {e}")))
}

/// Map one bridge stream event to a [`TransportEvent`].
///
/// Returns `Ok(None)` for event names the gateway does not consume.
pub fn parse_event(name: &str, data: &str) -> Result<Option<TransportEvent>, TransportError> {
    let event = match name {
        "qr" => TransportEvent::Qr(parse_json::<QrPayload>(name, data)?.qr),
        "open" => {
            let payload: OpenPayload = if data.trim().is_empty() {
                OpenPayload::default()
            } else {
                parse_json(name, data)?
            };
            TransportEvent::Open {
                own_identity: payload.jid,
            }
        }
        "close" => {
            let payload: ClosePayload = parse_json(name, data)?;
            TransportEvent::Closed(CloseReason {
                status_code: payload.status_code,
                message: payload.message,
            })
        }
        "creds" => {
            let payload: CredsPayload = parse_json(name, data)?;
            TransportEvent::CredentialsUpdated(decode_credentials(payload.credentials)?)
        }
        _ => return Ok(None),
    };
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatgate_types::session::CloseKind;

    #[test]
    fn test_connect_request_encodes_credentials() {
        let mut creds = CredentialSet::new();
        creds.insert("creds.json", b"abc".to_vec());
        let req = ConnectRequest {
            credentials: Some(encode_credentials(&creds)),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["credentials"]["creds.json"], "YWJj");

        let fresh = serde_json::to_value(ConnectRequest { credentials: None }).unwrap();
        assert!(fresh.get("credentials").is_none());
    }

    #[test]
    fn test_pairing_request_uses_camel_case() {
        let req = PairingCodeRequest {
            phone_number: "15551234567",
            custom_code: Some("WXYZ9876"),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["phoneNumber"], "15551234567");
        assert_eq!(json["customCode"], "WXYZ9876");
    }

    #[test]
    fn test_send_response_parses_message_id() {
        let resp: SendResponse = serde_json::from_str(r#"{"messageId":"3EB0ABC"}"#).unwrap();
        assert_eq!(resp.message_id, "3EB0ABC");
    }

    #[test]
    fn test_parse_qr_and_open_events() {
        assert_eq!(
            parse_event("qr", r#"{"qr":"2@abc,def"}"#).unwrap(),
            Some(TransportEvent::Qr("2@abc,def".to_string()))
        );
        assert_eq!(
            parse_event("open", r#"{"jid":"15551234567@s.whatsapp.net"}"#).unwrap(),
            Some(TransportEvent::Open {
                own_identity: Some("15551234567@s.whatsapp.net".to_string())
            })
        );
        assert_eq!(
            parse_event("open", "").unwrap(),
            Some(TransportEvent::Open { own_identity: None })
        );
    }

    #[test]
    fn test_parse_close_event_keeps_status_code() {
        let Some(TransportEvent::Closed(reason)) =
            parse_event("close", r#"{"statusCode":401,"message":"revoked"}"#).unwrap()
        else {
            panic!("expected close event");
        };
        assert_eq!(reason.kind(), CloseKind::LoggedOut);
        assert_eq!(reason.message, "revoked");

        let Some(TransportEvent::Closed(reason)) = parse_event("close", "{}").unwrap() else {
            panic!("expected close event");
        };
        assert_eq!(reason.kind(), CloseKind::Transient);
    }

    #[test]
    fn test_parse_creds_event_decodes_base64() {
        let Some(TransportEvent::CredentialsUpdated(set)) =
            parse_event("creds", r#"{"credentials":{"pre-key-1":"AAH/"}}"#).unwrap()
        else {
            panic!("expected creds event");
        };
        assert_eq!(set.get("pre-key-1"), Some(&[0u8, 1, 255][..]));

        assert!(parse_event("creds", r#"{"credentials":{"k":"!!"}}"#).is_err());
    }

    #[test]
    fn test_unknown_and_malformed_events() {
        assert_eq!(parse_event("presence", "{}").unwrap(), None);
        assert!(matches!(
            parse_event("qr", "not json"),
            Err(TransportError::Bridge(_))
        ));
    }
}
