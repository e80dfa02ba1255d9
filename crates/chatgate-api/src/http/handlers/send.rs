//! Single-message send handlers.
//!
//! Every `POST /api/send/<kind>` route takes `{ "to": "...", ...fields }`
//! with the kind fixed by the path. The catalog route goes through the
//! rich → degraded contract and reports which variant was delivered.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;

use chatgate_types::dispatch::{CatalogDelivery, SendReceipt};
use chatgate_types::error::GatewayError;
use chatgate_types::intent::{CatalogItemFields, IntentKind, OutboundIntent};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::json::ApiJson;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for `POST /api/send/catalog`.
#[derive(Debug, Deserialize)]
pub struct CatalogRequest {
    pub to: String,
    #[serde(flatten)]
    pub item: CatalogItemFields,
}

/// Build an intent from a path-fixed kind and a flat request body.
///
/// A `kind` field in the body is overridden by the path.
pub fn intent_from_body(kind: IntentKind, body: Value) -> Result<OutboundIntent, GatewayError> {
    let Value::Object(mut fields) = body else {
        return Err(GatewayError::invalid("request body must be a JSON object"));
    };
    fields.insert("kind".to_string(), Value::String(kind.to_string()));
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| GatewayError::invalid(format!("invalid {kind} request: {e}")))
}

async fn send_as(
    state: &AppState,
    kind: IntentKind,
    body: Value,
) -> Result<Json<ApiResponse<SendReceipt>>, AppError> {
    let start = Instant::now();
    let intent = intent_from_body(kind, body)?;
    let receipt = state.messaging.send(&intent).await?;
    Ok(Json(ApiResponse::success(receipt, start)))
}

macro_rules! send_handlers {
    ($($(#[$doc:meta])* $name:ident => $kind:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub async fn $name(
                State(state): State<AppState>,
                _auth: Authenticated,
                ApiJson(body): ApiJson<Value>,
            ) -> Result<Json<ApiResponse<SendReceipt>>, AppError> {
                send_as(&state, IntentKind::$kind, body).await
            }
        )*
    };
}

send_handlers! {
    /// POST /api/send/text
    text => Text,
    /// POST /api/send/media
    media => Media,
    /// POST /api/send/buttons/text
    button_text => ButtonText,
    /// POST /api/send/buttons/image
    button_image => ButtonImage,
    /// POST /api/send/buttons/video
    button_video => ButtonVideo,
    /// POST /api/send/interactive
    interactive => Interactive,
    /// POST /api/send/interactive/image
    interactive_image => InteractiveImage,
    /// POST /api/send/interactive/video
    interactive_video => InteractiveVideo,
    /// POST /api/send/contact
    contact => Contact,
    /// POST /api/send/location
    location => Location,
    /// POST /api/send/reaction
    reaction => Reaction,
    /// POST /api/send/sticker
    sticker => Sticker,
    /// POST /api/send/voice
    voice => Voice,
    /// POST /api/send/document
    document => Document,
    /// POST /api/send/invoice
    invoice => Invoice,
    /// POST /api/send/business-card
    business_card => BusinessCard,
    /// POST /api/send/survey
    survey => SurveyItem,
}

/// POST /api/send/catalog
pub async fn catalog(
    State(state): State<AppState>,
    _auth: Authenticated,
    ApiJson(body): ApiJson<CatalogRequest>,
) -> Result<Json<ApiResponse<CatalogDelivery>>, AppError> {
    let start = Instant::now();
    let delivery = state.messaging.send_catalog(&body.to, &body.item).await?;
    Ok(Json(ApiResponse::success(delivery, start)))
}
