//! Message composition: outbound intents to canonical payloads.
//!
//! Composition is pure. Every intent kind maps to exactly one
//! [`ComposeRule`]; validation failures surface as `InvalidIntent` or
//! `InvalidTarget` before anything reaches a transport.

pub mod catalog;
pub mod rules;
pub mod target;
pub mod vcard;
mod validate;

use chatgate_types::error::GatewayError;
use chatgate_types::intent::{
    AlbumItem, AlbumMediaType, CatalogItemFields, IntentBody, IntentKind, OutboundIntent,
};
use chatgate_types::payload::CanonicalPayload;

pub use catalog::CatalogPlan;
pub use rules::{ComposeContext, ComposeRule, HeaderKind, WithHeader};
pub use target::normalize_target;

use validate::{http_url, optional};

/// A payload ready for submission to a specific recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedMessage {
    pub jid: String,
    pub kind: IntentKind,
    pub payload: CanonicalPayload,
}

/// Stateless translator configured with the network suffix and currency default.
#[derive(Debug, Clone)]
pub struct MessageComposer {
    network_suffix: String,
    default_currency: String,
}

impl MessageComposer {
    pub fn new(network_suffix: impl Into<String>) -> Self {
        Self {
            network_suffix: network_suffix.into(),
            default_currency: "USD".to_string(),
        }
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn resolve_target(&self, raw: &str) -> Result<String, GatewayError> {
        normalize_target(raw, &self.network_suffix)
    }

    pub fn compose(&self, intent: &OutboundIntent) -> Result<ComposedMessage, GatewayError> {
        self.compose_body(&intent.target, &intent.body)
    }

    /// Compose `body` for the raw recipient `target`.
    pub fn compose_body(
        &self,
        target: &str,
        body: &IntentBody,
    ) -> Result<ComposedMessage, GatewayError> {
        let jid = self.resolve_target(target)?;
        let ctx = self.context(&jid);
        let payload = match body {
            IntentBody::Text(f) => f.compose(&ctx),
            IntentBody::Media(f) => f.compose(&ctx),
            IntentBody::ButtonText(f) => f.compose(&ctx),
            IntentBody::ButtonImage(f) => with_header(HeaderKind::Image, f).compose(&ctx),
            IntentBody::ButtonVideo(f) => with_header(HeaderKind::Video, f).compose(&ctx),
            IntentBody::Interactive(f) => f.compose(&ctx),
            IntentBody::InteractiveImage(f) => with_header(HeaderKind::Image, f).compose(&ctx),
            IntentBody::InteractiveVideo(f) => with_header(HeaderKind::Video, f).compose(&ctx),
            IntentBody::Contact(f) => f.compose(&ctx),
            IntentBody::Location(f) => f.compose(&ctx),
            IntentBody::Reaction(f) => f.compose(&ctx),
            IntentBody::Sticker(f) => f.compose(&ctx),
            IntentBody::Voice(f) => f.compose(&ctx),
            IntentBody::Document(f) => f.compose(&ctx),
            IntentBody::Invoice(f) => f.compose(&ctx),
            IntentBody::BusinessCard(f) => f.compose(&ctx),
            IntentBody::CatalogItem(f) => f.compose(&ctx),
            IntentBody::SurveyItem(f) => f.compose(&ctx),
        }?;
        Ok(ComposedMessage {
            kind: body.kind(),
            jid,
            payload,
        })
    }

    /// Validate a catalog item for the rich-then-degraded contract.
    pub fn catalog_plan(
        &self,
        target: &str,
        fields: &CatalogItemFields,
    ) -> Result<CatalogPlan, GatewayError> {
        let jid = self.resolve_target(target)?;
        CatalogPlan::new(jid, fields, &self.default_currency)
    }

    /// Compose one album entry for an already-resolved recipient.
    pub fn compose_album_item(
        &self,
        jid: &str,
        index: usize,
        item: &AlbumItem,
    ) -> Result<ComposedMessage, GatewayError> {
        let url = http_url(&item.url, &format!("items[{index}].url"))?;
        let caption = optional(item.caption.as_ref());
        let payload = match item.media_type {
            AlbumMediaType::Image => CanonicalPayload::Image {
                url,
                caption,
                mimetype: None,
            },
            AlbumMediaType::Video => CanonicalPayload::Video {
                url,
                caption,
                mimetype: None,
            },
        };
        Ok(ComposedMessage {
            jid: jid.to_string(),
            kind: IntentKind::Media,
            payload,
        })
    }

    fn context<'a>(&'a self, jid: &'a str) -> ComposeContext<'a> {
        ComposeContext {
            jid,
            network_suffix: &self.network_suffix,
            default_currency: &self.default_currency,
        }
    }
}

fn with_header<F>(kind: HeaderKind, fields: &F) -> WithHeader<'_, F> {
    WithHeader { kind, fields }
}
