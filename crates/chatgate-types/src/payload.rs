//! Canonical, protocol-shaped payloads handed to the transport.
//!
//! Produced by the composer from an [`crate::intent::OutboundIntent`]. The
//! dispatch layer never looks inside; it only hands a payload to the
//! transport and reads back a receipt or an error.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalPayload {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        mentions: Vec<String>,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mimetype: Option<String>,
    },
    Video {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mimetype: Option<String>,
    },
    Audio {
        url: String,
        mimetype: String,
        /// Push-to-talk (voice note) rendering.
        ptt: bool,
    },
    Document {
        url: String,
        file_name: String,
        mimetype: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Sticker {
        url: String,
    },
    Buttons {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        footer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        header: Option<MediaHeader>,
        buttons: Vec<PayloadButton>,
    },
    Template {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        footer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        header: Option<MediaHeader>,
        actions: Vec<TemplateAction>,
    },
    Contact {
        display_name: String,
        vcard: String,
    },
    Location {
        degrees_latitude: f64,
        degrees_longitude: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<String>,
    },
    Reaction {
        key: MessageKey,
        text: String,
    },
    Product {
        retailer_id: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        /// Price in thousandths of the major unit.
        price_amount_1000: i64,
        currency_code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Poll {
        name: String,
        values: Vec<String>,
        selectable_count: u32,
    },
}

impl CanonicalPayload {
    /// Short variant name for logs.
    pub fn variant_name(&self) -> &'static str {
        match self {
            CanonicalPayload::Text { .. } => "text",
            CanonicalPayload::Image { .. } => "image",
            CanonicalPayload::Video { .. } => "video",
            CanonicalPayload::Audio { .. } => "audio",
            CanonicalPayload::Document { .. } => "document",
            CanonicalPayload::Sticker { .. } => "sticker",
            CanonicalPayload::Buttons { .. } => "buttons",
            CanonicalPayload::Template { .. } => "template",
            CanonicalPayload::Contact { .. } => "contact",
            CanonicalPayload::Location { .. } => "location",
            CanonicalPayload::Reaction { .. } => "reaction",
            CanonicalPayload::Product { .. } => "product",
            CanonicalPayload::Poll { .. } => "poll",
        }
    }
}

/// Image or video shown above a button/template message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaHeader {
    Image { url: String },
    Video { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadButton {
    pub id: String,
    pub display_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateAction {
    Url {
        index: u32,
        display_text: String,
        url: String,
    },
    Call {
        index: u32,
        display_text: String,
        phone_number: String,
    },
    QuickReply {
        index: u32,
        display_text: String,
        id: String,
    },
}

/// Reference to a previously sent or received message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageKey {
    pub remote_jid: String,
    pub id: String,
    pub from_me: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_type_tag() {
        let payload = CanonicalPayload::Poll {
            name: "Lunch?".to_string(),
            values: vec!["Yes".to_string(), "No".to_string()],
            selectable_count: 1,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "poll");
        assert_eq!(json["selectable_count"], 1);
        assert_eq!(payload.variant_name(), "poll");
    }

    #[test]
    fn test_text_payload_omits_empty_mentions() {
        let payload = CanonicalPayload::Text {
            text: "hi".to_string(),
            mentions: Vec::new(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("mentions"));
    }
}
