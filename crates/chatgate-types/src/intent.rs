//! Outbound intent types: caller-supplied descriptions of a message to send,
//! before translation into a canonical payload.
//!
//! Wire shape is flat JSON with a `kind` discriminator and camelCase fields:
//!
//! ```json
//! { "to": "+1 555 123 4567", "kind": "location", "latitude": 52.37, "longitude": 4.89 }
//! ```

use serde::{Deserialize, Serialize};

use std::fmt;

/// A request to send one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundIntent {
    /// Recipient identifier in raw form (digits, `+`-prefixed, or qualified).
    #[serde(rename = "to")]
    pub target: String,
    #[serde(flatten)]
    pub body: IntentBody,
}

impl OutboundIntent {
    pub fn new(target: impl Into<String>, body: impl Into<IntentBody>) -> Self {
        Self {
            target: target.into(),
            body: body.into(),
        }
    }

    pub fn kind(&self) -> IntentKind {
        self.body.kind()
    }
}

/// Kind-specific attributes of an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IntentBody {
    Text(TextFields),
    Media(MediaFields),
    ButtonText(ButtonTextFields),
    ButtonImage(ButtonMediaFields),
    ButtonVideo(ButtonMediaFields),
    Interactive(InteractiveFields),
    InteractiveImage(InteractiveMediaFields),
    InteractiveVideo(InteractiveMediaFields),
    Contact(ContactFields),
    Location(LocationFields),
    Reaction(ReactionFields),
    Sticker(StickerFields),
    Voice(VoiceFields),
    Document(DocumentFields),
    Invoice(InvoiceFields),
    BusinessCard(BusinessCardFields),
    CatalogItem(CatalogItemFields),
    SurveyItem(SurveyFields),
}

impl IntentBody {
    pub fn kind(&self) -> IntentKind {
        match self {
            IntentBody::Text(_) => IntentKind::Text,
            IntentBody::Media(_) => IntentKind::Media,
            IntentBody::ButtonText(_) => IntentKind::ButtonText,
            IntentBody::ButtonImage(_) => IntentKind::ButtonImage,
            IntentBody::ButtonVideo(_) => IntentKind::ButtonVideo,
            IntentBody::Interactive(_) => IntentKind::Interactive,
            IntentBody::InteractiveImage(_) => IntentKind::InteractiveImage,
            IntentBody::InteractiveVideo(_) => IntentKind::InteractiveVideo,
            IntentBody::Contact(_) => IntentKind::Contact,
            IntentBody::Location(_) => IntentKind::Location,
            IntentBody::Reaction(_) => IntentKind::Reaction,
            IntentBody::Sticker(_) => IntentKind::Sticker,
            IntentBody::Voice(_) => IntentKind::Voice,
            IntentBody::Document(_) => IntentKind::Document,
            IntentBody::Invoice(_) => IntentKind::Invoice,
            IntentBody::BusinessCard(_) => IntentKind::BusinessCard,
            IntentBody::CatalogItem(_) => IntentKind::CatalogItem,
            IntentBody::SurveyItem(_) => IntentKind::SurveyItem,
        }
    }
}

/// Discriminator of an intent, used for logging and rule lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntentKind {
    Text,
    Media,
    ButtonText,
    ButtonImage,
    ButtonVideo,
    Interactive,
    InteractiveImage,
    InteractiveVideo,
    Contact,
    Location,
    Reaction,
    Sticker,
    Voice,
    Document,
    Invoice,
    BusinessCard,
    CatalogItem,
    SurveyItem,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentKind::Text => "text",
            IntentKind::Media => "media",
            IntentKind::ButtonText => "buttonText",
            IntentKind::ButtonImage => "buttonImage",
            IntentKind::ButtonVideo => "buttonVideo",
            IntentKind::Interactive => "interactive",
            IntentKind::InteractiveImage => "interactiveImage",
            IntentKind::InteractiveVideo => "interactiveVideo",
            IntentKind::Contact => "contact",
            IntentKind::Location => "location",
            IntentKind::Reaction => "reaction",
            IntentKind::Sticker => "sticker",
            IntentKind::Voice => "voice",
            IntentKind::Document => "document",
            IntentKind::Invoice => "invoice",
            IntentKind::BusinessCard => "businessCard",
            IntentKind::CatalogItem => "catalogItem",
            IntentKind::SurveyItem => "surveyItem",
        };
        f.write_str(s)
    }
}

macro_rules! into_body {
    ($($fields:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$fields> for IntentBody {
                fn from(fields: $fields) -> Self {
                    IntentBody::$variant(fields)
                }
            }
        )*
    };
}

into_body! {
    TextFields => Text,
    MediaFields => Media,
    ButtonTextFields => ButtonText,
    InteractiveFields => Interactive,
    ContactFields => Contact,
    LocationFields => Location,
    ReactionFields => Reaction,
    StickerFields => Sticker,
    VoiceFields => Voice,
    DocumentFields => Document,
    InvoiceFields => Invoice,
    BusinessCardFields => BusinessCard,
    CatalogItemFields => CatalogItem,
    SurveyFields => SurveyItem,
}

// ---------------------------------------------------------------------------
// Field structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFields {
    #[serde(default)]
    pub text: String,
    /// Raw identifiers to mention; normalized like targets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFields {
    pub media_type: MediaType,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// A quick-reply button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyButton {
    /// Button id echoed back on tap; defaults to `btn-<n>` (1-based).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonTextFields {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(default)]
    pub buttons: Vec<ReplyButton>,
}

/// Buttons attached to an image or video header.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonMediaFields {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(default)]
    pub buttons: Vec<ReplyButton>,
}

/// A template action button on an interactive message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InteractiveAction {
    #[serde(rename_all = "camelCase")]
    Url { text: String, url: String },
    #[serde(rename_all = "camelCase")]
    Call { text: String, phone_number: String },
    #[serde(rename_all = "camelCase")]
    QuickReply {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveFields {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(default)]
    pub actions: Vec<InteractiveAction>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveMediaFields {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(default)]
    pub actions: Vec<InteractiveAction>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFields {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

/// Coordinates arrive as JSON values so that strings and other malformed
/// inputs surface as composition errors rather than body rejections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFields {
    #[serde(default)]
    pub latitude: serde_json::Value,
    #[serde(default)]
    pub longitude: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionFields {
    #[serde(default)]
    pub message_id: String,
    /// Empty string removes an existing reaction.
    #[serde(default)]
    pub emoji: String,
    #[serde(default = "default_true")]
    pub from_me: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerFields {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceFields {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    #[serde(default)]
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFields {
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub items: Vec<InvoiceLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessCardFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItemFields {
    #[serde(default)]
    pub retailer_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price in major currency units (e.g. `12.5` for 12.50 USD).
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyFields {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable_count: Option<u32>,
}

/// Media kinds accepted inside an album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumMediaType {
    Image,
    Video,
}

/// One entry of a media album request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumItem {
    pub media_type: AlbumMediaType,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}
