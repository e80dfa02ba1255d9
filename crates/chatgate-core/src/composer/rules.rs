//! One compose rule per intent kind.

use std::collections::HashSet;

use serde_json::Value;

use chatgate_types::error::GatewayError;
use chatgate_types::intent::{
    BusinessCardFields, ButtonMediaFields, ButtonTextFields, CatalogItemFields, ContactFields,
    DocumentFields, InteractiveAction, InteractiveFields, InteractiveMediaFields, InvoiceFields,
    LocationFields, MediaFields, MediaType, ReactionFields, ReplyButton, StickerFields,
    SurveyFields, TextFields, VoiceFields,
};
use chatgate_types::payload::{
    CanonicalPayload, MediaHeader, MessageKey, PayloadButton, TemplateAction,
};

use super::catalog::CatalogPlan;
use super::target::normalize_target;
use super::validate::{
    count_between, currency, format_cents, http_url, optional, phone_digits, required,
    scaled_amount,
};
use super::vcard::VCard;

pub const MAX_BUTTONS: usize = 3;
pub const MAX_ACTIONS: usize = 3;
pub const MIN_SURVEY_OPTIONS: usize = 2;
pub const MAX_SURVEY_OPTIONS: usize = 12;
pub const MAX_INVOICE_ITEMS: usize = 50;

pub const DEFAULT_AUDIO_MIMETYPE: &str = "audio/mpeg";
pub const DEFAULT_VOICE_MIMETYPE: &str = "audio/ogg; codecs=opus";
pub const DEFAULT_DOCUMENT_MIMETYPE: &str = "application/octet-stream";

/// What a rule may consult besides its own fields.
#[derive(Debug, Clone, Copy)]
pub struct ComposeContext<'a> {
    /// Normalized recipient of the message.
    pub jid: &'a str,
    pub network_suffix: &'a str,
    pub default_currency: &'a str,
}

/// Translation of one kind's fields into a canonical payload.
pub trait ComposeRule {
    fn compose(&self, ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError>;
}

/// Header kind for the button and interactive variants that carry media.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Image,
    Video,
}

impl HeaderKind {
    fn header(self, url: String) -> MediaHeader {
        match self {
            HeaderKind::Image => MediaHeader::Image { url },
            HeaderKind::Video => MediaHeader::Video { url },
        }
    }
}

/// Fields shared by an image and a video variant, tagged with which one.
pub struct WithHeader<'a, F> {
    pub kind: HeaderKind,
    pub fields: &'a F,
}

impl ComposeRule for TextFields {
    fn compose(&self, ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        let text = required(&self.text, "text")?;
        let mentions = self
            .mentions
            .iter()
            .map(|m| normalize_target(m, ctx.network_suffix))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CanonicalPayload::Text { text, mentions })
    }
}

impl ComposeRule for MediaFields {
    fn compose(&self, _ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        let url = http_url(&self.url, "url")?;
        let caption = optional(self.caption.as_ref());
        let mimetype = optional(self.mimetype.as_ref());
        Ok(match self.media_type {
            MediaType::Image => CanonicalPayload::Image {
                url,
                caption,
                mimetype,
            },
            MediaType::Video => CanonicalPayload::Video {
                url,
                caption,
                mimetype,
            },
            MediaType::Audio => CanonicalPayload::Audio {
                url,
                mimetype: mimetype.unwrap_or_else(|| DEFAULT_AUDIO_MIMETYPE.to_string()),
                ptt: false,
            },
            MediaType::Document => CanonicalPayload::Document {
                file_name: optional(self.file_name.as_ref())
                    .unwrap_or_else(|| file_name_from_url(&url)),
                url,
                mimetype: mimetype.unwrap_or_else(|| DEFAULT_DOCUMENT_MIMETYPE.to_string()),
                caption,
            },
        })
    }
}

fn file_name_from_url(url: &str) -> String {
    url.split_once("://")
        .map_or(url, |(_, rest)| rest)
        .split(['?', '#'])
        .next()
        .and_then(|rest| rest.split_once('/'))
        .and_then(|(_, path)| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("document")
        .to_string()
}

fn reply_buttons(buttons: &[ReplyButton]) -> Result<Vec<PayloadButton>, GatewayError> {
    count_between(buttons.len(), 1, MAX_BUTTONS, "buttons")?;
    buttons
        .iter()
        .enumerate()
        .map(|(i, button)| {
            Ok(PayloadButton {
                id: optional(button.id.as_ref()).unwrap_or_else(|| format!("btn-{}", i + 1)),
                display_text: required(&button.text, &format!("buttons[{i}].text"))?,
            })
        })
        .collect()
}

impl ComposeRule for ButtonTextFields {
    fn compose(&self, _ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        Ok(CanonicalPayload::Buttons {
            text: required(&self.text, "text")?,
            footer: optional(self.footer.as_ref()),
            header: None,
            buttons: reply_buttons(&self.buttons)?,
        })
    }
}

impl ComposeRule for WithHeader<'_, ButtonMediaFields> {
    fn compose(&self, _ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        let f = self.fields;
        Ok(CanonicalPayload::Buttons {
            text: required(&f.caption, "caption")?,
            footer: optional(f.footer.as_ref()),
            header: Some(self.kind.header(http_url(&f.url, "url")?)),
            buttons: reply_buttons(&f.buttons)?,
        })
    }
}

fn template_actions(actions: &[InteractiveAction]) -> Result<Vec<TemplateAction>, GatewayError> {
    count_between(actions.len(), 1, MAX_ACTIONS, "actions")?;
    actions
        .iter()
        .enumerate()
        .map(|(i, action)| {
            let index = i as u32 + 1;
            Ok(match action {
                InteractiveAction::Url { text, url } => TemplateAction::Url {
                    index,
                    display_text: required(text, &format!("actions[{i}].text"))?,
                    url: http_url(url, &format!("actions[{i}].url"))?,
                },
                InteractiveAction::Call { text, phone_number } => TemplateAction::Call {
                    index,
                    display_text: required(text, &format!("actions[{i}].text"))?,
                    phone_number: format!(
                        "+{}",
                        phone_digits(phone_number, &format!("actions[{i}].phoneNumber"))?
                    ),
                },
                InteractiveAction::QuickReply { text, id } => TemplateAction::QuickReply {
                    index,
                    display_text: required(text, &format!("actions[{i}].text"))?,
                    id: optional(id.as_ref()).unwrap_or_else(|| format!("quick-{index}")),
                },
            })
        })
        .collect()
}

impl ComposeRule for InteractiveFields {
    fn compose(&self, _ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        Ok(CanonicalPayload::Template {
            text: required(&self.text, "text")?,
            title: optional(self.title.as_ref()),
            footer: optional(self.footer.as_ref()),
            header: None,
            actions: template_actions(&self.actions)?,
        })
    }
}

impl ComposeRule for WithHeader<'_, InteractiveMediaFields> {
    fn compose(&self, _ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        let f = self.fields;
        Ok(CanonicalPayload::Template {
            text: required(&f.text, "text")?,
            title: None,
            footer: optional(f.footer.as_ref()),
            header: Some(self.kind.header(http_url(&f.url, "url")?)),
            actions: template_actions(&f.actions)?,
        })
    }
}

impl ComposeRule for ContactFields {
    fn compose(&self, _ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        let display_name = required(&self.full_name, "fullName")?;
        let digits = phone_digits(&self.phone_number, "phoneNumber")?;
        let vcard = VCard::new(&display_name)
            .organization(optional(self.organization.as_ref()).as_deref())
            .phone(&digits)
            .build();
        Ok(CanonicalPayload::Contact {
            display_name,
            vcard,
        })
    }
}

impl ComposeRule for BusinessCardFields {
    fn compose(&self, _ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        let display_name = required(&self.name, "name")?;
        let digits = phone_digits(&self.phone_number, "phoneNumber")?;
        let vcard = VCard::new(&display_name)
            .organization(optional(self.organization.as_ref()).as_deref())
            .title(optional(self.title.as_ref()).as_deref())
            .phone(&digits)
            .email(optional(self.email.as_ref()).as_deref())
            .website(optional(self.website.as_ref()).as_deref())
            .address(optional(self.address.as_ref()).as_deref())
            .build();
        Ok(CanonicalPayload::Contact {
            display_name,
            vcard,
        })
    }
}

fn coordinate(value: &Value, field: &str, limit: f64) -> Result<f64, GatewayError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() && v.abs() <= limit => Ok(v),
        Some(_) => Err(GatewayError::invalid(format!(
            "'{field}' must be between -{limit} and {limit}"
        ))),
        None => Err(GatewayError::invalid(format!("'{field}' must be a number"))),
    }
}

impl ComposeRule for LocationFields {
    fn compose(&self, _ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        Ok(CanonicalPayload::Location {
            degrees_latitude: coordinate(&self.latitude, "latitude", 90.0)?,
            degrees_longitude: coordinate(&self.longitude, "longitude", 180.0)?,
            name: optional(self.name.as_ref()),
            address: optional(self.address.as_ref()),
        })
    }
}

impl ComposeRule for ReactionFields {
    fn compose(&self, ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        Ok(CanonicalPayload::Reaction {
            key: MessageKey {
                remote_jid: ctx.jid.to_string(),
                id: required(&self.message_id, "messageId")?,
                from_me: self.from_me,
            },
            text: self.emoji.trim().to_string(),
        })
    }
}

impl ComposeRule for StickerFields {
    fn compose(&self, _ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        Ok(CanonicalPayload::Sticker {
            url: http_url(&self.url, "url")?,
        })
    }
}

impl ComposeRule for VoiceFields {
    fn compose(&self, _ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        Ok(CanonicalPayload::Audio {
            url: http_url(&self.url, "url")?,
            mimetype: optional(self.mimetype.as_ref())
                .unwrap_or_else(|| DEFAULT_VOICE_MIMETYPE.to_string()),
            ptt: true,
        })
    }
}

impl ComposeRule for DocumentFields {
    fn compose(&self, _ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        Ok(CanonicalPayload::Document {
            url: http_url(&self.url, "url")?,
            file_name: required(&self.file_name, "fileName")?,
            mimetype: optional(self.mimetype.as_ref())
                .unwrap_or_else(|| DEFAULT_DOCUMENT_MIMETYPE.to_string()),
            caption: optional(self.caption.as_ref()),
        })
    }
}

impl ComposeRule for InvoiceFields {
    fn compose(&self, ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        let number = required(&self.invoice_number, "invoiceNumber")?;
        count_between(self.items.len(), 1, MAX_INVOICE_ITEMS, "items")?;
        let currency = currency(self.currency.as_ref(), ctx.default_currency)?;

        let mut lines = vec![format!("*Invoice {number}*")];
        if let Some(due) = optional(self.due_date.as_ref()) {
            lines.push(format!("Due: {due}"));
        }
        lines.push(String::new());

        let mut total: i64 = 0;
        for (i, item) in self.items.iter().enumerate() {
            let name = required(&item.name, &format!("items[{i}].name"))?;
            if item.quantity == 0 {
                return Err(GatewayError::invalid(format!(
                    "'items[{i}].quantity' must be at least 1"
                )));
            }
            let unit = scaled_amount(item.unit_price, 100.0, &format!("items[{i}].unitPrice"))?;
            let line_total = unit.saturating_mul(i64::from(item.quantity));
            total = total.saturating_add(line_total);
            lines.push(format!(
                "{}. {name} x{} @ {} = {}",
                i + 1,
                item.quantity,
                format_cents(unit),
                format_cents(line_total)
            ));
        }

        lines.push(String::new());
        lines.push(format!("*Total: {} {currency}*", format_cents(total)));
        if let Some(note) = optional(self.note.as_ref()) {
            lines.push(String::new());
            lines.push(note);
        }

        Ok(CanonicalPayload::Text {
            text: lines.join("\n"),
            mentions: Vec::new(),
        })
    }
}

impl ComposeRule for CatalogItemFields {
    fn compose(&self, ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        Ok(CatalogPlan::new(ctx.jid.to_string(), self, ctx.default_currency)?
            .rich()
            .payload)
    }
}

impl ComposeRule for SurveyFields {
    fn compose(&self, _ctx: &ComposeContext<'_>) -> Result<CanonicalPayload, GatewayError> {
        let name = required(&self.question, "question")?;
        count_between(
            self.options.len(),
            MIN_SURVEY_OPTIONS,
            MAX_SURVEY_OPTIONS,
            "options",
        )?;

        let mut seen = HashSet::new();
        let mut values = Vec::with_capacity(self.options.len());
        for (i, option) in self.options.iter().enumerate() {
            let option = required(option, &format!("options[{i}]"))?;
            if !seen.insert(option.clone()) {
                return Err(GatewayError::invalid(format!(
                    "duplicate survey option '{option}'"
                )));
            }
            values.push(option);
        }

        let selectable_count = self.selectable_count.unwrap_or(1);
        if selectable_count == 0 || selectable_count as usize > values.len() {
            return Err(GatewayError::invalid(format!(
                "'selectableCount' must be between 1 and {}",
                values.len()
            )));
        }

        Ok(CanonicalPayload::Poll {
            name,
            values,
            selectable_count,
        })
    }
}
