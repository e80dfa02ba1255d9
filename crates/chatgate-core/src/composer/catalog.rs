//! Two-step catalog contract: a rich product message, and a plain-text
//! degraded variant built from the same validated fields.

use chatgate_types::error::GatewayError;
use chatgate_types::intent::{CatalogItemFields, IntentKind};
use chatgate_types::payload::CanonicalPayload;

use super::ComposedMessage;
use super::validate::{currency, format_cents, optional, optional_url, required, scaled_amount};

/// A validated catalog item addressed to one recipient.
///
/// Construction validates every field, so both variants are infallible.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPlan {
    jid: String,
    retailer_id: String,
    title: String,
    description: Option<String>,
    price_amount_1000: i64,
    price_cents: i64,
    currency: String,
    image_url: Option<String>,
    url: Option<String>,
}

impl CatalogPlan {
    pub(crate) fn new(
        jid: String,
        fields: &CatalogItemFields,
        default_currency: &str,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            jid,
            retailer_id: required(&fields.retailer_id, "retailerId")?,
            title: required(&fields.name, "name")?,
            description: optional(fields.description.as_ref()),
            price_amount_1000: scaled_amount(fields.price, 1000.0, "price")?,
            price_cents: scaled_amount(fields.price, 100.0, "price")?,
            currency: currency(fields.currency.as_ref(), default_currency)?,
            image_url: optional_url(fields.image_url.as_ref(), "imageUrl")?,
            url: optional_url(fields.url.as_ref(), "url")?,
        })
    }

    pub fn jid(&self) -> &str {
        &self.jid
    }

    pub fn retailer_id(&self) -> &str {
        &self.retailer_id
    }

    /// The native product message.
    pub fn rich(&self) -> ComposedMessage {
        ComposedMessage {
            jid: self.jid.clone(),
            kind: IntentKind::CatalogItem,
            payload: CanonicalPayload::Product {
                retailer_id: self.retailer_id.clone(),
                title: self.title.clone(),
                description: self.description.clone(),
                price_amount_1000: self.price_amount_1000,
                currency_code: self.currency.clone(),
                image_url: self.image_url.clone(),
                url: self.url.clone(),
            },
        }
    }

    /// A text summary of the same item, for recipients or accounts that
    /// cannot render product messages.
    pub fn degraded(&self) -> ComposedMessage {
        let mut lines = vec![format!("*{}*", self.title)];
        if let Some(description) = &self.description {
            lines.push(description.clone());
        }
        lines.push(format!(
            "Price: {} {}",
            format_cents(self.price_cents),
            self.currency
        ));
        lines.push(format!("Item: {}", self.retailer_id));
        if let Some(url) = &self.url {
            lines.push(url.clone());
        }

        ComposedMessage {
            jid: self.jid.clone(),
            kind: IntentKind::CatalogItem,
            payload: CanonicalPayload::Text {
                text: lines.join("\n"),
                mentions: Vec::new(),
            },
        }
    }
}
