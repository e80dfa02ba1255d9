//! Messaging use cases: connectivity gate, then composition, then dispatch.
//!
//! Generic over [`Submitter`] so the HTTP layer uses the session manager and
//! tests use a recording fake.

use tracing::info;

use chatgate_types::dispatch::{CatalogDelivery, DispatchReport, SendReceipt};
use chatgate_types::error::GatewayError;
use chatgate_types::intent::{AlbumItem, CatalogItemFields, IntentBody, OutboundIntent};

use crate::composer::MessageComposer;
use crate::dispatch::{DispatchBatch, DispatchQueue, Submitter};

pub struct MessagingService<S: Submitter> {
    submitter: S,
    composer: MessageComposer,
    queue: DispatchQueue,
}

impl<S: Submitter> MessagingService<S> {
    pub fn new(submitter: S, composer: MessageComposer, queue: DispatchQueue) -> Self {
        Self {
            submitter,
            composer,
            queue,
        }
    }

    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    /// Send one message. Catalog items sent this way get no text fallback;
    /// use [`Self::send_catalog`] for that.
    pub async fn send(&self, intent: &OutboundIntent) -> Result<SendReceipt, GatewayError> {
        self.submitter.ready()?;
        let message = self.composer.compose(intent)?;
        let receipt = self.queue.send_one(&self.submitter, &message).await?;
        Ok(SendReceipt {
            kind: message.kind,
            receipt,
        })
    }

    pub async fn send_catalog(
        &self,
        target: &str,
        item: &CatalogItemFields,
    ) -> Result<CatalogDelivery, GatewayError> {
        self.submitter.ready()?;
        let plan = self.composer.catalog_plan(target, item)?;
        self.queue.send_catalog(&self.submitter, &plan).await
    }

    /// Send the same body to every recipient, paced by the bulk interval.
    ///
    /// Every recipient is composed before the first submission, so one bad
    /// recipient fails the whole request.
    pub async fn send_bulk(
        &self,
        recipients: &[String],
        body: &IntentBody,
        interval_ms: Option<u64>,
    ) -> Result<DispatchReport, GatewayError> {
        let interval = self.queue.bulk_interval(interval_ms)?;
        if recipients.is_empty() {
            return Err(GatewayError::invalid("'recipients' must not be empty"));
        }
        self.submitter.ready()?;

        let items = recipients
            .iter()
            .map(|recipient| self.composer.compose_body(recipient, body))
            .collect::<Result<Vec<_>, _>>()?;
        info!(kind = %body.kind(), recipients = items.len(), "starting bulk send");
        let batch = DispatchBatch::new(items, interval)?;
        Ok(self.queue.run(&self.submitter, batch).await)
    }

    /// Send media items to one recipient, paced by the album interval.
    pub async fn send_album(
        &self,
        target: &str,
        items: &[AlbumItem],
        interval_ms: Option<u64>,
    ) -> Result<DispatchReport, GatewayError> {
        self.queue.check_album_size(items.len())?;
        let interval = self.queue.album_interval(interval_ms)?;
        if items.is_empty() {
            return Err(GatewayError::invalid("'items' must not be empty"));
        }
        self.submitter.ready()?;

        let jid = self.composer.resolve_target(target)?;
        let messages = items
            .iter()
            .enumerate()
            .map(|(index, item)| self.composer.compose_album_item(&jid, index, item))
            .collect::<Result<Vec<_>, _>>()?;
        info!(jid = %jid, items = messages.len(), "starting album send");
        let batch = DispatchBatch::new(messages, interval)?;
        Ok(self.queue.run(&self.submitter, batch).await)
    }
}
