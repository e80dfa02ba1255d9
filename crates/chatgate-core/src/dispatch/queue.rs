//! Paced, strictly ordered submission of composed messages.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use chatgate_types::config::DispatchPolicy;
use chatgate_types::dispatch::{
    CatalogDelivery, CatalogVariant, DispatchReport, ItemOutcome, ItemResult, MessageReceipt,
};
use chatgate_types::error::GatewayError;
use chatgate_types::payload::CanonicalPayload;

use crate::composer::{CatalogPlan, ComposedMessage};

/// Where composed messages go. The session manager implements this by
/// acquiring the live transport for every call.
pub trait Submitter: Send + Sync {
    /// Connectivity gate: `Ok` only while messages can be submitted.
    fn ready(&self) -> Result<(), GatewayError>;

    fn submit(
        &self,
        jid: &str,
        payload: &CanonicalPayload,
    ) -> impl Future<Output = Result<MessageReceipt, GatewayError>> + Send;

    /// Advisory catalog lookup. `None` when the answer is unknown.
    fn probe_catalog(&self, _retailer_id: &str) -> impl Future<Output = Option<bool>> + Send {
        async { None }
    }
}

/// An ordered, non-empty group of messages with a pacing interval.
#[derive(Debug, Clone)]
pub struct DispatchBatch {
    items: Vec<ComposedMessage>,
    interval: Duration,
}

impl DispatchBatch {
    pub fn new(items: Vec<ComposedMessage>, interval: Duration) -> Result<Self, GatewayError> {
        if items.is_empty() {
            return Err(GatewayError::invalid("batch must contain at least one item"));
        }
        Ok(Self { items, interval })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Longest interval a caller may request between items.
pub const MAX_INTERVAL_MS: u64 = 60_000;

/// Runs batches against a [`Submitter`] with the configured pacing.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    policy: DispatchPolicy,
}

impl DispatchQueue {
    pub fn new(policy: DispatchPolicy) -> Self {
        Self { policy }
    }

    /// Fail fast when an album would exceed the cap.
    pub fn check_album_size(&self, len: usize) -> Result<(), GatewayError> {
        let max = self.policy.album_max_items;
        if len > max {
            return Err(GatewayError::BatchTooLarge { len, max });
        }
        Ok(())
    }

    pub fn bulk_interval(&self, override_ms: Option<u64>) -> Result<Duration, GatewayError> {
        interval_or(override_ms, self.policy.bulk_interval_ms)
    }

    pub fn album_interval(&self, override_ms: Option<u64>) -> Result<Duration, GatewayError> {
        interval_or(override_ms, self.policy.album_interval_ms)
    }

    /// Submit a single message, returning its receipt or the submission error.
    pub async fn send_one<S: Submitter>(
        &self,
        submitter: &S,
        message: &ComposedMessage,
    ) -> Result<MessageReceipt, GatewayError> {
        let result = submitter.submit(&message.jid, &message.payload).await;
        match &result {
            Ok(receipt) => info!(
                jid = %message.jid,
                kind = %message.kind,
                message_id = %receipt.message_id,
                "message sent"
            ),
            Err(e) => warn!(jid = %message.jid, kind = %message.kind, error = %e, "message failed"),
        }
        result
    }

    /// Submit every item in order, sleeping `interval` between submissions
    /// but not after the last. Failures are recorded per item and never
    /// stop later items.
    pub async fn run<S: Submitter>(&self, submitter: &S, batch: DispatchBatch) -> DispatchReport {
        let DispatchBatch { items, interval } = batch;
        let total = items.len();
        let mut results = Vec::with_capacity(total);

        for (index, message) in items.into_iter().enumerate() {
            if index > 0 && !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
            let outcome = match submitter.submit(&message.jid, &message.payload).await {
                Ok(receipt) => ItemOutcome::Sent {
                    message_id: receipt.message_id,
                },
                Err(e) => {
                    warn!(index, jid = %message.jid, error = %e, "batch item failed");
                    ItemOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            debug!(index, total, sent = outcome.is_sent(), "batch item processed");
            results.push(ItemResult {
                index,
                jid: message.jid,
                outcome,
            });
        }

        let report = DispatchReport::from_results(results);
        info!(
            total,
            sent = report.sent_count,
            failed = report.failed_count,
            "batch finished"
        );
        report
    }

    /// Submit the rich product variant and fall back to the degraded text
    /// variant when the rich submission fails for any reason.
    ///
    /// The catalog probe runs first and is advisory only. Fails only when
    /// the degraded variant fails too.
    pub async fn send_catalog<S: Submitter>(
        &self,
        submitter: &S,
        plan: &CatalogPlan,
    ) -> Result<CatalogDelivery, GatewayError> {
        let catalog_listed = submitter.probe_catalog(plan.retailer_id()).await;
        if catalog_listed == Some(false) {
            info!(
                retailer_id = plan.retailer_id(),
                "catalog item not listed, attempting rich message anyway"
            );
        }

        let rich = plan.rich();
        let rich_failure = match submitter.submit(&rich.jid, &rich.payload).await {
            Ok(receipt) => {
                info!(jid = %rich.jid, message_id = %receipt.message_id, "catalog item sent");
                return Ok(CatalogDelivery {
                    jid: rich.jid,
                    variant: CatalogVariant::Rich,
                    outcome: ItemOutcome::Sent {
                        message_id: receipt.message_id,
                    },
                    rich_failure: None,
                    catalog_listed,
                });
            }
            Err(e) => e,
        };

        warn!(
            jid = %rich.jid,
            error = %rich_failure,
            "rich catalog message rejected, sending text summary"
        );
        let degraded = plan.degraded();
        match submitter.submit(&degraded.jid, &degraded.payload).await {
            Ok(receipt) => Ok(CatalogDelivery {
                jid: degraded.jid,
                variant: CatalogVariant::Degraded,
                outcome: ItemOutcome::Sent {
                    message_id: receipt.message_id,
                },
                rich_failure: Some(rich_failure.to_string()),
                catalog_listed,
            }),
            Err(GatewayError::TransientTransportFailure(reason)) => {
                Err(GatewayError::TransientTransportFailure(format!(
                    "degraded catalog message failed: {reason} (rich attempt: {rich_failure})"
                )))
            }
            Err(other) => Err(other),
        }
    }
}

fn interval_or(override_ms: Option<u64>, default_ms: u64) -> Result<Duration, GatewayError> {
    let ms = override_ms.unwrap_or(default_ms);
    if ms > MAX_INTERVAL_MS {
        return Err(GatewayError::invalid(format!(
            "interval must not exceed {MAX_INTERVAL_MS} ms"
        )));
    }
    Ok(Duration::from_millis(ms))
}
