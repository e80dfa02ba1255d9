//! Delivery results: transport receipts, per-item outcomes of a batch, and
//! the catalog rich/degraded delivery report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::intent::IntentKind;

/// What the transport hands back for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub message_id: String,
    pub jid: String,
    pub sent_at: DateTime<Utc>,
}

/// Result of a single-item send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub kind: IntentKind,
    #[serde(flatten)]
    pub receipt: MessageReceipt,
}

/// Outcome of one item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Sent { message_id: String },
    Failed { reason: String },
}

impl ItemOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, ItemOutcome::Sent { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    /// Position of the item in the input batch.
    pub index: usize,
    pub jid: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Aggregate result of a batch. `sent_count + failed_count == results.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub sent_count: usize,
    pub failed_count: usize,
    pub results: Vec<ItemResult>,
}

impl DispatchReport {
    pub fn from_results(results: Vec<ItemResult>) -> Self {
        let sent_count = results.iter().filter(|r| r.outcome.is_sent()).count();
        Self {
            sent_count,
            failed_count: results.len() - sent_count,
            results,
        }
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }
}

/// Which catalog variant was ultimately submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogVariant {
    Rich,
    Degraded,
}

/// Report of a catalog send through the rich → degraded contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDelivery {
    pub jid: String,
    pub variant: CatalogVariant,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
    /// Why the rich attempt was rejected, when the degraded variant was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_failure: Option<String>,
    /// Advisory result of the catalog existence probe, if the transport answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_listed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: usize, outcome: ItemOutcome) -> ItemResult {
        ItemResult {
            index,
            jid: format!("{index}@s.whatsapp.net"),
            outcome,
        }
    }

    #[test]
    fn test_report_counts_partition_results() {
        let report = DispatchReport::from_results(vec![
            item(0, ItemOutcome::Sent { message_id: "a".to_string() }),
            item(1, ItemOutcome::Failed { reason: "boom".to_string() }),
            item(2, ItemOutcome::Sent { message_id: "c".to_string() }),
        ]);
        assert_eq!(report.sent_count, 2);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.sent_count + report.failed_count, report.total());
    }

    #[test]
    fn test_item_result_flattens_outcome() {
        let json = serde_json::to_value(item(
            3,
            ItemOutcome::Failed { reason: "rejected".to_string() },
        ))
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "rejected");
        assert_eq!(json["index"], 3);
    }
}
