//! Dispatch of composed messages: single sends, paced batches and the
//! catalog rich/degraded contract.

pub mod queue;

pub use queue::{DispatchBatch, DispatchQueue, MAX_INTERVAL_MS, Submitter};
