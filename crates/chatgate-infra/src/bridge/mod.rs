//! Protocol bridge adapter.
//!
//! The chat protocol itself (encryption, handshake, multi-device sync) runs
//! in an external sidecar. This module speaks to it over HTTP + SSE and
//! exposes it as the core [`Transport`](chatgate_core::transport::Transport).

pub mod transport;
pub mod types;

pub use transport::{BridgeConnector, BridgeTransport};
