//! Shared domain types for chatgate.
//!
//! Session state, authentication challenges, outbound intents, canonical
//! payloads, dispatch results, session events, configuration and errors.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod intent;
pub mod payload;
pub mod session;
