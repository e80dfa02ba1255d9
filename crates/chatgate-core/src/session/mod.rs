//! Session lifecycle: the single live transport, its state machine, pairing
//! challenges and automatic reconnection.

pub mod manager;
pub mod pairing;

pub use manager::{SessionManager, SessionSettings};
