//! Business logic services (use cases).
//!
//! Services orchestrate the composer and dispatch queue behind the
//! connectivity gate. They depend on traits (ports), never on concrete
//! infrastructure implementations.

pub mod messaging;

pub use messaging::MessagingService;
