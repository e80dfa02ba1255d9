//! Connection event bus for session state distribution.
//!
//! The session manager publishes through a `ConnectionEventBus`; everything
//! else reads through a `SessionObserver`.

pub mod bus;

pub use bus::{ConnectionEventBus, SessionObserver, SessionSnapshot};
