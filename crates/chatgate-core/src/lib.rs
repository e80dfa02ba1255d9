//! Session lifecycle, message composition and dispatch for chatgate.
//!
//! This crate defines the "ports" (transport and credential store traits)
//! that the infrastructure layer implements. It depends only on
//! `chatgate-types`, never on `chatgate-infra` or any network/IO crate.

pub mod composer;
pub mod credential;
pub mod dispatch;
pub mod event;
pub mod service;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
