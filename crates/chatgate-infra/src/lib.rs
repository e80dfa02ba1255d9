//! Infrastructure layer for chatgate.
//!
//! Implementations of the ports defined in `chatgate-core`: the file-backed
//! credential store, the protocol bridge transport, configuration loading and
//! data-directory resolution.

pub mod bridge;
pub mod config;
pub mod credentials;
pub mod filesystem;
