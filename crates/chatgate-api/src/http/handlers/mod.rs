//! HTTP request handlers for the REST API.

pub mod batch;
pub mod events;
pub mod send;
pub mod session;
