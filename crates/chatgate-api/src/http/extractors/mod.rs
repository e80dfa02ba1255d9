//! Request extractors: authentication and envelope-aware body/query parsing.

pub mod auth;
pub mod json;
pub mod query;
