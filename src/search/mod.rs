//! Core query module.
//!
//! `query` turns untrusted request bodies into a typed `ChannelQuery`;
//! `engine` runs that query against the loaded catalog.

pub mod engine;
pub mod query;
