//! Channel catalog query service.
//!
//! The crate loads a static catalog of channel records once and serves
//! a filter/sort/paginate query over it, either through the HTTP
//! daemon (`chanlist serve`) or directly from the CLI.

pub mod catalog;
pub mod cli;
pub mod models;
pub mod search;
pub mod server;
