//! Core domain + application logic for the injury-wire bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! `MessagingPort` trait implemented in the adapter crate; the upstream news
//! feed lives behind `FeedSource`.

pub mod clock;
pub mod config;
pub mod digest;
pub mod domain;
pub mod errors;
pub mod feed;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod poller;
pub mod queries;
pub mod scheduler;
pub mod severity;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
