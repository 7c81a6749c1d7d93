#![deny(unsafe_code)]

//! breachhound core — entitlements, corpus scanning, result aggregation,
//! and command handling.
//!
//! The core is platform-agnostic: commands come in as parsed
//! [`command::Command`] values with whatever context the platform supplies,
//! and go out as tagged [`command::Reply`] variants that the adapter layer
//! renders. All persisted state lives in injected per-entity stores.

/// Command grammar and tagged reply variants.
pub mod command;
/// Corpus directory management and file administration.
pub mod corpus;
/// API keys and search quotas.
pub mod entitlement;
/// User-facing error taxonomy.
pub mod error;
/// Command routing and error translation.
pub mod handler;
/// Banned-IP moderation store.
pub mod moderation;
/// Report artifacts and the chunked interactive summary.
pub mod report;
/// Substring search with context extraction and related-term expansion.
pub mod scanner;
/// Injected per-entity key-value stores.
pub mod store;
/// Per-user command usage statistics.
pub mod usage;

pub use command::{Command, Reply};
pub use error::BotError;
pub use handler::{Caller, CommandHandler, CommandRequest};
pub use scanner::SearchResult;
