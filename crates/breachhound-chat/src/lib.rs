#![deny(unsafe_code)]

//! Chat-platform adapter layer for breachhound.
//!
//! This crate bridges the platform's message stream and the core command
//! handler. Inbound messages are parsed and dispatched; the resulting tagged
//! replies are published on a broadcast bus for the platform integration to
//! render. The platform SDK itself stays outside this workspace; only the
//! interfaces the core needs are modeled here.

/// Keep-alive HTTP endpoint.
pub mod keepalive;
/// Inbound message and platform-context types.
pub mod message;
/// The async dispatch service.
pub mod service;
/// Bot-token loading.
pub mod token;

pub use message::ChatMessage;
pub use service::{ChatService, ChatServiceHandle, OutboundReply};
pub use token::BotToken;

/// Errors from the chat adapter.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(
        "bot token is not set: export {env} before starting the service",
        env = token::TOKEN_ENV
    )]
    MissingToken,

    #[error("message send failed: {0}")]
    SendFailed(String),

    #[error("keep-alive endpoint failed: {0}")]
    Keepalive(#[from] std::io::Error),
}
