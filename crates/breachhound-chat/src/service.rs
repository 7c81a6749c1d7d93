//! Async chat service — bridges platform messages to the core command
//! handler.
//!
//! Mirrors the daemon's service/handle split: the platform integration
//! enqueues inbound messages through a [`ChatServiceHandle`], and rendered
//! replies come back on a broadcast bus.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use breachhound_core::command::{Command, ParseError, Reply};
use breachhound_core::handler::{CommandHandler, CommandRequest};

use crate::message::ChatMessage;
use crate::ChatError;

/// Commands that can be sent to the chat service.
#[derive(Debug)]
pub enum ServiceCommand {
    /// Dispatch an inbound platform message.
    Dispatch(ChatMessage),
    /// Shut down the service.
    Shutdown,
}

/// A reply paired with the user it should be delivered to.
#[derive(Debug, Clone)]
pub struct OutboundReply {
    /// Platform id of the recipient.
    pub recipient: String,
    /// What to render.
    pub reply: Reply,
}

/// The async dispatch service that runs as a tokio task.
pub struct ChatService {
    /// Channel for receiving commands (dispatch message, shutdown).
    command_rx: mpsc::Receiver<ServiceCommand>,

    /// Sender for rendered replies.
    reply_tx: broadcast::Sender<OutboundReply>,

    /// The core command handler.
    handler: Arc<CommandHandler>,

    /// Command prefix recognised in message bodies.
    prefix: String,
}

/// Handle for interacting with a running [`ChatService`].
#[derive(Clone)]
pub struct ChatServiceHandle {
    command_tx: mpsc::Sender<ServiceCommand>,
}

impl ChatServiceHandle {
    /// Enqueue an inbound message for dispatch.
    pub async fn dispatch(&self, msg: ChatMessage) -> Result<(), ChatError> {
        self.command_tx
            .send(ServiceCommand::Dispatch(msg))
            .await
            .map_err(|_| ChatError::SendFailed("service channel closed".to_string()))
    }

    /// Request the service to shut down.
    pub async fn shutdown(&self) -> Result<(), ChatError> {
        self.command_tx
            .send(ServiceCommand::Shutdown)
            .await
            .map_err(|_| ChatError::SendFailed("service channel closed".to_string()))
    }
}

impl ChatService {
    /// Create a new service and return it with a handle for sending commands.
    pub fn new(
        handler: Arc<CommandHandler>,
        prefix: impl Into<String>,
        reply_tx: broadcast::Sender<OutboundReply>,
    ) -> (Self, ChatServiceHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);

        let service = Self {
            command_rx,
            reply_tx,
            handler,
            prefix: prefix.into(),
        };

        let handle = ChatServiceHandle { command_tx };

        (service, handle)
    }

    /// Run the service event loop until shutdown.
    pub async fn run(mut self) {
        info!("chat service started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                ServiceCommand::Dispatch(msg) => {
                    self.process_inbound(msg);
                }
                ServiceCommand::Shutdown => {
                    info!("chat service shutting down");
                    break;
                }
            }
        }

        info!("chat service stopped");
    }

    /// Parse and dispatch one inbound message, publishing the replies.
    ///
    /// Non-command messages are ignored; parse errors become user-facing
    /// replies. Returns the number of replies published.
    pub fn process_inbound(&self, msg: ChatMessage) -> usize {
        let replies = match Command::parse(&msg.body, &self.prefix) {
            Ok(command) => {
                debug!(sender = %msg.sender_id, command = command.name(), "dispatching command");
                let request = CommandRequest {
                    caller: msg.caller(),
                    command,
                    attachment: msg.attachment.clone(),
                    server: msg.server.clone(),
                    subject: msg.subject.clone(),
                };
                self.handler.dispatch(request)
            }
            Err(ParseError::NotACommand) => return 0,
            Err(e) => {
                warn!(sender = %msg.sender_id, error = %e, "rejected malformed command");
                vec![Reply::message(format!("❌ {e}"))]
            }
        };

        let count = replies.len();
        for reply in replies {
            let _ = self.reply_tx.send(OutboundReply {
                recipient: msg.sender_id.clone(),
                reply,
            });
        }
        count
    }
}
