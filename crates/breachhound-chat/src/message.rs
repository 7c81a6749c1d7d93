//! Inbound message types — what the platform integration hands the service.

use std::time::SystemTime;

use breachhound_core::handler::{AttachmentData, Caller, ServerContext, UserContext};

/// A message received from the chat platform.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Platform id of the sender.
    pub sender_id: String,

    /// Display name of the sender.
    pub sender_name: String,

    /// Whether the platform grants the sender elevated permissions
    /// (e.g. a server administrator role).
    pub platform_admin: bool,

    /// Message text body.
    pub body: String,

    /// Timestamp of the message.
    pub timestamp: SystemTime,

    /// Attached file, if any (used by `addfile`).
    pub attachment: Option<AttachmentData>,

    /// Server details, when the message came from a server channel.
    pub server: Option<ServerContext>,

    /// Details of the user a `userinfo` command targets.
    pub subject: Option<UserContext>,
}

impl ChatMessage {
    /// Create a simple text message from a plain user.
    pub fn text(sender_id: &str, body: &str) -> Self {
        Self {
            sender_id: sender_id.to_string(),
            sender_name: sender_id.to_string(),
            platform_admin: false,
            body: body.to_string(),
            timestamp: SystemTime::now(),
            attachment: None,
            server: None,
            subject: None,
        }
    }

    /// Create a text message from a platform-elevated sender.
    pub fn from_admin(sender_id: &str, body: &str) -> Self {
        Self {
            platform_admin: true,
            ..Self::text(sender_id, body)
        }
    }

    /// Attach a file to the message.
    pub fn with_attachment(mut self, file_name: &str, bytes: Vec<u8>) -> Self {
        self.attachment = Some(AttachmentData {
            file_name: file_name.to_string(),
            bytes,
        });
        self
    }

    /// Attach server context to the message.
    pub fn with_server(mut self, server: ServerContext) -> Self {
        self.server = Some(server);
        self
    }

    /// Attach a target-user context to the message.
    pub fn with_subject(mut self, subject: UserContext) -> Self {
        self.subject = Some(subject);
        self
    }

    /// The sender as a core [`Caller`].
    pub fn caller(&self) -> Caller {
        Caller {
            id: self.sender_id.clone(),
            display_name: self.sender_name.clone(),
            platform_admin: self.platform_admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message() {
        let msg = ChatMessage::text("u123", "/help");
        assert_eq!(msg.sender_id, "u123");
        assert_eq!(msg.body, "/help");
        assert!(!msg.platform_admin);
        assert!(msg.attachment.is_none());
    }

    #[test]
    fn test_admin_message() {
        let msg = ChatMessage::from_admin("ops", "/apistats");
        assert!(msg.platform_admin);
        assert!(msg.caller().platform_admin);
    }

    #[test]
    fn test_with_attachment() {
        let msg = ChatMessage::from_admin("ops", "/addfile dump.txt")
            .with_attachment("dump.txt", b"data".to_vec());
        let attachment = msg.attachment.unwrap();
        assert_eq!(attachment.file_name, "dump.txt");
        assert_eq!(attachment.bytes, b"data");
    }
}
