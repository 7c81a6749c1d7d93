//! Command grammar — parsing message bodies into typed commands, and the
//! tagged reply variants the platform adapter renders.

use std::path::PathBuf;

/// Errors from command parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("message is not a command")]
    NotACommand,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Search { term: String },
    CreateKey { user: String },
    RevokeKey { key: String },
    MakeAdmin { user: String },
    ApiStats,
    UserStats,
    BanIp { ip: String },
    UnbanIp { ip: String },
    AddFile { name: String },
    ListBreaches,
    DeleteBreach { name: String },
    ServerInfo,
    UserInfo { user: Option<String> },
}

impl Command {
    /// Parse a message body with the given command prefix.
    ///
    /// Search terms may contain spaces; other arguments are single tokens.
    pub fn parse(body: &str, prefix: &str) -> Result<Self, ParseError> {
        let body = body.trim();
        let stripped = body.strip_prefix(prefix).ok_or(ParseError::NotACommand)?;

        let mut parts = stripped.split_whitespace();
        let name = parts.next().ok_or(ParseError::NotACommand)?;
        let args: Vec<&str> = parts.collect();

        match name.to_lowercase().as_str() {
            "help" => Ok(Command::Help),
            "search" => {
                if args.is_empty() {
                    return Err(ParseError::Usage("search <term>"));
                }
                Ok(Command::Search {
                    term: args.join(" "),
                })
            }
            "createkey" => one_arg(&args, "createkey <user>").map(|user| Command::CreateKey {
                user: user.to_string(),
            }),
            "revokekey" => one_arg(&args, "revokekey <key>").map(|key| Command::RevokeKey {
                key: key.to_string(),
            }),
            "makeadmin" => one_arg(&args, "makeadmin <user>").map(|user| Command::MakeAdmin {
                user: user.to_string(),
            }),
            "apistats" => Ok(Command::ApiStats),
            "userstats" => Ok(Command::UserStats),
            "banip" => one_arg(&args, "banip <ip>").map(|ip| Command::BanIp {
                ip: ip.to_string(),
            }),
            "unbanip" => one_arg(&args, "unbanip <ip>").map(|ip| Command::UnbanIp {
                ip: ip.to_string(),
            }),
            "addfile" => one_arg(&args, "addfile <name> (with attachment)").map(|name| {
                Command::AddFile {
                    name: name.to_string(),
                }
            }),
            "listbreaches" => Ok(Command::ListBreaches),
            "deletebreach" => {
                one_arg(&args, "deletebreach <name>").map(|name| Command::DeleteBreach {
                    name: name.to_string(),
                })
            }
            "serverinfo" => Ok(Command::ServerInfo),
            "userinfo" => Ok(Command::UserInfo {
                user: args.first().map(|s| s.to_string()),
            }),
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }

    /// The command name as recorded by the usage tracker.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Search { .. } => "search",
            Command::CreateKey { .. } => "createkey",
            Command::RevokeKey { .. } => "revokekey",
            Command::MakeAdmin { .. } => "makeadmin",
            Command::ApiStats => "apistats",
            Command::UserStats => "userstats",
            Command::BanIp { .. } => "banip",
            Command::UnbanIp { .. } => "unbanip",
            Command::AddFile { .. } => "addfile",
            Command::ListBreaches => "listbreaches",
            Command::DeleteBreach { .. } => "deletebreach",
            Command::ServerInfo => "serverinfo",
            Command::UserInfo { .. } => "userinfo",
        }
    }

    /// Whether this command requires admin rights.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::CreateKey { .. }
                | Command::RevokeKey { .. }
                | Command::MakeAdmin { .. }
                | Command::ApiStats
                | Command::UserStats
                | Command::BanIp { .. }
                | Command::UnbanIp { .. }
                | Command::AddFile { .. }
                | Command::ListBreaches
                | Command::DeleteBreach { .. }
        )
    }
}

fn one_arg<'a>(args: &[&'a str], usage: &'static str) -> Result<&'a str, ParseError> {
    match args {
        [arg] => Ok(arg),
        _ => Err(ParseError::Usage(usage)),
    }
}

/// A field in an embed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

/// What the platform adapter should render for one reply.
///
/// The core never touches platform rendering; it only emits these tagged
/// variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A plain text message.
    Message(String),
    /// A structured embed.
    Embed {
        title: String,
        description: String,
        fields: Vec<EmbedField>,
    },
    /// A file attachment, by path.
    File(PathBuf),
}

impl Reply {
    /// Shorthand for a plain message reply.
    pub fn message(text: impl Into<String>) -> Self {
        Reply::Message(text.into())
    }
}
