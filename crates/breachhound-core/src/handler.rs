//! Command handler — routes parsed commands through the entitlement gate,
//! the scanner, and the aggregator, and translates every error into a
//! user-facing reply.
//!
//! Control flow for a search: entitlement check → corpus scan → report
//! artifact + summary → quota increment. Usage is recorded for every
//! dispatched command.

use std::path::Path;

use tracing::{info, warn};

use breachhound_config::AppConfig;

use crate::command::{Command, EmbedField, Reply};
use crate::corpus::Corpus;
use crate::entitlement::EntitlementStore;
use crate::error::BotError;
use crate::moderation::{BanList, BanOutcome, UnbanOutcome};
use crate::report::{self, ReportWriter};
use crate::scanner;
use crate::usage::UsageTracker;

/// The user issuing a command.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Platform-wide user id.
    pub id: String,
    /// Display name used in replies.
    pub display_name: String,
    /// Whether the platform grants this caller elevated permissions,
    /// independent of any admin API key.
    pub platform_admin: bool,
}

impl Caller {
    /// A plain, non-elevated caller.
    pub fn user(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: id.to_string(),
            platform_admin: false,
        }
    }
}

/// File payload accompanying an `addfile` command.
#[derive(Debug, Clone)]
pub struct AttachmentData {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Platform-provided server details for `serverinfo`.
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub name: String,
    pub member_count: u64,
    pub created_at: String,
    pub owner: String,
}

/// Platform-provided user details for `userinfo`.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub name: String,
    pub joined_at: String,
    pub created_at: String,
    pub roles: Vec<String>,
}

/// A command plus the platform context it arrived with.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub caller: Caller,
    pub command: Command,
    /// Attachment carried on the message, for `addfile`.
    pub attachment: Option<AttachmentData>,
    /// Server details, when the message came from a server channel.
    pub server: Option<ServerContext>,
    /// Details of the user a `userinfo` command targets (the caller when
    /// no target was given).
    pub subject: Option<UserContext>,
}

impl CommandRequest {
    /// A bare request with no platform context.
    pub fn new(caller: Caller, command: Command) -> Self {
        Self {
            caller,
            command,
            attachment: None,
            server: None,
            subject: None,
        }
    }
}

/// Routes commands to the stores and the search pipeline.
pub struct CommandHandler {
    entitlements: EntitlementStore,
    usage: UsageTracker,
    bans: BanList,
    corpus: Corpus,
    reports: ReportWriter,
}

impl CommandHandler {
    /// Assemble a handler from its parts.
    pub fn new(
        entitlements: EntitlementStore,
        usage: UsageTracker,
        bans: BanList,
        corpus: Corpus,
        reports: ReportWriter,
    ) -> Self {
        Self {
            entitlements,
            usage,
            bans,
            corpus,
            reports,
        }
    }

    /// Assemble a handler with on-disk stores per the configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        let data_dir: &Path = &config.storage.data_dir;
        Self::new(
            EntitlementStore::on_disk(data_dir, config.quota.free_search_limit),
            UsageTracker::on_disk(data_dir),
            BanList::on_disk(data_dir),
            Corpus::new(&config.corpus.root, config.corpus.extensions.clone()),
            ReportWriter::new(&config.storage.reports_dir),
        )
    }

    /// The entitlement store, for startup bootstrap and statistics.
    pub fn entitlements(&self) -> &EntitlementStore {
        &self.entitlements
    }

    /// The corpus handle, for the keep-alive stats endpoint.
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Dispatch one command. Every error is translated into a user-facing
    /// reply; this never fails.
    pub fn dispatch(&self, request: CommandRequest) -> Vec<Reply> {
        if let Err(e) = self.usage.record(&request.caller.id, request.command.name()) {
            warn!(error = %e, "usage tracking failed");
        }

        match self.run(&request) {
            Ok(replies) => replies,
            Err(e) => vec![self.reject(&e)],
        }
    }

    fn run(&self, request: &CommandRequest) -> Result<Vec<Reply>, BotError> {
        let caller = &request.caller;

        if request.command.requires_admin() && !self.is_elevated(caller)? {
            return Err(BotError::PermissionDenied(format!(
                "'{}' is restricted to administrators",
                request.command.name()
            )));
        }

        match &request.command {
            Command::Help => Ok(vec![self.help()]),
            Command::Search { term } => self.search(caller, term),
            Command::CreateKey { user } => {
                let key = self.entitlements.create_key(user, false)?;
                Ok(vec![Reply::message(format!(
                    "✅ API key created for {user}: {key}"
                ))])
            }
            Command::MakeAdmin { user } => {
                let key = self.entitlements.create_key(user, true)?;
                Ok(vec![Reply::message(format!(
                    "✅ {user} has been made an admin with key: {key}"
                ))])
            }
            Command::RevokeKey { key } => {
                if self.entitlements.revoke_key(key)? {
                    Ok(vec![Reply::message(format!(
                        "✅ API key {key} has been revoked."
                    ))])
                } else {
                    Err(BotError::NotFound(format!("no API key named '{key}'")))
                }
            }
            Command::ApiStats => self.api_stats(),
            Command::UserStats => self.user_stats(),
            Command::BanIp { ip } => {
                let reply = match self.bans.ban(ip)? {
                    BanOutcome::Banned => format!("✅ IP address {ip} has been banned."),
                    BanOutcome::AlreadyBanned => "⚠️ This IP is already banned!".to_string(),
                };
                Ok(vec![Reply::message(reply)])
            }
            Command::UnbanIp { ip } => {
                let reply = match self.bans.unban(ip)? {
                    UnbanOutcome::Unbanned => format!("✅ IP address {ip} has been unbanned."),
                    UnbanOutcome::NotBanned => "⚠️ This IP is not banned!".to_string(),
                };
                Ok(vec![Reply::message(reply)])
            }
            Command::AddFile { name } => {
                let attachment = request.attachment.as_ref().ok_or_else(|| {
                    BotError::Validation("attach the file to the addfile message".to_string())
                })?;
                self.corpus.add_file(name, &attachment.bytes)?;
                Ok(vec![Reply::message(format!(
                    "✅ File '{name}' has been added to the corpus."
                ))])
            }
            Command::ListBreaches => self.list_breaches(),
            Command::DeleteBreach { name } => {
                self.corpus.delete_file(name)?;
                Ok(vec![Reply::message(format!("✅ Successfully deleted {name}"))])
            }
            Command::ServerInfo => Ok(vec![server_info(request)?]),
            Command::UserInfo { .. } => Ok(vec![user_info(request)?]),
        }
    }

    /// Admin check: an active admin key or platform-level elevation.
    fn is_elevated(&self, caller: &Caller) -> Result<bool, BotError> {
        Ok(caller.platform_admin || self.entitlements.is_admin(&caller.id)?)
    }

    fn search(&self, caller: &Caller, term: &str) -> Result<Vec<Reply>, BotError> {
        let has_key = self.entitlements.has_active_key(&caller.id)?;
        let limit = self.entitlements.free_search_limit();

        if !has_key && self.entitlements.search_count(&caller.id)? >= limit {
            return Err(BotError::QuotaExceeded { limit });
        }

        info!(caller = %caller.id, term, "corpus search");
        let results = scanner::scan(&self.corpus, term)?;
        if results.is_empty() {
            return Ok(vec![Reply::message(format!(
                "No files containing '{term}' were found."
            ))]);
        }

        // Artifact-write failure surfaces to the caller, unlike per-file
        // scan errors.
        let artifact = self.reports.write(term, &results)?;

        let mut replies: Vec<Reply> = report::build_summary(term, &results)
            .into_iter()
            .map(Reply::Message)
            .collect();
        replies.push(Reply::File(artifact));

        if !has_key {
            self.entitlements.increment_search_count(&caller.id)?;
            let remaining = limit.saturating_sub(self.entitlements.search_count(&caller.id)?);
            replies.push(Reply::message(format!(
                "ℹ️ You have {remaining} free searches remaining."
            )));
        }

        Ok(replies)
    }

    fn help(&self) -> Reply {
        let limit = self.entitlements.free_search_limit();
        Reply::Embed {
            title: "🔍 breachhound help".to_string(),
            description: "Search breach data for terms and inspect the results.".to_string(),
            fields: vec![
                EmbedField {
                    name: "Basic usage".to_string(),
                    value: "/search <term> - search the breach corpus\n/help - show this message"
                        .to_string(),
                },
                EmbedField {
                    name: "Admin".to_string(),
                    value: "/createkey /revokekey /makeadmin /apistats /userstats /banip \
                            /unbanip /addfile /listbreaches /deletebreach"
                        .to_string(),
                },
                EmbedField {
                    name: "Usage limits".to_string(),
                    value: format!(
                        "Free users get {limit} searches. API key holders are unlimited."
                    ),
                },
            ],
        }
    }

    fn api_stats(&self) -> Result<Vec<Reply>, BotError> {
        let stats = self.entitlements.key_stats()?;
        Ok(vec![Reply::Embed {
            title: "🔑 API key statistics".to_string(),
            description: String::new(),
            fields: vec![
                EmbedField {
                    name: "Total keys".to_string(),
                    value: stats.total.to_string(),
                },
                EmbedField {
                    name: "Active keys".to_string(),
                    value: stats.active.to_string(),
                },
                EmbedField {
                    name: "Admin keys".to_string(),
                    value: stats.admin.to_string(),
                },
            ],
        }])
    }

    fn user_stats(&self) -> Result<Vec<Reply>, BotError> {
        let totals = self.usage.totals()?;
        let top = self.usage.top_users(5)?;
        let top_value = if top.is_empty() {
            "No data".to_string()
        } else {
            top.iter()
                .map(|(user, uses)| format!("{user}: {uses} commands"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(vec![Reply::Embed {
            title: "📊 Bot usage statistics".to_string(),
            description: String::new(),
            fields: vec![
                EmbedField {
                    name: "Total users".to_string(),
                    value: totals.users.to_string(),
                },
                EmbedField {
                    name: "Total commands used".to_string(),
                    value: totals.commands.to_string(),
                },
                EmbedField {
                    name: "Top users".to_string(),
                    value: top_value,
                },
            ],
        }])
    }

    fn list_breaches(&self) -> Result<Vec<Reply>, BotError> {
        let entries = self.corpus.list()?;
        if entries.is_empty() {
            return Ok(vec![Reply::message("No breach files found.")]);
        }

        let fields = entries
            .into_iter()
            .map(|entry| EmbedField {
                name: entry.name,
                value: format!("Size: {:.2} KB", entry.size_bytes as f64 / 1024.0),
            })
            .collect();

        Ok(vec![Reply::Embed {
            title: "📁 Available breach files".to_string(),
            description: String::new(),
            fields,
        }])
    }

    /// Translate an error into its user-facing reply.
    fn reject(&self, error: &BotError) -> Reply {
        match error {
            BotError::QuotaExceeded { limit } => Reply::Embed {
                title: "❌ Free search limit reached".to_string(),
                description: format!(
                    "You've used all {limit} free searches. Contact an administrator to \
                     purchase an API key for unlimited access."
                ),
                fields: vec![EmbedField {
                    name: "💡 Benefits of an API key".to_string(),
                    value: "Unlimited searches, full context for each result, priority support"
                        .to_string(),
                }],
            },
            other => Reply::message(format!("❌ {other}")),
        }
    }
}

fn server_info(request: &CommandRequest) -> Result<Reply, BotError> {
    let server = request.server.as_ref().ok_or_else(|| {
        BotError::Validation("server information is only available in a server".to_string())
    })?;

    Ok(Reply::Embed {
        title: format!("📊 Server information: {}", server.name),
        description: String::new(),
        fields: vec![
            EmbedField {
                name: "Members".to_string(),
                value: server.member_count.to_string(),
            },
            EmbedField {
                name: "Created at".to_string(),
                value: server.created_at.clone(),
            },
            EmbedField {
                name: "Owner".to_string(),
                value: server.owner.clone(),
            },
        ],
    })
}

fn user_info(request: &CommandRequest) -> Result<Reply, BotError> {
    let subject = request.subject.as_ref().ok_or_else(|| {
        BotError::NotFound("no such user in this server".to_string())
    })?;

    let roles = if subject.roles.is_empty() {
        "None".to_string()
    } else {
        subject.roles.join(", ")
    };

    Ok(Reply::Embed {
        title: format!("👤 User information: {}", subject.name),
        description: String::new(),
        fields: vec![
            EmbedField {
                name: "Joined server".to_string(),
                value: subject.joined_at.clone(),
            },
            EmbedField {
                name: "Account created".to_string(),
                value: subject.created_at.clone(),
            },
            EmbedField {
                name: "Roles".to_string(),
                value: roles,
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use breachhound_test_utils::corpus::TempCorpus;
    use pretty_assertions::assert_eq;

    struct Fixture {
        _corpus_dir: TempCorpus,
        handler: CommandHandler,
    }

    fn fixture() -> Fixture {
        let corpus_dir = TempCorpus::new();
        let corpus = Corpus::new(corpus_dir.root(), vec![".txt".to_string()]);
        let handler = CommandHandler::new(
            EntitlementStore::in_memory(10),
            UsageTracker::in_memory(),
            BanList::in_memory(),
            corpus,
            ReportWriter::new(corpus_dir.sibling("reports")),
        );
        Fixture {
            _corpus_dir: corpus_dir,
            handler,
        }
    }

    fn admin() -> Caller {
        Caller {
            id: "admin".to_string(),
            display_name: "admin".to_string(),
            platform_admin: true,
        }
    }

    fn search_request(caller: Caller, term: &str) -> CommandRequest {
        CommandRequest::new(
            caller,
            Command::Search {
                term: term.to_string(),
            },
        )
    }

    fn first_message(replies: &[Reply]) -> &str {
        match &replies[0] {
            Reply::Message(text) => text,
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn test_search_no_results() {
        let f = fixture();
        let replies = f.handler.dispatch(search_request(Caller::user("alice"), "ghost"));
        assert_eq!(
            first_message(&replies),
            "No files containing 'ghost' were found."
        );
    }

    #[test]
    fn test_search_returns_summary_artifact_and_remaining() {
        let f = fixture();
        f.handler
            .corpus
            .add_file("dump.txt", b"line before\nthe target line\nline after")
            .unwrap();

        let replies = f.handler.dispatch(search_request(Caller::user("alice"), "target"));

        assert!(matches!(replies[0], Reply::Message(_)));
        assert!(replies.iter().any(|r| matches!(r, Reply::File(_))));
        let last = replies.last().unwrap();
        assert_eq!(
            *last,
            Reply::message("ℹ️ You have 9 free searches remaining.")
        );
    }

    #[test]
    fn test_search_metering_skipped_for_key_holders() {
        let f = fixture();
        f.handler.corpus.add_file("dump.txt", b"target").unwrap();
        f.handler.entitlements.create_key("alice", false).unwrap();

        let replies = f.handler.dispatch(search_request(Caller::user("alice"), "target"));

        assert!(
            !replies
                .iter()
                .any(|r| matches!(r, Reply::Message(m) if m.contains("free searches remaining")))
        );
        assert_eq!(f.handler.entitlements.search_count("alice").unwrap(), 0);
    }

    #[test]
    fn test_quota_exhaustion_rejects_eleventh_search() {
        let f = fixture();
        f.handler.corpus.add_file("dump.txt", b"target").unwrap();

        for _ in 0..10 {
            let replies = f.handler.dispatch(search_request(Caller::user("bob"), "target"));
            assert!(replies.iter().any(|r| matches!(r, Reply::File(_))));
        }
        assert_eq!(f.handler.entitlements.search_count("bob").unwrap(), 10);

        let replies = f.handler.dispatch(search_request(Caller::user("bob"), "target"));
        assert!(matches!(
            &replies[0],
            Reply::Embed { title, .. } if title.contains("limit reached")
        ));
        // Counter stops incrementing once the limit is hit
        assert_eq!(f.handler.entitlements.search_count("bob").unwrap(), 10);
    }

    #[test]
    fn test_admin_gate_rejects_plain_users() {
        let f = fixture();
        let replies = f.handler.dispatch(CommandRequest::new(
            Caller::user("alice"),
            Command::ApiStats,
        ));
        assert!(first_message(&replies).contains("permission denied"));
    }

    #[test]
    fn test_admin_gate_accepts_key_admins_and_platform_admins() {
        let f = fixture();
        let replies = f
            .handler
            .dispatch(CommandRequest::new(admin(), Command::ApiStats));
        assert!(matches!(replies[0], Reply::Embed { .. }));

        f.handler.entitlements.create_key("keyed", true).unwrap();
        let replies = f.handler.dispatch(CommandRequest::new(
            Caller::user("keyed"),
            Command::ApiStats,
        ));
        assert!(matches!(replies[0], Reply::Embed { .. }));
    }

    #[test]
    fn test_createkey_and_revokekey() {
        let f = fixture();
        let replies = f.handler.dispatch(CommandRequest::new(
            admin(),
            Command::CreateKey {
                user: "carol".to_string(),
            },
        ));
        assert!(first_message(&replies).contains("API key created for carol"));
        assert!(f.handler.entitlements.has_active_key("carol").unwrap());

        let key = first_message(&replies).rsplit(' ').next().unwrap().to_string();
        let replies = f
            .handler
            .dispatch(CommandRequest::new(admin(), Command::RevokeKey { key }));
        assert!(first_message(&replies).contains("revoked"));
        assert!(!f.handler.entitlements.has_active_key("carol").unwrap());
    }

    #[test]
    fn test_revoke_unknown_key_not_found() {
        let f = fixture();
        let replies = f.handler.dispatch(CommandRequest::new(
            admin(),
            Command::RevokeKey {
                key: "key_nobody_19700101000000".to_string(),
            },
        ));
        assert!(first_message(&replies).contains("not found"));
    }

    #[test]
    fn test_makeadmin_grants_admin() {
        let f = fixture();
        f.handler.dispatch(CommandRequest::new(
            admin(),
            Command::MakeAdmin {
                user: "carol".to_string(),
            },
        ));
        assert!(f.handler.entitlements.is_admin("carol").unwrap());
    }

    #[test]
    fn test_banip_flow() {
        let f = fixture();
        let ban = |ip: &str| {
            f.handler.dispatch(CommandRequest::new(
                admin(),
                Command::BanIp { ip: ip.to_string() },
            ))
        };

        assert!(first_message(&ban("1.2.3.4")).contains("has been banned"));
        assert!(first_message(&ban("1.2.3.4")).contains("already banned"));
        assert!(first_message(&ban("999.1.1.1")).contains("invalid input"));
    }

    #[test]
    fn test_addfile_requires_attachment() {
        let f = fixture();
        let replies = f.handler.dispatch(CommandRequest::new(
            admin(),
            Command::AddFile {
                name: "dump.txt".to_string(),
            },
        ));
        assert!(first_message(&replies).contains("attach the file"));
    }

    #[test]
    fn test_addfile_and_deletebreach() {
        let f = fixture();
        let mut request = CommandRequest::new(
            admin(),
            Command::AddFile {
                name: "dump.txt".to_string(),
            },
        );
        request.attachment = Some(AttachmentData {
            file_name: "dump.txt".to_string(),
            bytes: b"secret target data".to_vec(),
        });
        let replies = f.handler.dispatch(request);
        assert!(first_message(&replies).contains("has been added"));

        let replies = f.handler.dispatch(CommandRequest::new(
            admin(),
            Command::DeleteBreach {
                name: "dump.txt".to_string(),
            },
        ));
        assert!(first_message(&replies).contains("Successfully deleted"));

        let replies = f.handler.dispatch(CommandRequest::new(
            admin(),
            Command::DeleteBreach {
                name: "dump.txt".to_string(),
            },
        ));
        assert!(first_message(&replies).contains("not found"));
    }

    #[test]
    fn test_listbreaches() {
        let f = fixture();
        let replies = f
            .handler
            .dispatch(CommandRequest::new(admin(), Command::ListBreaches));
        assert_eq!(first_message(&replies), "No breach files found.");

        f.handler.corpus.add_file("dump.txt", b"12345").unwrap();
        let replies = f
            .handler
            .dispatch(CommandRequest::new(admin(), Command::ListBreaches));
        match &replies[0] {
            Reply::Embed { fields, .. } => {
                assert_eq!(fields[0].name, "dump.txt");
                assert!(fields[0].value.contains("KB"));
            }
            other => panic!("expected embed, got {other:?}"),
        }
    }

    #[test]
    fn test_usage_recorded_for_every_dispatch() {
        let f = fixture();
        f.handler
            .dispatch(CommandRequest::new(Caller::user("alice"), Command::Help));
        f.handler.dispatch(search_request(Caller::user("alice"), "x"));

        let totals = f.handler.usage.totals().unwrap();
        assert_eq!(totals.commands, 2);
    }

    #[test]
    fn test_serverinfo_requires_context() {
        let f = fixture();
        let replies = f.handler.dispatch(CommandRequest::new(
            Caller::user("alice"),
            Command::ServerInfo,
        ));
        assert!(first_message(&replies).contains("only available in a server"));

        let mut request = CommandRequest::new(Caller::user("alice"), Command::ServerInfo);
        request.server = Some(ServerContext {
            name: "ops".to_string(),
            member_count: 42,
            created_at: "2024-01-01".to_string(),
            owner: "alice".to_string(),
        });
        let replies = f.handler.dispatch(request);
        assert!(matches!(
            &replies[0],
            Reply::Embed { title, .. } if title.contains("ops")
        ));
    }

    #[test]
    fn test_userinfo_formats_roles() {
        let f = fixture();
        let mut request = CommandRequest::new(
            Caller::user("alice"),
            Command::UserInfo { user: None },
        );
        request.subject = Some(UserContext {
            name: "alice".to_string(),
            joined_at: "2024-02-02".to_string(),
            created_at: "2020-01-01".to_string(),
            roles: vec!["member".to_string(), "helper".to_string()],
        });

        let replies = f.handler.dispatch(request);
        match &replies[0] {
            Reply::Embed { fields, .. } => {
                assert_eq!(fields[2].value, "member, helper");
            }
            other => panic!("expected embed, got {other:?}"),
        }
    }

    #[test]
    fn test_from_config_wires_configured_paths() {
        use breachhound_test_utils::config::TestConfigBuilder;

        let dir = tempfile::tempdir().unwrap();
        let config = TestConfigBuilder::new()
            .rooted_at(dir.path())
            .free_search_limit(2)
            .build();
        let handler = CommandHandler::from_config(&config);
        assert_eq!(handler.entitlements().free_search_limit(), 2);

        handler.corpus().add_file("dump.txt", b"target").unwrap();
        let replies = handler.dispatch(search_request(Caller::user("zoe"), "target"));

        let reports_dir = dir.path().join("reports");
        assert!(replies.iter().any(
            |r| matches!(r, Reply::File(path) if path.starts_with(&reports_dir))
        ));
        // Stores land under the configured data dir
        assert!(dir.path().join("stores").join("search_counts.json").exists());
    }

    #[test]
    fn test_help_mentions_limit() {
        let f = fixture();
        let replies = f
            .handler
            .dispatch(CommandRequest::new(Caller::user("alice"), Command::Help));
        match &replies[0] {
            Reply::Embed { fields, .. } => {
                assert!(fields.iter().any(|f| f.value.contains("10 searches")));
            }
            other => panic!("expected embed, got {other:?}"),
        }
    }
}
