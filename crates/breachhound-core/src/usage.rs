//! Usage tracker — per-user, per-command counters for statistics reporting.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::store::{JsonStore, StoreError};

/// Append-only usage counters for a single user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Per-command invocation counts.
    pub commands: HashMap<String, u64>,
    /// Total commands invoked by this user.
    pub total_uses: u64,
    /// Last invocation time, RFC 3339. Empty until the first command.
    pub last_used: String,
}

/// Aggregate totals for the `userstats` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageTotals {
    pub users: usize,
    pub commands: u64,
}

type UsageMap = HashMap<String, UsageRecord>;

/// Persistent per-user usage statistics.
pub struct UsageTracker {
    store: JsonStore<UsageMap>,
}

impl UsageTracker {
    /// Create a tracker backed by a JSON file under `data_dir`.
    pub fn on_disk(data_dir: &Path) -> Self {
        Self {
            store: JsonStore::on_disk("user_stats", data_dir),
        }
    }

    /// Create a tracker backed by an in-memory fake, for tests.
    pub fn in_memory() -> Self {
        Self {
            store: JsonStore::in_memory("user_stats"),
        }
    }

    /// Record one invocation of `command` by `owner_id`.
    pub fn record(&self, owner_id: &str, command: &str) -> Result<(), StoreError> {
        self.store.update(|stats| {
            let record = stats.entry(owner_id.to_string()).or_default();
            *record.commands.entry(command.to_string()).or_insert(0) += 1;
            record.total_uses += 1;
            record.last_used = Utc::now().to_rfc3339();
        })
    }

    /// Total users seen and total commands recorded.
    pub fn totals(&self) -> Result<UsageTotals, StoreError> {
        let stats = self.store.load()?;
        Ok(UsageTotals {
            users: stats.len(),
            commands: stats.values().map(|r| r.total_uses).sum(),
        })
    }

    /// The `n` most active users as `(owner_id, total_uses)`, descending.
    pub fn top_users(&self, n: usize) -> Result<Vec<(String, u64)>, StoreError> {
        let stats = self.store.load()?;
        let mut users: Vec<(String, u64)> = stats
            .into_iter()
            .map(|(owner, record)| (owner, record.total_uses))
            .collect();
        users.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        users.truncate(n);
        Ok(users)
    }
}
