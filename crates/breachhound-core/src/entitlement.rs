//! Entitlement store — API keys and per-user search quotas.
//!
//! A user is "unlimited" iff they hold at least one active API key;
//! otherwise searches are capped at the configured free-tier limit.
//! Keys are never physically deleted, only deactivated.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{JsonStore, StoreError};

/// A single API key record, keyed by its id in the key store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Id of the user this key was issued to.
    pub owner_id: String,
    /// Creation time, RFC 3339.
    pub created_at: String,
    /// Whether this key grants admin rights.
    pub is_admin: bool,
    /// Whether this key is currently active. Revocation flips this to false.
    pub active: bool,
}

/// Aggregate key counts for the `apistats` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStats {
    pub total: usize,
    pub active: usize,
    pub admin: usize,
}

type KeyMap = HashMap<String, ApiKey>;
type QuotaMap = HashMap<String, u64>;

/// Persistent API-key and search-quota state.
pub struct EntitlementStore {
    keys: JsonStore<KeyMap>,
    quota: JsonStore<QuotaMap>,
    free_search_limit: u64,
}

impl EntitlementStore {
    /// Create a store backed by JSON files under `data_dir`.
    pub fn on_disk(data_dir: &Path, free_search_limit: u64) -> Self {
        Self {
            keys: JsonStore::on_disk("api_keys", data_dir),
            quota: JsonStore::on_disk("search_counts", data_dir),
            free_search_limit,
        }
    }

    /// Create a store backed by in-memory fakes, for tests.
    pub fn in_memory(free_search_limit: u64) -> Self {
        Self {
            keys: JsonStore::in_memory("api_keys"),
            quota: JsonStore::in_memory("search_counts"),
            free_search_limit,
        }
    }

    /// The configured free-tier search limit.
    pub fn free_search_limit(&self) -> u64 {
        self.free_search_limit
    }

    /// True iff `owner_id` holds at least one active key.
    pub fn has_active_key(&self, owner_id: &str) -> Result<bool, StoreError> {
        let keys = self.keys.load()?;
        Ok(keys.values().any(|k| k.owner_id == owner_id && k.active))
    }

    /// True iff `owner_id` holds at least one active admin key.
    pub fn is_admin(&self, owner_id: &str) -> Result<bool, StoreError> {
        let keys = self.keys.load()?;
        Ok(keys
            .values()
            .any(|k| k.owner_id == owner_id && k.active && k.is_admin))
    }

    /// Issue a new active key for `owner_id` and return its id.
    ///
    /// The id is deterministic from the owner and the creation second;
    /// two keys for the same owner within one second collide and the
    /// later write wins.
    pub fn create_key(&self, owner_id: &str, is_admin: bool) -> Result<String, StoreError> {
        let now = Utc::now();
        let key_id = format!("key_{}_{}", owner_id, now.format("%Y%m%d%H%M%S"));
        let record = ApiKey {
            owner_id: owner_id.to_string(),
            created_at: now.to_rfc3339(),
            is_admin,
            active: true,
        };

        self.keys.update(|keys| {
            keys.insert(key_id.clone(), record);
        })?;

        info!(owner = %owner_id, admin = is_admin, "API key created");
        Ok(key_id)
    }

    /// Deactivate a key. Returns whether the key existed.
    pub fn revoke_key(&self, key_id: &str) -> Result<bool, StoreError> {
        let existed = self.keys.update(|keys| match keys.get_mut(key_id) {
            Some(record) => {
                record.active = false;
                true
            }
            None => false,
        })?;

        if existed {
            info!(key = %key_id, "API key revoked");
        }
        Ok(existed)
    }

    /// Number of searches `owner_id` has performed. Zero if never searched.
    pub fn search_count(&self, owner_id: &str) -> Result<u64, StoreError> {
        let quota = self.quota.load()?;
        Ok(quota.get(owner_id).copied().unwrap_or(0))
    }

    /// Record one search against `owner_id`'s quota.
    pub fn increment_search_count(&self, owner_id: &str) -> Result<(), StoreError> {
        self.quota.update(|quota| {
            *quota.entry(owner_id.to_string()).or_insert(0) += 1;
        })
    }

    /// Free searches left for a metered user. `None` means unmetered.
    pub fn remaining_free_searches(&self, owner_id: &str) -> Result<Option<u64>, StoreError> {
        if self.has_active_key(owner_id)? {
            return Ok(None);
        }
        let used = self.search_count(owner_id)?;
        Ok(Some(self.free_search_limit.saturating_sub(used)))
    }

    /// Aggregate key counts for statistics reporting.
    pub fn key_stats(&self) -> Result<KeyStats, StoreError> {
        let keys = self.keys.load()?;
        Ok(KeyStats {
            total: keys.len(),
            active: keys.values().filter(|k| k.active).count(),
            admin: keys.values().filter(|k| k.active && k.is_admin).count(),
        })
    }

    /// Ensure `owner_id` holds an active admin key, issuing one if needed.
    ///
    /// Used at startup for the configured bootstrap admin. Returns the new
    /// key id when one was created.
    pub fn ensure_admin(&self, owner_id: &str) -> Result<Option<String>, StoreError> {
        if self.is_admin(owner_id)? {
            return Ok(None);
        }
        let key_id = self.create_key(owner_id, true)?;
        info!(owner = %owner_id, "bootstrap admin key issued");
        Ok(Some(key_id))
    }
}
