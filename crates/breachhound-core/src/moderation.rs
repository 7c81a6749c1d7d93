//! Moderation store — the persisted banned-IP list.

use std::net::Ipv4Addr;
use std::path::Path;

use tracing::info;

use crate::error::BotError;
use crate::store::{JsonStore, StoreError};

/// Outcome of a ban request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanOutcome {
    Banned,
    AlreadyBanned,
}

/// Outcome of an unban request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnbanOutcome {
    Unbanned,
    NotBanned,
}

/// Persistent set of banned IPv4 addresses, stored as dotted-quad strings.
pub struct BanList {
    store: JsonStore<Vec<String>>,
}

impl BanList {
    /// Create a list backed by a JSON file under `data_dir`.
    pub fn on_disk(data_dir: &Path) -> Self {
        Self {
            store: JsonStore::on_disk("banned_ips", data_dir),
        }
    }

    /// Create a list backed by an in-memory fake, for tests.
    pub fn in_memory() -> Self {
        Self {
            store: JsonStore::in_memory("banned_ips"),
        }
    }

    /// Ban an address. Rejects anything that is not a valid dotted quad.
    pub fn ban(&self, ip: &str) -> Result<BanOutcome, BotError> {
        let ip = validate(ip)?;
        let outcome = self.store.update(|ips| {
            if ips.iter().any(|existing| existing == &ip) {
                BanOutcome::AlreadyBanned
            } else {
                ips.push(ip.clone());
                BanOutcome::Banned
            }
        })?;

        if outcome == BanOutcome::Banned {
            info!(%ip, "IP banned");
        }
        Ok(outcome)
    }

    /// Unban an address.
    pub fn unban(&self, ip: &str) -> Result<UnbanOutcome, BotError> {
        let ip = validate(ip)?;
        let outcome = self.store.update(|ips| {
            let before = ips.len();
            ips.retain(|existing| existing != &ip);
            if ips.len() < before {
                UnbanOutcome::Unbanned
            } else {
                UnbanOutcome::NotBanned
            }
        })?;

        if outcome == UnbanOutcome::Unbanned {
            info!(%ip, "IP unbanned");
        }
        Ok(outcome)
    }

    /// Whether an address is currently banned.
    pub fn is_banned(&self, ip: &str) -> Result<bool, StoreError> {
        let ips = self.store.load()?;
        Ok(ips.iter().any(|existing| existing == ip))
    }

    /// All banned addresses, in insertion order.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        self.store.load()
    }
}

/// Validate dotted-quad IPv4 syntax, including the 0–255 octet range.
fn validate(ip: &str) -> Result<String, BotError> {
    ip.parse::<Ipv4Addr>()
        .map(|addr| addr.to_string())
        .map_err(|_| BotError::Validation(format!("'{ip}' is not a valid IPv4 address")))
}
