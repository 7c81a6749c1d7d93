//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::Path;

use breachhound_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .free_search_limit(3)
///     .corpus_root("/tmp/corpus")
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn corpus_root(mut self, root: impl AsRef<Path>) -> Self {
        self.config.corpus.root = root.as_ref().to_path_buf();
        self
    }

    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.storage.data_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn reports_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.storage.reports_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn free_search_limit(mut self, limit: u64) -> Self {
        self.config.quota.free_search_limit = limit;
        self
    }

    pub fn bootstrap_admin(mut self, owner: &str) -> Self {
        self.config.service.bootstrap_admin = Some(owner.to_string());
        self
    }

    pub fn keepalive(mut self, addr: &str, port: u16) -> Self {
        self.config.keepalive.enabled = true;
        self.config.keepalive.listen_addr = addr.to_string();
        self.config.keepalive.listen_port = port;
        self
    }

    /// Point every filesystem path at subdirectories of `base`.
    pub fn rooted_at(self, base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        self.corpus_root(base.join("breaches"))
            .data_dir(base.join("stores"))
            .reports_dir(base.join("reports"))
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
