use std::fmt;

use crate::types::MAX_PAGE_COUNT;

/// What `begin_write` does while another write transaction is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WritePolicy {
    /// Wait until the active writer finishes.
    Block,
    /// Return `WriteConflict` immediately.
    FailFast,
}

/// Tunables for an open store.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// fsync the WAL and backing file on every commit.
    /// Env: COFFER_SYNC = 0|1|true|false (default true)
    pub sync_on_commit: bool,

    /// Env: COFFER_WRITE_POLICY = block|fail-fast (default block)
    pub write_policy: WritePolicy,

    /// Largest page count the backing file may reach before writes fail with `StorageFull`.
    /// Env: COFFER_MAX_PAGES (default 2^40 - 1)
    pub max_pages: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_on_commit: true,
            write_policy: WritePolicy::Block,
            max_pages: MAX_PAGE_COUNT,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("COFFER_SYNC") {
            let s = v.trim().to_ascii_lowercase();
            cfg.sync_on_commit = !(s == "0" || s == "false" || s == "off" || s == "no");
        }

        if let Some(v) = lookup("COFFER_WRITE_POLICY") {
            match v.trim().to_ascii_lowercase().as_str() {
                "fail-fast" | "failfast" | "fail_fast" => cfg.write_policy = WritePolicy::FailFast,
                "block" => cfg.write_policy = WritePolicy::Block,
                _ => {}
            }
        }

        if let Some(v) = lookup("COFFER_MAX_PAGES") {
            if let Ok(n) = v.trim().parse::<u64>() {
                if n > 0 {
                    cfg.max_pages = n.min(MAX_PAGE_COUNT);
                }
            }
        }

        cfg
    }

    pub fn with_sync_on_commit(mut self, sync: bool) -> Self {
        self.sync_on_commit = sync;
        self
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = max_pages.min(MAX_PAGE_COUNT);
        self
    }
}

impl fmt::Display for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sync_on_commit={} write_policy={:?} max_pages={}",
            self.sync_on_commit, self.write_policy, self.max_pages
        )
    }
}
