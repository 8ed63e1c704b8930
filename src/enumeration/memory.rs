use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::DomainSource;

/// In-memory domain table for tests and local dry runs.
#[derive(Debug, Default)]
pub struct MemoryDomainTable {
    name: String,
    domains: Vec<String>,
    failure: Option<String>,
    scans: AtomicUsize,
}

impl MemoryDomainTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains.extend(domains.into_iter().map(Into::into));
        self
    }

    /// Every scan fails with `reason`.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DomainSource for MemoryDomainTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scan_domains(&self) -> Result<Vec<String>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.failure {
            return Err(anyhow!("scan of {} failed: {}", self.name, reason));
        }
        Ok(self.domains.clone())
    }
}
