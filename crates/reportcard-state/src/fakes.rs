//! In-memory fakes for storage traits (testing only)
//!
//! `MemoryReportStore` satisfies the [`ReportStore`] contract without any
//! external dependencies and counts writes so tests can assert that a
//! request did or did not touch the cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::storage_traits::*;

/// In-memory report store backed by a `HashMap<key, CachedReport>`.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: Mutex<HashMap<String, CachedReport>>,
    puts: AtomicUsize,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls served so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of identities currently stored.
    pub fn len(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn get(&self, identity: &RepositoryIdentity) -> StorageResult<Option<CachedReport>> {
        let reports = self.reports.lock().unwrap();
        Ok(reports.get(identity.key().as_str()).cloned())
    }

    async fn put(&self, report: &CachedReport) -> StorageResult<()> {
        let mut reports = self.reports.lock().unwrap();
        reports.insert(report.identity.key().as_str().to_string(), report.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, identity: &RepositoryIdentity) -> StorageResult<()> {
        let mut reports = self.reports.lock().unwrap();
        reports.remove(identity.key().as_str());
        Ok(())
    }
}
