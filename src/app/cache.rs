//! Process-local cache of recently processed transactions.
//!
//! A latency optimization in front of the database, keyed by transaction
//! hash. Not durable and not authoritative: the unique constraint on
//! `transaction_hash` remains the idempotency boundary, and callers must
//! still handle duplicates at write time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::domain::types::{StoredTransaction, WalletMapping};

#[derive(Debug, Clone)]
pub struct CachedResult {
    pub transaction: StoredTransaction,
    pub mappings: Vec<WalletMapping>,
}

struct Entry {
    result: CachedResult,
    inserted_at: Instant,
}

pub struct ProcessedCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl ProcessedCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Look up a hash, evicting the entry if it has aged out.
    pub fn get(&self, hash: &str) -> Option<CachedResult> {
        let entry = self.entries.get(hash)?;
        if entry.inserted_at.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(hash);
            return None;
        }
        Some(entry.result.clone())
    }

    pub fn insert(&self, hash: String, transaction: StoredTransaction, mappings: Vec<WalletMapping>) {
        self.entries.insert(
            hash,
            Entry {
                result: CachedResult {
                    transaction,
                    mappings,
                },
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop all aged-out entries.
    pub fn sweep(&self) {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() <= self.ttl);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.entries.len(), "swept processed-transaction cache");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Periodic sweep task, intended to be spawned at startup.
    pub fn run_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_stored_transaction;

    #[test]
    fn test_hit_within_ttl() {
        let cache = ProcessedCache::new(Duration::from_secs(60));
        let tx = sample_stored_transaction("abc123");
        cache.insert("abc123".to_string(), tx, vec![]);
        let hit = cache.get("abc123").unwrap();
        assert_eq!(hit.transaction.transaction_hash, "abc123");
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_expired_entry_evicted_on_access() {
        let cache = ProcessedCache::new(Duration::ZERO);
        cache.insert("abc123".to_string(), sample_stored_transaction("abc123"), vec![]);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("abc123").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_stale_entries() {
        let cache = ProcessedCache::new(Duration::from_millis(20));
        cache.insert("old".to_string(), sample_stored_transaction("old"), vec![]);
        std::thread::sleep(Duration::from_millis(30));
        cache.insert("fresh".to_string(), sample_stored_transaction("fresh"), vec![]);
        cache.sweep();
        assert_eq!(cache.len(), 1);
        assert!(cache.get("fresh").is_some());
    }
}
