//! Cross-ledger root index

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::IndexError;

/// One completed anchoring, as handed to audit writers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub scan_id: Uuid,
    pub public_tx_id: String,
    pub private_tx_id: String,
    pub cross_ledger_root: String,
    pub anchored_at: DateTime<Utc>,
}

/// Store of anchor records addressed by cross-ledger root
#[async_trait]
pub trait RootIndex: Send + Sync {
    fn name(&self) -> &str;

    async fn record(&self, record: AnchorRecord) -> Result<(), IndexError>;

    async fn lookup(&self, root: &str) -> Result<Option<AnchorRecord>, IndexError>;

    /// All records for a scan, oldest first
    async fn for_scan(&self, scan_id: &Uuid) -> Result<Vec<AnchorRecord>, IndexError>;
}

/// Default bound on [`MemoryRootIndex`] entries
pub const DEFAULT_INDEX_CAPACITY: usize = 100_000;

#[derive(Debug, Default)]
struct Entries {
    records: HashMap<String, AnchorRecord>,
    /// Roots in insertion order, oldest at the front
    order: VecDeque<String>,
}

/// In-memory index (lost on restart).
///
/// Holds at most `capacity` records; the oldest is evicted first.
#[derive(Debug)]
pub struct MemoryRootIndex {
    entries: RwLock<Entries>,
    capacity: usize,
}

impl Default for MemoryRootIndex {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_INDEX_CAPACITY)
    }
}

impl MemoryRootIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero capacity is treated as one
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.records.is_empty()
    }
}

#[async_trait]
impl RootIndex for MemoryRootIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn record(&self, record: AnchorRecord) -> Result<(), IndexError> {
        let mut entries = self.entries.write().await;
        let root = record.cross_ledger_root.clone();
        if entries.records.insert(root.clone(), record).is_none() {
            entries.order.push_back(root);
        }
        while entries.records.len() > self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.records.remove(&oldest);
            tracing::debug!(root = %oldest, "Evicted oldest root index entry");
        }
        Ok(())
    }

    async fn lookup(&self, root: &str) -> Result<Option<AnchorRecord>, IndexError> {
        Ok(self.entries.read().await.records.get(root).cloned())
    }

    async fn for_scan(&self, scan_id: &Uuid) -> Result<Vec<AnchorRecord>, IndexError> {
        let entries = self.entries.read().await;
        let mut found: Vec<AnchorRecord> = entries
            .records
            .values()
            .filter(|r| &r.scan_id == scan_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.anchored_at);
        Ok(found)
    }
}
