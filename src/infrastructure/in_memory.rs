use crate::domain::aggregation::{Aggregation, GroupTotal};
use crate::domain::payment::{PaymentDocument, SourcePayment};
use crate::domain::ports::{PaymentSource, STAGING_INDEXES, StagingStore};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A payment source backed by rows already held in memory.
///
/// Used for CSV exports of the extract query and in tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPaymentSource {
    rows: Vec<SourcePayment>,
}

impl InMemoryPaymentSource {
    pub fn new(rows: Vec<SourcePayment>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl PaymentSource for InMemoryPaymentSource {
    async fn extract(&self, limit: Option<u32>) -> Result<Vec<SourcePayment>> {
        let take = limit.map_or(self.rows.len(), |l| l as usize);
        Ok(self.rows.iter().take(take).cloned().collect())
    }
}

/// A thread-safe in-memory staging collection.
///
/// Uses `Arc<RwLock<Vec<PaymentDocument>>>` so clones share the same documents.
/// Aggregations are evaluated in process with the same grouping, ordering and
/// limit rules the document store applies.
#[derive(Default, Clone)]
pub struct InMemoryStagingStore {
    documents: Arc<RwLock<Vec<PaymentDocument>>>,
    indexes: Arc<RwLock<Vec<String>>>,
}

impl InMemoryStagingStore {
    /// Creates a new, empty in-memory staging store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the staged documents in insertion order.
    pub async fn documents(&self) -> Vec<PaymentDocument> {
        self.documents.read().await.clone()
    }

    /// Names of the indexes created so far, in the `field_1_field_1` form.
    pub async fn indexes(&self) -> Vec<String> {
        self.indexes.read().await.clone()
    }
}

fn index_name(keys: &[&str]) -> String {
    keys.iter()
        .map(|k| format!("{k}_1"))
        .collect::<Vec<_>>()
        .join("_")
}

#[async_trait]
impl StagingStore for InMemoryStagingStore {
    async fn clear(&self) -> Result<u64> {
        let mut documents = self.documents.write().await;
        let deleted = documents.len() as u64;
        documents.clear();
        Ok(deleted)
    }

    async fn insert_many(&self, docs: Vec<PaymentDocument>) -> Result<u64> {
        let inserted = docs.len() as u64;
        self.documents.write().await.extend(docs);
        Ok(inserted)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        for keys in STAGING_INDEXES {
            let name = index_name(keys);
            if !indexes.contains(&name) {
                indexes.push(name);
            }
        }
        Ok(())
    }

    async fn find_one(&self) -> Result<Option<PaymentDocument>> {
        Ok(self.documents.read().await.first().cloned())
    }

    async fn aggregate(&self, aggregation: &Aggregation) -> Result<Vec<GroupTotal>> {
        let documents = self.documents.read().await;
        Ok(aggregation.apply(documents.iter()))
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
