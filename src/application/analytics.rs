use crate::domain::aggregation::{Aggregation, GroupTotal};
use crate::domain::payment::PaymentDocument;
use crate::domain::ports::StagingStoreBox;
use crate::error::Result;

/// Exploratory reports over the staging collection.
///
/// Every method is a single read; nothing is cached between calls.
pub struct Analytics {
    store: StagingStoreBox,
}

impl Analytics {
    pub fn new(store: StagingStoreBox) -> Self {
        Self { store }
    }

    /// One staged document, or `None` if the collection is empty.
    pub async fn sample(&self) -> Result<Option<PaymentDocument>> {
        self.store.find_one().await
    }

    /// Total revenue per store, highest first.
    pub async fn revenue_by_store(&self) -> Result<Vec<GroupTotal>> {
        self.run(Aggregation::revenue_by_store()).await
    }

    /// Total revenue per film rating, highest first.
    pub async fn revenue_by_rating(&self) -> Result<Vec<GroupTotal>> {
        self.run(Aggregation::revenue_by_rating()).await
    }

    /// The `limit` customers with the largest total spend, highest first.
    pub async fn top_customers(&self, limit: usize) -> Result<Vec<GroupTotal>> {
        self.run(Aggregation::top_customers(limit)).await
    }

    pub async fn run(&self, aggregation: Aggregation) -> Result<Vec<GroupTotal>> {
        let rows = self.store.aggregate(&aggregation).await?;
        tracing::debug!(
            group_by = aggregation.group_by.path(),
            rows = rows.len(),
            "aggregation finished"
        );
        Ok(rows)
    }
}
