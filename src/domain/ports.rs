use super::aggregation::{Aggregation, GroupTotal};
use super::payment::{PaymentDocument, SourcePayment};
use crate::error::Result;
use async_trait::async_trait;

/// Secondary indexes kept on the staging collection, as ascending key lists.
pub const STAGING_INDEXES: [&[&str]; 2] = [&["customer_id"], &["store_id", "date_key"]];

/// Where extracted payment rows come from.
#[async_trait]
pub trait PaymentSource: Send + Sync {
    /// Returns at most `limit` rows, or every row when `limit` is `None`.
    async fn extract(&self, limit: Option<u32>) -> Result<Vec<SourcePayment>>;
}

/// The staging collection holding transformed payment documents.
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Removes every document and returns how many were deleted.
    async fn clear(&self) -> Result<u64>;
    /// Inserts the batch and returns how many documents were written.
    async fn insert_many(&self, docs: Vec<PaymentDocument>) -> Result<u64>;
    async fn ensure_indexes(&self) -> Result<()>;
    /// Any single document, used as a sanity check after loading.
    async fn find_one(&self) -> Result<Option<PaymentDocument>>;
    async fn aggregate(&self, aggregation: &Aggregation) -> Result<Vec<GroupTotal>>;
    /// Human readable location of the collection, for logs and summaries.
    fn describe(&self) -> String;
}

pub type PaymentSourceBox = Box<dyn PaymentSource>;
pub type StagingStoreBox = Box<dyn StagingStore>;
