use crate::domain::payment::{PaymentDocument, SourcePayment};
use crate::domain::ports::{PaymentSourceBox, StagingStoreBox};
use crate::error::Result;
use chrono::{DateTime, Utc};

/// Outcome of one load into the staging collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Rows returned by the source.
    pub extracted: usize,
    /// Documents written to the collection.
    pub loaded: u64,
    /// Rows dropped because they could not be transformed.
    pub skipped: usize,
    /// Documents removed from the collection before loading.
    pub replaced: u64,
    /// Where the documents went.
    pub target: String,
}

/// Transforms extracted rows into staged documents sharing one `loaded_at`.
///
/// Rows that fail to transform are logged and left out; the count of such
/// rows is returned alongside the documents.
pub fn transform_rows(
    rows: Vec<SourcePayment>,
    loaded_at: DateTime<Utc>,
) -> (Vec<PaymentDocument>, usize) {
    let mut documents = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    for row in rows {
        let payment_id = row.payment_id;
        match PaymentDocument::from_source(row, loaded_at) {
            Ok(doc) => documents.push(doc),
            Err(e) => {
                tracing::warn!(payment_id, error = %e, "skipping payment row");
                skipped += 1;
            }
        }
    }
    (documents, skipped)
}

/// Runs the extract, transform and load steps against the staging collection.
///
/// Each run replaces the whole collection, so running it twice with the same
/// source leaves a single copy of every payment.
pub struct StagingLoader {
    source: PaymentSourceBox,
    store: StagingStoreBox,
}

impl StagingLoader {
    /// Creates a new `StagingLoader`.
    ///
    /// # Arguments
    ///
    /// * `source` - Where payment rows are extracted from.
    /// * `store` - The staging collection that is reloaded.
    pub fn new(source: PaymentSourceBox, store: StagingStoreBox) -> Self {
        Self { source, store }
    }

    /// Extracts at most `limit` rows and reloads the staging collection with them.
    pub async fn run(&self, limit: Option<u32>) -> Result<LoadSummary> {
        self.run_at(limit, Utc::now()).await
    }

    /// Same as [`run`](Self::run) with an explicit load timestamp.
    pub async fn run_at(&self, limit: Option<u32>, loaded_at: DateTime<Utc>) -> Result<LoadSummary> {
        let rows = self.source.extract(limit).await?;
        let extracted = rows.len();
        tracing::info!(extracted, ?limit, "extracted payment rows");

        let (documents, skipped) = transform_rows(rows, loaded_at);

        let replaced = self.store.clear().await?;
        let loaded = self.store.insert_many(documents).await?;
        self.store.ensure_indexes().await?;

        let target = self.store.describe();
        tracing::info!(
            loaded,
            replaced,
            skipped,
            target = %target,
            "Loaded {} documents into staging",
            loaded
        );

        Ok(LoadSummary {
            extracted,
            loaded,
            skipped,
            replaced,
            target,
        })
    }

    /// Consumes the loader and hands back the staging store, e.g. for reporting.
    pub fn into_store(self) -> StagingStoreBox {
        self.store
    }
}
