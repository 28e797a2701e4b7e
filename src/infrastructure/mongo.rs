use crate::config::MongoConfig;
use crate::domain::aggregation::{
    AMOUNT_SCALE, Aggregation, GroupKey, GroupTotal, sort_descending,
};
use crate::domain::payment::{DateKey, Film, FilmRating, PaymentDocument};
use crate::domain::ports::{STAGING_INDEXES, StagingStore};
use crate::error::{Result, StagingError};
use async_trait::async_trait;
use bson::{Bson, Document, doc};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection, IndexModel};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Film sub-document as stored in MongoDB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedFilm {
    pub film_id: i64,
    pub title: String,
    pub rating: Option<String>,
}

/// Payment document as stored in MongoDB.
///
/// BSON has no unsigned or decimal-with-scale types that the staging queries
/// need, so ids are widened to `i64`, the amount is a double and timestamps
/// are native BSON dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedPayment {
    pub payment_id: i64,
    pub customer_id: i64,
    pub staff_id: i64,
    pub rental_id: Option<i64>,
    pub store_id: i64,
    pub film: StagedFilm,
    pub amount: f64,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub payment_date: DateTime<Utc>,
    pub date_key: i64,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub loaded_at: DateTime<Utc>,
}

impl From<&PaymentDocument> for StagedPayment {
    fn from(doc: &PaymentDocument) -> Self {
        Self {
            payment_id: i64::from(doc.payment_id),
            customer_id: i64::from(doc.customer_id),
            staff_id: i64::from(doc.staff_id),
            rental_id: doc.rental_id.map(i64::from),
            store_id: i64::from(doc.store_id),
            film: StagedFilm {
                film_id: i64::from(doc.film.film_id),
                title: doc.film.title.clone(),
                rating: doc.film.rating.map(|r| r.as_str().to_string()),
            },
            amount: doc.amount.to_f64().unwrap_or_default(),
            payment_date: doc.payment_date,
            date_key: i64::from(doc.date_key.0),
            loaded_at: doc.loaded_at,
        }
    }
}

fn narrow<T: TryFrom<i64>>(field: &str, value: i64) -> Result<T> {
    T::try_from(value)
        .map_err(|_| StagingError::ValidationError(format!("{field} out of range: {value}")))
}

fn decimal_from_f64(value: f64) -> Result<Decimal> {
    Decimal::from_f64_retain(value)
        .ok_or_else(|| StagingError::ValidationError(format!("amount is not finite: {value}")))
}

impl TryFrom<StagedPayment> for PaymentDocument {
    type Error = StagingError;

    fn try_from(staged: StagedPayment) -> Result<Self> {
        let rating = staged
            .film
            .rating
            .as_deref()
            .map(str::parse::<FilmRating>)
            .transpose()?;

        Ok(Self {
            payment_id: narrow("payment_id", staged.payment_id)?,
            customer_id: narrow("customer_id", staged.customer_id)?,
            staff_id: narrow("staff_id", staged.staff_id)?,
            rental_id: staged
                .rental_id
                .map(|id| narrow("rental_id", id))
                .transpose()?,
            store_id: narrow("store_id", staged.store_id)?,
            film: Film {
                film_id: narrow("film.film_id", staged.film.film_id)?,
                title: staged.film.title,
                rating,
            },
            amount: decimal_from_f64(staged.amount)?.round_dp(4),
            payment_date: staged.payment_date,
            date_key: DateKey(narrow("date_key", staged.date_key)?),
            loaded_at: staged.loaded_at,
        })
    }
}

/// Builds the aggregation pipeline for a report:
/// `$group` on the field summing `amount`, `$set` rounding the sum to cents,
/// `$sort` descending with `_id` as tie-breaker, then `$limit` when the report
/// is capped.
///
/// Sorting and limiting must see the rounded total: summed doubles carry
/// float noise that would otherwise order equal totals ahead of their keys.
pub fn pipeline(aggregation: &Aggregation) -> Vec<Document> {
    let metric = aggregation.metric.name();

    let mut group = doc! { "_id": format!("${}", aggregation.group_by.path()) };
    group.insert(metric, doc! { "$sum": "$amount" });

    let scale = AMOUNT_SCALE as i32;
    let mut rounded = Document::new();
    rounded.insert(metric, doc! { "$round": [format!("${metric}"), scale] });

    let mut sort = Document::new();
    sort.insert(metric, -1);
    sort.insert("_id", 1);

    let mut stages = vec![
        doc! { "$group": group },
        doc! { "$set": rounded },
        doc! { "$sort": sort },
    ];
    if let Some(limit) = aggregation.limit {
        stages.push(doc! { "$limit": i64::try_from(limit).unwrap_or(i64::MAX) });
    }
    stages
}

fn group_key(value: Option<&Bson>) -> Result<GroupKey> {
    match value {
        None | Some(Bson::Null) => Ok(GroupKey::Missing),
        Some(Bson::Int32(v)) => Ok(GroupKey::Int(i64::from(*v))),
        Some(Bson::Int64(v)) => Ok(GroupKey::Int(*v)),
        Some(Bson::String(v)) => Ok(GroupKey::Text(v.clone())),
        Some(other) => Err(StagingError::ValidationError(format!(
            "unsupported group key: {other}"
        ))),
    }
}

fn metric_value(value: Option<&Bson>) -> Result<Decimal> {
    match value {
        Some(Bson::Double(v)) => decimal_from_f64(*v),
        Some(Bson::Int32(v)) => Ok(Decimal::from(*v)),
        Some(Bson::Int64(v)) => Ok(Decimal::from(*v)),
        other => Err(StagingError::ValidationError(format!(
            "missing or non-numeric total: {other:?}"
        ))),
    }
}

/// Converts one `{_id, <metric>}` result document into a report row.
pub fn group_total(document: &Document, metric: &str) -> Result<GroupTotal> {
    Ok(GroupTotal::new(
        group_key(document.get("_id"))?,
        metric_value(document.get(metric))?,
    ))
}

/// Converts a pipeline's result documents into report rows, in report order.
pub fn report_rows(documents: &[Document], metric: &str) -> Result<Vec<GroupTotal>> {
    let mut rows = documents
        .iter()
        .map(|document| group_total(document, metric))
        .collect::<Result<Vec<_>>>()?;
    sort_descending(&mut rows);
    Ok(rows)
}

/// Staging collection in MongoDB.
#[derive(Clone)]
pub struct MongoStagingStore {
    collection: Collection<StagedPayment>,
    namespace: String,
}

impl MongoStagingStore {
    /// Connects to the server and binds the configured database and collection.
    ///
    /// The driver connects lazily, so an unreachable server surfaces on the
    /// first operation rather than here.
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.uri).await?;
        let collection = client
            .database(&config.database)
            .collection::<StagedPayment>(&config.collection);
        Ok(Self {
            collection,
            namespace: config.namespace(),
        })
    }
}

#[async_trait]
impl StagingStore for MongoStagingStore {
    async fn clear(&self) -> Result<u64> {
        let result = self.collection.delete_many(doc! {}).await?;
        Ok(result.deleted_count)
    }

    async fn insert_many(&self, docs: Vec<PaymentDocument>) -> Result<u64> {
        if docs.is_empty() {
            return Ok(0);
        }
        let staged: Vec<StagedPayment> = docs.iter().map(StagedPayment::from).collect();
        let result = self.collection.insert_many(staged).await?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        for keys in STAGING_INDEXES {
            let mut index_keys = Document::new();
            for key in keys {
                index_keys.insert(*key, 1);
            }
            let index = IndexModel::builder().keys(index_keys).build();
            let created = self.collection.create_index(index).await?;
            tracing::debug!(index = %created.index_name, "ensured staging index");
        }
        Ok(())
    }

    async fn find_one(&self) -> Result<Option<PaymentDocument>> {
        self.collection
            .find_one(doc! {})
            .await?
            .map(PaymentDocument::try_from)
            .transpose()
    }

    async fn aggregate(&self, aggregation: &Aggregation) -> Result<Vec<GroupTotal>> {
        // The server rejects `$limit: 0`.
        if aggregation.limit == Some(0) {
            return Ok(Vec::new());
        }

        let stages = pipeline(aggregation);
        tracing::debug!(pipeline = ?stages, namespace = %self.namespace, "running aggregation");

        let cursor = self.collection.aggregate(stages).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        report_rows(&documents, aggregation.metric.name())
    }

    fn describe(&self) -> String {
        format!("MongoDB {}", self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregation::TOP_CUSTOMERS_DEFAULT;
    use crate::domain::payment::{SourcePayment, parse_datetime};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pipeline_revenue_by_store() {
        let stages = pipeline(&Aggregation::revenue_by_store());

        assert_eq!(
            stages,
            vec![
                doc! { "$group": { "_id": "$store_id", "total_revenue": { "$sum": "$amount" } } },
                doc! { "$set": { "total_revenue": { "$round": ["$total_revenue", 2_i32] } } },
                doc! { "$sort": { "total_revenue": -1, "_id": 1 } },
            ]
        );
    }

    #[test]
    fn test_pipeline_revenue_by_rating_uses_nested_path() {
        let stages = pipeline(&Aggregation::revenue_by_rating());
        let group = stages[0].get_document("$group").unwrap();

        assert_eq!(group.get_str("_id").unwrap(), "$film.rating");
        assert_eq!(stages.len(), 3);
    }

    #[test]
    fn test_pipeline_top_customers_is_limited() {
        let stages = pipeline(&Aggregation::top_customers(TOP_CUSTOMERS_DEFAULT));

        assert_eq!(stages.len(), 4);
        assert_eq!(
            stages[0],
            doc! { "$group": { "_id": "$customer_id", "total_spend": { "$sum": "$amount" } } }
        );
        assert_eq!(
            stages[1],
            doc! { "$set": { "total_spend": { "$round": ["$total_spend", 2_i32] } } }
        );
        assert_eq!(stages[2], doc! { "$sort": { "total_spend": -1, "_id": 1 } });
        assert_eq!(stages[3], doc! { "$limit": 10_i64 });
    }

    #[test]
    fn test_pipeline_rounds_before_sorting_and_limiting() {
        let stages = pipeline(&Aggregation::top_customers(3));
        let names: Vec<&str> = stages
            .iter()
            .map(|stage| stage.keys().next().unwrap().as_str())
            .collect();

        assert_eq!(names, ["$group", "$set", "$sort", "$limit"]);
    }

    #[test]
    fn test_report_rows_break_float_noise_ties_by_key() {
        // 0.10 + 0.20 summed as doubles lands just above 0.30
        let documents = [
            doc! { "_id": 5_i64, "total_spend": 0.1_f64 + 0.2_f64 },
            doc! { "_id": 3_i64, "total_spend": 0.3_f64 },
            doc! { "_id": 9_i64, "total_spend": 4.99_f64 },
        ];

        let rows = report_rows(&documents, "total_spend").unwrap();

        let keys: Vec<GroupKey> = rows.iter().map(|row| row.key.clone()).collect();
        assert_eq!(keys, [GroupKey::Int(9), GroupKey::Int(3), GroupKey::Int(5)]);
        assert_eq!(rows[1].total, rows[2].total);
        assert_eq!(rows[2].total.to_string(), "0.30");
    }

    #[test]
    fn test_group_total_from_result_document() {
        let row = group_total(&doc! { "_id": 1_i64, "total_revenue": 25.940000000000005 }, "total_revenue")
            .unwrap();
        assert_eq!(row.key, GroupKey::Int(1));
        assert_eq!(row.total.to_string(), "25.94");

        let row = group_total(&doc! { "_id": Bson::Null, "total_revenue": 1.99 }, "total_revenue")
            .unwrap();
        assert_eq!(row.key, GroupKey::Missing);

        let row = group_total(&doc! { "_id": "PG-13", "total_revenue": 3_i32 }, "total_revenue")
            .unwrap();
        assert_eq!(row.key, GroupKey::Text("PG-13".to_string()));
        assert_eq!(row.total.to_string(), "3.00");
    }

    #[test]
    fn test_group_total_rejects_missing_metric() {
        assert!(group_total(&doc! { "_id": 1_i64 }, "total_spend").is_err());
    }

    #[test]
    fn test_staged_payment_conversion() {
        let loaded_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let row = SourcePayment {
            payment_id: 16049,
            customer_id: 599,
            staff_id: 2,
            rental_id: Some(15725),
            amount: dec!(2.99),
            payment_date: parse_datetime("2005-08-23 11:25:00").unwrap(),
            store_id: 2,
            film_id: 101,
            title: "BROTHERHOOD BLANKET".to_string(),
            rating: Some("R".to_string()),
        };
        let doc = PaymentDocument::from_source(row, loaded_at).unwrap();

        let staged = StagedPayment::from(&doc);
        assert_eq!(staged.amount, 2.99);
        assert_eq!(staged.date_key, 20050823);
        assert_eq!(staged.film.rating.as_deref(), Some("R"));

        let bson = bson::to_document(&staged).unwrap();
        assert!(matches!(bson.get("payment_date"), Some(Bson::DateTime(_))));
        assert_eq!(bson.get_document("film").unwrap().get_str("rating").unwrap(), "R");

        let back = PaymentDocument::try_from(staged).unwrap();
        assert_eq!(back, doc);
    }
}
