use super::payment::PaymentDocument;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;

/// Number of customers returned by the top spenders report unless overridden.
pub const TOP_CUSTOMERS_DEFAULT: usize = 10;

/// Decimal places kept on summed amounts. Sakila stores amounts as `DECIMAL(5,2)`.
pub const AMOUNT_SCALE: u32 = 2;

/// Normalises a monetary total to `AMOUNT_SCALE` decimal places.
pub fn money(value: Decimal) -> Decimal {
    let mut value = value.round_dp(AMOUNT_SCALE);
    value.rescale(AMOUNT_SCALE);
    value
}

/// Document field a report groups on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    StoreId,
    FilmRating,
    CustomerId,
}

impl GroupField {
    /// Dotted path of the field inside a staged document.
    pub fn path(&self) -> &'static str {
        match self {
            GroupField::StoreId => "store_id",
            GroupField::FilmRating => "film.rating",
            GroupField::CustomerId => "customer_id",
        }
    }

    /// Column heading used when the report is written out.
    pub fn column(&self) -> &'static str {
        match self {
            GroupField::StoreId => "store_id",
            GroupField::FilmRating => "rating",
            GroupField::CustomerId => "customer_id",
        }
    }

    pub fn key_of(&self, doc: &PaymentDocument) -> GroupKey {
        match self {
            GroupField::StoreId => GroupKey::Int(i64::from(doc.store_id)),
            GroupField::FilmRating => doc
                .film
                .rating
                .map(|r| GroupKey::Text(r.as_str().to_string()))
                .unwrap_or(GroupKey::Missing),
            GroupField::CustomerId => GroupKey::Int(i64::from(doc.customer_id)),
        }
    }
}

/// Name of the summed `amount` column in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    TotalRevenue,
    TotalSpend,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::TotalRevenue => "total_revenue",
            Metric::TotalSpend => "total_spend",
        }
    }
}

/// Value of the grouped field for one result row.
///
/// Ordered nulls first, then numbers, then text, matching the document
/// store's comparison order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Missing,
    Int(i64),
    Text(String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Missing => Ok(()),
            GroupKey::Int(value) => write!(f, "{value}"),
            GroupKey::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupTotal {
    pub key: GroupKey,
    pub total: Decimal,
}

impl GroupTotal {
    pub fn new(key: GroupKey, total: Decimal) -> Self {
        Self {
            key,
            total: money(total),
        }
    }
}

/// A read-only group / sum / sort-descending / limit request over the staged payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregation {
    pub group_by: GroupField,
    pub metric: Metric,
    pub limit: Option<usize>,
}

impl Aggregation {
    /// Total revenue per store.
    pub fn revenue_by_store() -> Self {
        Self {
            group_by: GroupField::StoreId,
            metric: Metric::TotalRevenue,
            limit: None,
        }
    }

    /// Total revenue per film rating.
    pub fn revenue_by_rating() -> Self {
        Self {
            group_by: GroupField::FilmRating,
            metric: Metric::TotalRevenue,
            limit: None,
        }
    }

    /// The `limit` customers with the highest total spend.
    pub fn top_customers(limit: usize) -> Self {
        Self {
            group_by: GroupField::CustomerId,
            metric: Metric::TotalSpend,
            limit: Some(limit),
        }
    }

    /// Evaluates the aggregation over documents held in process.
    ///
    /// Rows come back sorted by total descending; equal totals are ordered by
    /// ascending key.
    pub fn apply<'a, I>(&self, docs: I) -> Vec<GroupTotal>
    where
        I: IntoIterator<Item = &'a PaymentDocument>,
    {
        let mut sums: HashMap<GroupKey, Decimal> = HashMap::new();
        for doc in docs {
            *sums.entry(self.group_by.key_of(doc)).or_default() += doc.amount;
        }

        let mut rows: Vec<GroupTotal> = sums
            .into_iter()
            .map(|(key, total)| GroupTotal::new(key, total))
            .collect();
        sort_descending(&mut rows);
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }
}

pub fn sort_descending(rows: &mut [GroupTotal]) {
    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
}
