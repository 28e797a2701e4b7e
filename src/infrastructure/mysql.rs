use crate::config::MySqlConfig;
use crate::domain::payment::SourcePayment;
use crate::domain::ports::PaymentSource;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::Row;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};

/// Joins each payment to the store of its customer and the film it paid for.
pub const EXTRACT_QUERY: &str = r#"
SELECT
  p.payment_id,
  p.customer_id,
  p.staff_id,
  p.rental_id,
  p.amount,
  p.payment_date,
  c.store_id,
  f.film_id,
  f.title,
  CAST(f.rating AS CHAR) AS rating
FROM payment p
JOIN customer c ON p.customer_id = c.customer_id
JOIN rental r ON p.rental_id = r.rental_id
JOIN inventory i ON r.inventory_id = i.inventory_id
JOIN film f ON i.film_id = f.film_id
ORDER BY p.payment_id
"#;

/// Reads payments from a Sakila MySQL database.
#[derive(Clone)]
pub struct MySqlPaymentSource {
    pool: MySqlPool,
}

impl MySqlPaymentSource {
    /// Opens a small connection pool against the configured database.
    pub async fn connect(config: &MySqlConfig) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }
}

fn map_row(row: &MySqlRow) -> std::result::Result<SourcePayment, sqlx::Error> {
    Ok(SourcePayment {
        payment_id: row.try_get("payment_id")?,
        customer_id: row.try_get("customer_id")?,
        staff_id: row.try_get("staff_id")?,
        rental_id: row.try_get("rental_id")?,
        amount: row.try_get("amount")?,
        payment_date: row.try_get("payment_date")?,
        store_id: row.try_get("store_id")?,
        film_id: row.try_get("film_id")?,
        title: row.try_get("title")?,
        rating: row.try_get("rating")?,
    })
}

pub fn extract_sql(limit: Option<u32>) -> String {
    match limit {
        Some(_) => format!("{}LIMIT ?", EXTRACT_QUERY),
        None => EXTRACT_QUERY.to_string(),
    }
}

#[async_trait]
impl PaymentSource for MySqlPaymentSource {
    async fn extract(&self, limit: Option<u32>) -> Result<Vec<SourcePayment>> {
        let sql = extract_sql(limit);
        let mut query = sqlx::query(&sql);
        if let Some(limit) = limit {
            query = query.bind(limit);
        }

        let rows = query.fetch_all(&self.pool).await?;
        tracing::debug!(rows = rows.len(), "extracted payments from MySQL");

        let payments = rows
            .iter()
            .map(map_row)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(payments)
    }
}
