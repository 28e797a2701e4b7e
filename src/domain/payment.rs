use crate::error::{Result, StagingError};
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// MPAA rating of a film, as stored in the Sakila `film.rating` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilmRating {
    #[serde(rename = "G")]
    G,
    #[serde(rename = "PG")]
    Pg,
    #[serde(rename = "PG-13")]
    Pg13,
    #[serde(rename = "R")]
    R,
    #[serde(rename = "NC-17")]
    Nc17,
}

impl FilmRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilmRating::G => "G",
            FilmRating::Pg => "PG",
            FilmRating::Pg13 => "PG-13",
            FilmRating::R => "R",
            FilmRating::Nc17 => "NC-17",
        }
    }
}

impl fmt::Display for FilmRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilmRating {
    type Err = StagingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "G" => Ok(FilmRating::G),
            "PG" => Ok(FilmRating::Pg),
            "PG-13" => Ok(FilmRating::Pg13),
            "R" => Ok(FilmRating::R),
            "NC-17" => Ok(FilmRating::Nc17),
            other => Err(StagingError::ValidationError(format!(
                "Unknown film rating: {other}"
            ))),
        }
    }
}

/// Calendar day of a payment encoded as `YYYYMMDD`, used as the warehouse date dimension key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(pub u32);

impl From<NaiveDateTime> for DateKey {
    fn from(value: NaiveDateTime) -> Self {
        let year = u32::try_from(value.year()).unwrap_or_default();
        Self(year * 10_000 + value.month() * 100 + value.day())
    }
}

impl From<DateTime<Utc>> for DateKey {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from(value.naive_utc())
    }
}

/// One row of the OLTP extract: a payment joined with its customer, rental, inventory and film.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourcePayment {
    pub payment_id: u32,
    pub customer_id: u32,
    pub staff_id: u32,
    pub rental_id: Option<i32>,
    pub amount: Decimal,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub payment_date: NaiveDateTime,
    pub store_id: u32,
    pub film_id: u32,
    pub title: String,
    pub rating: Option<String>,
}

/// Parses `YYYY-MM-DD HH:MM:SS` as written by MySQL, falling back to ISO 8601.
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| value.parse::<NaiveDateTime>())
        .map_err(|e| StagingError::ValidationError(format!("Invalid payment date {value:?}: {e}")))
}

fn deserialize_datetime<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub film_id: u32,
    pub title: String,
    pub rating: Option<FilmRating>,
}

/// A payment as staged in the document store.
///
/// Film attributes are nested under `film`, the payment date is carried both as
/// a UTC timestamp and as a `date_key`, and `loaded_at` records the batch that
/// wrote the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDocument {
    pub payment_id: u32,
    pub customer_id: u32,
    pub staff_id: u32,
    pub rental_id: Option<i32>,
    pub store_id: u32,
    pub film: Film,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub date_key: DateKey,
    pub loaded_at: DateTime<Utc>,
}

impl PaymentDocument {
    /// Builds the staged document for an extracted row.
    ///
    /// Source timestamps carry no zone and are taken as UTC. An empty rating is
    /// stored as null; any other unrecognised rating rejects the row.
    pub fn from_source(row: SourcePayment, loaded_at: DateTime<Utc>) -> Result<Self> {
        let rating = row
            .rating
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(FilmRating::from_str)
            .transpose()?;
        let payment_date = row.payment_date.and_utc();

        Ok(Self {
            payment_id: row.payment_id,
            customer_id: row.customer_id,
            staff_id: row.staff_id,
            rental_id: row.rental_id,
            store_id: row.store_id,
            film: Film {
                film_id: row.film_id,
                title: row.title,
                rating,
            },
            amount: row.amount,
            payment_date,
            date_key: DateKey::from(payment_date),
            loaded_at,
        })
    }
}
