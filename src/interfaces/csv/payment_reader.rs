use crate::domain::payment::SourcePayment;
use crate::error::{Result, StagingError};
use std::io::Read;

/// Reads extracted payment rows from a CSV export of the extract query.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<SourcePayment>`.
/// Whitespace is trimmed and empty `rental_id` or `rating` cells read as null.
pub struct PaymentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentReader<R> {
    /// Creates a new `PaymentReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes rows.
    pub fn payments(self) -> impl Iterator<Item = Result<SourcePayment>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(StagingError::from))
    }
}
