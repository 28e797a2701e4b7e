use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const HEADER: [&str; 10] = [
    "payment_id",
    "customer_id",
    "staff_id",
    "rental_id",
    "amount",
    "payment_date",
    "store_id",
    "film_id",
    "title",
    "rating",
];

/// Writes `rows` payments spread over `customers` customers and two stores,
/// each paying 1.00.
#[allow(dead_code)]
pub fn generate_csv(path: &Path, rows: usize, customers: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER)?;

    for i in 1..=rows {
        let customer = (i - 1) % customers + 1;
        let store = if customer % 2 == 0 { "2" } else { "1" };
        wtr.write_record([
            i.to_string().as_str(),
            customer.to_string().as_str(),
            "1",
            i.to_string().as_str(),
            "1.00",
            "2005-07-08 03:17:05",
            store,
            "1",
            "ACADEMY DINOSAUR",
            "PG",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
