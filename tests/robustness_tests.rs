use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[test]
fn test_malformed_csv_handling() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(file.path()).unwrap();
    wtr.write_record(common::HEADER).unwrap();

    // Valid payment
    wtr.write_record(["1", "1", "1", "76", "2.99", "2005-05-25 11:30:37", "1", "663", "PATIENT SISTER", "NC-17"])
        .unwrap();
    // Non-numeric amount
    wtr.write_record(["2", "1", "1", "77", "lots", "2005-05-25 11:30:37", "1", "663", "PATIENT SISTER", "NC-17"])
        .unwrap();
    // Unparseable payment date
    wtr.write_record(["3", "1", "1", "78", "1.00", "sometime", "1", "663", "PATIENT SISTER", "NC-17"])
        .unwrap();
    // Valid payment again
    wtr.write_record(["4", "2", "1", "79", "4.00", "2005-05-26 09:00:00", "1", "663", "PATIENT SISTER", "NC-17"])
        .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("sakila-staging"));
    cmd.env_remove("SAKILA_MONGO_URI")
        .args(["run", "--report", "store", "--from-csv"])
        .arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading payment"))
        .stdout("store_id,total_revenue\n1,6.99\n");
}

#[test]
fn test_unknown_rating_is_skipped() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(file.path()).unwrap();
    wtr.write_record(common::HEADER).unwrap();
    wtr.write_record(["1", "1", "1", "76", "2.99", "2005-05-25 11:30:37", "1", "663", "PATIENT SISTER", "X"])
        .unwrap();
    wtr.write_record(["2", "1", "1", "77", "1.01", "2005-05-25 11:30:37", "1", "663", "PATIENT SISTER", "PG"])
        .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("sakila-staging"));
    cmd.env_remove("SAKILA_MONGO_URI")
        .args(["load", "--from-csv"])
        .arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("skipping payment row"))
        .stdout(predicate::str::contains("Loaded 1 documents into staging"))
        .stdout(predicate::str::contains("Skipped 1 rows"));
}

#[test]
fn test_large_extract_is_capped_by_default() {
    let file = tempfile::NamedTempFile::new().unwrap();
    common::generate_csv(file.path(), 750, 25).unwrap();

    let mut cmd = Command::new(cargo_bin!("sakila-staging"));
    cmd.env_remove("SAKILA_MONGO_URI")
        .args(["load", "--from-csv"])
        .arg(file.path());

    cmd.assert()
        .success()
        .stdout("Loaded 500 documents into staging: in-memory\n");
}
