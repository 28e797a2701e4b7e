//! Payment records, the report model, and the ports the adapters implement.

pub mod aggregation;
pub mod payment;
pub mod ports;
