use crate::domain::aggregation::{GroupField, GroupTotal, Metric};
use crate::error::Result;
use std::io::Write;

/// Writes report rows as CSV: a `<key>,<metric>` header followed by one line per group.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_totals(&mut self, field: GroupField, metric: Metric, rows: &[GroupTotal]) -> Result<()> {
        self.writer.write_record([field.column(), metric.name()])?;
        for row in rows {
            self.writer
                .write_record([row.key.to_string(), row.total.to_string()])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
