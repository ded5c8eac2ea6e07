use crate::domain::transfer::TransferRecord;
use std::io::Write;

const HEADER: [&str; 7] = [
    "id",
    "source",
    "destination",
    "source_balance_before",
    "destination_balance_before",
    "amount",
    "created_at",
];

/// Writes the transfer audit log as CSV, one row per committed transfer.
pub struct TransferLogWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TransferLogWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(sink),
        }
    }

    pub fn write_records<I>(&mut self, records: I) -> csv::Result<()>
    where
        I: IntoIterator<Item = TransferRecord>,
    {
        self.writer.write_record(HEADER)?;
        for record in records {
            self.writer.serialize(record)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
