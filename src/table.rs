//! Tabular text sink for decoded records.

use std::io::Write;

use crate::{schema::Sensor, stream::Record};

/// Write records as CSV.
///
/// The header row holds the channel names in ascending row order; each
/// record follows as one row of decimal values in the same column order. A
/// name absent from a record renders as an empty field.
pub fn write_records<W: Write>(
    sensor: &Sensor,
    records: impl IntoIterator<Item = Record>,
    sink: W,
) -> csv::Result<()> {
    let mut sink = csv::Writer::from_writer(sink);

    sink.write_record(sensor.channels().iter().map(|channel| channel.name()))?;

    for record in records {
        sink.write_record(sensor.channels().iter().map(|channel| {
            record
                .get(channel.name())
                .map(|value| value.to_string())
                .unwrap_or_default()
        }))?;
    }

    sink.flush()?;
    Ok(())
}
