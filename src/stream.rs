//! Streaming record decoder.

use std::{
    collections::BTreeMap,
    io::{ErrorKind, Read},
};

use tracing::{debug, warn};

use crate::schema::Sensor;

/// One decoded row: channel name to physical value.
pub type Record = BTreeMap<String, f64>;

/// A lazy stream of decoded records.
///
/// Each pull reads exactly one row's worth of bytes from the source and
/// decodes every channel of the schema. The stream ends, dropping the
/// source, the moment a full row can no longer be read; a trailing partial
/// row is discarded. The stream is not restartable: exhausting it consumes
/// the source, and abandoning it early releases the source all the same.
pub struct Records<'a, R> {
    sensor: &'a Sensor,
    source: Option<R>,
    row: Vec<u8>,
}

impl<'a, R: Read> Records<'a, R> {
    pub(crate) fn new(sensor: &'a Sensor, source: R) -> Self {
        debug!(
            sensor = sensor.name(),
            row_length = sensor.row_length(),
            "opened record stream"
        );

        // A schema without channels has zero-length rows, which would never
        // exhaust the source; its stream is empty instead.
        let source = (sensor.row_length() > 0).then_some(source);

        Self {
            sensor,
            source,
            row: vec![0; sensor.row_length()],
        }
    }

    /// Decode every channel of a freshly read row.
    fn expand(&self) -> Record {
        let mut record = Record::new();
        let mut position = 0;

        for channel in self.sensor.channels() {
            let width = channel.layout().storage.bytes();
            let raw = &self.row[position..position + width];
            position += width;

            record.insert(channel.name().to_owned(), channel.decode(raw));
        }

        record
    }
}

impl<R: Read> Iterator for Records<'_, R> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let source = self.source.as_mut()?;

        if let Err(error) = source.read_exact(&mut self.row) {
            // A short trailing row ends the stream; so does a failing
            // source, after noting it.
            if error.kind() != ErrorKind::UnexpectedEof {
                warn!(sensor = self.sensor.name(), %error, "record source failed");
            }
            self.source = None;
            return None;
        }

        Some(self.expand())
    }
}
