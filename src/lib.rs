//! A decoder for fixed-format binary telemetry logs from sensing hardware.
//!
//! Capture schemas describe, per channel, how a raw value is packed into
//! each fixed-length row: the container width and byte order, the count of
//! significant bits, a right shift, signedness, and an offset/scale
//! calibration pair. The [`schema`] module builds validated
//! [`Sensor`](schema::Sensor) layouts from INI documents (or any ordered
//! key/value source), [`stream`] lazily decodes rows from a byte source
//! into physical values, and [`table`] writes the result as CSV.

pub mod schema;
pub mod stream;
pub mod table;
