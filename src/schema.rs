//! Sensor schemas: per-channel packing formats and calibration.

pub mod channel;
pub mod sensor;

pub use channel::{Channel, ChannelError, Layout, LayoutError, Storage};
pub use sensor::{SchemaError, Sensor};
