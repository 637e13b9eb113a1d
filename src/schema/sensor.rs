//! Sensor schema: the ordered channel set of one device.

use std::{collections::HashMap, fmt, io::Read, path::Path};

use ini::Ini;
use thiserror::Error;

use crate::stream::Records;

use super::channel::{Channel, ChannelError};

/// An error building a sensor schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema document could not be read or parsed.
    #[error("Failed to read schema document.")]
    Document(#[from] ini::Error),
    /// A channel entry is invalid.
    #[error("{sensor}: failed to parse sensor metadata.")]
    Channel {
        sensor: String,
        #[source]
        cause: ChannelError,
    },
    /// Two channels declare the same row position.
    #[error("{sensor}: channels {first} and {second} share index {index}.")]
    DuplicateIndex {
        sensor: String,
        index: usize,
        first: String,
        second: String,
    },
    /// The declared indices leave gaps in the row.
    #[error("{sensor}: channel indices do not cover 0..{count}.")]
    SparseIndices { sensor: String, count: usize },
}

/// The decoded layout of one sensor: its channels in row order, and the
/// fixed byte length of a row.
///
/// A schema is immutable once built. Channel indices are the row layout
/// order, so construction verifies they cover `0..count` with no gaps or
/// duplicates.
#[derive(Debug, Clone)]
pub struct Sensor {
    name: String,
    channels: Vec<Channel>,
    row_length: usize,
}

impl Sensor {
    /// Build a schema from named channel entries.
    ///
    /// Each entry is one channel's key/value section; see
    /// [`Channel::from_entry`] for the recognized keys.
    pub fn from_sections<S>(name: impl Into<String>, sections: S) -> Result<Self, SchemaError>
    where
        S: IntoIterator<Item = (String, HashMap<String, String>)>,
    {
        let name = name.into();

        let mut channels = Vec::new();
        for (section, entry) in sections {
            let channel = Channel::from_entry(&section, &entry).map_err(|cause| {
                SchemaError::Channel {
                    sensor: name.clone(),
                    cause,
                }
            })?;
            channels.push(channel);
        }

        channels.sort_by_key(Channel::index);

        // The declared indices are used directly as row layout order, so the
        // set must be exactly 0..count.
        for (position, channel) in channels.iter().enumerate() {
            if channel.index() == position {
                continue;
            }
            // Sorted, so an index below its position duplicates its
            // predecessor; anything else leaves a gap.
            let duplicate = position > 0 && channel.index() == channels[position - 1].index();
            return Err(if duplicate {
                SchemaError::DuplicateIndex {
                    sensor: name,
                    index: channel.index(),
                    first: channels[position - 1].name().to_owned(),
                    second: channel.name().to_owned(),
                }
            } else {
                SchemaError::SparseIndices {
                    sensor: name,
                    count: channels.len(),
                }
            });
        }

        let row_length = channels
            .iter()
            .map(|channel| channel.layout().storage.bytes())
            .sum();

        Ok(Self {
            name,
            channels,
            row_length,
        })
    }

    /// Read a schema document from disk.
    ///
    /// The sensor takes its name from the file stem. Sections are consumed
    /// in document order; keys outside any section are ignored.
    pub fn from_ini_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let document = Ini::load_from_file(path)?;

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let sections = document.iter().filter_map(|(section, properties)| {
            section.map(|section| {
                let entry = properties
                    .iter()
                    .map(|(key, value)| (key.to_owned(), value.to_owned()))
                    .collect();
                (section.to_owned(), entry)
            })
        });

        Self::from_sections(name, sections.collect::<Vec<_>>())
    }

    /// The sensor's identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The channels in ascending row order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// The fixed byte length of one row.
    pub fn row_length(&self) -> usize {
        self.row_length
    }

    /// Iterate decoded records from a byte source.
    ///
    /// The stream consumes the source; see [`Records`].
    pub fn records<R: Read>(&self, source: R) -> Records<'_, R> {
        Records::new(self, source)
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} channels, {} bytes per row",
            self.name,
            self.channels.len(),
            self.row_length
        )?;
        for channel in &self.channels {
            write!(f, "\n  {channel}")?;
        }
        Ok(())
    }
}
