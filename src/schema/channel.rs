//! Per-channel packing format and calibration.

use std::{collections::HashMap, fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

/// Container widths a channel value may be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    B8,
    B16,
    B32,
    B64,
}

impl Storage {
    /// Width of the container in bits.
    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    /// Width of the container in bytes.
    pub fn bytes(self) -> usize {
        match self {
            Self::B8 => 1,
            Self::B16 => 2,
            Self::B32 => 4,
            Self::B64 => 8,
        }
    }

    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::B8),
            16 => Some(Self::B16),
            32 => Some(Self::B32),
            64 => Some(Self::B64),
            _ => None,
        }
    }
}

/// An error parsing or validating a channel type string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The string does not match the type grammar.
    #[error("Invalid type string: {0:?}.")]
    Grammar(String),
    /// The container has no bits at all.
    #[error("Storage size is zero.")]
    ZeroStorage,
    /// More significant bits than the container holds.
    #[error("Sample size ({size}) is larger than storage size ({storage}).")]
    SampleTooLarge { size: u32, storage: u32 },
    /// The shift pushes significant bits past the top of the container.
    #[error("Value would be shifted out by {0} bits.")]
    ShiftedOut(u32),
    /// The container width is not in the supported set.
    #[error("Unsupported storage size ({0}): supported sizes are 8, 16, 32 and 64.")]
    UnsupportedStorage(u32),
}

/// How one channel's value is packed into its slot of a row.
///
/// Parsed from the `type` key of a channel entry, written as
/// `<le|be>:<u|s><size>/<storage>>><shift>` (for example `le:s12/16>>4`): a
/// container of `storage` bits in the given byte order, holding `size`
/// significant bits starting `shift` bits up, two's-complement when marked
/// `s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Physical container width.
    pub storage: Storage,
    /// Count of significant bits.
    pub size: u32,
    /// Right shift applied after loading the container.
    pub shift: u32,
    /// Whether the significant bits are two's-complement.
    pub signed: bool,
    /// Byte order of the container.
    pub big_endian: bool,
}

static TYPE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A(le|be):([us])(\d+)/(\d+)>>(\d+)\z").unwrap());

impl FromStr for Layout {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = TYPE_PATTERN
            .captures(s)
            .ok_or_else(|| LayoutError::Grammar(s.to_owned()))?;

        let big_endian = &captures[1] == "be";
        let signed = &captures[2] == "s";

        let number = |i: usize| {
            captures[i]
                .parse::<u32>()
                .map_err(|_| LayoutError::Grammar(s.to_owned()))
        };
        let size = number(3)?;
        let storage = number(4)?;
        let shift = number(5)?;

        if storage == 0 {
            return Err(LayoutError::ZeroStorage);
        }
        if storage < size {
            return Err(LayoutError::SampleTooLarge { size, storage });
        }
        if shift > storage - size {
            return Err(LayoutError::ShiftedOut(shift - (storage - size)));
        }
        let storage =
            Storage::from_bits(storage).ok_or(LayoutError::UnsupportedStorage(storage))?;

        Ok(Self {
            storage,
            size,
            shift,
            signed,
            big_endian,
        })
    }
}

impl Layout {
    /// Extract the field's integer value from its container bytes.
    ///
    /// `raw` must be exactly `storage.bytes()` long. The container is loaded
    /// in the configured byte order, shifted down, masked to the significant
    /// bits, and sign-extended when marked signed. The result is exact for
    /// every supported width, so it spans beyond `i64`.
    pub fn extract(&self, raw: &[u8]) -> i128 {
        let container = match self.storage {
            Storage::B8 => raw[0] as u64,
            Storage::B16 => {
                let raw = raw.try_into().unwrap();
                if self.big_endian {
                    u16::from_be_bytes(raw) as u64
                } else {
                    u16::from_le_bytes(raw) as u64
                }
            }
            Storage::B32 => {
                let raw = raw.try_into().unwrap();
                if self.big_endian {
                    u32::from_be_bytes(raw) as u64
                } else {
                    u32::from_le_bytes(raw) as u64
                }
            }
            Storage::B64 => {
                let raw = raw.try_into().unwrap();
                if self.big_endian {
                    u64::from_be_bytes(raw)
                } else {
                    u64::from_le_bytes(raw)
                }
            }
        };

        // A shift of the full container width (reachable only at size 0)
        // leaves nothing behind.
        let shifted = container.checked_shr(self.shift).unwrap_or(0);
        let masked = shifted & mask(self.size);

        if self.signed && self.size > 0 && masked >> (self.size - 1) & 1 == 1 {
            masked as i128 - (1 << self.size)
        } else {
            masked as i128
        }
    }
}

/// The low `size` bits set.
fn mask(size: u32) -> u64 {
    match size {
        0 => 0,
        64 => u64::MAX,
        size => (1 << size) - 1,
    }
}

/// An error building a channel from its schema entry.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The entry has no `index` key.
    #[error("Missing index for channel {0}.")]
    MissingIndex(String),
    /// The entry failed to parse or validate.
    #[error("Failed to parse channel {name}.")]
    Parse {
        name: String,
        #[source]
        cause: EntryError,
    },
}

/// The underlying defect in a channel entry.
#[derive(Debug, Error)]
pub enum EntryError {
    /// The entry has no `type` key.
    #[error("Missing type string.")]
    MissingType,
    /// The type string is malformed or describes an impossible packing.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// The index is not a non-negative integer.
    #[error("Invalid index: {0:?}.")]
    Index(String),
    /// A calibration term is not numeric.
    #[error("Invalid {key} value: {value:?}.")]
    Number { key: &'static str, value: String },
}

/// A single named measurement and where to find it within a row.
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    index: usize,
    layout: Layout,
    offset: f64,
    scale: f64,
}

impl Channel {
    /// Build a channel from one named section of a schema document.
    ///
    /// The entry must carry `index` and `type` keys; `offset` and `scale`
    /// are optional calibration terms, defaulting to 0 and 1.
    pub fn from_entry(name: &str, entry: &HashMap<String, String>) -> Result<Self, ChannelError> {
        let wrap = |cause| ChannelError::Parse {
            name: name.to_owned(),
            cause,
        };

        let index = entry
            .get("index")
            .ok_or_else(|| ChannelError::MissingIndex(name.to_owned()))?;
        let index = index
            .parse()
            .map_err(|_| wrap(EntryError::Index(index.clone())))?;

        let layout = entry
            .get("type")
            .ok_or_else(|| wrap(EntryError::MissingType))?
            .parse::<Layout>()
            .map_err(|cause| wrap(cause.into()))?;

        let mut channel = Self {
            name: name.to_owned(),
            index,
            layout,
            offset: 0.0,
            scale: 1.0,
        };

        for (key, slot) in [
            ("offset", &mut channel.offset),
            ("scale", &mut channel.scale),
        ] {
            if let Some(value) = entry.get(key) {
                *slot = value.parse().map_err(|_| {
                    wrap(EntryError::Number {
                        key,
                        value: value.clone(),
                    })
                })?;
            }
        }

        Ok(channel)
    }

    /// The channel's name, unique within its schema.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The channel's position within a row.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The channel's packing format.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Decode one container's bytes into the physical value.
    ///
    /// The raw field value is extracted per the layout, then calibrated:
    /// the offset is added before the scale is applied.
    pub fn decode(&self, raw: &[u8]) -> f64 {
        (self.layout.extract(raw) as f64 + self.offset) * self.scale
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:?} {}/{}",
            self.index,
            self.name,
            self.layout.size,
            self.layout.storage.bits()
        )
    }
}
