use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;

use crate::bits::packed_len;

/// Marks a known-good position in the telemetry stream.
pub const SYNC_MARKER: [u8; 4] = [0xFF, 0xFF, 0xAA, 0x55];

/// Size of the big-endian dropped-sample counter that may follow the header.
pub const DROPPED_COUNT_SIZE: usize = 2;

/// Leading byte of every packet: type code in the high nibble, flags below.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketHeader {
    /// Must be zero on DRL/REF, battery and error packets. Ignored on EEG and
    /// accelerometer packets.
    pub reserved_flags: B3,
    /// Set when a dropped-sample count follows (EEG and accelerometer only).
    pub dropped: bool,
    pub type_code: B4,
}

impl PacketHeader {
    pub fn from_lead_byte(byte: u8) -> Self {
        PacketHeader::from_bytes([byte])
    }

    pub fn packet_type(&self) -> PacketType {
        PacketType::from_primitive(self.type_code())
    }

    /// Low nibble of the lead byte.
    pub fn flags(&self) -> u8 {
        self.into_bytes()[0] & 0x0F
    }

    /// True when the header announces a dropped-sample count that this
    /// packet type actually carries.
    pub fn has_dropped_count(&self) -> bool {
        self.dropped() && self.packet_type().carries_dropped_count()
    }

    /// Full frame length implied by the header, or `None` for a type code
    /// outside the protocol.
    pub fn frame_len(&self) -> Option<usize> {
        let base = self.packet_type().base_len()?;
        if self.has_dropped_count() {
            Some(base + DROPPED_COUNT_SIZE)
        } else {
            Some(base)
        }
    }
}

/// Packet type codes (high nibble of the lead byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum PacketType {
    #[strum(to_string = "DRL/REF")]
    DrlRef = 0x9,
    #[strum(to_string = "ACC")]
    Accelerometer = 0xA,
    #[strum(to_string = "BATTERY")]
    Battery = 0xB,
    #[strum(to_string = "ERROR")]
    Error = 0xD,
    #[strum(to_string = "EEG")]
    Eeg = 0xE,
    #[strum(to_string = "SYNC")]
    Sync = 0xF,

    // 0xC is reserved for compressed EEG, which is not decoded
    #[num_enum(catch_all)]
    #[strum(to_string = "UNKNOWN")]
    Unknown(u8),
}

impl PacketType {
    pub fn from_lead_byte(byte: u8) -> Self {
        PacketType::from_primitive(byte >> 4)
    }

    pub fn carries_dropped_count(&self) -> bool {
        matches!(self, PacketType::Eeg | PacketType::Accelerometer)
    }

    /// Number of packed 10-bit samples in the payload.
    pub fn sample_count(&self) -> Option<usize> {
        match self {
            PacketType::DrlRef => Some(2),
            PacketType::Accelerometer => Some(3),
            PacketType::Eeg => Some(4),
            _ => None,
        }
    }

    /// Payload bytes following the header (and the dropped count, if any).
    pub fn payload_len(&self) -> Option<usize> {
        match self {
            PacketType::DrlRef | PacketType::Accelerometer | PacketType::Eeg => {
                self.sample_count().map(packed_len)
            }
            PacketType::Battery => Some(8),
            PacketType::Error => Some(4),
            PacketType::Sync => Some(SYNC_MARKER.len() - 1),
            PacketType::Unknown(_) => None,
        }
    }

    /// Frame length without a dropped-sample count.
    pub fn base_len(&self) -> Option<usize> {
        self.payload_len().map(|len| 1 + len)
    }
}

/// Offset of the next sync marker in `buf`, if one is fully visible.
pub fn find_sync(buf: &[u8]) -> Option<usize> {
    buf.windows(SYNC_MARKER.len()).position(|w| w == SYNC_MARKER)
}
