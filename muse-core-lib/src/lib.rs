//! Decoding of the Muse EEG headset's serial protocol.
//!
//! Two engines share the same three-way contract (value, need more data,
//! malformed): [`message::decode_one`] for the binary telemetry stream and
//! [`version::parse_version`] for the ASCII handshake line.

pub mod bits;
pub mod error;
pub mod estimate;
pub mod message;
pub mod numeric;
pub mod packet;
pub mod stream;
pub mod version;

pub use error::{DecodeError, DecodeResult, ResultCode};
pub use estimate::estimate_len;
pub use message::{Packet, decode_one, decode_stream};
pub use stream::PacketStream;
pub use version::{MuseVersion, find_start, parse_version};
