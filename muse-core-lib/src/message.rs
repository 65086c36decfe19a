use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;
use zerocopy::byteorder::big_endian::{I16, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::bits::{decode_samples, encode_samples};
use crate::error::{DecodeError, DecodeResult};
use crate::packet::{DROPPED_COUNT_SIZE, PacketHeader, PacketType, SYNC_MARKER};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const EEG_CHANNELS: usize = 4;
pub const ACC_AXES: usize = 3;

/// One decoded telemetry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Packet {
    /// The `FF FF AA 55` marker
    Sync,
    /// Device-side error word
    Error { code: u32 },
    Eeg(EegData),
    Accelerometer(AccelerometerData),
    Battery(BatteryData),
    DrlRef(DrlRefData),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EegData {
    /// Raw 10-bit channel readings
    pub samples: [u16; EEG_CHANNELS],
    /// Samples lost since the previous EEG packet, 0 when not reported
    pub dropped: u16,
}

impl EegData {
    /// # Panics
    ///
    /// Panics if `index` is not below [`EEG_CHANNELS`].
    pub fn channel(&self, index: usize) -> u16 {
        assert!(index < EEG_CHANNELS, "EEG packets have {EEG_CHANNELS} channels, got index {index}");
        self.samples[index]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AccelerometerData {
    /// Raw 10-bit axis readings
    pub samples: [u16; ACC_AXES],
    /// Samples lost since the previous accelerometer packet, 0 when not reported
    pub dropped: u16,
}

impl AccelerometerData {
    /// # Panics
    ///
    /// Panics if `index` is not below [`ACC_AXES`].
    pub fn axis(&self, index: usize) -> u16 {
        assert!(index < ACC_AXES, "accelerometer packets have {ACC_AXES} axes, got index {index}");
        self.samples[index]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatteryData {
    pub percent: u16,
    pub fuel_gauge_mv: u16,
    pub adc_mv: u16,
    pub temp_c: i16,
}

/// Battery payload as it appears on the wire (8 bytes, big-endian).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct BatteryRaw {
    pub percent: U16,
    pub fuel_gauge_mv: U16,
    pub adc_mv: U16,
    pub temp_c: I16,
}

impl From<BatteryRaw> for BatteryData {
    fn from(raw: BatteryRaw) -> Self {
        Self {
            percent: raw.percent.get(),
            fuel_gauge_mv: raw.fuel_gauge_mv.get(),
            adc_mv: raw.adc_mv.get(),
            temp_c: raw.temp_c.get(),
        }
    }
}

impl From<BatteryData> for BatteryRaw {
    fn from(data: BatteryData) -> Self {
        Self {
            percent: U16::new(data.percent),
            fuel_gauge_mv: U16::new(data.fuel_gauge_mv),
            adc_mv: U16::new(data.adc_mv),
            temp_c: I16::new(data.temp_c),
        }
    }
}

/// Driven right leg and reference electrode readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DrlRefData {
    pub drl: u16,
    pub reference: u16,
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Sync => PacketType::Sync,
            Packet::Error { .. } => PacketType::Error,
            Packet::Eeg(_) => PacketType::Eeg,
            Packet::Accelerometer(_) => PacketType::Accelerometer,
            Packet::Battery(_) => PacketType::Battery,
            Packet::DrlRef(_) => PacketType::DrlRef,
        }
    }

    /// Dropped-sample count, for the packet types that report one.
    pub fn dropped_samples(&self) -> Option<u16> {
        match self {
            Packet::Eeg(eeg) => Some(eeg.dropped),
            Packet::Accelerometer(acc) => Some(acc.dropped),
            _ => None,
        }
    }

    /// The packed 10-bit samples of EEG and accelerometer packets. DRL/REF
    /// readings are named fields of [`DrlRefData`] and are not returned here.
    pub fn samples(&self) -> Option<&[u16]> {
        match self {
            Packet::Eeg(eeg) => Some(&eeg.samples),
            Packet::Accelerometer(acc) => Some(&acc.samples),
            Packet::DrlRef(_) | Packet::Sync | Packet::Error { .. } | Packet::Battery(_) => None,
        }
    }

    /// Exact number of bytes [`Packet::encode`] writes.
    pub fn wire_len(&self) -> usize {
        let base = self.packet_type().base_len().unwrap_or(0);
        match self.dropped_samples() {
            Some(dropped) if dropped != 0 => base + DROPPED_COUNT_SIZE,
            _ => base,
        }
    }

    /// Appends the wire form of this packet to `dst`.
    ///
    /// EEG and accelerometer packets carry a dropped-sample count only when it
    /// is non-zero.
    ///
    /// # Panics
    ///
    /// Panics if a sample exceeds 10 bits.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_len());
        if let Packet::Sync = self {
            dst.put_slice(&SYNC_MARKER);
            return;
        }

        let dropped = self.dropped_samples().unwrap_or(0);
        let header = PacketHeader::new()
            .with_type_code(self.packet_type().into())
            .with_dropped(dropped != 0);
        dst.put_slice(&header.into_bytes());
        if dropped != 0 {
            dst.put_u16(dropped);
        }

        match self {
            Packet::Sync => {}
            Packet::Error { code } => dst.put_u32(*code),
            Packet::Eeg(eeg) => dst.put_slice(&encode_samples(&eeg.samples)),
            Packet::Accelerometer(acc) => dst.put_slice(&encode_samples(&acc.samples)),
            Packet::Battery(battery) => dst.put_slice(BatteryRaw::from(*battery).as_bytes()),
            Packet::DrlRef(drl_ref) => dst.put_slice(&encode_samples(&[drl_ref.drl, drl_ref.reference])),
        }
    }
}

impl From<Packet> for Bytes {
    fn from(packet: Packet) -> Self {
        let mut buf = BytesMut::with_capacity(packet.wire_len());
        packet.encode(&mut buf);
        buf.freeze()
    }
}

/// Decodes the packet at the front of `buf`.
///
/// Returns the packet and the number of bytes it occupied. A buffer holding
/// only part of a recognised frame yields [`DecodeError::NeedMoreData`]; an
/// unknown type code, unexpected flag bits or a corrupt sync marker yield
/// [`DecodeError::BadString`].
pub fn decode_one(buf: &[u8]) -> DecodeResult<Packet> {
    let result = decode_frame(buf);
    if let Err(error) = &result {
        trace!(len = buf.len(), lead = ?buf.first(), %error, "packet not decoded");
    }
    result
}

fn decode_frame(buf: &[u8]) -> DecodeResult<Packet> {
    let &lead = buf.first().ok_or(DecodeError::NeedMoreData)?;
    let header = PacketHeader::from_lead_byte(lead);
    let frame_len = header
        .frame_len()
        .ok_or(DecodeError::BadString("unrecognized packet type"))?;
    if buf.len() < frame_len {
        return Err(DecodeError::NeedMoreData);
    }
    let frame = &buf[..frame_len];

    let packet = match header.packet_type() {
        PacketType::Sync => {
            if frame != &SYNC_MARKER[..] {
                return Err(DecodeError::BadString("malformed sync marker"));
            }
            Packet::Sync
        }
        PacketType::DrlRef => {
            expect_no_flags(&header)?;
            let [drl, reference] = decode_samples(&frame[1..])?;
            Packet::DrlRef(DrlRefData { drl, reference })
        }
        PacketType::Accelerometer => {
            let (dropped, payload) = split_dropped(&header, frame);
            Packet::Accelerometer(AccelerometerData {
                samples: decode_samples(payload)?,
                dropped,
            })
        }
        PacketType::Battery => {
            expect_no_flags(&header)?;
            let raw = BatteryRaw::read_from_bytes(&frame[1..])
                .map_err(|_| DecodeError::BadString("battery payload has wrong size"))?;
            Packet::Battery(BatteryData::from(raw))
        }
        PacketType::Error => {
            expect_no_flags(&header)?;
            let mut payload = &frame[1..];
            Packet::Error {
                code: payload.get_u32(),
            }
        }
        PacketType::Eeg => {
            let (dropped, payload) = split_dropped(&header, frame);
            Packet::Eeg(EegData {
                samples: decode_samples(payload)?,
                dropped,
            })
        }
        PacketType::Unknown(_) => return Err(DecodeError::BadString("unrecognized packet type")),
    };

    Ok((packet, frame_len))
}

fn expect_no_flags(header: &PacketHeader) -> Result<(), DecodeError> {
    if header.flags() != 0 {
        return Err(DecodeError::BadString("unexpected flags on packet without dropped count"));
    }
    Ok(())
}

/// Reads the optional dropped-sample count and returns the sample payload.
/// Only the dropped flag is looked at; the low three flag bits are ignored.
fn split_dropped<'a>(header: &PacketHeader, frame: &'a [u8]) -> (u16, &'a [u8]) {
    let mut rest = &frame[1..];
    let dropped = if header.dropped() { rest.get_u16() } else { 0 };
    (dropped, rest)
}

/// Progress of a [`decode_stream`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Bytes consumed by the packets that were delivered.
    pub consumed: usize,
    /// Number of packets delivered to the callback.
    pub packets: usize,
    /// Why decoding stopped before the end of the buffer, if it did.
    pub error: Option<DecodeError>,
}

impl StreamOutcome {
    pub fn into_result(self) -> DecodeResult<()> {
        match self.error {
            None => Ok(((), self.consumed)),
            Some(error) => Err(error),
        }
    }
}

/// Decodes packets back to back, handing each one to `on_packet`.
///
/// Stops at the end of the buffer or at the first call that fails. Packets
/// already handed to the callback stay delivered; nothing past the failing
/// offset is looked at.
pub fn decode_stream<F>(buf: &[u8], mut on_packet: F) -> StreamOutcome
where
    F: FnMut(Packet),
{
    let mut consumed = 0;
    let mut packets = 0;
    while consumed < buf.len() {
        match decode_one(&buf[consumed..]) {
            Ok((packet, used)) => {
                on_packet(packet);
                consumed += used;
                packets += 1;
            }
            Err(error) => {
                return StreamOutcome {
                    consumed,
                    packets,
                    error: Some(error),
                };
            }
        }
    }
    StreamOutcome {
        consumed,
        packets,
        error: None,
    }
}
