//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use bytes::{Bytes, BytesMut};
#[allow(unused_imports)]
pub use muse_core_lib::bits::encode_samples;
#[allow(unused_imports)]
pub use muse_core_lib::error::{DecodeError, DecodeResult, ResultCode};
#[allow(unused_imports)]
pub use muse_core_lib::estimate::estimate_len;
#[allow(unused_imports)]
pub use muse_core_lib::message::{
    AccelerometerData, BatteryData, DrlRefData, EegData, Packet, StreamOutcome, decode_one, decode_stream,
};
#[allow(unused_imports)]
pub use muse_core_lib::packet::{PacketType, SYNC_MARKER};
#[allow(unused_imports)]
pub use muse_core_lib::stream::PacketStream;
#[allow(unused_imports)]
pub use muse_core_lib::version::{
    FirmwareType, ImageType, MUSE_MAXVER, MUSE_MINVER, MuseVersion, VersionNumber, find_start, parse_version,
};

/// Decode hex string to bytes for testing
#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Vec<u8> {
    hex::decode(hex_data).expect("Failed to decode hex")
}

#[allow(dead_code)]
pub fn sync_packet() -> Vec<u8> {
    SYNC_MARKER.to_vec()
}

#[allow(dead_code)]
pub fn error_packet(code: u32) -> Vec<u8> {
    let mut out = vec![0xD0];
    out.extend_from_slice(&code.to_be_bytes());
    out
}

#[allow(dead_code)]
pub fn battery_packet(percent: u16, fuel_gauge_mv: u16, adc_mv: u16, temp_c: i16) -> Vec<u8> {
    let mut out = vec![0xB0];
    out.extend_from_slice(&percent.to_be_bytes());
    out.extend_from_slice(&fuel_gauge_mv.to_be_bytes());
    out.extend_from_slice(&adc_mv.to_be_bytes());
    out.extend_from_slice(&temp_c.to_be_bytes());
    out
}

#[allow(dead_code)]
pub fn drlref_packet(drl: u16, reference: u16) -> Vec<u8> {
    let mut out = vec![0x90];
    out.extend(encode_samples(&[drl, reference]));
    out
}

/// Accelerometer packet; `dropped` adds the flag and the count.
#[allow(dead_code)]
pub fn acc_packet(dropped: Option<u16>, samples: [u16; 3]) -> Vec<u8> {
    with_dropped(0xA0, dropped, &samples)
}

/// EEG packet; `dropped` adds the flag and the count.
#[allow(dead_code)]
pub fn eeg_packet(dropped: Option<u16>, samples: [u16; 4]) -> Vec<u8> {
    with_dropped(0xE0, dropped, &samples)
}

fn with_dropped(lead: u8, dropped: Option<u16>, samples: &[u16]) -> Vec<u8> {
    let mut out = Vec::new();
    match dropped {
        Some(count) => {
            out.push(lead | 0x08);
            out.extend_from_slice(&count.to_be_bytes());
        }
        None => out.push(lead),
    }
    out.extend(encode_samples(samples));
    out
}

/// One valid frame of every kind, paired with what it decodes to.
#[allow(dead_code)]
pub fn sample_frames() -> Vec<(Vec<u8>, Packet)> {
    vec![
        (sync_packet(), Packet::Sync),
        (error_packet(0xDEAD_BEEF), Packet::Error { code: 0xDEAD_BEEF }),
        (
            battery_packet(87, 3900, 3850, -12),
            Packet::Battery(BatteryData {
                percent: 87,
                fuel_gauge_mv: 3900,
                adc_mv: 3850,
                temp_c: -12,
            }),
        ),
        (
            drlref_packet(1023, 17),
            Packet::DrlRef(DrlRefData {
                drl: 1023,
                reference: 17,
            }),
        ),
        (
            acc_packet(None, [512, 0, 1023]),
            Packet::Accelerometer(AccelerometerData {
                samples: [512, 0, 1023],
                dropped: 0,
            }),
        ),
        (
            acc_packet(Some(3), [1, 2, 3]),
            Packet::Accelerometer(AccelerometerData {
                samples: [1, 2, 3],
                dropped: 3,
            }),
        ),
        (
            eeg_packet(None, [100, 200, 300, 400]),
            Packet::Eeg(EegData {
                samples: [100, 200, 300, 400],
                dropped: 0,
            }),
        ),
        (
            eeg_packet(Some(0xFFFF), [1023, 0, 1023, 0]),
            Packet::Eeg(EegData {
                samples: [1023, 0, 1023, 0],
                dropped: 0xFFFF,
            }),
        ),
    ]
}
