//! Tests for decoding individual packets and packet streams

mod common;

use common::*;

#[test]
fn test_sync_marker() {
    assert_eq!(decode_one(&hex_to_bytes("ffffaa55")), Ok((Packet::Sync, 4)));
}

#[test]
fn test_accelerometer_with_dropped_count() {
    let bytes = hex_to_bytes("a800030040200c");
    assert_eq!(bytes, acc_packet(Some(3), [1, 2, 3]));

    assert_eq!(
        decode_one(&bytes),
        Ok((
            Packet::Accelerometer(AccelerometerData {
                samples: [1, 2, 3],
                dropped: 3,
            }),
            7
        ))
    );
}

#[test]
fn test_accelerometer_without_dropped_count() {
    let bytes = hex_to_bytes("a00040200c");
    let (packet, used) = decode_one(&bytes).expect("Failed to decode accelerometer packet");
    assert_eq!(used, 5);
    assert_eq!(packet.dropped_samples(), Some(0));
    assert_eq!(packet.samples(), Some(&[1u16, 2, 3][..]));
}

#[test]
fn test_eeg_packets() {
    let bytes = eeg_packet(None, [1023, 1023, 1023, 1023]);
    assert_eq!(bytes, hex_to_bytes("e0ffffffffff"));
    assert_eq!(
        decode_one(&bytes),
        Ok((
            Packet::Eeg(EegData {
                samples: [1023; 4],
                dropped: 0,
            }),
            6
        ))
    );

    let bytes = eeg_packet(Some(258), [0, 1, 2, 3]);
    let (packet, used) = decode_one(&bytes).expect("Failed to decode EEG packet");
    assert_eq!(used, 8);
    match packet {
        Packet::Eeg(eeg) => {
            assert_eq!(eeg.dropped, 258);
            assert_eq!(eeg.channel(0), 0);
            assert_eq!(eeg.channel(3), 3);
        }
        other => panic!("Expected EEG packet, got {:?}", other),
    }
}

#[test]
fn test_battery_is_big_endian() {
    let bytes = hex_to_bytes("b0005a0f3c0eb0fff6");
    assert_eq!(
        decode_one(&bytes),
        Ok((
            Packet::Battery(BatteryData {
                percent: 90,
                fuel_gauge_mv: 3900,
                adc_mv: 3760,
                temp_c: -10,
            }),
            9
        ))
    );
}

#[test]
fn test_error_word() {
    assert_eq!(
        decode_one(&hex_to_bytes("d000010203")),
        Ok((Packet::Error { code: 0x0001_0203 }, 5))
    );
}

#[test]
fn test_drl_ref() {
    // 0b1000000000 0b0000000001, four padding bits
    let bytes = hex_to_bytes("90800010");
    assert_eq!(
        decode_one(&bytes),
        Ok((
            Packet::DrlRef(DrlRefData {
                drl: 512,
                reference: 1,
            }),
            4
        ))
    );
}

#[test]
fn test_trailing_bytes_are_not_consumed() {
    let mut bytes = error_packet(7);
    bytes.extend_from_slice(&[0xAB, 0xCD]);
    assert_eq!(decode_one(&bytes), Ok((Packet::Error { code: 7 }, 5)));
}

#[test]
fn test_unknown_type_codes() {
    for lead in [0x00u8, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80, 0xC0] {
        let result = decode_one(&[lead, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(
            matches!(result, Err(DecodeError::BadString(_))),
            "lead {:#04x}: expected BadString, got {:?}",
            lead,
            result
        );
    }
}

#[test]
fn test_unexpected_flags() {
    let cases: Vec<(Vec<u8>, &str)> = vec![
        (hex_to_bytes("98800010"), "DRL/REF with dropped flag"),
        (hex_to_bytes("91800010"), "DRL/REF with low flag"),
        (hex_to_bytes("b8005a0f3c0eb0fff6"), "battery with flag"),
        (hex_to_bytes("d400010203"), "error with flag"),
    ];
    for (bytes, description) in cases {
        let result = decode_one(&bytes);
        assert!(
            matches!(result, Err(DecodeError::BadString(_))),
            "{}: expected BadString, got {:?}",
            description,
            result
        );
    }
}

#[test]
fn test_low_flag_bits_ignored_on_sample_packets() {
    // Only bit 3 decides whether a dropped count follows
    assert_eq!(
        decode_one(&hex_to_bytes("a10040200c")),
        Ok((
            Packet::Accelerometer(AccelerometerData {
                samples: [1, 2, 3],
                dropped: 0,
            }),
            5
        ))
    );
    assert_eq!(estimate_len(&hex_to_bytes("a1")), 5);

    let mut bytes = eeg_packet(Some(4), [10, 20, 30, 40]);
    bytes[0] |= 0x01;
    assert_eq!(bytes[0], 0xE9);
    assert_eq!(
        decode_one(&bytes),
        Ok((
            Packet::Eeg(EegData {
                samples: [10, 20, 30, 40],
                dropped: 4,
            }),
            8
        ))
    );

    let mut bytes = eeg_packet(None, [1, 2, 3, 4]);
    bytes[0] |= 0x07;
    let (packet, used) = decode_one(&bytes).expect("Failed to decode EEG packet with low flag bits");
    assert_eq!(used, 6);
    assert_eq!(packet.dropped_samples(), Some(0));
}

#[test]
fn test_corrupt_sync_marker() {
    for bytes in [[0xFF, 0xFF, 0xAA, 0x54], [0xF0, 0x00, 0x00, 0x00], [0xFF, 0xFE, 0xAA, 0x55]] {
        assert!(matches!(decode_one(&bytes), Err(DecodeError::BadString(_))));
    }
}

#[test]
fn test_decode_stream_delivers_every_packet() {
    let frames = sample_frames();
    let mut buf = Vec::new();
    for (bytes, _) in &frames {
        buf.extend_from_slice(bytes);
    }

    let mut seen = Vec::new();
    let outcome = decode_stream(&buf, |packet| seen.push(packet));

    assert_eq!(
        outcome,
        StreamOutcome {
            consumed: buf.len(),
            packets: frames.len(),
            error: None,
        }
    );
    assert_eq!(seen, frames.into_iter().map(|(_, p)| p).collect::<Vec<_>>());
    assert_eq!(outcome.into_result(), Ok(((), buf.len())));
}

#[test]
fn test_decode_stream_stops_at_truncated_packet() {
    let mut buf = sync_packet();
    buf.extend(error_packet(1));
    let full = eeg_packet(Some(9), [1, 2, 3, 4]);
    buf.extend_from_slice(&full[..full.len() - 1]);

    let mut seen = Vec::new();
    let outcome = decode_stream(&buf, |packet| seen.push(packet));

    assert_eq!(seen, vec![Packet::Sync, Packet::Error { code: 1 }]);
    assert_eq!(outcome.consumed, 9);
    assert_eq!(outcome.packets, 2);
    assert_eq!(outcome.error, Some(DecodeError::NeedMoreData));
    assert_eq!(outcome.into_result(), Err(DecodeError::NeedMoreData));
}

#[test]
fn test_decode_stream_stops_at_garbage() {
    let mut buf = drlref_packet(1, 2);
    buf.push(0x42);
    buf.extend(sync_packet());

    let mut count = 0;
    let outcome = decode_stream(&buf, |_| count += 1);

    assert_eq!(count, 1);
    assert_eq!(outcome.consumed, 4);
    assert!(matches!(outcome.error, Some(DecodeError::BadString(_))));
}

#[test]
fn test_decode_stream_on_empty_buffer() {
    let outcome = decode_stream(&[], |_| panic!("no packets expected"));
    assert_eq!(outcome.into_result(), Ok(((), 0)));
}

#[test]
fn test_packet_type_accessors() {
    for (bytes, packet) in sample_frames() {
        assert_eq!(packet.packet_type(), PacketType::from_lead_byte(bytes[0]));
        assert_eq!(packet.wire_len(), bytes.len());
    }
    assert_eq!(Packet::Sync.dropped_samples(), None);
    assert_eq!(Packet::Error { code: 1 }.samples(), None);

    // DRL/REF readings are exposed as named fields only
    let drl_ref = Packet::DrlRef(DrlRefData {
        drl: 1,
        reference: 2,
    });
    assert_eq!(drl_ref.samples(), None);
    assert_eq!(drl_ref.dropped_samples(), None);
}
