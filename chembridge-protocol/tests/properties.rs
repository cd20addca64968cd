//! Property tests for the codec, the resync buffer, and status encoding

use chembridge_protocol::frame::{self, PREAMBLE_LENGTH};
use chembridge_protocol::state::{
    Alarms, ChemicalChannel, DeviceState, DosingStatus, FirmwareVersion, Warnings, WaterChemistry,
};
use chembridge_protocol::{encode_status_payload, parse_payload, PacketBuffer, MAX_FRAME_SIZE};
use proptest::prelude::*;

const MAX_PAYLOAD: usize = MAX_FRAME_SIZE - frame::MIN_FRAME_SIZE;

fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD)
}

/// Payload bytes that can never form a preamble inside the frame
fn clean_payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..0xFF, 0..=MAX_PAYLOAD)
}

fn encode(dest: u8, src: u8, action: u8, payload: &[u8]) -> Vec<u8> {
    let mut buffer = [0u8; 300];
    let len = frame::build(&mut buffer, dest, src, action, payload).unwrap();
    buffer[..len].to_vec()
}

fn dosing_status() -> impl Strategy<Value = DosingStatus> {
    prop_oneof![
        Just(DosingStatus::Dosing),
        Just(DosingStatus::Monitoring),
        Just(DosingStatus::Mixing),
    ]
}

fn water_chemistry() -> impl Strategy<Value = WaterChemistry> {
    prop_oneof![
        Just(WaterChemistry::Ok),
        Just(WaterChemistry::Corrosive),
        Just(WaterChemistry::Scaling),
    ]
}

prop_compose! {
    fn channel(scale: f32)(
        level in any::<u16>(),
        setpoint in any::<u16>(),
        dose_time in any::<u16>(),
        dose_volume in any::<u16>(),
        tank_level in 0u8..=6,
        dosing_status in dosing_status(),
        doser_configured in any::<bool>(),
    ) -> ChemicalChannel {
        ChemicalChannel {
            level: level as f32 / scale,
            setpoint: setpoint as f32 / scale,
            dose_time,
            dose_volume,
            tank_level,
            dosing_status,
            is_dosing: dosing_status == DosingStatus::Dosing && doser_configured,
        }
    }
}

prop_compose! {
    fn device_state()(
        address in 144u8..=158,
        ph in channel(100.0),
        orp in channel(1.0),
        lsi_raw in any::<u8>(),
        calcium_hardness in any::<u16>(),
        cyanuric_acid in any::<u8>(),
        alkalinity in any::<u16>(),
        salt_steps in any::<u8>(),
        temperature in any::<u8>(),
        major in any::<u8>(),
        minor in any::<u8>(),
        alarm_bits in any::<u8>(),
        warning_bits in 0u8..0x20,
        water in water_chemistry(),
        comms_lost in any::<bool>(),
        last_update_ms in any::<u64>(),
    ) -> DeviceState {
        let alarms = Alarms::from_bits(alarm_bits);
        let lsi = if lsi_raw & 0x80 != 0 {
            (256 - lsi_raw as u16) as f32 / -100.0
        } else {
            lsi_raw as f32 / 100.0
        };
        DeviceState {
            address,
            ph,
            orp,
            lsi,
            calcium_hardness,
            cyanuric_acid,
            alkalinity,
            salt_level: salt_steps as u16 * 50,
            temperature,
            firmware: FirmwareVersion { major, minor },
            alarms,
            warnings: Warnings {
                water_chemistry: water,
                ..Warnings::from_raw(warning_bits, 0)
            },
            flow_detected: !alarms.flow,
            comms_lost,
            last_update_ms,
        }
    }
}

proptest! {
    #[test]
    fn built_frames_validate(
        dest in any::<u8>(),
        src in any::<u8>(),
        action in any::<u8>(),
        payload in payload_strategy(),
    ) {
        let bytes = encode(dest, src, action, &payload);
        prop_assert_eq!(bytes.len(), frame::total_length(payload.len() as u8));
        prop_assert!(frame::validate_checksum(&bytes));
        prop_assert!(frame::validate_structure(&bytes));
        prop_assert_eq!(frame::payload(&bytes), &payload[..]);
    }

    #[test]
    fn single_bit_flip_is_detected(
        payload in payload_strategy(),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut bytes = encode(144, 16, 18, &payload);
        // Header, payload, or checksum; the preamble is not covered
        let index = PREAMBLE_LENGTH + position.index(bytes.len() - PREAMBLE_LENGTH);
        // A shorter length field moves the checksum window; the buffer covers that
        prop_assume!(index != frame::offset::LENGTH);
        bytes[index] ^= 1 << bit;
        prop_assert!(!frame::validate_checksum(&bytes));
    }

    #[test]
    fn chunked_feed_yields_one_frame(
        payload in payload_strategy(),
        cuts in prop::collection::vec(1usize..8, 1..64),
    ) {
        let bytes = encode(16, 144, 18, &payload);
        let mut buffer = PacketBuffer::new();
        let mut frames = Vec::new();

        let mut start = 0;
        let mut sizes = cuts.iter().cycle();
        while start < bytes.len() {
            let size = *sizes.next().unwrap();
            let end = (start + size).min(bytes.len());
            buffer.push(&bytes[start..end]);
            while let Some(frame) = buffer.next_frame() {
                frames.push(frame);
            }
            start = end;
        }

        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(frames[0].as_bytes(), &bytes[..]);
    }

    #[test]
    fn byte_at_a_time_yields_one_frame(payload in payload_strategy()) {
        let bytes = encode(16, 150, 18, &payload);
        let mut buffer = PacketBuffer::new();
        let mut frames = Vec::new();

        for byte in &bytes {
            buffer.push(core::slice::from_ref(byte));
            while let Some(frame) = buffer.next_frame() {
                frames.push(frame);
            }
        }

        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(frames[0].as_bytes(), &bytes[..]);
    }

    #[test]
    fn noise_then_frame(
        noise in prop::collection::vec(0u8..0xFF, 0..200),
        payload in clean_payload_strategy(),
    ) {
        let bytes = encode(16, 144, 18, &payload);
        let mut buffer = PacketBuffer::new();
        let mut frames = Vec::new();

        buffer.push(&noise);
        buffer.push(&bytes);
        while let Some(frame) = buffer.next_frame() {
            frames.push(frame);
        }

        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(frames[0].as_bytes(), &bytes[..]);
    }

    #[test]
    fn corrupted_payload_yields_nothing(
        payload in prop::collection::vec(0u8..0xFF, 1..=MAX_PAYLOAD),
        position in any::<prop::sample::Index>(),
        flip in 1u8..=0xFF,
    ) {
        let mut bytes = encode(16, 144, 18, &payload);
        let index = frame::offset::PAYLOAD + position.index(payload.len());
        bytes[index] ^= flip;
        // Keep the corruption from introducing a preamble byte
        prop_assume!(bytes[index] != 0xFF);

        let mut buffer = PacketBuffer::new();
        buffer.push(&bytes);

        prop_assert_eq!(buffer.next_frame(), None);
        prop_assert_eq!(buffer.stats().invalid_checksums, 1);
        prop_assert_eq!(buffer.stats().packets_received, 0);
    }

    #[test]
    fn status_round_trip(state in device_state()) {
        let payload = encode_status_payload(&state);
        let parsed = parse_payload(&payload, state.address, state.last_update_ms).unwrap();
        prop_assert_eq!(parsed, state);
    }
}

/// A damaged length field moves the checksum window; the buffer must skip
/// the frame and still find the intact copy behind it.
#[test]
fn test_length_bit_flips_never_accepted() {
    let payload: Vec<u8> = (1..=10).collect();
    let good = encode(144, 16, 18, &payload);

    for bit in 0..8 {
        let mut bad = good.clone();
        bad[frame::offset::LENGTH] ^= 1 << bit;
        assert!(!frame::validate_checksum(&bad), "bit {bit}");

        let mut buffer = PacketBuffer::new();
        let mut frames = Vec::new();
        buffer.push(&bad);
        buffer.push(&good);
        // Idle line, so a lengthened window can complete
        buffer.push(&[0u8; 64]);
        while let Some(frame) = buffer.next_frame() {
            frames.push(frame);
        }

        assert_eq!(frames.len(), 1, "bit {bit}");
        assert_eq!(frames[0].as_bytes(), &good[..], "bit {bit}");
        assert_eq!(buffer.stats().packets_received, 1, "bit {bit}");
    }
}
