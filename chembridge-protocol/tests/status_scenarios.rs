//! End-to-end decoding of captured status responses

use chembridge_protocol::frame;
use chembridge_protocol::{parse_status, DosingStatus, PacketBuffer, WaterChemistry};

/// Status response from the device at 0x90 with pH 7.24, ORP 700 mV, 82 °F
fn captured_response() -> Vec<u8> {
    let mut payload = [0u8; 41];
    payload[0] = 0x02;
    payload[1] = 0xD4;
    payload[2] = 0x02;
    payload[3] = 0xBC;
    payload[31] = 0x52;

    let mut bytes = vec![0xFF, 0x00, 0xFF, 0xA5, 0x00, 0x10, 0x90, 0x12, 0x29];
    bytes.extend_from_slice(&payload);
    let sum = frame::checksum(&bytes[3..]);
    bytes.extend_from_slice(&sum.to_be_bytes());
    bytes
}

/// A full bench capture: pH 7.5 / ORP 720 with dosing, alarms and warnings
fn bench_capture() -> Vec<u8> {
    let payload: [u8; 41] = [
        0x02, 0xEE, // pH 7.50
        0x02, 0xD0, // ORP 720
        0x02, 0xE4, // pH setpoint 7.40
        0x02, 0xBC, // ORP setpoint 700
        0x00, 0x00, //
        0x00, 0x1E, // pH dose time 30 s
        0x00, 0x00, //
        0x00, 0x3C, // ORP dose time 60 s
        0x00, 0x64, // pH dose volume 100 mL
        0x00, 0xC8, // ORP dose volume 200 mL
        0x05, 0x03, // tanks
        0xEC, // LSI -0.20
        0x01, 0x90, // calcium 400
        0x00, //
        0x28, // CYA 40
        0x00, 0x64, // alkalinity 100
        0x3C, // salt 3000
        0x00, //
        0x4E, // 78 degrees
        0x20, // pH tank empty
        0x02, // pH daily limit
        0b01_00_11_01, // ORP monitoring, pH dosing, both dosers configured
        0x00, //
        0x50, 0x01, // firmware 1.080
        0x01, // corrosive
        0x00, 0x00,
    ];
    let mut buffer = [0u8; 64];
    let len = frame::build(&mut buffer, 16, 145, 18, &payload).unwrap();
    buffer[..len].to_vec()
}

#[test]
fn test_captured_response_parses() {
    let bytes = captured_response();
    assert_eq!(bytes.len(), 52);

    let mut buffer = PacketBuffer::new();
    buffer.push(&bytes);
    let frame = buffer.next_frame().expect("frame");
    let state = parse_status(&frame, 5000).expect("status");

    assert_eq!(state.address, 0x90);
    assert_eq!(state.ph.level, 7.24);
    assert_eq!(state.orp.level, 700.0);
    assert_eq!(state.temperature, 82);
    assert_eq!(state.last_update_ms, 5000);
}

#[test]
fn test_zeroed_checksum_rejected() {
    let mut bytes = captured_response();
    let len = bytes.len();
    bytes[len - 2] = 0;
    bytes[len - 1] = 0;

    let mut buffer = PacketBuffer::new();
    buffer.push(&bytes);

    let mut states = 0;
    while let Some(frame) = buffer.next_frame() {
        if parse_status(&frame, 0).is_ok() {
            states += 1;
        }
    }
    assert_eq!(states, 0);
    assert_eq!(buffer.stats().invalid_checksums, 1);
}

#[test]
fn test_bench_capture_decodes_every_field() {
    let mut buffer = PacketBuffer::new();
    buffer.push(&bench_capture());
    let frame = buffer.next_frame().expect("frame");
    let state = parse_status(&frame, 0).expect("status");

    assert_eq!(state.address, 145);
    assert_eq!(state.ph.level, 7.5);
    assert_eq!(state.ph.setpoint, 7.4);
    assert_eq!(state.ph.dose_time, 30);
    assert_eq!(state.ph.dose_volume, 100);
    assert_eq!(state.ph.tank_level, 4);
    assert_eq!(state.ph.dosing_status, DosingStatus::Dosing);
    assert!(state.ph.is_dosing);

    assert_eq!(state.orp.level, 720.0);
    assert_eq!(state.orp.setpoint, 700.0);
    assert_eq!(state.orp.dose_time, 60);
    assert_eq!(state.orp.dose_volume, 200);
    assert_eq!(state.orp.tank_level, 2);
    assert_eq!(state.orp.dosing_status, DosingStatus::Monitoring);
    assert!(!state.orp.is_dosing);

    assert_eq!(state.lsi, -0.2);
    assert_eq!(state.calcium_hardness, 400);
    assert_eq!(state.cyanuric_acid, 40);
    assert_eq!(state.alkalinity, 100);
    assert_eq!(state.salt_level, 3000);
    assert_eq!(state.temperature, 78);

    assert!(state.alarms.ph_tank_empty);
    assert!(!state.alarms.flow);
    assert!(state.flow_detected);
    assert!(state.warnings.ph_daily_limit);
    assert_eq!(state.warnings.water_chemistry, WaterChemistry::Corrosive);
    assert!(!state.comms_lost);
    assert_eq!(state.firmware.render().as_str(), "1.080");
}

#[test]
fn test_response_between_bus_chatter() {
    // Our own poll echoed back, a burst of line noise, then the response
    let poll = chembridge_protocol::Frame::status_request(145);
    let mut stream = poll.as_bytes().to_vec();
    stream.extend_from_slice(&[0x00, 0x13, 0x7E, 0xFF, 0x00]);
    stream.extend_from_slice(&bench_capture());

    let mut buffer = PacketBuffer::new();
    let mut states = Vec::new();
    for chunk in stream.chunks(7) {
        buffer.push(chunk);
        while let Some(frame) = buffer.next_frame() {
            if let Ok(state) = parse_status(&frame, 0) {
                states.push(state);
            }
        }
    }

    assert_eq!(states.len(), 1);
    assert_eq!(states[0].address, 145);
    assert_eq!(buffer.stats().packets_received, 2);
}
