//! End-to-end: simulated sender → scripted camera → receiver.

use optical_link::capture::{Camera, CaptureConfig, ConfigError, ScriptedCamera};
use optical_link::classify::ChannelMap;
use optical_link::config::LinkConfig;
use optical_link::protocol::{FrameError, Parity, SyncPolicy};
use optical_link::receiver::{
    CancellationToken, LinkError, NullSink, Receiver, ReceiverEvent, SessionSummary,
};
use optical_link::sampling::SamplingMode;
use optical_link::sender::{encode_frame, SenderSchedule};

fn link() -> LinkConfig {
    let mut config = LinkConfig::default();
    config.capture = CaptureConfig {
        width: 64,
        height: 48,
        fps: 30,
        ..Default::default()
    };
    config.calibration.settle_seconds = 0.5;
    config.sampling.base_capture_interval = 0.2;
    config.sender.bit_duration = 0.2;
    config.sender.marker_hold = 1.0;
    config
}

fn transmit(
    config: &LinkConfig,
    transmissions: &[Vec<u8>],
    noise: u8,
) -> (SessionSummary, Vec<ReceiverEvent>) {
    let schedule = SenderSchedule::for_transmissions(
        transmissions,
        &config.channel,
        &config.sender,
        config.sampling.bits_per_tick(),
    );
    let screen = ScriptedCamera::centered_screen(&config.capture, 0.5);
    let mut camera = ScriptedCamera::new(schedule, screen).with_noise(noise, 42);
    camera.open(&config.capture).unwrap();

    let mut receiver = Receiver::new(config).unwrap();
    let mut events = Vec::new();
    let summary = receiver
        .run(&mut camera, &CancellationToken::new(), &mut NullSink, |event| {
            events.push(event.clone())
        })
        .unwrap();
    assert_eq!(summary.roi, Some(screen));
    (summary, events)
}

fn frames(config: &LinkConfig, texts: &[&str]) -> Vec<Vec<u8>> {
    texts
        .iter()
        .map(|text| encode_frame(text, &config.protocol).unwrap())
        .collect()
}

fn texts(summary: &SessionSummary) -> Vec<String> {
    summary
        .messages
        .iter()
        .map(|m| m.text.trim_end().to_string())
        .collect()
}

#[test]
fn test_region_mode_multiple_messages() {
    let config = link();
    let sent = ["hello", "optical link"];
    let (summary, _) = transmit(&config, &frames(&config, &sent), 0);

    assert_eq!(texts(&summary), sent);
    assert_eq!(summary.stats.frames_discarded(), 0);
}

#[test]
fn test_lines_mode() {
    let mut config = link();
    config.sampling.mode = SamplingMode::Lines;
    config.sampling.bits_per_tick = 4;

    let (summary, _) = transmit(&config, &frames(&config, &["four bands"]), 0);
    assert_eq!(texts(&summary), ["four bands"]);
}

#[test]
fn test_survives_pixel_noise() {
    let config = link();
    let (summary, _) = transmit(&config, &frames(&config, &["noisy"]), 20);
    assert_eq!(texts(&summary), ["noisy"]);
}

#[test]
fn test_chromatic_bit_colors() {
    let mut config = link();
    config.channel = ChannelMap::chromatic_bits();
    let (summary, _) = transmit(&config, &frames(&config, &["blue and magenta"]), 0);
    assert_eq!(texts(&summary), ["blue and magenta"]);
}

#[test]
fn test_lines_mode_rejects_chromatic_bits() {
    let mut config = link();
    config.channel = ChannelMap::chromatic_bits();
    config.sampling.mode = SamplingMode::Lines;
    config.sampling.bits_per_tick = 2;

    let result = Receiver::new(&config);
    assert!(matches!(
        result,
        Err(LinkError::Config(ConfigError::ChromaticLineBits { .. }))
    ));
}

#[test]
fn test_corrupted_checksum_then_recovery() {
    let config = link();
    let mut bad = encode_frame("x", &config.protocol).unwrap();
    // Flip two data bits: parity still holds, the checksum does not
    let payload = config.protocol.start_sequence.len();
    bad[payload + 1] ^= 1;
    bad[payload + 2] ^= 1;

    let mut transmissions = vec![bad];
    transmissions.extend(frames(&config, &["ok"]));
    let (summary, events) = transmit(&config, &transmissions, 0);

    let reasons: Vec<&FrameError> = events
        .iter()
        .filter_map(|e| match e {
            ReceiverEvent::Discarded { reason, .. } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(reasons, [&FrameError::ChecksumMismatch]);
    assert_eq!(texts(&summary), ["ok"]);
}

#[test]
fn test_odd_parity_session() {
    let mut config = link();
    config.protocol.parity = Parity::Odd;
    let (summary, _) = transmit(&config, &frames(&config, &["a"]), 0);
    assert_eq!(summary.messages[0].text, "a");
}

#[test]
fn test_latest_start_policy_recovers_from_truncated_frame() {
    let mut config = link();
    config.protocol.sync_policy = SyncPolicy::LatestStart;

    // A start sequence with no payload or end, then a full frame, all in
    // one transmission.
    let mut bits = config.protocol.start_sequence.clone();
    bits.extend(encode_frame("z", &config.protocol).unwrap());
    let (summary, _) = transmit(&config, &[bits], 0);
    assert_eq!(texts(&summary), ["z"]);
}

#[test]
fn test_no_marker() {
    let config = link();
    let schedule = SenderSchedule::default();
    let screen = ScriptedCamera::centered_screen(&config.capture, 0.5);
    let mut camera = ScriptedCamera::new(schedule, screen);
    camera.open(&config.capture).unwrap();

    let mut receiver = Receiver::new(&config).unwrap();
    let result = receiver.run(
        &mut camera,
        &CancellationToken::new(),
        &mut NullSink,
        |_| {},
    );
    assert!(matches!(result, Err(LinkError::NoMarkerDetected)));
}

#[test]
fn test_session_from_toml_file() {
    let toml = r#"
[capture]
width = 64
height = 48
fps = 30

[protocol]
parity = "odd"

[sampling]
base_capture_interval = 0.2

[calibration]
settle_seconds = 0.5

[sender]
bit_duration = 0.2
marker_hold = 1.0
"#;
    let path = std::env::temp_dir().join(format!("optical-link-{}.toml", std::process::id()));
    std::fs::write(&path, toml).unwrap();
    let config = LinkConfig::from_file(&path);
    std::fs::remove_file(&path).unwrap();
    let config = config.unwrap();

    assert_eq!(config.protocol.parity, Parity::Odd);
    let (summary, _) = transmit(&config, &frames(&config, &["a"]), 0);
    assert_eq!(summary.messages[0].text, "a");
}
