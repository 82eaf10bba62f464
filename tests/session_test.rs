// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! End-to-end session lifecycle tests.
//!
//! These tests drive the supervisor with a scripted connector and capture
//! outputs with a recording sink. The tokio clock starts paused, so the
//! retry backoffs elapse instantly while their exact spacing stays
//! observable through the connector's attempt timestamps.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use mrspub::link::{LinkStep, ScriptedConnector, SessionScript};
use mrspub::scan::{
    EchoChannel, ScanFrame, LAYER1_ANGLE, LAYER2_ANGLE, LAYER3_ANGLE, LAYER4_ANGLE,
    SAMPLES_PER_LAYER,
};
use mrspub::session::{Supervisor, SessionState, CONNECT_RETRY_DELAY, SCAN_RESTART_DELAY};
use mrspub::sink::RecordingSink;

/// Layer angles in cycle order (slots 0..3).
const SLOT_ANGLES: [i16; 4] = [LAYER2_ANGLE, LAYER3_ANGLE, LAYER1_ANGLE, LAYER4_ANGLE];

/// Device command sequence of one successful session setup.
const SETUP_CALLS: [&str; 10] = [
    "login",
    "scan_config",
    "scan_output_range",
    "set_scan_data_config",
    "set_echo_filter",
    "enable_ranging",
    "save_config",
    "start_device",
    "start_measurement",
    "scan_continuous",
];

fn frame_for_slot(slot: usize) -> ScanFrame {
    ScanFrame {
        layer_angle: SLOT_ANGLES[slot],
        scan_frequency: 5000,
        angular_resolution: 2500,
        start_angle: -1_375_000,
        stop_angle: 1_375_000,
        echoes: vec![EchoChannel {
            ranges: vec![5.0; SAMPLES_PER_LAYER],
            intensities: vec![90.0; SAMPLES_PER_LAYER],
        }],
        echo_count: vec![1; SAMPLES_PER_LAYER],
        timestamp: 1_000_000 * (slot as u64 + 1),
    }
}

fn frames(slots: &[usize]) -> Vec<LinkStep> {
    slots
        .iter()
        .map(|&slot| LinkStep::Frame(frame_for_slot(slot)))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_refused_connections() {
    let running = Arc::new(AtomicBool::new(true));
    let mut steps = frames(&[0, 1, 2, 3]);
    steps.push(LinkStep::Shutdown);

    let (connector, log) = ScriptedConnector::new(
        vec![
            SessionScript::Refuse,
            SessionScript::Refuse,
            SessionScript::Accept(steps),
        ],
        Arc::clone(&running),
    );
    let sink = RecordingSink::new();
    let outputs = sink.clone();

    let mut supervisor = Supervisor::new(connector, sink, "laser", running);
    supervisor.run().await;

    // Exactly three attempts, separated by the short backoff
    let attempts = log.attempts();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[1] - attempts[0], CONNECT_RETRY_DELAY);
    assert_eq!(attempts[2] - attempts[1], CONNECT_RETRY_DELAY);

    // The setup sequence ran exactly once, after the third attempt
    let mut expected = vec!["connect", "connect", "connect"];
    expected.extend(SETUP_CALLS);
    expected.push("disconnect");
    assert_eq!(log.calls(), expected);

    // The one good cycle produced its outputs
    assert_eq!(outputs.cloud_count(), 1);
    assert_eq!(outputs.scan_count(), 4);
    assert_eq!(outputs.multi_count(), 4);
    assert_eq!(supervisor.state(), SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_tears_down_and_restarts() {
    let running = Arc::new(AtomicBool::new(true));

    // First session: one full cycle, then the read times out.
    let mut first = frames(&[0, 1, 2, 3]);
    first.push(LinkStep::Fail);
    // Second session: a cycle tail without a cycle start, then shutdown.
    let mut second = frames(&[1, 2, 3]);
    second.push(LinkStep::Shutdown);

    let (connector, log) = ScriptedConnector::new(
        vec![SessionScript::Accept(first), SessionScript::Accept(second)],
        Arc::clone(&running),
    );
    let sink = RecordingSink::new();
    let outputs = sink.clone();

    let mut supervisor = Supervisor::new(connector, sink, "laser", running);
    supervisor.run().await;

    // Teardown happened before the reconnect, after the long backoff
    let attempts = log.attempts();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[1] - attempts[0], SCAN_RESTART_DELAY);

    let calls = log.calls();
    let first_disconnect = calls.iter().position(|c| *c == "disconnect").unwrap();
    let second_connect = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == "connect")
        .nth(1)
        .map(|(i, _)| i)
        .unwrap();
    assert!(first_disconnect < second_connect);

    // Setup ran once per session
    assert_eq!(log.count("login"), 2);
    assert_eq!(log.count("scan_continuous"), 2);

    // Synchronization state did not survive the teardown: the second
    // session's cycle-end frame found an unsynced stream, so only the
    // first session's cycle emitted a cloud.
    assert_eq!(outputs.cloud_count(), 1);

    // Every good frame produced its per-layer records
    assert_eq!(outputs.scan_count(), 7);
    assert_eq!(outputs.multi_count(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_mid_cycle_start_holds_cloud_until_cycle_start() {
    let running = Arc::new(AtomicBool::new(true));
    let mut steps = frames(&[1, 2, 3, 0, 1, 2, 3]);
    steps.push(LinkStep::Shutdown);

    let (connector, _log) = ScriptedConnector::new(
        vec![SessionScript::Accept(steps)],
        Arc::clone(&running),
    );
    let sink = RecordingSink::new();
    let outputs = sink.clone();

    let mut supervisor = Supervisor::new(connector, sink, "laser", running);
    supervisor.run().await;

    // The first cycle-end frame arrived before any cycle start and
    // produced no cloud; the complete cycle after it did.
    assert_eq!(outputs.cloud_count(), 1);
    assert_eq!(outputs.scan_count(), 7);
    assert_eq!(outputs.multi_count(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_discards_partial_cycle() {
    let running = Arc::new(AtomicBool::new(true));
    let mut steps = frames(&[0, 1]);
    steps.push(LinkStep::Shutdown);

    let (connector, log) = ScriptedConnector::new(
        vec![SessionScript::Accept(steps)],
        Arc::clone(&running),
    );
    let sink = RecordingSink::new();
    let outputs = sink.clone();

    let mut supervisor = Supervisor::new(connector, sink, "laser", running);
    supervisor.run().await;

    // No flush on shutdown: the half-filled cycle is dropped, but the
    // per-layer records for the frames that did arrive were emitted.
    assert_eq!(outputs.cloud_count(), 0);
    assert_eq!(outputs.scan_count(), 2);
    assert_eq!(outputs.multi_count(), 2);

    // The connection resource was released on the way out
    assert_eq!(log.count("disconnect"), 1);
    assert_eq!(supervisor.state(), SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_cloud_emission_bounded_by_cycle_end_frames() {
    let running = Arc::new(AtomicBool::new(true));
    // Mixed stream with duplicate and missing layers across one session
    let slots = [0usize, 1, 2, 3, 1, 2, 3, 0, 1, 2, 3];
    let mut steps = frames(&slots);
    steps.push(LinkStep::Shutdown);

    let (connector, _log) = ScriptedConnector::new(
        vec![SessionScript::Accept(steps)],
        Arc::clone(&running),
    );
    let sink = RecordingSink::new();
    let outputs = sink.clone();

    let mut supervisor = Supervisor::new(connector, sink, "laser", running);
    supervisor.run().await;

    // Sync is armed by the first slot-0 frame and stays armed, so every
    // slot-3 frame afterwards publishes (the middle one re-emits a stale
    // buffer because its cycle start was dropped).
    let cycle_end_frames = slots.iter().filter(|&&s| s == 3).count();
    assert_eq!(outputs.cloud_count(), cycle_end_frames);
    assert_eq!(outputs.scan_count(), slots.len());
    assert_eq!(outputs.multi_count(), slots.len());
}
