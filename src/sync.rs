// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Layer synchronization: aligning per-layer frames into cycles.
//!
//! Frames arrive one layer at a time in the sensor's interleaved sweep
//! order. The synchronizer classifies each frame into its canonical slot,
//! tracks whether a cycle start has been observed, and decides when the
//! combined cloud is complete.
//!
//! A frame for slot 0 rewinds the cloud buffer cursors and arms the
//! `synced` flag, discarding any partially-filled cycle; partial cycles
//! are never emitted. Per-layer records go out for every frame whether or
//! not the stream is synced. A frame for slot 3 while synced publishes
//! the combined cloud; `synced` stays armed afterwards, so a missing
//! cycle-start frame leads to a re-emission of the (possibly stale)
//! buffer at the next slot-3 frame rather than a skipped cycle.
//!
//! A synchronizer lives for exactly one session. Teardown drops it, and
//! with it all cycle state.

use log::{debug, trace};

use crate::assembler::Assembler;
use crate::cloud::CloudBuffer;
use crate::msg::Time;
use crate::scan::{LayerSlot, ScanFrame, LAYER_COUNT, SAMPLES_PER_LAYER};
use crate::sink::OutputSink;

/// Per-session cycle alignment state.
pub struct LayerSynchronizer {
    assembler: Assembler,
    cloud: CloudBuffer,
    synced: bool,
}

impl LayerSynchronizer {
    /// Create a fresh synchronizer; `synced` starts false.
    pub fn new(assembler: Assembler) -> Self {
        Self {
            assembler,
            cloud: CloudBuffer::new(LAYER_COUNT, SAMPLES_PER_LAYER),
            synced: false,
        }
    }

    /// Whether a cycle start has been observed since session start.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Process one frame: emit its per-layer records and update the cycle.
    ///
    /// Outputs for the frame are always emitted before this call returns,
    /// so they strictly precede the next frame read, and a combined cloud
    /// is emitted strictly after the per-layer records of the frames that
    /// fed it.
    pub async fn observe<S: OutputSink>(&mut self, frame: &ScanFrame, sink: &mut S) {
        let slot = LayerSlot::classify(frame.layer_angle);
        if !LayerSlot::is_known(frame.layer_angle) {
            debug!(
                "unmapped layer angle {} treated as {}",
                frame.layer_angle, slot
            );
        }

        // A cycle-start frame rewinds the buffer and arms collection,
        // dropping whatever an incomplete previous cycle left behind.
        if slot.is_cycle_start() {
            self.cloud.reset_all();
            self.synced = true;
        }

        sink.publish_scan(slot, &self.assembler.to_single_echo(frame))
            .await;
        sink.publish_multi_echo(slot, &self.assembler.to_multi_echo(frame))
            .await;

        if !self.synced {
            trace!("dropping cloud samples for {}: not synced", slot);
            return;
        }

        self.assembler.write_cloud_row(&mut self.cloud, slot, frame);

        if slot.is_cycle_end() {
            let cloud = self
                .assembler
                .assemble_cloud(&self.cloud, Time::from_nanos(frame.timestamp));
            sink.publish_cloud(&cloud).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::ScanTemplates;
    use crate::scan::{
        EchoChannel, OutputRange, ScanConfig, LAYER1_ANGLE, LAYER2_ANGLE, LAYER3_ANGLE,
        LAYER4_ANGLE,
    };
    use crate::sink::RecordingSink;

    const SLOT_ANGLES: [i16; 4] = [LAYER2_ANGLE, LAYER3_ANGLE, LAYER1_ANGLE, LAYER4_ANGLE];

    fn synchronizer() -> LayerSynchronizer {
        let cfg = ScanConfig {
            scan_frequency: 5000,
            num_sectors: 1,
            angular_resolution: 2500,
            start_angle: -1_375_000,
            stop_angle: 1_375_000,
        };
        let range = OutputRange {
            angular_resolution: 2500,
            start_angle: -1_375_000,
            stop_angle: 1_375_000,
        };
        LayerSynchronizer::new(Assembler::new(ScanTemplates::derive(&cfg, &range, "laser")))
    }

    fn frame_for_slot(slot: usize) -> ScanFrame {
        ScanFrame {
            layer_angle: SLOT_ANGLES[slot],
            scan_frequency: 5000,
            angular_resolution: 2500,
            start_angle: -1_375_000,
            stop_angle: 1_375_000,
            echoes: vec![EchoChannel {
                ranges: vec![3.0; SAMPLES_PER_LAYER],
                intensities: vec![80.0; SAMPLES_PER_LAYER],
            }],
            echo_count: vec![1; SAMPLES_PER_LAYER],
            timestamp: 1_000 + slot as u64,
        }
    }

    async fn run_sequence(slots: &[usize]) -> RecordingSink {
        let mut sync = synchronizer();
        let mut sink = RecordingSink::new();
        for &slot in slots {
            sync.observe(&frame_for_slot(slot), &mut sink).await;
        }
        sink
    }

    #[tokio::test]
    async fn test_complete_cycle_emits_one_cloud() {
        let sink = run_sequence(&[0, 1, 2, 3]).await;
        assert_eq!(sink.cloud_count(), 1);
        assert_eq!(sink.scan_count(), 4);
        assert_eq!(sink.multi_count(), 4);
    }

    #[tokio::test]
    async fn test_no_cloud_before_cycle_start() {
        // Session starts mid-cycle: per-layer records flow, no cloud
        let sink = run_sequence(&[1, 2, 3]).await;
        assert_eq!(sink.cloud_count(), 0);
        assert_eq!(sink.scan_count(), 3);
        assert_eq!(sink.multi_count(), 3);
    }

    #[tokio::test]
    async fn test_dropped_cycle_start_re_emits_stale_cloud() {
        // The cycle-start frame between the two passes is missing: the
        // second slot-3 frame re-publishes the buffer instead of waiting
        // for a new cycle start.
        let sink = run_sequence(&[0, 1, 2, 3, 1, 2, 3]).await;
        assert_eq!(sink.cloud_count(), 2);
    }

    #[tokio::test]
    async fn test_recovery_after_dropped_cycle_start() {
        // Same as above with a full recovered cycle appended: every
        // slot-3 frame seen while synced publishes.
        let sink = run_sequence(&[0, 1, 2, 3, 1, 2, 3, 0, 1, 2, 3]).await;
        assert_eq!(sink.cloud_count(), 3);
    }

    #[tokio::test]
    async fn test_out_of_order_cycle_still_emits_on_slot_3() {
        let sink = run_sequence(&[0, 2, 1, 3]).await;
        assert_eq!(sink.cloud_count(), 1);
    }

    #[tokio::test]
    async fn test_cloud_emissions_bounded_by_synced_slot_3_frames() {
        for slots in [
            vec![0, 1, 2, 3],
            vec![3, 3, 0, 3],
            vec![1, 2, 3, 0, 1, 2, 3],
            vec![0, 0, 1, 1, 2, 2, 3, 3],
            vec![2, 3, 2, 3],
        ] {
            let mut sync = synchronizer();
            let mut sink = RecordingSink::new();
            let mut synced_last_frames = 0;
            for &slot in &slots {
                sync.observe(&frame_for_slot(slot), &mut sink).await;
                if slot == 3 && sync.is_synced() {
                    synced_last_frames += 1;
                }
            }
            assert!(
                sink.cloud_count() <= synced_last_frames,
                "sequence {:?} emitted {} clouds for {} synced cycle-end frames",
                slots,
                sink.cloud_count(),
                synced_last_frames
            );
        }
    }

    #[tokio::test]
    async fn test_per_layer_records_for_every_frame() {
        let slots = [1, 2, 3, 0, 1, 2, 3, 3, 0];
        let sink = run_sequence(&slots).await;
        assert_eq!(sink.scan_count(), slots.len());
        assert_eq!(sink.multi_count(), slots.len());
    }

    #[tokio::test]
    async fn test_unmapped_layer_lands_on_slot_0() {
        let mut sync = synchronizer();
        let mut sink = RecordingSink::new();

        let mut odd = frame_for_slot(0);
        odd.layer_angle = 777;
        sync.observe(&odd, &mut sink).await;

        // The unmapped frame classified to slot 0 and armed the cycle
        assert!(sync.is_synced());
        let outputs = sink.take();
        assert_eq!(outputs.scans.len(), 1);
        assert_eq!(outputs.scans[0].0, LayerSlot::Layer2);
    }

    #[tokio::test]
    async fn test_cloud_stamp_follows_cycle_end_frame() {
        let sink = run_sequence(&[0, 1, 2, 3]).await;
        let outputs = sink.take();
        assert_eq!(outputs.clouds.len(), 1);
        // Slot 3 frame carries timestamp 1003
        assert_eq!(outputs.clouds[0].header.stamp.nanosec, 1003);
    }
}
