// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Simulated sensor link.
//!
//! Produces synthetic layer frames in the sensor's interleaved sweep
//! order at the real device rate (50 Hz cycles, one layer frame every
//! 5 ms). Useful for running the publisher without hardware and as the
//! reference implementation of the link traits.
//!
//! The synthetic scene is a smooth range field with a weaker second echo
//! on every seventh bin, which exercises the multi-echo path.

use std::time::Duration;

use log::{debug, info};

use crate::link::{Connector, DeviceLink};
use crate::scan::{
    timestamp, EchoChannel, EchoFilter, Error, LayerSlot, OutputRange, ScanConfig,
    ScanDataConfig, ScanFrame, RANGE_MAX_M, RANGE_MIN_M, SAMPLES_PER_LAYER,
};

/// Frame pacing: 50 Hz cycle rate across 4 layers.
const FRAME_INTERVAL: Duration = Duration::from_millis(5);

/// Connector for the built-in simulated sensor.
#[derive(Clone, Debug)]
pub struct SimConnector {
    interval: Duration,
}

impl Default for SimConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl SimConnector {
    /// Simulated sensor at the real device rate.
    pub fn new() -> Self {
        Self {
            interval: FRAME_INTERVAL,
        }
    }

    /// Simulated sensor with custom frame pacing (zero for tests).
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Connector for SimConnector {
    type Link = SimLink;

    fn connect(&mut self) -> Result<Self::Link, Error> {
        info!("sim: link established");
        Ok(SimLink {
            seq: 0,
            interval: self.interval,
        })
    }
}

/// Simulated device session.
pub struct SimLink {
    seq: usize,
    interval: Duration,
}

impl SimLink {
    fn synth_frame(&self, slot: LayerSlot) -> ScanFrame {
        let mut primary = EchoChannel {
            ranges: Vec::with_capacity(SAMPLES_PER_LAYER),
            intensities: Vec::with_capacity(SAMPLES_PER_LAYER),
        };
        let mut secondary = EchoChannel {
            ranges: Vec::with_capacity(SAMPLES_PER_LAYER),
            intensities: Vec::with_capacity(SAMPLES_PER_LAYER),
        };
        let mut echo_count = Vec::with_capacity(SAMPLES_PER_LAYER);

        for i in 0..SAMPLES_PER_LAYER {
            let azimuth = (-137.5 + i as f32 * 0.25).to_radians();
            let range = (4.0 + 1.5 * (azimuth * 3.0).sin()).clamp(RANGE_MIN_M, RANGE_MAX_M);
            primary.ranges.push(range);
            primary.intensities.push(120.0 + 80.0 * (azimuth * 2.0).cos());

            secondary.ranges.push((range + 0.3).min(RANGE_MAX_M));
            secondary.intensities.push(40.0);
            echo_count.push(if i % 7 == 0 { 2 } else { 1 });
        }

        ScanFrame {
            layer_angle: slot.layer_angle(),
            scan_frequency: 5000,
            angular_resolution: 2500,
            start_angle: -1_375_000,
            stop_angle: 1_375_000,
            echoes: vec![primary, secondary],
            echo_count,
            timestamp: timestamp().unwrap_or(0),
        }
    }
}

impl DeviceLink for SimLink {
    fn login(&mut self) -> Result<(), Error> {
        debug!("sim: login");
        Ok(())
    }

    fn scan_config(&mut self) -> Result<ScanConfig, Error> {
        Ok(ScanConfig {
            scan_frequency: 5000,
            num_sectors: 1,
            angular_resolution: 2500,
            start_angle: -1_375_000,
            stop_angle: 1_375_000,
        })
    }

    fn scan_output_range(&mut self) -> Result<OutputRange, Error> {
        Ok(OutputRange {
            angular_resolution: 2500,
            start_angle: -1_375_000,
            stop_angle: 1_375_000,
        })
    }

    fn set_scan_data_config(&mut self, cfg: &ScanDataConfig) -> Result<(), Error> {
        debug!("sim: scan data config {:?}", cfg);
        Ok(())
    }

    fn set_echo_filter(&mut self, filter: EchoFilter) -> Result<(), Error> {
        debug!("sim: echo filter {:?}", filter);
        Ok(())
    }

    fn enable_ranging(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn save_config(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn start_device(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn start_measurement(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn scan_continuous(&mut self, enable: bool) -> Result<(), Error> {
        debug!("sim: continuous mode {}", enable);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<ScanFrame, Error> {
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }

        let slot = LayerSlot::all()[self.seq % LayerSlot::all().len()];
        self.seq += 1;
        Ok(self.synth_frame(slot))
    }
}

impl Drop for SimLink {
    fn drop(&mut self) {
        debug!("sim: link closed");
    }
}
