// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Output assembly: per-frame scan records and the combined cloud.
//!
//! The assembler turns one [`ScanFrame`] into its single-echo and
//! multi-echo records, writes the frame's samples into the shared
//! [`CloudBuffer`] row for its layer, and packs the buffer into a
//! PointCloud2 record when a cycle completes.
//!
//! Record prototypes ([`ScanTemplates`]) are derived once per session from
//! the device's reported scan configuration and output range, then cloned
//! and stamped for every frame. Per-frame work is array fills only.

use itertools::izip;

use crate::cloud::CloudBuffer;
use crate::msg::{
    cloud_fields, Header, LaserEcho, LaserScan, MultiEchoLaserScan, PointCloud2, Time, POINT_STEP,
};
use crate::scan::{
    LayerSlot, OutputRange, ScanConfig, ScanFrame, LAYER_COUNT, RANGE_MAX_M, RANGE_MIN_M,
    SAMPLES_PER_LAYER,
};

/// Per-session record prototypes.
///
/// Timing fields are derived from the device configuration:
/// `scan_time = 100.0 / scan_frequency` (frequency is in 1/100 Hz) and
/// `time_increment = (angular_resolution / 10000.0) / 360.0 / scan_time`.
/// Range bounds are the sensor's fixed 0.2 m .. 64 m window.
#[derive(Clone, Debug)]
pub struct ScanTemplates {
    pub scan: LaserScan,
    pub multi: MultiEchoLaserScan,
    pub cloud: PointCloud2,
}

impl ScanTemplates {
    /// Derive the session prototypes from the fetched device configuration.
    pub fn derive(cfg: &ScanConfig, range: &OutputRange, frame_id: &str) -> Self {
        let scan_time = 100.0 / cfg.scan_frequency as f32;
        let time_increment = (range.angular_resolution as f32 / 10_000.0) / 360.0 / scan_time;
        let angle_min = (range.start_angle as f32 / 10_000.0).to_radians();
        let angle_max = (range.stop_angle as f32 / 10_000.0).to_radians();
        let angle_increment = (range.angular_resolution as f32 / 10_000.0).to_radians();

        let header = Header {
            stamp: Time::default(),
            frame_id: frame_id.to_string(),
        };

        let scan = LaserScan {
            header: header.clone(),
            angle_min,
            angle_max,
            angle_increment,
            time_increment,
            scan_time,
            range_min: RANGE_MIN_M,
            range_max: RANGE_MAX_M,
            ranges: Vec::new(),
            intensities: Vec::new(),
        };

        let multi = MultiEchoLaserScan {
            header: header.clone(),
            angle_min,
            angle_max,
            angle_increment,
            time_increment,
            scan_time,
            range_min: RANGE_MIN_M,
            range_max: RANGE_MAX_M,
            ranges: Vec::new(),
            intensities: Vec::new(),
        };

        let cloud = PointCloud2 {
            header,
            height: LAYER_COUNT as u32,
            width: SAMPLES_PER_LAYER as u32,
            fields: cloud_fields(),
            is_bigendian: false,
            point_step: POINT_STEP as u32,
            row_step: (POINT_STEP * SAMPLES_PER_LAYER) as u32,
            data: Vec::new(),
            is_dense: false,
        };

        Self { scan, multi, cloud }
    }
}

/// Builds the three output projections from frames and cycle state.
#[derive(Clone, Debug)]
pub struct Assembler {
    templates: ScanTemplates,
}

impl Assembler {
    pub fn new(templates: ScanTemplates) -> Self {
        Self { templates }
    }

    /// Session prototypes, mainly for inspection in tests.
    pub fn templates(&self) -> &ScanTemplates {
        &self.templates
    }

    /// Build the single-echo record for a frame.
    ///
    /// Selects the primary echo per angular bin, which is the first echo
    /// channel in the frame's own echo ordering.
    pub fn to_single_echo(&self, frame: &ScanFrame) -> LaserScan {
        let mut scan = self.templates.scan.clone();
        scan.header.stamp = Time::from_nanos(frame.timestamp);
        if let Some(primary) = frame.echoes.first() {
            scan.ranges = primary.ranges.clone();
            scan.intensities = primary.intensities.clone();
        }
        scan
    }

    /// Build the multi-echo record for a frame.
    ///
    /// Each angular bin gets the ordered sequence of its recorded echoes;
    /// bins without a recorded count fall back to the primary echo only.
    pub fn to_multi_echo(&self, frame: &ScanFrame) -> MultiEchoLaserScan {
        let mut scan = self.templates.multi.clone();
        scan.header.stamp = Time::from_nanos(frame.timestamp);

        let samples = frame.samples();
        scan.ranges = Vec::with_capacity(samples);
        scan.intensities = Vec::with_capacity(samples);

        for bin in 0..samples {
            let count = frame.echo_count.get(bin).copied().unwrap_or(1).max(1) as usize;
            let mut ranges = LaserEcho::default();
            let mut intensities = LaserEcho::default();
            for channel in frame.echoes.iter().take(count) {
                if let (Some(&range), Some(&intensity)) =
                    (channel.ranges.get(bin), channel.intensities.get(bin))
                {
                    ranges.echoes.push(range);
                    intensities.echoes.push(intensity);
                }
            }
            scan.ranges.push(ranges);
            scan.intensities.push(intensities);
        }

        scan
    }

    /// Write a frame's samples into the cloud buffer row for its slot.
    ///
    /// The azimuth of sample i is `start_angle + i * resolution`; the
    /// elevation comes from the frame's reported layer angle. Only the
    /// slot's own row is touched.
    pub fn write_cloud_row(&self, cloud: &mut CloudBuffer, slot: LayerSlot, frame: &ScanFrame) {
        let Some(primary) = frame.echoes.first() else {
            return;
        };

        let elevation = (frame.layer_angle as f32 / 100.0).to_radians();
        let (sin_el, cos_el) = elevation.sin_cos();
        let start_deg = frame.start_angle as f32 / 10_000.0;
        let step_deg = frame.angular_resolution as f32 / 10_000.0;
        let row = slot.index();

        for (i, (&range, &intensity)) in
            primary.ranges.iter().zip(&primary.intensities).enumerate()
        {
            let azimuth = (start_deg + i as f32 * step_deg).to_radians();
            let x = range * cos_el * azimuth.cos();
            let y = range * cos_el * azimuth.sin();
            let z = range * sin_el;
            cloud.write(row, x, y, z, intensity);
        }
    }

    /// Pack the full buffer into a cloud record.
    ///
    /// The record is a read-only view of the buffer at emission time:
    /// height 4, width 1101, cells packed row-major as little-endian
    /// x/y/z/intensity floats.
    pub fn assemble_cloud(&self, cloud: &CloudBuffer, stamp: Time) -> PointCloud2 {
        let mut record = self.templates.cloud.clone();
        record.header.stamp = stamp;
        record.height = cloud.height() as u32;
        record.width = cloud.width() as u32;
        record.row_step = (POINT_STEP * cloud.width()) as u32;

        let mut data = Vec::with_capacity(cloud.height() * cloud.width() * POINT_STEP);
        for (x, y, z, intensity) in izip!(cloud.x(), cloud.y(), cloud.z(), cloud.intensity()) {
            data.extend_from_slice(&x.to_le_bytes());
            data.extend_from_slice(&y.to_le_bytes());
            data.extend_from_slice(&z.to_le_bytes());
            data.extend_from_slice(&intensity.to_le_bytes());
        }
        record.data = data;
        record
    }
}
