// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Output record types with ROS 2 `sensor_msgs` field layouts.
//!
//! These structs mirror the ROS 2 message definitions field-for-field so
//! that CDR-encoded payloads are wire compatible with `sensor_msgs/msg/
//! LaserScan`, `sensor_msgs/msg/MultiEchoLaserScan` and `sensor_msgs/msg/
//! PointCloud2` subscribers. Field order matters: the CDR serializer walks
//! the struct in declaration order.

use serde::{Deserialize, Serialize};

/// Encoding suffix for single-echo scan records.
pub const LASER_SCAN_TYPE: &str = "sensor_msgs/msg/LaserScan";

/// Encoding suffix for multi-echo scan records.
pub const MULTI_ECHO_SCAN_TYPE: &str = "sensor_msgs/msg/MultiEchoLaserScan";

/// Encoding suffix for point cloud records.
pub const POINT_CLOUD_TYPE: &str = "sensor_msgs/msg/PointCloud2";

/// Bytes per cloud cell: x, y, z, intensity as f32.
pub const POINT_STEP: usize = 16;

/// Message timestamp, seconds and nanoseconds since an epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

impl Time {
    /// Split a nanosecond timestamp into seconds and remainder.
    pub fn from_nanos(nanos: u64) -> Self {
        Self {
            sec: (nanos / 1_000_000_000) as i32,
            nanosec: (nanos % 1_000_000_000) as u32,
        }
    }
}

/// Standard message header.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Time,
    pub frame_id: String,
}

/// Single-echo laser scan of one layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    pub header: Header,
    /// Start azimuth, radians
    pub angle_min: f32,
    /// Stop azimuth, radians
    pub angle_max: f32,
    /// Azimuth step, radians
    pub angle_increment: f32,
    /// Seconds between samples
    pub time_increment: f32,
    /// Seconds between scans
    pub scan_time: f32,
    /// Minimum valid range, meters
    pub range_min: f32,
    /// Maximum valid range, meters
    pub range_max: f32,
    pub ranges: Vec<f32>,
    pub intensities: Vec<f32>,
}

/// Echo sequence for one angular bin, sensor echo order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LaserEcho {
    pub echoes: Vec<f32>,
}

/// Multi-echo laser scan of one layer; one echo sequence per angular bin.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiEchoLaserScan {
    pub header: Header,
    pub angle_min: f32,
    pub angle_max: f32,
    pub angle_increment: f32,
    pub time_increment: f32,
    pub scan_time: f32,
    pub range_min: f32,
    pub range_max: f32,
    pub ranges: Vec<LaserEcho>,
    pub intensities: Vec<LaserEcho>,
}

/// One field of a point cloud cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointField {
    pub name: String,
    pub offset: u32,
    pub datatype: u8,
    pub count: u32,
}

/// Combined point cloud; height = layers, width = samples per layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud2 {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    pub point_step: u32,
    pub row_step: u32,
    pub data: Vec<u8>,
    pub is_dense: bool,
}

/// Point field data types for PointCloud2 messages.
///
/// These values correspond to the ROS sensor_msgs/PointField datatype
/// field. All variants are defined for completeness, even if not all are
/// currently used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(dead_code)]
pub enum PointFieldType {
    INT8 = 1,
    UINT8 = 2,
    INT16 = 3,
    UINT16 = 4,
    INT32 = 5,
    UINT32 = 6,
    FLOAT32 = 7,
    FLOAT64 = 8,
}

/// Build the XYZ + intensity point fields (16-byte stride).
///
/// Returns a vector of PointField definitions for:
/// - x: FLOAT32 at offset 0
/// - y: FLOAT32 at offset 4
/// - z: FLOAT32 at offset 8
/// - intensity: FLOAT32 at offset 12
pub fn cloud_fields() -> Vec<PointField> {
    vec![
        PointField {
            name: String::from("x"),
            offset: 0,
            datatype: PointFieldType::FLOAT32 as u8,
            count: 1,
        },
        PointField {
            name: String::from("y"),
            offset: 4,
            datatype: PointFieldType::FLOAT32 as u8,
            count: 1,
        },
        PointField {
            name: String::from("z"),
            offset: 8,
            datatype: PointFieldType::FLOAT32 as u8,
            count: 1,
        },
        PointField {
            name: String::from("intensity"),
            offset: 12,
            datatype: PointFieldType::FLOAT32 as u8,
            count: 1,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_from_nanos() {
        let t = Time::from_nanos(1_500_000_001);
        assert_eq!(t.sec, 1);
        assert_eq!(t.nanosec, 500_000_001);

        let zero = Time::from_nanos(0);
        assert_eq!(zero.sec, 0);
        assert_eq!(zero.nanosec, 0);
    }

    #[test]
    fn test_cloud_fields_layout() {
        let fields = cloud_fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].name, "x");
        assert_eq!(fields[3].name, "intensity");
        assert_eq!(fields[3].offset, 12);
        for field in &fields {
            assert_eq!(field.datatype, PointFieldType::FLOAT32 as u8);
            assert_eq!(field.count, 1);
        }
        // Fields pack exactly one cell
        assert_eq!(fields[3].offset as usize + 4, POINT_STEP);
    }

    #[test]
    fn test_scan_round_trip_cdr() {
        let scan = LaserScan {
            header: Header {
                stamp: Time::from_nanos(42),
                frame_id: "laser".into(),
            },
            angle_min: -2.4,
            angle_max: 2.4,
            angle_increment: 0.0043,
            time_increment: 3.47e-4,
            scan_time: 0.02,
            range_min: 0.2,
            range_max: 64.0,
            ranges: vec![1.0, 2.0, 3.0],
            intensities: vec![10.0, 20.0, 30.0],
        };

        let bytes = cdr::serialize::<_, _, cdr::CdrLe>(&scan, cdr::Infinite).unwrap();
        let back: LaserScan = cdr::deserialize(&bytes).unwrap();
        assert_eq!(back, scan);
    }
}
