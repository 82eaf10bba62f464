// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Common scan types and the canonical layer mapping.
//!
//! This module provides the sensor-agnostic data model shared by the device
//! link, the layer synchronizer, and the output assembler: parsed scan
//! frames, the device configuration records written during session setup,
//! and the fixed layer-to-slot mapping used to align frames into cycles.

use std::fmt;

/// Number of scan layers (elevation planes) per cycle.
pub const LAYER_COUNT: usize = 4;

/// Angular samples per layer: 275° aperture at 0.25° resolution (+ 1).
pub const SAMPLES_PER_LAYER: usize = 275 * 4 + 1;

/// Minimum measurable range in meters.
pub const RANGE_MIN_M: f32 = 0.2;

/// Maximum measurable range in meters.
pub const RANGE_MAX_M: f32 = 64.0;

/// Layer elevation angles as reported by the sensor, in 1/100 degree.
///
/// The sensor sweeps the four planes in an interleaved order; one cycle
/// starts at the 0.00° plane (layer 2) and ends at the -5.00° plane
/// (layer 4).
pub const LAYER1_ANGLE: i16 = 250;
pub const LAYER2_ANGLE: i16 = 0;
pub const LAYER3_ANGLE: i16 = -250;
pub const LAYER4_ANGLE: i16 = -500;

/// Common error type for link and publisher operations.
#[derive(Debug)]
pub enum Error {
    /// I/O error (socket, file operations)
    Io(std::io::Error),
    /// Device link unreachable
    ConnectFailed(String),
    /// Frame read timed out mid-session
    Timeout,
    /// A device command failed
    Link(String),
    /// Output publisher setup failed
    Sink(String),
    /// System time error
    SystemTime(std::time::SystemTimeError),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::ConnectFailed(msg) => write!(f, "connect failed: {}", msg),
            Error::Timeout => write!(f, "scan read timed out"),
            Error::Link(msg) => write!(f, "link error: {}", msg),
            Error::Sink(msg) => write!(f, "sink error: {}", msg),
            Error::SystemTime(err) => write!(f, "system time error: {}", err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<std::time::SystemTimeError> for Error {
    fn from(err: std::time::SystemTimeError) -> Self {
        Error::SystemTime(err)
    }
}

/// One echo channel of a scan frame.
///
/// Channels are ordered by the sensor's own echo ordering; the first
/// channel is the primary echo used for single-echo output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EchoChannel {
    /// Range per angular bin, meters
    pub ranges: Vec<f32>,
    /// Remission per angular bin
    pub intensities: Vec<f32>,
}

/// One layer's scan as yielded by the device link.
///
/// Angles are device units: elevation in 1/100 degree, azimuth and
/// resolution in 1/10000 degree. Ranges are meters (the link converts the
/// device's millimeter values). Frames are immutable once yielded.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanFrame {
    /// Elevation plane reported by the sensor, 1/100 degree
    pub layer_angle: i16,
    /// Scan frequency, device units (1/100 Hz)
    pub scan_frequency: u32,
    /// Angular resolution, 1/10000 degree
    pub angular_resolution: u32,
    /// First azimuth of the sweep, 1/10000 degree
    pub start_angle: i32,
    /// Last azimuth of the sweep, 1/10000 degree
    pub stop_angle: i32,
    /// Echo channels, primary first; all sized to the frame's sample count
    pub echoes: Vec<EchoChannel>,
    /// Echoes recorded per angular bin
    pub echo_count: Vec<u8>,
    /// Acquisition timestamp, nanoseconds
    pub timestamp: u64,
}

impl ScanFrame {
    /// Angular sample count of this frame.
    pub fn samples(&self) -> usize {
        self.echoes.first().map_or(0, |ch| ch.ranges.len())
    }
}

/// Scan configuration reported by the device.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScanConfig {
    /// Scan frequency, device units (1/100 Hz)
    pub scan_frequency: u32,
    /// Number of configured sectors
    pub num_sectors: u16,
    /// Angular resolution, 1/10000 degree
    pub angular_resolution: u32,
    /// Sector start azimuth, 1/10000 degree
    pub start_angle: i32,
    /// Sector stop azimuth, 1/10000 degree
    pub stop_angle: i32,
}

/// Output range reported by the device.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputRange {
    /// Angular resolution, 1/10000 degree
    pub angular_resolution: u32,
    /// Output start azimuth, 1/10000 degree
    pub start_angle: i32,
    /// Output stop azimuth, 1/10000 degree
    pub stop_angle: i32,
}

/// Data-channel configuration written during session setup.
#[derive(Clone, Copy, Debug)]
pub struct ScanDataConfig {
    /// Output channel mask (1 + 2 + 4 = range, remission, echo)
    pub output_channel: u8,
    /// Enable remission output
    pub remission: bool,
    /// Remission resolution selector (0 = default)
    pub resolution: u8,
    /// Encoder channel selector (0 = off)
    pub encoder: u8,
    /// Include position block
    pub position: bool,
    /// Include device name block
    pub device_name: bool,
    /// Include comment block
    pub comment: bool,
    /// Include timestamp block
    pub timestamp: bool,
    /// Output interval in scans (1 = every scan)
    pub output_interval: u16,
}

impl Default for ScanDataConfig {
    fn default() -> Self {
        Self {
            output_channel: 7,
            remission: true,
            resolution: 0,
            encoder: 0,
            position: false,
            device_name: false,
            comment: false,
            timestamp: true,
            output_interval: 1,
        }
    }
}

/// Echo filter modes supported by the sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum EchoFilter {
    FirstEcho = 0,
    #[default]
    AllEchoes = 1,
    LastEcho = 2,
}

/// Canonical mapping from a layer's elevation angle to its cycle slot.
///
/// Slots follow the sensor's interleaved sweep order, not the geometric
/// order of the planes: a cycle begins at layer 2 (slot 0) and ends at
/// layer 4 (slot 3). The slot value doubles as the row index into the
/// point cloud buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum LayerSlot {
    Layer2 = 0,
    Layer3 = 1,
    Layer1 = 2,
    Layer4 = 3,
}

impl LayerSlot {
    /// Map a reported layer angle to its slot.
    ///
    /// Total and deterministic: unrecognized angles map to slot 0. This
    /// mirrors the device driver's historical behavior and means a frame
    /// with a corrupt layer angle lands on layer 2's row rather than
    /// being rejected.
    pub fn classify(layer_angle: i16) -> Self {
        match layer_angle {
            LAYER2_ANGLE => LayerSlot::Layer2,
            LAYER3_ANGLE => LayerSlot::Layer3,
            LAYER1_ANGLE => LayerSlot::Layer1,
            LAYER4_ANGLE => LayerSlot::Layer4,
            _ => LayerSlot::Layer2,
        }
    }

    /// Whether an angle is one of the four known planes.
    pub fn is_known(layer_angle: i16) -> bool {
        matches!(
            layer_angle,
            LAYER1_ANGLE | LAYER2_ANGLE | LAYER3_ANGLE | LAYER4_ANGLE
        )
    }

    /// Row index of this slot in the cloud buffer.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Elevation angle of this slot's plane, 1/100 degree.
    pub const fn layer_angle(self) -> i16 {
        match self {
            LayerSlot::Layer2 => LAYER2_ANGLE,
            LayerSlot::Layer3 => LAYER3_ANGLE,
            LayerSlot::Layer1 => LAYER1_ANGLE,
            LayerSlot::Layer4 => LAYER4_ANGLE,
        }
    }

    /// Whether this slot opens a cycle.
    #[inline]
    pub const fn is_cycle_start(self) -> bool {
        matches!(self, LayerSlot::Layer2)
    }

    /// Whether this slot closes a cycle.
    #[inline]
    pub const fn is_cycle_end(self) -> bool {
        matches!(self, LayerSlot::Layer4)
    }

    /// All slots in cycle order.
    pub const fn all() -> [LayerSlot; LAYER_COUNT] {
        [
            LayerSlot::Layer2,
            LayerSlot::Layer3,
            LayerSlot::Layer1,
            LayerSlot::Layer4,
        ]
    }

    /// Scan channel name for this slot, e.g. `scan_layer_2`.
    pub const fn scan_channel(self) -> &'static str {
        match self {
            LayerSlot::Layer2 => "scan_layer_2",
            LayerSlot::Layer3 => "scan_layer_3",
            LayerSlot::Layer1 => "scan_layer_1",
            LayerSlot::Layer4 => "scan_layer_4",
        }
    }

    /// Multi-echo channel name for this slot, e.g. `scan_layer_2_multi`.
    pub const fn multi_channel(self) -> &'static str {
        match self {
            LayerSlot::Layer2 => "scan_layer_2_multi",
            LayerSlot::Layer3 => "scan_layer_3_multi",
            LayerSlot::Layer1 => "scan_layer_1_multi",
            LayerSlot::Layer4 => "scan_layer_4_multi",
        }
    }
}

impl fmt::Display for LayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LayerSlot::Layer2 => write!(f, "layer 2"),
            LayerSlot::Layer3 => write!(f, "layer 3"),
            LayerSlot::Layer1 => write!(f, "layer 1"),
            LayerSlot::Layer4 => write!(f, "layer 4"),
        }
    }
}

/// Get current timestamp in nanoseconds.
///
/// On Linux, uses `CLOCK_MONOTONIC_RAW` for best accuracy.
/// On other platforms, falls back to `SystemTime`.
#[cfg(target_os = "linux")]
pub fn timestamp() -> Result<u64, Error> {
    let mut tp = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let err = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC_RAW, &mut tp) };
    if err != 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    Ok(tp.tv_sec as u64 * 1_000_000_000 + tp.tv_nsec as u64)
}

#[cfg(not(target_os = "linux"))]
pub fn timestamp() -> Result<u64, Error> {
    let now = std::time::SystemTime::now();
    let duration = now.duration_since(std::time::UNIX_EPOCH)?;
    Ok(duration.as_nanos() as u64)
}
