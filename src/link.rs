// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Device link abstraction for the session loop.
//!
//! The wire protocol (login telegrams, configuration commands, frame
//! decoding) lives behind two traits:
//!
//! - [`Connector`] acquires a connected [`DeviceLink`]. The link value is
//!   the connection resource: dropping it releases the connection, so a
//!   session cannot outlive its link and a teardown always precedes the
//!   next connect attempt.
//! - [`DeviceLink`] exposes the session setup commands and the blocking
//!   frame read, yielding already-parsed [`ScanFrame`] records.
//!
//! This crate bundles a simulated implementation ([`crate::sim`]) and the
//! scripted test doubles below; hardware links implement the same traits
//! out of tree.
//!
//! # Example
//!
//! ```ignore
//! use mrspub::link::{Connector, DeviceLink};
//!
//! let mut link = connector.connect()?;
//! link.login()?;
//! let cfg = link.scan_config()?;
//! // ... configure, start, then read frames
//! let frame = link.read_frame()?;
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use clap::ValueEnum;
use std::fmt;

use crate::scan::{
    EchoFilter, Error, OutputRange, ScanConfig, ScanDataConfig, ScanFrame,
};

/// A connected device session.
///
/// All methods block until the device answers or the link's own timeout
/// expires. Implementations decode the wire protocol; callers only see
/// parsed records. Dropping the link releases the connection.
pub trait DeviceLink: Send {
    /// Authenticate for configuration access.
    fn login(&mut self) -> Result<(), Error>;

    /// Fetch the device's scan configuration.
    fn scan_config(&mut self) -> Result<ScanConfig, Error>;

    /// Fetch the device's output range.
    fn scan_output_range(&mut self) -> Result<OutputRange, Error>;

    /// Write the data-channel configuration.
    fn set_scan_data_config(&mut self, cfg: &ScanDataConfig) -> Result<(), Error>;

    /// Select which echoes the device reports.
    fn set_echo_filter(&mut self, filter: EchoFilter) -> Result<(), Error>;

    /// Enable the ranging application.
    fn enable_ranging(&mut self) -> Result<(), Error>;

    /// Persist the written configuration.
    fn save_config(&mut self) -> Result<(), Error>;

    /// Log out and re-enable the device after configuration.
    fn start_device(&mut self) -> Result<(), Error>;

    /// Start measurement.
    fn start_measurement(&mut self) -> Result<(), Error>;

    /// Switch continuous scan output on or off.
    fn scan_continuous(&mut self, enable: bool) -> Result<(), Error>;

    /// Blocking read of the next scan frame.
    fn read_frame(&mut self) -> Result<ScanFrame, Error>;
}

/// Acquires connected links; owns the retry-relevant endpoint state.
pub trait Connector: Send {
    type Link: DeviceLink;

    /// Attempt one connection to the device.
    fn connect(&mut self) -> Result<Self::Link, Error>;
}

/// Device link selector for CLI dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LinkType {
    /// Built-in simulated sensor
    #[default]
    Sim,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LinkType::Sim => write!(f, "sim"),
        }
    }
}

/// One step served by a [`ScriptedLink`] frame read.
#[derive(Clone, Debug)]
pub enum LinkStep {
    /// Yield this frame
    Frame(ScanFrame),
    /// Fail the read with a timeout
    Fail,
    /// Clear the shared running flag, then fail the read
    Shutdown,
}

/// One scripted connect attempt.
#[derive(Clone, Debug)]
pub enum SessionScript {
    /// The connect attempt fails
    Refuse,
    /// The connect attempt succeeds and the link serves these steps
    Accept(Vec<LinkStep>),
}

/// Observation handle for a scripted connector.
///
/// Records connect attempt times (on the tokio clock, so paused-time
/// tests see exact backoff spacing) and every device command issued, in
/// order, across all sessions.
#[derive(Clone, Default)]
pub struct ScriptLog {
    attempts: Arc<Mutex<Vec<tokio::time::Instant>>>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl ScriptLog {
    /// Times of all connect attempts, successful or not.
    pub fn attempts(&self) -> Vec<tokio::time::Instant> {
        self.attempts.lock().unwrap().clone()
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of times a given call was recorded.
    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == name).count()
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

/// Scripted connector replaying a fixed session sequence.
///
/// When the script is exhausted it clears the shared running flag and
/// refuses further connections, so a supervisor driving it terminates
/// cleanly.
pub struct ScriptedConnector {
    sessions: VecDeque<SessionScript>,
    running: Arc<AtomicBool>,
    log: ScriptLog,
}

impl ScriptedConnector {
    pub fn new(
        sessions: Vec<SessionScript>,
        running: Arc<AtomicBool>,
    ) -> (Self, ScriptLog) {
        let log = ScriptLog::default();
        (
            Self {
                sessions: sessions.into(),
                running,
                log: log.clone(),
            },
            log,
        )
    }
}

impl Connector for ScriptedConnector {
    type Link = ScriptedLink;

    fn connect(&mut self) -> Result<Self::Link, Error> {
        self.log.attempts.lock().unwrap().push(tokio::time::Instant::now());
        self.log.record("connect");

        match self.sessions.pop_front() {
            Some(SessionScript::Refuse) => {
                Err(Error::ConnectFailed("scripted refusal".to_string()))
            }
            Some(SessionScript::Accept(steps)) => Ok(ScriptedLink {
                steps: steps.into(),
                running: Arc::clone(&self.running),
                log: self.log.clone(),
            }),
            None => {
                self.running.store(false, Ordering::Relaxed);
                Err(Error::ConnectFailed("script exhausted".to_string()))
            }
        }
    }
}

/// Link half of [`ScriptedConnector`]: answers every setup command with
/// canned configuration and serves the scripted frame steps.
pub struct ScriptedLink {
    steps: VecDeque<LinkStep>,
    running: Arc<AtomicBool>,
    log: ScriptLog,
}

impl ScriptedLink {
    /// Configuration reported by every scripted link.
    pub fn canned_config() -> (ScanConfig, OutputRange) {
        (
            ScanConfig {
                scan_frequency: 5000,
                num_sectors: 1,
                angular_resolution: 2500,
                start_angle: -1_375_000,
                stop_angle: 1_375_000,
            },
            OutputRange {
                angular_resolution: 2500,
                start_angle: -1_375_000,
                stop_angle: 1_375_000,
            },
        )
    }
}

impl DeviceLink for ScriptedLink {
    fn login(&mut self) -> Result<(), Error> {
        self.log.record("login");
        Ok(())
    }

    fn scan_config(&mut self) -> Result<ScanConfig, Error> {
        self.log.record("scan_config");
        Ok(Self::canned_config().0)
    }

    fn scan_output_range(&mut self) -> Result<OutputRange, Error> {
        self.log.record("scan_output_range");
        Ok(Self::canned_config().1)
    }

    fn set_scan_data_config(&mut self, _cfg: &ScanDataConfig) -> Result<(), Error> {
        self.log.record("set_scan_data_config");
        Ok(())
    }

    fn set_echo_filter(&mut self, _filter: EchoFilter) -> Result<(), Error> {
        self.log.record("set_echo_filter");
        Ok(())
    }

    fn enable_ranging(&mut self) -> Result<(), Error> {
        self.log.record("enable_ranging");
        Ok(())
    }

    fn save_config(&mut self) -> Result<(), Error> {
        self.log.record("save_config");
        Ok(())
    }

    fn start_device(&mut self) -> Result<(), Error> {
        self.log.record("start_device");
        Ok(())
    }

    fn start_measurement(&mut self) -> Result<(), Error> {
        self.log.record("start_measurement");
        Ok(())
    }

    fn scan_continuous(&mut self, _enable: bool) -> Result<(), Error> {
        self.log.record("scan_continuous");
        Ok(())
    }

    fn read_frame(&mut self) -> Result<ScanFrame, Error> {
        match self.steps.pop_front() {
            Some(LinkStep::Frame(frame)) => Ok(frame),
            Some(LinkStep::Fail) => Err(Error::Timeout),
            Some(LinkStep::Shutdown) => {
                self.running.store(false, Ordering::Relaxed);
                Err(Error::Timeout)
            }
            None => {
                self.running.store(false, Ordering::Relaxed);
                Err(Error::Timeout)
            }
        }
    }
}

impl Drop for ScriptedLink {
    fn drop(&mut self) {
        self.log.record("disconnect");
    }
}
