// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Session lifecycle supervision.
//!
//! One supervisory loop owns the connection resource and re-enters the
//! session state machine from `Disconnected` on any teardown:
//!
//! ```text
//! Disconnected ──connect──► Connected ──login/configure──► Configured
//!       ▲                                                      │
//!       │                                         start/continuous mode
//!       │                                                      ▼
//!       └────────────── teardown (timeout/shutdown) ◄──── Measuring
//! ```
//!
//! Failure policy: a refused connection retries after a fixed 1 s backoff,
//! indefinitely. Any failure of a live session (setup command or frame
//! read) tears the whole session down and restarts from `Disconnected`
//! after a fixed 10 s backoff; no in-place repair is attempted, so cycle
//! synchronization state is never reused across an unreliable link. The
//! link value is scoped to one pass of the loop and is dropped, releasing
//! the connection, before any backoff or reconnect.
//!
//! Shutdown is cooperative: the shared running flag is polled once per
//! supervisory iteration and once per frame read. Nothing is flushed on
//! exit; an in-flight cycle is discarded.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::time::sleep;

use crate::assembler::{Assembler, ScanTemplates};
use crate::link::{Connector, DeviceLink};
use crate::scan::{EchoFilter, Error, ScanDataConfig};
use crate::sink::OutputSink;
use crate::sync::LayerSynchronizer;

/// Backoff after a refused connection attempt.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Backoff after a live session failed before restarting from scratch.
pub const SCAN_RESTART_DELAY: Duration = Duration::from_secs(10);

/// Session lifecycle states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
    Configured,
    Measuring,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connected => write!(f, "connected"),
            SessionState::Configured => write!(f, "configured"),
            SessionState::Measuring => write!(f, "measuring"),
        }
    }
}

/// How a session ended.
enum SessionEnd {
    /// Shutdown was requested; leave the supervisory loop
    Shutdown,
    /// The session failed; restart after the long backoff
    Failed,
}

/// Owns the session lifecycle: connect, configure, acquire, tear down.
pub struct Supervisor<C, S> {
    connector: C,
    sink: S,
    frame_id: String,
    running: Arc<AtomicBool>,
    state: SessionState,
}

impl<C: Connector, S: OutputSink> Supervisor<C, S> {
    pub fn new(connector: C, sink: S, frame_id: &str, running: Arc<AtomicBool>) -> Self {
        Self {
            connector,
            sink,
            frame_id: frame_id.to_string(),
            running,
            state: SessionState::Disconnected,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run until shutdown is requested.
    ///
    /// Never returns an error: connection failures retry forever and
    /// session failures restart the state machine, per the failure policy
    /// above.
    pub async fn run(&mut self) {
        while self.running.load(Ordering::Relaxed) {
            info!("connecting to sensor");
            let mut link = match self.connector.connect() {
                Ok(link) => link,
                Err(e) => {
                    warn!("unable to connect ({}), retrying", e);
                    sleep(CONNECT_RETRY_DELAY).await;
                    continue;
                }
            };
            self.state = SessionState::Connected;
            info!("connected to sensor");

            let end = self.run_session(&mut link).await;

            // Scoped release: the link is gone before any backoff or
            // reconnect, whichever way the session ended.
            drop(link);
            self.state = SessionState::Disconnected;

            if let SessionEnd::Failed = end {
                sleep(SCAN_RESTART_DELAY).await;
            }
        }

        info!("supervisor stopped");
    }

    /// Drive one connected session to its end.
    async fn run_session(&mut self, link: &mut C::Link) -> SessionEnd {
        let mut synchronizer = match self.establish(link) {
            Ok(synchronizer) => synchronizer,
            Err(e) => {
                error!("session setup failed ({}), reinitializing", e);
                return SessionEnd::Failed;
            }
        };

        info!("started, reading continuous measurements");

        while self.running.load(Ordering::Relaxed) {
            match link.read_frame() {
                Ok(frame) => synchronizer.observe(&frame, &mut self.sink).await,
                Err(e) => {
                    error!("sensor timed out on delivering scan ({}), reinitializing", e);
                    return SessionEnd::Failed;
                }
            }
        }

        SessionEnd::Shutdown
    }

    /// Advance a fresh link to `Measuring` and build the session's
    /// synchronizer from the fetched configuration.
    fn establish(&mut self, link: &mut C::Link) -> Result<LayerSynchronizer, Error> {
        debug!("logging in to sensor");
        link.login()?;

        let cfg = link.scan_config()?;
        let range = link.scan_output_range()?;
        debug!(
            "scan configuration: frequency {}, sectors {}, resolution {}, start {}, stop {}",
            cfg.scan_frequency, cfg.num_sectors, cfg.angular_resolution, cfg.start_angle,
            cfg.stop_angle
        );
        debug!(
            "output range: resolution {}, start {}, stop {}",
            range.angular_resolution, range.start_angle, range.stop_angle
        );

        let templates = ScanTemplates::derive(&cfg, &range, &self.frame_id);

        debug!("setting scan data configuration");
        link.set_scan_data_config(&ScanDataConfig::default())?;
        debug!("setting echo configuration");
        link.set_echo_filter(EchoFilter::AllEchoes)?;
        debug!("setting application mode");
        link.enable_ranging()?;
        link.save_config()?;
        self.state = SessionState::Configured;

        info!("starting device");
        link.start_device()?;
        link.start_measurement()?;
        link.scan_continuous(true)?;
        self.state = SessionState::Measuring;

        Ok(LayerSynchronizer::new(Assembler::new(templates)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Disconnected.to_string(), "disconnected");
        assert_eq!(SessionState::Measuring.to_string(), "measuring");
    }

    #[test]
    fn test_backoff_policy_constants() {
        // The short retry applies to refused connections, the long one to
        // failed sessions; a session restart must out-wait a plain retry.
        assert_eq!(CONNECT_RETRY_DELAY, Duration::from_secs(1));
        assert_eq!(SCAN_RESTART_DELAY, Duration::from_secs(10));
        assert!(SCAN_RESTART_DELAY > CONNECT_RETRY_DELAY);
    }
}
