// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Multi-layer scan and point cloud publisher library.
//!
//! This library acquires per-layer scan frames from a 4-layer scanning
//! range sensor and publishes three synchronized projections: a
//! single-echo scan and a multi-echo scan per layer, plus one combined
//! point cloud per completed sweep cycle.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │ DeviceLink │ ──► │   Supervisor     │ ──► │ LayerSynchronizer│
//! │ (sim/hw)   │     │ (session FSM,    │     │ (cycle alignment)│
//! └────────────┘     │  retry/backoff)  │     └────────┬────────┘
//!                    └──────────────────┘              │
//!                                                      ▼
//!                    ┌──────────────────┐     ┌─────────────────┐
//!                    │   OutputSink     │ ◄── │    Assembler     │
//!                    │ (zenoh channels) │     │ (records, cloud) │
//!                    └──────────────────┘     └─────────────────┘
//! ```
//!
//! The supervisor owns the connection lifecycle: it connects, logs in,
//! configures the data channels, starts continuous measurement and then
//! feeds every frame through the synchronizer. Any session failure tears
//! the connection down and restarts from scratch; cycle state never
//! survives a teardown.
//!
//! The synchronizer maps each frame onto its canonical layer slot,
//! rewinds the shared cloud buffer whenever the cycle-start layer
//! arrives, and emits the combined cloud when the cycle-end layer is
//! observed. Per-layer records are emitted for every frame regardless of
//! cycle state.
//!
//! # Modules
//!
//! - [`scan`]: Common types, the layer-slot mapping, and error handling
//! - [`link`]: Device link traits and scripted test doubles
//! - [`sim`]: Built-in simulated sensor link
//! - [`cloud`]: Pre-allocated cloud buffer with per-row cursors
//! - [`assembler`]: Record templates and output assembly
//! - [`sync`]: Layer synchronization and cycle completion
//! - [`session`]: Session lifecycle supervision
//! - [`sink`]: Output sink trait, zenoh sink, recording sink
//!
//! # Example
//!
//! ```ignore
//! use std::sync::{atomic::AtomicBool, Arc};
//! use mrspub::{session::Supervisor, sim::SimConnector, sink::RecordingSink};
//!
//! let running = Arc::new(AtomicBool::new(true));
//! let mut supervisor = Supervisor::new(
//!     SimConnector::new(),
//!     RecordingSink::new(),
//!     "laser",
//!     running.clone(),
//! );
//! supervisor.run().await;
//! ```

pub mod assembler;
pub mod cloud;
pub mod link;
pub mod msg;
pub mod scan;
pub mod session;
pub mod sim;
pub mod sink;
pub mod sync;

// Re-exports for convenience
pub use assembler::{Assembler, ScanTemplates};
pub use cloud::CloudBuffer;
pub use link::{Connector, DeviceLink, LinkType};
pub use scan::{Error, LayerSlot, ScanFrame};
pub use session::{SessionState, Supervisor};
pub use sink::{OutputSink, RecordingSink, ZenohSink};
pub use sync::LayerSynchronizer;
