// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Output sink abstraction and the zenoh-backed implementation.
//!
//! The synchronizer publishes through [`OutputSink`], a capability handed
//! in explicitly and scoped to one run. The production sink declares one
//! zenoh publisher per named channel (`scan_layer_2`, `scan_layer_2_multi`,
//! ..., `cloud`) under a configurable prefix and puts CDR-encoded records
//! on them. Publish failures are logged, never propagated: a slow or
//! absent subscriber must not take the acquisition loop down.
//!
//! [`RecordingSink`] captures records in memory for tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use cdr::{CdrLe, Infinite};
use log::{error, trace};
use serde::Serialize;
use zenoh::prelude::r#async::*;

use crate::msg::{
    LaserScan, MultiEchoLaserScan, PointCloud2, LASER_SCAN_TYPE, MULTI_ECHO_SCAN_TYPE,
    POINT_CLOUD_TYPE,
};
use crate::scan::{Error, LayerSlot};

/// Receives the three output projections on named channels.
pub trait OutputSink: Send {
    /// Publish a single-echo record on the slot's scan channel.
    fn publish_scan<'a>(
        &'a mut self,
        slot: LayerSlot,
        scan: &'a LaserScan,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

    /// Publish a multi-echo record on the slot's multi channel.
    fn publish_multi_echo<'a>(
        &'a mut self,
        slot: LayerSlot,
        scan: &'a MultiEchoLaserScan,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

    /// Publish a combined cloud record on the cloud channel.
    fn publish_cloud<'a>(
        &'a mut self,
        cloud: &'a PointCloud2,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Session-lifetime zenoh publisher.
type ChannelPublisher = zenoh::publication::Publisher<'static>;

/// Zenoh-backed sink: one publisher per output channel.
pub struct ZenohSink {
    scan_pubs: Vec<ChannelPublisher>,
    multi_pubs: Vec<ChannelPublisher>,
    cloud_pub: ChannelPublisher,
}

impl ZenohSink {
    /// Declare the publishers for every output channel under `prefix`.
    pub async fn new(session: Arc<zenoh::Session>, prefix: &str) -> Result<Self, Error> {
        let mut scan_pubs = Vec::with_capacity(LayerSlot::all().len());
        let mut multi_pubs = Vec::with_capacity(LayerSlot::all().len());

        for slot in LayerSlot::all() {
            scan_pubs
                .push(Self::declare(&session, format!("{}/{}", prefix, slot.scan_channel())).await?);
        }
        for slot in LayerSlot::all() {
            multi_pubs.push(
                Self::declare(&session, format!("{}/{}", prefix, slot.multi_channel())).await?,
            );
        }
        let cloud_pub = Self::declare(&session, format!("{}/cloud", prefix)).await?;

        Ok(Self {
            scan_pubs,
            multi_pubs,
            cloud_pub,
        })
    }

    async fn declare(
        session: &Arc<zenoh::Session>,
        topic: String,
    ) -> Result<ChannelPublisher, Error> {
        session
            .clone()
            .declare_publisher(topic.clone())
            .priority(Priority::DataHigh)
            .congestion_control(CongestionControl::Drop)
            .res_async()
            .await
            .map_err(|e| Error::Sink(format!("failed to create publisher {}: {}", topic, e)))
    }

    async fn put<T: Serialize>(publisher: &ChannelPublisher, record: &T, type_suffix: &'static str) {
        let payload = match cdr::serialize::<_, _, CdrLe>(record, Infinite) {
            Ok(payload) => payload,
            Err(e) => {
                error!("{} encode error: {}", type_suffix, e);
                return;
            }
        };

        let value = Value::from(payload).encoding(Encoding::WithSuffix(
            KnownEncoding::AppOctetStream,
            type_suffix.into(),
        ));

        match publisher.put(value).res_async().await {
            Ok(_) => trace!("{} message sent on {}", type_suffix, publisher.key_expr()),
            Err(e) => error!("{} message error: {:?}", publisher.key_expr(), e),
        }
    }
}

impl OutputSink for ZenohSink {
    fn publish_scan<'a>(
        &'a mut self,
        slot: LayerSlot,
        scan: &'a LaserScan,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            Self::put(&self.scan_pubs[slot.index()], scan, LASER_SCAN_TYPE).await;
        })
    }

    fn publish_multi_echo<'a>(
        &'a mut self,
        slot: LayerSlot,
        scan: &'a MultiEchoLaserScan,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            Self::put(&self.multi_pubs[slot.index()], scan, MULTI_ECHO_SCAN_TYPE).await;
        })
    }

    fn publish_cloud<'a>(
        &'a mut self,
        cloud: &'a PointCloud2,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            Self::put(&self.cloud_pub, cloud, POINT_CLOUD_TYPE).await;
        })
    }
}

/// Everything a [`RecordingSink`] captured, in emission order per kind.
#[derive(Clone, Debug, Default)]
pub struct RecordedOutputs {
    pub scans: Vec<(LayerSlot, LaserScan)>,
    pub multi_scans: Vec<(LayerSlot, MultiEchoLaserScan)>,
    pub clouds: Vec<PointCloud2>,
}

/// In-memory sink for unit and scenario tests.
///
/// Clones share storage, so a test can keep a handle while the sink
/// itself moves into the supervisor.
#[derive(Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<RecordedOutputs>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn take(&self) -> RecordedOutputs {
        self.inner.lock().unwrap().clone()
    }

    pub fn scan_count(&self) -> usize {
        self.inner.lock().unwrap().scans.len()
    }

    pub fn multi_count(&self) -> usize {
        self.inner.lock().unwrap().multi_scans.len()
    }

    pub fn cloud_count(&self) -> usize {
        self.inner.lock().unwrap().clouds.len()
    }
}

impl OutputSink for RecordingSink {
    fn publish_scan<'a>(
        &'a mut self,
        slot: LayerSlot,
        scan: &'a LaserScan,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.inner.lock().unwrap().scans.push((slot, scan.clone()));
        })
    }

    fn publish_multi_echo<'a>(
        &'a mut self,
        slot: LayerSlot,
        scan: &'a MultiEchoLaserScan,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.inner
                .lock()
                .unwrap()
                .multi_scans
                .push((slot, scan.clone()));
        })
    }

    fn publish_cloud<'a>(
        &'a mut self,
        cloud: &'a PointCloud2,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.inner.lock().unwrap().clouds.push(cloud.clone());
        })
    }
}
