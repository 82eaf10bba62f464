// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Multi-layer scan publisher binary.
//!
//! Wires a device link to the zenoh output sink and hands both to the
//! session supervisor. The supervisor runs until Ctrl-C, reconnecting
//! and restarting sessions on its own; this binary only does the one-time
//! setup.

mod args;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::{debug, info};
use zenoh::prelude::r#async::*;

use args::Args;
use mrspub::link::LinkType;
use mrspub::session::Supervisor;
use mrspub::sim::SimConnector;
use mrspub::sink::ZenohSink;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    env_logger::init();

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                running.store(false, Ordering::Relaxed);
            }
        });
    }

    let session = zenoh::open(zenoh::config::Config::from(args.clone()))
        .res_async()
        .await?
        .into_arc();
    debug!("opened zenoh session");

    let sink = ZenohSink::new(session, &args.topic_prefix).await?;

    match args.link {
        LinkType::Sim => {
            info!(
                "using simulated sensor link ({}:{} not contacted)",
                args.host, args.port
            );
            let connector = SimConnector::new();
            Supervisor::new(connector, sink, &args.frame_id, running)
                .run()
                .await;
        }
    }

    Ok(())
}
