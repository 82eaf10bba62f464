// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use serde_json::json;
use zenoh::config::{Config, WhatAmI};
use zenoh::prelude::ValidatedMap;

use mrspub::link::LinkType;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Device link implementation.  The built-in `sim` link produces
    /// synthetic frames at the device rate; hardware links are provided
    /// by external crates implementing the link traits.
    #[arg(long, env, default_value = "sim", value_enum)]
    pub link: LinkType,

    /// Sensor hostname or IP address
    #[arg(long, env, default_value = "192.168.1.2")]
    pub host: String,

    /// Sensor command port
    #[arg(long, env, default_value = "2111")]
    pub port: u16,

    /// The name of the laser frame
    #[arg(long, env, default_value = "laser")]
    pub frame_id: String,

    /// Prefix for the scan and cloud output channels
    #[arg(long, env, default_value = "rt")]
    pub topic_prefix: String,

    /// zenoh connection mode
    #[arg(long, env, default_value = "peer")]
    mode: WhatAmI,

    /// connect to zenoh endpoints
    #[arg(long, env)]
    connect: Vec<String>,

    /// listen to zenoh endpoints
    #[arg(long, env)]
    listen: Vec<String>,

    /// disable zenoh multicast scouting
    #[arg(long, env)]
    no_multicast_scouting: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let mut config = Config::default();

        config
            .insert_json5("mode", &json!(args.mode).to_string())
            .unwrap();

        if !args.connect.is_empty() {
            config
                .insert_json5("connect/endpoints", &json!(args.connect).to_string())
                .unwrap();
        }

        if !args.listen.is_empty() {
            config
                .insert_json5("listen/endpoints", &json!(args.listen).to_string())
                .unwrap();
        }

        if args.no_multicast_scouting {
            config
                .insert_json5("scouting/multicast/enabled", &json!(false).to_string())
                .unwrap();
        }

        config
    }
}
