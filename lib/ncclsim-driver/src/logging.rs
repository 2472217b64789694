// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Driver logging.
//!
//! Logs go to stderr so the scenario report on stdout stays clean.
//!
//! - `NCCLSIM_LOG`: filter directives, e.g. `debug` or
//!   `ncclsim_driver::resolver=trace` (default `info`)
//! - `NCCLSIM_LOGGING_JSONL`: one JSON object per line
//! - `NCCLSIM_LOGGING_NO_ANSI`: plain text without colours

use std::sync::Once;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};

const FILTER_ENV: &str = "NCCLSIM_LOG";

const JSONL_ENV: &str = "NCCLSIM_LOGGING_JSONL";

const NO_ANSI_ENV: &str = "NCCLSIM_LOGGING_NO_ANSI";

/// Once instance to ensure the logger is only initialized once
static INIT: Once = Once::new();

pub fn init() {
    INIT.call_once(setup_logging);
}

fn setup_logging() {
    let filter_layer = filters();
    let result = if env_is_truthy(JSONL_ENV) {
        let l = fmt::layer()
            .json()
            .with_ansi(false)
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .with_filter(filter_layer);
        tracing_subscriber::registry().with(l).try_init()
    } else {
        let l = fmt::layer()
            .compact()
            .with_ansi(!env_is_truthy(NO_ANSI_ENV))
            .with_writer(std::io::stderr)
            .with_filter(filter_layer);
        tracing_subscriber::registry().with(l).try_init()
    };
    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}

fn filters() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(FILTER_ENV)
        .from_env_lossy()
}

fn env_is_truthy(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
