// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use ncclsim_driver::config::{CONFIG_PATH_ENV, DriverConfig};
use ncclsim_driver::report::ProcessIdentity;
use ncclsim_driver::resolver::{self, NcclLibrary};
use ncclsim_driver::{Reporter, harness, logging};

#[derive(Parser)]
#[command(
    name = "ncclsim-driver",
    about = "Exercise an NCCL-compatible library so a uprobe tracer can be validated"
)]
struct Cli {
    /// Shared library to load (default: ./libncclsim.so, then system NCCL)
    library: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Group size of the shared communicator
    #[arg(long)]
    world_size: Option<i32>,

    /// Rank of this process in the shared communicator
    #[arg(long)]
    rank: Option<i32>,

    /// Multiplier for the sleeps between calls (0 disables them)
    #[arg(long)]
    pace: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    let mut figment = DriverConfig::figment_for(cli.config.as_deref());
    if let Some(world_size) = cli.world_size {
        figment = figment.merge(("world_size", world_size));
    }
    if let Some(rank) = cli.rank {
        figment = figment.merge(("rank", rank));
    }
    if let Some(pace) = cli.pace {
        figment = figment.merge(("pacing.scale", pace));
    }
    let config = DriverConfig::extract_from(figment).context("invalid driver configuration")?;

    let path = resolver::locate(cli.library.as_deref(), &config.library);
    tracing::info!(
        library = %path.display(),
        world_size = config.world_size,
        rank = config.rank,
        pace = config.pacing.scale,
        "starting NCCL scenario driver"
    );

    // SAFETY: the library is loaded for the purpose of calling its NCCL
    // exports, which are trusted to match their nccl.h signatures.
    let library = unsafe { NcclLibrary::open(&path) }.with_context(|| {
        format!(
            "cannot load {} (build the synthetic library with `cargo build -p ncclsim` or pass a path)",
            path.display()
        )
    })?;

    let report = Reporter::stdout();
    report.section("NCCL scenario driver");
    report.line(format!("  library: {}", library.path().display()));
    report.line(format!(
        "  resolved {} of {} symbols",
        library.resolved().len(),
        library.resolved().len() + library.missing().len()
    ));

    let summary = harness::run(library.api(), &config, &report);
    report.summary(&summary, &ProcessIdentity::current());
    Ok(())
}
