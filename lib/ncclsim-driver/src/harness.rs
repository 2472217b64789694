// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Shared communicator lifecycle around a suite run.

use ncclsim_common::NcclResult;

use crate::config::DriverConfig;
use crate::outcome::RunSummary;
use crate::report::{Reporter, format_code};
use crate::resolver::{NcclApi, Op};
use crate::scenarios::{ScenarioContext, SharedComm, Suite};

/// Communicator shared by every scenario, destroyed on drop.
///
/// When it cannot be created the guard holds a null handle and scenarios run
/// against it, expecting `ncclInvalidArgument` from every bound call.
pub struct CommGuard<'a> {
    api: &'a NcclApi,
    comm: SharedComm,
    live: bool,
}

impl<'a> CommGuard<'a> {
    pub fn establish(api: &'a NcclApi, world_size: i32, rank: i32, report: &Reporter) -> Self {
        let null = Self {
            api,
            comm: SharedComm::null(),
            live: false,
        };

        let Some((ret, id)) = api.get_unique_id() else {
            tracing::warn!("ncclGetUniqueId unavailable; using a null communicator");
            report.line("  ⚠ ncclGetUniqueId unavailable, using a null communicator");
            return null;
        };
        if ret != NcclResult::Success.raw() {
            tracing::warn!(ret, "ncclGetUniqueId failed; using a null communicator");
            report.line(format!(
                "  ⚠ ncclGetUniqueId -> {}, using a null communicator",
                format_code(ret)
            ));
            return null;
        }

        match api.comm_init_rank(world_size, id, rank) {
            Some((ret, comm)) if ret == NcclResult::Success.raw() && !comm.is_null() => {
                tracing::info!(world_size, rank, "shared communicator initialized");
                report.line(format!(
                    "  ✓ shared communicator (nranks={world_size}, rank={rank})"
                ));
                Self {
                    api,
                    comm: SharedComm::new(comm),
                    live: true,
                }
            }
            Some((ret, _)) => {
                tracing::warn!(ret, world_size, rank, "ncclCommInitRank failed; using a null communicator");
                report.line(format!(
                    "  ⚠ ncclCommInitRank -> {}, using a null communicator",
                    format_code(ret)
                ));
                null
            }
            None => {
                tracing::warn!("ncclCommInitRank unavailable; using a null communicator");
                report.line("  ⚠ ncclCommInitRank unavailable, using a null communicator");
                null
            }
        }
    }

    pub fn comm(&self) -> SharedComm {
        self.comm
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for CommGuard<'_> {
    fn drop(&mut self) {
        if !self.live {
            return;
        }
        match self.api.comm_destroy(self.comm.handle()) {
            Some(ret) if ret == NcclResult::Success.raw() => {
                tracing::debug!("shared communicator destroyed");
            }
            Some(ret) => tracing::warn!(ret, "ncclCommDestroy failed for the shared communicator"),
            None => tracing::warn!("ncclCommDestroy unavailable; shared communicator leaked"),
        }
    }
}

/// Print the symbol table, run the standard suite against a shared
/// communicator, and tear the communicator down.
pub fn run(api: &NcclApi, config: &DriverConfig, report: &Reporter) -> RunSummary {
    let missing = api.missing();
    report.section("Resolved entry points");
    report.symbols(&missing);
    if !missing.is_empty() {
        report.line(format!(
            "  {} of {} symbols missing",
            missing.len(),
            Op::ALL.len()
        ));
    }

    report.section("Shared communicator");
    let guard = CommGuard::establish(api, config.world_size, config.rank, report);
    let ctx = ScenarioContext {
        api,
        comm: guard.comm(),
        comm_live: guard.is_live(),
        pacing: config.pacing.clone(),
        report,
    };
    let summary = Suite::standard().run(&ctx);
    drop(guard);
    summary
}
