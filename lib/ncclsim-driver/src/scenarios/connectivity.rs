// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Version query and a private communicator round trip.

use ncclsim_common::ffi::decode_version;
use ncclsim_common::{NcclResult, UniqueId};

use super::{Call, Scenario, ScenarioContext};
use crate::outcome::ScenarioOutcome;
use crate::report::format_code;
use crate::resolver::Op;

const PROBE_WORLD_SIZE: i32 = 2;
const PROBE_RANK: i32 = 0;

pub struct Connectivity;

impl Scenario for Connectivity {
    fn name(&self) -> &'static str {
        "connectivity"
    }

    fn title(&self) -> &'static str {
        "Basic connectivity"
    }

    fn required(&self) -> &'static [Op] {
        &[Op::GetVersion, Op::CommInitRank]
    }

    fn run(&self, ctx: &ScenarioContext<'_>) -> ScenarioOutcome {
        let mut outcome = ScenarioOutcome::default();
        let api = ctx.api;

        if let Some((ret, code)) = api.get_version() {
            ctx.record(
                &mut outcome,
                Call::new(Op::GetVersion, "library version"),
                Some(ret),
                NcclResult::Success,
            );
            if ret == NcclResult::Success.raw() {
                let (major, minor, patch) = decode_version(code);
                ctx.report
                    .line(format!("    version {major}.{minor}.{patch} ({code})"));
            }
        }

        // Init may legitimately fail here (e.g. a real NCCL without a device);
        // any defined code counts.
        let id = match api.get_unique_id() {
            Some((ret, id)) if ret == NcclResult::Success.raw() => id,
            _ => UniqueId::default(),
        };
        let Some((ret, comm)) = api.comm_init_rank(PROBE_WORLD_SIZE, id, PROBE_RANK) else {
            return outcome;
        };
        if outcome.record_known(Op::CommInitRank, ret) {
            ctx.report.line(format!(
                "  ✓ {:<18} nranks={PROBE_WORLD_SIZE} rank={PROBE_RANK} -> {}",
                Op::CommInitRank.symbol(),
                format_code(ret)
            ));
        } else {
            ctx.report.line(format!(
                "  ✗ {:<18} returned undefined code {ret}",
                Op::CommInitRank.symbol()
            ));
        }
        if comm.is_null() {
            let reason = api
                .error_string(ret)
                .unwrap_or_else(|| format_code(ret));
            ctx.report
                .line(format!("    no communicator: {reason}"));
            return outcome;
        }

        if let Some((ret, count)) = api.comm_count(comm) {
            let passed = ctx.record(
                &mut outcome,
                Call::new(Op::CommCount, "world size echo"),
                Some(ret),
                NcclResult::Success,
            );
            if passed && count != PROBE_WORLD_SIZE {
                tracing::warn!(count, expected = PROBE_WORLD_SIZE, "communicator reports wrong size");
            }
        }
        if let Some((ret, rank)) = api.comm_user_rank(comm) {
            let passed = ctx.record(
                &mut outcome,
                Call::new(Op::CommUserRank, "rank echo"),
                Some(ret),
                NcclResult::Success,
            );
            if passed && rank != PROBE_RANK {
                tracing::warn!(rank, expected = PROBE_RANK, "communicator reports wrong rank");
            }
        }
        ctx.record(
            &mut outcome,
            Call::new(Op::CommDestroy, "release probe communicator"),
            api.comm_destroy(comm),
            NcclResult::Success,
        );

        outcome
    }
}
