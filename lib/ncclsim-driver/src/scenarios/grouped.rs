// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! A send/recv pair bracketed by a group.

use ncclsim_common::{ElementType, NcclResult};

use super::{Call, Scenario, ScenarioContext, scratch};
use crate::outcome::ScenarioOutcome;
use crate::resolver::Op;

const COUNT: usize = 4096;
const DATATYPE: ElementType = ElementType::Float16;
const PEER: i32 = 1;

pub struct GroupedPointToPoint;

impl Scenario for GroupedPointToPoint {
    fn name(&self) -> &'static str {
        "grouped"
    }

    fn title(&self) -> &'static str {
        "Grouped send/recv"
    }

    fn required(&self) -> &'static [Op] {
        &[Op::GroupStart, Op::GroupEnd, Op::Send, Op::Recv]
    }

    fn run(&self, ctx: &ScenarioContext<'_>) -> ScenarioOutcome {
        let mut outcome = ScenarioOutcome::default();
        let api = ctx.api;
        let comm = ctx.handle();
        let send_buf = scratch([(COUNT, DATATYPE)]);
        let mut recv_buf = scratch([(COUNT, DATATYPE)]);

        ctx.record(
            &mut outcome,
            Call::new(Op::GroupStart, "open group"),
            api.group_start(),
            NcclResult::Success,
        );
        ctx.record_bound(
            &mut outcome,
            Call::sized(Op::Send, "to peer 1", COUNT, DATATYPE),
            api.send(&send_buf, COUNT, DATATYPE, PEER, comm),
        );
        ctx.record_bound(
            &mut outcome,
            Call::sized(Op::Recv, "from peer 1", COUNT, DATATYPE),
            api.recv(&mut recv_buf, COUNT, DATATYPE, PEER, comm),
        );
        ctx.record(
            &mut outcome,
            Call::new(Op::GroupEnd, "flush group"),
            api.group_end(),
            NcclResult::Success,
        );
        outcome
    }
}
