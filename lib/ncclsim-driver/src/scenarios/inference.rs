// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Small, latency-sensitive all-reduces of a tensor-parallel decode step.

use std::time::Duration;

use ncclsim_common::{ElementType, ReduceOperator};

use super::{Call, Scenario, ScenarioContext, scratch};
use crate::outcome::ScenarioOutcome;
use crate::resolver::Op;

pub const LAYERS: usize = 8;
pub const HIDDEN: usize = 4096;

const DATATYPE: ElementType = ElementType::Float16;
const LAYER_TIME: Duration = Duration::from_millis(1);

pub struct Inference;

impl Scenario for Inference {
    fn name(&self) -> &'static str {
        "inference"
    }

    fn title(&self) -> &'static str {
        "Inference decode step"
    }

    fn required(&self) -> &'static [Op] {
        &[Op::AllReduce]
    }

    fn run(&self, ctx: &ScenarioContext<'_>) -> ScenarioOutcome {
        let mut outcome = ScenarioOutcome::default();
        let mut buf = scratch([(HIDDEN, DATATYPE)]);

        for layer in 0..LAYERS {
            for block in ["attn", "mlp"] {
                let label = format!("layer {layer} {block}");
                let ret = ctx.api.all_reduce(
                    &mut buf,
                    HIDDEN,
                    DATATYPE,
                    ReduceOperator::Sum,
                    ctx.handle(),
                );
                ctx.record_bound(
                    &mut outcome,
                    Call::sized(Op::AllReduce, &label, HIDDEN, DATATYPE),
                    ret,
                );
            }
            ctx.pause(LAYER_TIME);
        }
        outcome
    }
}
