// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Traffic shape of one tensor-parallel training step on a 70B-class model.
//!
//! ```text
//! forward   4 x AllReduce  activations  8192 x 2048   bf16
//! backward  group { AllReduce per gradient tensor }    bf16, capped
//! sync      Broadcast      weights      8192 x 8192   bf16, root 0
//! ```

use std::time::Duration;

use ncclsim_common::{ElementType, NcclResult, ReduceOperator};

use super::{Call, Scenario, ScenarioContext, scratch};
use crate::outcome::ScenarioOutcome;
use crate::resolver::Op;

const DATATYPE: ElementType = ElementType::Bfloat16;

const HIDDEN: usize = 8192;
const SEQUENCE: usize = 2048;
const INTERMEDIATE: usize = 28672;
const VOCAB: usize = 32000;

pub const FORWARD_LAYERS: usize = 4;
pub const ACTIVATION_COUNT: usize = HIDDEN * SEQUENCE;
pub const WEIGHT_SYNC_COUNT: usize = HIDDEN * HIDDEN;

/// Largest gradient all-reduce issued, in elements.
pub const GRADIENT_CAP: usize = 16 * 1024 * 1024;

pub const GRADIENTS: [(&str, usize); 5] = [
    ("embed_tokens", VOCAB * HIDDEN),
    ("self_attn.qkv", HIDDEN * HIDDEN * 3),
    ("self_attn.o_proj", HIDDEN * HIDDEN),
    ("mlp.gate_proj", HIDDEN * INTERMEDIATE),
    ("mlp.down_proj", INTERMEDIATE * HIDDEN),
];

const LAYER_GAP: Duration = Duration::from_millis(10);
const GRADIENT_GAP: Duration = Duration::from_millis(5);

pub struct TrainingReplay;

impl Scenario for TrainingReplay {
    fn name(&self) -> &'static str {
        "training"
    }

    fn title(&self) -> &'static str {
        "Training step replay"
    }

    fn required(&self) -> &'static [Op] {
        &[Op::AllReduce, Op::Broadcast, Op::GroupStart, Op::GroupEnd]
    }

    fn run(&self, ctx: &ScenarioContext<'_>) -> ScenarioOutcome {
        let mut outcome = ScenarioOutcome::default();
        let api = ctx.api;
        let comm = ctx.handle();
        let mut buf = scratch(
            [ACTIVATION_COUNT, WEIGHT_SYNC_COUNT, GRADIENT_CAP].map(|count| (count, DATATYPE)),
        );

        ctx.report.line("  forward pass");
        for layer in 0..FORWARD_LAYERS {
            let label = format!("layer {layer} activations");
            ctx.record_bound(
                &mut outcome,
                Call::sized(Op::AllReduce, &label, ACTIVATION_COUNT, DATATYPE),
                api.all_reduce(&mut buf, ACTIVATION_COUNT, DATATYPE, ReduceOperator::Sum, comm),
            );
            ctx.pause(LAYER_GAP);
        }

        ctx.report.line("  backward pass");
        ctx.record(
            &mut outcome,
            Call::new(Op::GroupStart, "gradient bucket"),
            api.group_start(),
            NcclResult::Success,
        );
        for (name, elements) in GRADIENTS {
            let count = elements.min(GRADIENT_CAP);
            ctx.record_bound(
                &mut outcome,
                Call::sized(Op::AllReduce, name, count, DATATYPE),
                api.all_reduce(&mut buf, count, DATATYPE, ReduceOperator::Sum, comm),
            );
            ctx.pause(GRADIENT_GAP);
        }
        ctx.record(
            &mut outcome,
            Call::new(Op::GroupEnd, "gradient bucket"),
            api.group_end(),
            NcclResult::Success,
        );

        ctx.report.line("  weight sync");
        ctx.record_bound(
            &mut outcome,
            Call::sized(Op::Broadcast, "weights from root 0", WEIGHT_SYNC_COUNT, DATATYPE),
            api.broadcast(&mut buf, WEIGHT_SYNC_COUNT, DATATYPE, 0, comm),
        );
        outcome
    }
}
