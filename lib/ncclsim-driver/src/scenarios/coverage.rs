// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Datatype, operator and collective coverage.
//!
//! One call per case, spaced out so a tracer sees distinct events.

use std::time::Duration;

use ncclsim_common::{ElementType, ReduceOperator};

use super::{Call, Scenario, ScenarioContext, scratch};
use crate::outcome::ScenarioOutcome;
use crate::resolver::Op;

/// Nominal gap between coverage calls.
pub const CALL_SPACING: Duration = Duration::from_millis(50);

/// One all-reduce per element type, with counts that tell them apart.
pub const DATATYPE_CASES: [(ElementType, usize, &str); 9] = [
    (ElementType::Float32, 1024, "fp32 gradients"),
    (ElementType::Float16, 2048, "mixed precision"),
    (ElementType::Bfloat16, 4096, "bf16 training"),
    (ElementType::Float64, 512, "fp64 reference"),
    (ElementType::Int8, 8192, "quantized weights"),
    (ElementType::Int32, 1024, "index tensor"),
    (ElementType::Int64, 256, "large indices"),
    (ElementType::Uint32, 3072, "token ids"),
    (ElementType::Uint64, 768, "hash keys"),
];

pub const OPERATOR_COUNT: usize = 1024;

pub struct DatatypeCoverage;

impl Scenario for DatatypeCoverage {
    fn name(&self) -> &'static str {
        "datatypes"
    }

    fn title(&self) -> &'static str {
        "Datatype coverage (AllReduce, sum)"
    }

    fn required(&self) -> &'static [Op] {
        &[Op::AllReduce]
    }

    fn run(&self, ctx: &ScenarioContext<'_>) -> ScenarioOutcome {
        let mut outcome = ScenarioOutcome::default();
        let mut buf = scratch(DATATYPE_CASES.map(|(ty, count, _)| (count, ty)));

        for (ty, count, label) in DATATYPE_CASES {
            let ret = ctx
                .api
                .all_reduce(&mut buf, count, ty, ReduceOperator::Sum, ctx.handle());
            ctx.record_bound(
                &mut outcome,
                Call::sized(Op::AllReduce, label, count, ty),
                ret,
            );
            ctx.pause(CALL_SPACING);
        }
        outcome
    }
}

pub struct OperatorCoverage;

impl Scenario for OperatorCoverage {
    fn name(&self) -> &'static str {
        "operators"
    }

    fn title(&self) -> &'static str {
        "Reduction operator coverage (AllReduce, Float32)"
    }

    fn required(&self) -> &'static [Op] {
        &[Op::AllReduce]
    }

    fn run(&self, ctx: &ScenarioContext<'_>) -> ScenarioOutcome {
        let mut outcome = ScenarioOutcome::default();
        let ty = ElementType::Float32;
        let mut buf = scratch([(OPERATOR_COUNT, ty)]);

        for op in ReduceOperator::ALL {
            let ret = ctx
                .api
                .all_reduce(&mut buf, OPERATOR_COUNT, ty, op, ctx.handle());
            ctx.record_bound(
                &mut outcome,
                Call::sized(Op::AllReduce, op.name(), OPERATOR_COUNT, ty),
                ret,
            );
            ctx.pause(CALL_SPACING);
        }
        outcome
    }
}

pub struct CollectiveCoverage;

impl CollectiveCoverage {
    const BROADCAST: (usize, ElementType) = (2048, ElementType::Float32);
    const ALL_GATHER: (usize, ElementType) = (4096, ElementType::Float16);
    const REDUCE_SCATTER: (usize, ElementType) = (1024, ElementType::Bfloat16);
    const POINT_TO_POINT: (usize, ElementType) = (512, ElementType::Float32);
    const REDUCE: (usize, ElementType) = (1536, ElementType::Float32);
    const ALL_TO_ALL: (usize, ElementType) = (768, ElementType::Int32);
}

impl Scenario for CollectiveCoverage {
    fn name(&self) -> &'static str {
        "collectives"
    }

    fn title(&self) -> &'static str {
        "Collective coverage"
    }

    fn required(&self) -> &'static [Op] {
        &[
            Op::AllReduce,
            Op::Broadcast,
            Op::AllGather,
            Op::ReduceScatter,
            Op::Send,
            Op::Recv,
        ]
    }

    fn run(&self, ctx: &ScenarioContext<'_>) -> ScenarioOutcome {
        let mut outcome = ScenarioOutcome::default();
        let api = ctx.api;
        let comm = ctx.handle();
        let mut buf = scratch([
            Self::BROADCAST,
            Self::ALL_GATHER,
            Self::REDUCE_SCATTER,
            Self::POINT_TO_POINT,
            Self::REDUCE,
            Self::ALL_TO_ALL,
        ]);

        let (count, ty) = Self::BROADCAST;
        ctx.record_bound(
            &mut outcome,
            Call::sized(Op::Broadcast, "root 0", count, ty),
            api.broadcast(&mut buf, count, ty, 0, comm),
        );
        ctx.pause(CALL_SPACING);

        let (count, ty) = Self::ALL_GATHER;
        ctx.record_bound(
            &mut outcome,
            Call::sized(Op::AllGather, "gather shards", count, ty),
            api.all_gather(&mut buf, count, ty, comm),
        );
        ctx.pause(CALL_SPACING);

        let (count, ty) = Self::REDUCE_SCATTER;
        ctx.record_bound(
            &mut outcome,
            Call::sized(Op::ReduceScatter, "sum", count, ty),
            api.reduce_scatter(&mut buf, count, ty, ReduceOperator::Sum, comm),
        );
        ctx.pause(CALL_SPACING);

        let (count, ty) = Self::POINT_TO_POINT;
        ctx.record_bound(
            &mut outcome,
            Call::sized(Op::Send, "to peer 1", count, ty),
            api.send(&buf, count, ty, 1, comm),
        );
        ctx.pause(CALL_SPACING);

        ctx.record_bound(
            &mut outcome,
            Call::sized(Op::Recv, "from peer 0", count, ty),
            api.recv(&mut buf, count, ty, 0, comm),
        );

        if api.has(&[Op::Reduce]) {
            ctx.pause(CALL_SPACING);
            let (count, ty) = Self::REDUCE;
            ctx.record_bound(
                &mut outcome,
                Call::sized(Op::Reduce, "max to root 0", count, ty),
                api.reduce(&mut buf, count, ty, ReduceOperator::Max, 0, comm),
            );
        }
        if api.has(&[Op::AllToAll]) {
            ctx.pause(CALL_SPACING);
            let (count, ty) = Self::ALL_TO_ALL;
            ctx.record_bound(
                &mut outcome,
                Call::sized(Op::AllToAll, "exchange", count, ty),
                api.all_to_all(&mut buf, count, ty, comm),
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_datatype_covered_once() {
        let covered: HashSet<_> = DATATYPE_CASES.iter().map(|(ty, _, _)| *ty).collect();
        assert_eq!(covered.len(), DATATYPE_CASES.len());
        assert!(ElementType::ALL.iter().all(|ty| covered.contains(ty)));
    }
}
