// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Back-to-back all-reduces with no spacing, to check that a tracer keeps up.

use std::time::Instant;

use ncclsim_common::{ElementType, ReduceOperator};

use super::{Call, Scenario, ScenarioContext, scratch};
use crate::outcome::ScenarioOutcome;
use crate::resolver::Op;

pub const CALLS: usize = 100;
pub const FIRST_COUNT: usize = 1024;
pub const COUNT_STEP: usize = 100;

const DATATYPE: ElementType = ElementType::Float32;

/// Element count of the `index`-th burst call.
pub const fn count_at(index: usize) -> usize {
    FIRST_COUNT + COUNT_STEP * index
}

fn call(index: usize, label: &str) -> Call<'_> {
    Call::sized(Op::AllReduce, label, count_at(index), DATATYPE)
}

pub struct Burst;

impl Scenario for Burst {
    fn name(&self) -> &'static str {
        "burst"
    }

    fn title(&self) -> &'static str {
        "High-frequency burst"
    }

    fn required(&self) -> &'static [Op] {
        &[Op::AllReduce]
    }

    fn run(&self, ctx: &ScenarioContext<'_>) -> ScenarioOutcome {
        let mut outcome = ScenarioOutcome::default();
        let mut buf = scratch([(count_at(CALLS - 1), DATATYPE)]);

        ctx.report.line(format!(
            "  {CALLS} x ncclAllReduce, count {}..={}, {DATATYPE}",
            count_at(0),
            count_at(CALLS - 1)
        ));
        let start = Instant::now();
        for index in 0..CALLS {
            let ret = ctx.api.all_reduce(
                &mut buf,
                count_at(index),
                DATATYPE,
                ReduceOperator::Sum,
                ctx.handle(),
            );
            // the two ends anchor the burst in the tracer output
            match index {
                0 => ctx.record_bound(&mut outcome, call(index, "burst first"), ret),
                i if i == CALLS - 1 => ctx.record_bound(&mut outcome, call(index, "burst last"), ret),
                _ => ctx.tally(&mut outcome, Op::AllReduce, ret),
            };
        }
        let elapsed = start.elapsed();

        let average = elapsed / CALLS as u32;
        ctx.report.line(format!(
            "  {} calls in {elapsed:.2?} ({average:.1?} per call)",
            outcome.attempted
        ));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_range() {
        assert_eq!(count_at(0), 1024);
        assert_eq!(count_at(CALLS - 1), 10924);
    }
}
