// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! All-reduces issued from several OS threads at once.
//!
//! A tracer must attribute each event to the thread that issued it, so every
//! worker reports its kernel thread id alongside its counts.

use std::time::Duration;

use ncclsim_common::{ElementType, ReduceOperator};

use super::{Scenario, ScenarioContext, scratch};
use crate::outcome::ScenarioOutcome;
use crate::pool::WorkerPool;
use crate::report::current_tid;
use crate::resolver::Op;

pub const WORKERS: usize = 4;
pub const CALLS_PER_WORKER: usize = 10;

const DATATYPE: ElementType = ElementType::Float32;

/// Element count of call `index` on worker `worker`.
pub const fn count_for(worker: usize, index: usize) -> usize {
    (worker + 1) * 1000 + index * 100
}

/// Nominal gap between calls on worker `worker`.
pub fn spacing_for(worker: usize) -> Duration {
    Duration::from_millis(10) + Duration::from_millis(5) * worker as u32
}

struct WorkerReport {
    name: String,
    tid: i64,
    outcome: ScenarioOutcome,
}

pub struct Concurrency;

impl Scenario for Concurrency {
    fn name(&self) -> &'static str {
        "concurrency"
    }

    fn title(&self) -> &'static str {
        "Multi-threaded issue"
    }

    fn required(&self) -> &'static [Op] {
        &[Op::AllReduce]
    }

    fn run(&self, ctx: &ScenarioContext<'_>) -> ScenarioOutcome {
        let mut outcome = ScenarioOutcome::default();
        let pool = WorkerPool::new("nccl-worker", WORKERS);
        let api = ctx.api;
        let comm = ctx.comm;

        let reports = pool.run(|worker| {
            let mut local = ScenarioOutcome::default();
            let mut buf = scratch([(count_for(worker, CALLS_PER_WORKER - 1), DATATYPE)]);
            for index in 0..CALLS_PER_WORKER {
                let count = count_for(worker, index);
                let ret = api.all_reduce(&mut buf, count, DATATYPE, ReduceOperator::Sum, comm.handle());
                ctx.tally(&mut local, Op::AllReduce, ret);
                ctx.pause(spacing_for(worker));
            }
            WorkerReport {
                name: pool.worker_name(worker),
                tid: current_tid(),
                outcome: local,
            }
        });

        match reports {
            Ok(reports) => {
                for report in &reports {
                    ctx.report.line(format!(
                        "  {} tid={} calls={} passed={}",
                        report.name, report.tid, report.outcome.attempted, report.outcome.passed
                    ));
                    outcome.absorb(&report.outcome);
                }
                ctx.report.line(format!(
                    "  {}/{} threads joined, {} calls",
                    reports.len(),
                    pool.size(),
                    outcome.attempted
                ));
            }
            Err(e) => {
                tracing::error!(error = %e, "worker pool failed");
                ctx.report.line(format!("  ✗ {e}"));
            }
        }
        outcome
    }
}
