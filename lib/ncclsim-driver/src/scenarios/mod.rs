// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Scenarios exercising the resolved entry points.
//!
//! Each scenario issues a fixed, documented sequence of calls so that a tracer
//! attached to the library can be checked event by event against the report.
//! Scenarios run one after another on the calling thread; only
//! [`concurrency`] fans out, and it joins its workers before returning.

use std::time::{Duration, Instant};

use ncclsim_common::{CommHandle, ElementType, NcclResult, RawResult};

use crate::config::PacingConfig;
use crate::outcome::{RunSummary, ScenarioOutcome, ScenarioRun, ScenarioSkip};
use crate::report::{CallLine, Reporter};
use crate::resolver::{NcclApi, Op};

pub mod burst;
pub mod concurrency;
pub mod connectivity;
pub mod coverage;
pub mod grouped;
pub mod inference;
pub mod training;

/// A communicator handle that may be handed to worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedComm(CommHandle);

// SAFETY: the handle is an opaque token owned by the library, which validates
// it on every call; the driver never dereferences it.
unsafe impl Send for SharedComm {}
unsafe impl Sync for SharedComm {}

impl SharedComm {
    pub fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    pub fn new(handle: CommHandle) -> Self {
        Self(handle)
    }

    pub fn handle(self) -> CommHandle {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

/// Everything a scenario may touch.
pub struct ScenarioContext<'a> {
    pub api: &'a NcclApi,
    pub comm: SharedComm,
    /// Whether `comm` is a live communicator rather than a null fallback.
    pub comm_live: bool,
    pub pacing: PacingConfig,
    pub report: &'a Reporter,
}

/// Description of one call, for the report.
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    pub op: Op,
    pub label: &'a str,
    pub count: usize,
    pub datatype: Option<ElementType>,
}

impl<'a> Call<'a> {
    pub fn new(op: Op, label: &'a str) -> Self {
        Self {
            op,
            label,
            count: 0,
            datatype: None,
        }
    }

    pub fn sized(op: Op, label: &'a str, count: usize, datatype: ElementType) -> Self {
        Self {
            op,
            label,
            count,
            datatype: Some(datatype),
        }
    }
}

impl ScenarioContext<'_> {
    /// Code a communicator-bound call should return.
    pub fn expected(&self) -> NcclResult {
        if self.comm_live {
            NcclResult::Success
        } else {
            NcclResult::InvalidArgument
        }
    }

    pub fn handle(&self) -> CommHandle {
        self.comm.handle()
    }

    /// Sleep for `nominal` scaled by the configured pacing.
    pub fn pause(&self, nominal: Duration) {
        let scaled = self.pacing.scaled(nominal);
        if !scaled.is_zero() {
            std::thread::sleep(scaled);
        }
    }

    /// Count a call and print it. `None` means the symbol was unavailable and
    /// nothing was issued.
    pub fn record(
        &self,
        outcome: &mut ScenarioOutcome,
        call: Call<'_>,
        ret: Option<RawResult>,
        expected: NcclResult,
    ) -> bool {
        let Some(ret) = ret else {
            tracing::debug!(symbol = call.op.symbol(), "not issued: symbol unavailable");
            return false;
        };
        let passed = outcome.record(call.op, ret, expected);
        if !passed {
            tracing::warn!(
                symbol = call.op.symbol(),
                label = call.label,
                ret,
                %expected,
                "unexpected result"
            );
        }
        self.report.call(&CallLine {
            op: call.op,
            label: call.label,
            count: call.count,
            datatype: call.datatype,
            ret,
            passed,
        });
        passed
    }

    /// [`record`](Self::record) a communicator-bound call.
    pub fn record_bound(
        &self,
        outcome: &mut ScenarioOutcome,
        call: Call<'_>,
        ret: Option<RawResult>,
    ) -> bool {
        self.record(outcome, call, ret, self.expected())
    }

    /// Count a communicator-bound call without printing it.
    pub fn tally(&self, outcome: &mut ScenarioOutcome, op: Op, ret: Option<RawResult>) -> bool {
        match ret {
            Some(ret) => outcome.record(op, ret, self.expected()),
            None => {
                tracing::debug!(symbol = op.symbol(), "not issued: symbol unavailable");
                false
            }
        }
    }
}

/// Zeroed host buffer large enough for every `(count, datatype)` in `calls`.
pub fn scratch<I>(calls: I) -> Vec<u8>
where
    I: IntoIterator<Item = (usize, ElementType)>,
{
    let bytes = calls
        .into_iter()
        .map(|(count, ty)| ty.bytes_for(count))
        .max()
        .unwrap_or(0);
    vec![0u8; bytes]
}

pub trait Scenario: Send + Sync {
    /// Short identifier used in logs and the summary.
    fn name(&self) -> &'static str;

    /// Heading printed before the scenario runs.
    fn title(&self) -> &'static str;

    /// Entry points without which the scenario is skipped.
    fn required(&self) -> &'static [Op];

    fn run(&self, ctx: &ScenarioContext<'_>) -> ScenarioOutcome;
}

/// Ordered list of scenarios.
pub struct Suite {
    scenarios: Vec<Box<dyn Scenario>>,
}

impl Suite {
    pub fn new(scenarios: Vec<Box<dyn Scenario>>) -> Self {
        Self { scenarios }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(connectivity::Connectivity),
            Box::new(coverage::DatatypeCoverage),
            Box::new(coverage::OperatorCoverage),
            Box::new(coverage::CollectiveCoverage),
            Box::new(grouped::GroupedPointToPoint),
            Box::new(training::TrainingReplay),
            Box::new(burst::Burst),
            Box::new(concurrency::Concurrency),
            Box::new(inference::Inference),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.scenarios.iter().map(|s| s.name()).collect()
    }

    /// Run every scenario in order, skipping those whose required entry
    /// points did not resolve.
    pub fn run(&self, ctx: &ScenarioContext<'_>) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::default();

        for scenario in &self.scenarios {
            let name = scenario.name();
            let missing: Vec<Op> = scenario
                .required()
                .iter()
                .copied()
                .filter(|op| !ctx.api.has(&[*op]))
                .collect();

            ctx.report.section(scenario.title());
            if !missing.is_empty() {
                let symbols: Vec<_> = missing.iter().map(|op| op.symbol()).collect();
                tracing::warn!(scenario = name, missing = ?symbols, "skipping scenario");
                ctx.report
                    .line(format!("  ⚠ skipped: missing {}", symbols.join(", ")));
                summary.skipped.push(ScenarioSkip { name, missing });
                continue;
            }

            tracing::info!(scenario = name, comm_live = ctx.comm_live, "starting scenario");
            let begin = Instant::now();
            let mut outcome = scenario.run(ctx);
            outcome.elapsed = begin.elapsed();
            tracing::info!(
                scenario = name,
                attempted = outcome.attempted,
                passed = outcome.passed,
                succeeded = outcome.succeeded,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "finished scenario"
            );
            ctx.report.line(format!(
                "  {}/{} calls passed in {:.2?}",
                outcome.passed, outcome.attempted, outcome.elapsed
            ));
            summary.runs.push(ScenarioRun { name, outcome });
        }

        summary.elapsed = started.elapsed();
        summary
    }
}
