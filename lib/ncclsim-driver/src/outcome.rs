// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Per-scenario call accounting.
//!
//! A call *passes* when it returns the code expected for the communicator it
//! used. It *succeeds* when it returns `ncclSuccess`. Against a null
//! communicator every bound call is expected to fail with
//! `ncclInvalidArgument`, so a run can pass without a single success.
//! Calls to entry points a tracer hooks are also counted as *traced*.

use std::time::Duration;

use ncclsim_common::{NcclResult, RawResult};

use crate::resolver::Op;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioOutcome {
    pub attempted: usize,
    pub passed: usize,
    pub succeeded: usize,
    /// Calls to entry points that produce a tracer event.
    pub traced: usize,
    pub elapsed: Duration,
}

impl ScenarioOutcome {
    /// Count a call that should have returned `expected`. Returns whether it did.
    pub fn record(&mut self, op: Op, ret: RawResult, expected: NcclResult) -> bool {
        let code = NcclResult::from_raw(ret);
        let pass = code == Some(expected);
        self.tally(op, code, pass);
        pass
    }

    /// Count a call for which any defined result code is acceptable.
    pub fn record_known(&mut self, op: Op, ret: RawResult) -> bool {
        let code = NcclResult::from_raw(ret);
        self.tally(op, code, code.is_some());
        code.is_some()
    }

    fn tally(&mut self, op: Op, code: Option<NcclResult>, pass: bool) {
        self.attempted += 1;
        if op.is_traced() {
            self.traced += 1;
        }
        if pass {
            self.passed += 1;
        }
        if code.is_some_and(NcclResult::is_success) {
            self.succeeded += 1;
        }
    }

    /// Fold counts from a sub-task (e.g. one worker thread) into this outcome.
    /// Elapsed time is left to the caller.
    pub fn absorb(&mut self, other: &ScenarioOutcome) {
        self.attempted += other.attempted;
        self.passed += other.passed;
        self.succeeded += other.succeeded;
        self.traced += other.traced;
    }

    /// Calls that reached the library without producing a tracer event.
    pub fn untraced(&self) -> usize {
        self.attempted - self.traced
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.attempted
    }
}

/// A scenario that ran.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub name: &'static str,
    pub outcome: ScenarioOutcome,
}

/// A scenario that was skipped for lack of symbols.
#[derive(Debug, Clone)]
pub struct ScenarioSkip {
    pub name: &'static str,
    pub missing: Vec<Op>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub runs: Vec<ScenarioRun>,
    pub skipped: Vec<ScenarioSkip>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn totals(&self) -> ScenarioOutcome {
        let mut totals = ScenarioOutcome {
            elapsed: self.elapsed,
            ..Default::default()
        };
        for run in &self.runs {
            totals.absorb(&run.outcome);
        }
        totals
    }

    pub fn outcome(&self, name: &str) -> Option<&ScenarioOutcome> {
        self.runs
            .iter()
            .find(|run| run.name == name)
            .map(|run| &run.outcome)
    }

    pub fn was_skipped(&self, name: &str) -> bool {
        self.skipped.iter().any(|skip| skip.name == name)
    }
}
