// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Console report.
//!
//! The report is the driver's product: one line per call with the values a
//! tracer should capture, and a closing summary the tracer's output can be
//! checked against. Structured diagnostics go through `tracing` instead.

use std::io::{self, Write};

use bytesize::ByteSize;
use ncclsim_common::{ElementType, NcclResult, RawResult};
use parking_lot::Mutex;

use crate::outcome::RunSummary;
use crate::resolver::Op;

/// Kernel `TASK_COMM_LEN` minus the terminating NUL.
pub const TASK_COMM_BYTES: usize = 15;

const RULE: &str = "==============================================================";

enum Sink {
    Stdout(io::Stdout),
    Buffer(Vec<u8>),
    Discard,
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Stdout(out) => out.write(buf),
            Sink::Buffer(bytes) => bytes.write(buf),
            Sink::Discard => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Stdout(out) => out.flush(),
            _ => Ok(()),
        }
    }
}

/// Thread-safe line writer for the report.
pub struct Reporter {
    sink: Mutex<Sink>,
}

impl Reporter {
    pub fn stdout() -> Self {
        Self::with_sink(Sink::Stdout(io::stdout()))
    }

    /// Keep the report in memory; see [`Reporter::take_output`].
    pub fn buffered() -> Self {
        Self::with_sink(Sink::Buffer(Vec::new()))
    }

    pub fn discard() -> Self {
        Self::with_sink(Sink::Discard)
    }

    fn with_sink(sink: Sink) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Drain what a buffered reporter has collected so far.
    pub fn take_output(&self) -> String {
        match &mut *self.sink.lock() {
            Sink::Buffer(bytes) => String::from_utf8_lossy(&std::mem::take(bytes)).into_owned(),
            _ => String::new(),
        }
    }

    pub fn line(&self, text: impl AsRef<str>) {
        let mut sink = self.sink.lock();
        // a closed stdout must not abort a run
        let _ = writeln!(sink, "{}", text.as_ref());
        let _ = sink.flush();
    }

    pub fn section(&self, title: &str) {
        self.line("");
        self.line(RULE);
        self.line(title);
        self.line(RULE);
    }

    pub fn call(&self, call: &CallLine<'_>) {
        self.line(call.render());
    }

    pub fn symbols(&self, missing: &[Op]) {
        for op in Op::ALL {
            let mark = if missing.contains(&op) { "✗" } else { "✓" };
            self.line(format!("  {mark} {op}"));
        }
    }

    pub fn summary(&self, summary: &RunSummary, identity: &ProcessIdentity) {
        let totals = summary.totals();

        self.section("Summary");
        for run in &summary.runs {
            let o = &run.outcome;
            self.line(format!(
                "  {:<14} attempted={:<4} passed={:<4} succeeded={:<4} {:>10.1?}",
                run.name, o.attempted, o.passed, o.succeeded, o.elapsed
            ));
        }
        for skip in &summary.skipped {
            let missing: Vec<_> = skip.missing.iter().map(|op| op.symbol()).collect();
            self.line(format!(
                "  {:<14} skipped (missing {})",
                skip.name,
                missing.join(", ")
            ));
        }
        self.line("");
        self.line(format!(
            "Total NCCL calls: {} attempted, {} passed, {} succeeded",
            totals.attempted, totals.passed, totals.succeeded
        ));
        self.line(format!("Elapsed: {:.2?}", totals.elapsed));

        self.line("");
        self.line("Verify the tracer output:");
        self.line(format!(
            "  1. {} events captured (no drops)",
            totals.traced
        ));
        if totals.untraced() > 0 {
            let untraced: Vec<_> = Op::ALL
                .into_iter()
                .filter(|op| !op.is_traced())
                .map(Op::symbol)
                .collect();
            self.line(format!(
                "     ({} more calls went to unhooked symbols: {})",
                totals.untraced(),
                untraced.join(", ")
            ));
        }
        self.line("  2. op_type names the collective issued (AllReduce, Broadcast, AllGather, ...)");
        self.line("  3. count and datatype_size match the calls listed above");
        self.line("  4. duration_ns > 0 for every event");
        self.line(format!(
            "  5. pid == {}, tid matches the issuing thread",
            identity.pid
        ));
        self.line(format!(
            "  6. comm == \"{}\" (truncated to {TASK_COMM_BYTES} bytes)",
            identity.name
        ));
    }
}

/// One reported library call.
#[derive(Debug, Clone)]
pub struct CallLine<'a> {
    pub op: Op,
    pub label: &'a str,
    pub count: usize,
    pub datatype: Option<ElementType>,
    pub ret: RawResult,
    pub passed: bool,
}

impl CallLine<'_> {
    pub fn render(&self) -> String {
        let mark = if self.passed { "✓" } else { "✗" };
        let shape = match self.datatype {
            Some(ty) => format!(
                "count={:<9} {:<8} {:>10}",
                self.count,
                ty.name(),
                format_bytes(ty.bytes_for(self.count))
            ),
            None => String::new(),
        };
        format!(
            "  {mark} {:<18} {:<22} {shape} -> {}",
            self.op.symbol(),
            self.label,
            format_code(self.ret)
        )
    }
}

pub fn format_bytes(bytes: usize) -> String {
    ByteSize::b(bytes as u64).to_string()
}

/// `Name(raw)` for a defined result code, `Unknown(raw)` otherwise.
pub fn format_code(ret: RawResult) -> String {
    match NcclResult::from_raw(ret) {
        Some(code) => format!("{code}({ret})"),
        None => format!("Unknown({ret})"),
    }
}

/// What a tracer sees as the issuing process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub pid: u32,
    pub name: String,
}

impl ProcessIdentity {
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            name: truncate_comm(&process_name()),
        }
    }
}

fn process_name() -> String {
    if let Ok(comm) = std::fs::read_to_string("/proc/self/comm") {
        return comm.trim_end().to_string();
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

/// Cut `name` to at most [`TASK_COMM_BYTES`] bytes on a character boundary.
pub fn truncate_comm(name: &str) -> String {
    let mut end = name.len().min(TASK_COMM_BYTES);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

/// Kernel thread id of the calling thread.
#[cfg(target_os = "linux")]
pub fn current_tid() -> i64 {
    // SAFETY: gettid takes no arguments and cannot fail.
    unsafe { libc::syscall(libc::SYS_gettid) as i64 }
}

#[cfg(not(target_os = "linux"))]
pub fn current_tid() -> i64 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{ScenarioOutcome, ScenarioRun, ScenarioSkip};
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case("ncclsim-driver", "ncclsim-driver")]
    #[case("test_nccl_uprobe_driver", "test_nccl_uprob")]
    #[case("exactly15bytes!", "exactly15bytes!")]
    #[case("", "")]
    fn test_truncate_comm(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(truncate_comm(name), expected);
    }

    #[test]
    fn test_truncate_comm_respects_char_boundaries() {
        let name = "αβγδεζηθ";
        let truncated = truncate_comm(name);
        assert!(truncated.len() <= TASK_COMM_BYTES);
        assert!(name.starts_with(&truncated));
    }

    #[test]
    fn test_format_code() {
        assert_eq!(format_code(0), "Success(0)");
        assert_eq!(format_code(4), "InvalidArgument(4)");
        assert_eq!(format_code(42), "Unknown(42)");
    }

    #[test]
    fn test_call_line() {
        let line = CallLine {
            op: Op::AllReduce,
            label: "fp32 gradients",
            count: 1024,
            datatype: Some(ElementType::Float32),
            ret: 0,
            passed: true,
        }
        .render();
        assert!(line.contains("ncclAllReduce"));
        assert!(line.contains("count=1024"));
        assert!(line.contains("Float32"));
        assert!(line.ends_with("-> Success(0)"));
    }

    #[test]
    fn test_current_identity() {
        let identity = ProcessIdentity::current();
        assert_eq!(identity.pid, std::process::id());
        assert!(identity.name.len() <= TASK_COMM_BYTES);
        #[cfg(target_os = "linux")]
        assert!(current_tid() > 0);
    }

    #[test]
    fn test_summary_counts_only_traced_events() {
        let reporter = Reporter::buffered();
        let summary = RunSummary {
            runs: vec![ScenarioRun {
                name: "connectivity",
                outcome: ScenarioOutcome {
                    attempted: 5,
                    passed: 5,
                    succeeded: 5,
                    traced: 1,
                    elapsed: Duration::from_millis(2),
                },
            }],
            ..Default::default()
        };
        let identity = ProcessIdentity {
            pid: 1,
            name: "ncclsim-driver".into(),
        };
        reporter.summary(&summary, &identity);

        let out = reporter.take_output();
        assert!(out.contains("Total NCCL calls: 5 attempted"));
        assert!(out.contains("1. 1 events captured (no drops)"));
        assert!(out.contains("(4 more calls went to unhooked symbols: ncclGetUniqueId, ncclCommInitRank"));
        assert!(out.contains("ncclReduce, ncclAllToAll)"));
    }

    #[test]
    fn test_summary_lists_runs_and_skips() {
        let reporter = Reporter::buffered();
        let summary = RunSummary {
            runs: vec![ScenarioRun {
                name: "burst",
                outcome: ScenarioOutcome {
                    attempted: 100,
                    passed: 100,
                    succeeded: 0,
                    traced: 100,
                    elapsed: Duration::from_millis(12),
                },
            }],
            skipped: vec![ScenarioSkip {
                name: "grouped",
                missing: vec![Op::GroupStart, Op::GroupEnd],
            }],
            elapsed: Duration::from_millis(20),
        };
        let identity = ProcessIdentity {
            pid: 4242,
            name: "ncclsim-driver".into(),
        };
        reporter.summary(&summary, &identity);

        let out = reporter.take_output();
        assert!(out.contains("Total NCCL calls: 100 attempted, 100 passed, 0 succeeded"));
        assert!(out.contains("skipped (missing ncclGroupStart, ncclGroupEnd)"));
        assert!(out.contains("100 events captured"));
        assert!(!out.contains("unhooked symbols"));
        assert!(out.contains("pid == 4242"));
        assert!(out.contains("comm == \"ncclsim-driver\""));
        assert!(reporter.take_output().is_empty());
    }
}
