// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Scenario driver for NCCL uprobe tracers.
//!
//! Loads an NCCL-compatible shared library at runtime, resolves its entry
//! points, and issues a fixed catalogue of calls (datatype and operator
//! coverage, every collective, grouped point-to-point, a training-step
//! replay, bursts, and multi-threaded traffic). The printed report lists
//! what a tracer attached to the library should have captured.

pub mod config;
pub mod harness;
pub mod logging;
pub mod outcome;
pub mod pool;
pub mod report;
pub mod resolver;
pub mod scenarios;

pub use config::{ConfigError, DriverConfig, PacingConfig};
pub use outcome::{RunSummary, ScenarioOutcome};
pub use report::Reporter;
pub use resolver::{ApiTable, NcclApi, NcclLibrary, Op, ResolveError};
