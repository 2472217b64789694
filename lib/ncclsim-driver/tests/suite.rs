// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The standard suite against the synthetic library linked in-process.

mod common;

use ncclsim_driver::report::ProcessIdentity;
use ncclsim_driver::resolver::{ApiTable, NcclLibrary, ResolveError};
use ncclsim_driver::{Reporter, harness};
use rstest::rstest;

use common::{api, linked_api, linked_table, unpaced};

const BOUND_SCENARIOS: [&str; 6] = [
    "datatypes",
    "operators",
    "collectives",
    "burst",
    "concurrency",
    "inference",
];

#[test]
fn test_live_communicator_passes_everything() {
    let api = linked_api();
    let report = Reporter::buffered();
    let summary = harness::run(&api, &unpaced(), &report);

    assert!(summary.skipped.is_empty());
    assert_eq!(summary.runs.len(), 9);
    for run in &summary.runs {
        assert!(run.outcome.attempted > 0, "{} issued nothing", run.name);
        assert!(run.outcome.all_passed(), "{}: {:?}", run.name, run.outcome);
        assert_eq!(run.outcome.succeeded, run.outcome.attempted, "{}", run.name);
    }

    let concurrency = summary.outcome("concurrency").unwrap();
    assert_eq!(concurrency.succeeded, 40);
    assert_eq!(summary.outcome("burst").unwrap().attempted, 100);
    assert_eq!(summary.outcome("datatypes").unwrap().attempted, 9);
    assert_eq!(summary.outcome("operators").unwrap().attempted, 5);
    assert_eq!(summary.outcome("collectives").unwrap().attempted, 7);
    assert_eq!(summary.outcome("grouped").unwrap().attempted, 4);
    // 4 forward, group start, 5 gradients, group end, broadcast
    assert_eq!(summary.outcome("training").unwrap().attempted, 12);
    assert_eq!(summary.outcome("inference").unwrap().attempted, 16);
    // version, probe init, count, rank, destroy
    assert_eq!(summary.outcome("connectivity").unwrap().attempted, 5);

    // connectivity's init/count/rank/destroy plus reduce and alltoall
    let totals = summary.totals();
    assert_eq!(totals.untraced(), 6);
    assert_eq!(totals.traced, totals.attempted - 6);
    report.summary(&summary, &ProcessIdentity::current());

    let out = report.take_output();
    assert!(out.contains(&format!("1. {} events captured", totals.traced)));
    assert!(out.contains("4/4 threads joined, 40 calls"));
    assert!(out.contains("shared communicator (nranks=8, rank=0)"));
    assert!(out.contains("version 2.21.5"));
    assert!(out.contains("embed_tokens"));
    assert!(out.contains("burst first"));
    assert!(out.contains("count=10924"));
}

#[test]
fn test_null_communicator_passes_without_success() {
    // Without ncclGetUniqueId no shared communicator can be created.
    let api = api(ApiTable {
        get_unique_id: None,
        ..linked_table()
    });
    let report = Reporter::buffered();
    let summary = harness::run(&api, &unpaced(), &report);

    assert!(summary.skipped.is_empty());
    for run in &summary.runs {
        assert!(run.outcome.all_passed(), "{}: {:?}", run.name, run.outcome);
    }
    for name in BOUND_SCENARIOS {
        let outcome = summary.outcome(name).unwrap();
        assert!(outcome.attempted > 0, "{name}");
        assert_eq!(outcome.succeeded, 0, "{name}");
    }
    // only the group brackets succeed
    assert_eq!(summary.outcome("grouped").unwrap().succeeded, 2);
    assert_eq!(summary.outcome("training").unwrap().succeeded, 2);
    assert!(report.take_output().contains("using a null communicator"));
}

#[test]
fn test_configured_rank_and_rejected_init() {
    let api = linked_api();
    let report = Reporter::discard();
    let mut config = unpaced();
    config.world_size = 2;
    config.rank = 1;
    let summary = harness::run(&api, &config, &report);
    assert_eq!(summary.outcome("burst").unwrap().succeeded, 100);

    // out-of-range rank makes ncclCommInitRank reject the request
    let guard = harness::CommGuard::establish(&api, 2, 2, &report);
    assert!(!guard.is_live());
    assert!(guard.comm().is_null());
}

#[rstest]
#[case::all_reduce_only(
    ApiTable { all_reduce: linked_table().all_reduce, ..ApiTable::default() },
    &["datatypes", "operators", "burst", "concurrency", "inference"],
    &["connectivity", "collectives", "grouped", "training"],
)]
#[case::no_groups(
    ApiTable { group_start: None, group_end: None, ..linked_table() },
    &["connectivity", "datatypes", "operators", "collectives", "burst", "concurrency", "inference"],
    &["grouped", "training"],
)]
fn test_missing_symbols_skip_scenarios(
    #[case] table: ApiTable,
    #[case] ran: &[&str],
    #[case] skipped: &[&str],
) {
    let api = api(table);
    let summary = harness::run(&api, &unpaced(), &Reporter::discard());

    let names: Vec<_> = summary.runs.iter().map(|run| run.name).collect();
    assert_eq!(names, ran);
    let skipped_names: Vec<_> = summary.skipped.iter().map(|skip| skip.name).collect();
    assert_eq!(skipped_names, skipped);
    assert!(summary.runs.iter().all(|run| run.outcome.all_passed()));
}

#[test]
fn test_optional_collectives_are_not_gating() {
    let api = api(ApiTable {
        reduce: None,
        all_to_all: None,
        ..linked_table()
    });
    let summary = harness::run(&api, &unpaced(), &Reporter::discard());
    let collectives = summary.outcome("collectives").unwrap();
    assert_eq!(collectives.attempted, 5);
    assert!(collectives.all_passed());
}

#[test]
fn test_missing_library_is_fatal() {
    let err = unsafe { NcclLibrary::open("/nonexistent/dir/libncclsim.so") }.unwrap_err();
    assert!(matches!(err, ResolveError::Load { .. }));
}
