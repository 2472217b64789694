// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use std::path::PathBuf;

use ncclsim_common::ffi::*;
use ncclsim_driver::config::PacingConfig;
use ncclsim_driver::{ApiTable, DriverConfig, NcclApi};

/// Entry points of the synthetic library, linked into the test binary.
pub fn linked_table() -> ApiTable {
    ApiTable {
        get_version: Some(ncclsim::ncclGetVersion as GetVersionFn),
        get_unique_id: Some(ncclsim::ncclGetUniqueId as GetUniqueIdFn),
        comm_init_rank: Some(ncclsim::ncclCommInitRank as CommInitRankFn),
        comm_destroy: Some(ncclsim::ncclCommDestroy as CommDestroyFn),
        comm_count: Some(ncclsim::ncclCommCount as CommCountFn),
        comm_user_rank: Some(ncclsim::ncclCommUserRank as CommUserRankFn),
        get_error_string: Some(ncclsim::ncclGetErrorString as GetErrorStringFn),
        all_reduce: Some(ncclsim::ncclAllReduce as AllReduceFn),
        broadcast: Some(ncclsim::ncclBroadcast as BroadcastFn),
        all_gather: Some(ncclsim::ncclAllGather as AllGatherFn),
        reduce_scatter: Some(ncclsim::ncclReduceScatter as ReduceScatterFn),
        reduce: Some(ncclsim::ncclReduce as ReduceFn),
        all_to_all: Some(ncclsim::ncclAllToAll as AllToAllFn),
        send: Some(ncclsim::ncclSend as SendFn),
        recv: Some(ncclsim::ncclRecv as RecvFn),
        group_start: Some(ncclsim::ncclGroupStart as GroupStartFn),
        group_end: Some(ncclsim::ncclGroupEnd as GroupEndFn),
    }
}

pub fn api(table: ApiTable) -> NcclApi {
    // SAFETY: every entry is an export of the linked synthetic library.
    unsafe { NcclApi::from_table(table) }
}

pub fn linked_api() -> NcclApi {
    api(linked_table())
}

/// Default configuration with all pacing removed.
pub fn unpaced() -> DriverConfig {
    DriverConfig {
        pacing: PacingConfig { scale: 0.0 },
        ..Default::default()
    }
}

/// The synthetic library as a shared object next to the test binary, when
/// cargo has produced one.
pub fn built_library() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let deps = exe.parent()?;
    [deps.to_path_buf(), deps.parent()?.to_path_buf()]
        .into_iter()
        .map(|dir| dir.join(ncclsim_driver::resolver::DEFAULT_LIBRARY))
        .find(|path| path.exists())
}
