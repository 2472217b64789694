// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Exported NCCL entry points.
//!
//! Symbol names and signatures match `nccl.h` so that a uprobe set written for
//! `libnccl.so` attaches to `libncclsim.so` unchanged. Buffer pointers and the
//! stream are never dereferenced. Collective and point-to-point calls charge
//! the count-scaled latency before validating the communicator, so a rejected
//! call still takes time proportional to its payload.

#![allow(non_snake_case)]

use std::ffi::{c_char, c_int, c_void};

use ncclsim_common::ffi;
use ncclsim_common::result::describe_raw;
use ncclsim_common::{CommHandle, NcclResult, RawDataType, RawRedOp, RawResult, UniqueId};

use crate::comm;
use crate::latency::{self, GROUP_FLUSH_DELAY};

/// `ncclGetVersion` value: 2.21.5.
pub const NCCL_VERSION_CODE: c_int = 22105;

// Exports must stay assignable to the shared ABI signatures.
const _: ffi::GetVersionFn = ncclGetVersion;
const _: ffi::GetUniqueIdFn = ncclGetUniqueId;
const _: ffi::CommInitRankFn = ncclCommInitRank;
const _: ffi::CommDestroyFn = ncclCommDestroy;
const _: ffi::CommCountFn = ncclCommCount;
const _: ffi::CommUserRankFn = ncclCommUserRank;
const _: ffi::GetErrorStringFn = ncclGetErrorString;
const _: ffi::AllReduceFn = ncclAllReduce;
const _: ffi::BroadcastFn = ncclBroadcast;
const _: ffi::AllGatherFn = ncclAllGather;
const _: ffi::ReduceScatterFn = ncclReduceScatter;
const _: ffi::ReduceFn = ncclReduce;
const _: ffi::AllToAllFn = ncclAllToAll;
const _: ffi::SendFn = ncclSend;
const _: ffi::RecvFn = ncclRecv;
const _: ffi::GroupStartFn = ncclGroupStart;
const _: ffi::GroupEndFn = ncclGroupEnd;

#[inline]
fn status(result: Result<(), NcclResult>) -> RawResult {
    match result {
        Ok(()) => NcclResult::Success.raw(),
        Err(code) => code.raw(),
    }
}

/// Write `value` through `out`, rejecting null.
///
/// # Safety
/// A non-null `out` must be valid for a write of `T`.
#[inline]
unsafe fn write_out<T>(out: *mut T, value: T) -> Result<(), NcclResult> {
    if out.is_null() {
        return Err(NcclResult::InvalidArgument);
    }
    unsafe { out.write(value) };
    Ok(())
}

/// Charge the latency for `count`, then require a live communicator.
#[inline]
fn collective(count: usize, comm: CommHandle) -> RawResult {
    latency::simulate(count);
    status(comm::lookup(comm).map(drop))
}

/// # Safety
/// `version` must be null or valid for a write of `int`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ncclGetVersion(version: *mut c_int) -> RawResult {
    status(unsafe { write_out(version, NCCL_VERSION_CODE) })
}

/// # Safety
/// `unique_id` must be null or valid for a write of `ncclUniqueId`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ncclGetUniqueId(unique_id: *mut UniqueId) -> RawResult {
    status(unsafe { write_out(unique_id, comm::create_id()) })
}

/// # Safety
/// `comm_out` must be null or valid for a write of `ncclComm_t`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ncclCommInitRank(
    comm_out: *mut CommHandle,
    nranks: c_int,
    comm_id: UniqueId,
    rank: c_int,
) -> RawResult {
    if comm_out.is_null() {
        return NcclResult::InvalidArgument.raw();
    }
    let result = comm::init(nranks, rank, &comm_id)
        .and_then(|handle| unsafe { write_out(comm_out, handle) });
    status(result)
}

#[unsafe(no_mangle)]
pub extern "C" fn ncclCommDestroy(comm: CommHandle) -> RawResult {
    status(comm::destroy(comm))
}

/// # Safety
/// `count` must be null or valid for a write of `int`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ncclCommCount(comm: CommHandle, count: *mut c_int) -> RawResult {
    let result = comm::world_size_of(comm).and_then(|n| unsafe { write_out(count, n) });
    status(result)
}

/// # Safety
/// `rank` must be null or valid for a write of `int`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ncclCommUserRank(comm: CommHandle, rank: *mut c_int) -> RawResult {
    let result = comm::rank_of(comm).and_then(|r| unsafe { write_out(rank, r) });
    status(result)
}

#[unsafe(no_mangle)]
pub extern "C" fn ncclGetErrorString(result: RawResult) -> *const c_char {
    describe_raw(result).as_ptr()
}

#[unsafe(no_mangle)]
pub extern "C" fn ncclAllReduce(
    _sendbuff: *const c_void,
    _recvbuff: *mut c_void,
    count: usize,
    _datatype: RawDataType,
    _op: RawRedOp,
    comm: CommHandle,
    _stream: ffi::Stream,
) -> RawResult {
    collective(count, comm)
}

#[unsafe(no_mangle)]
pub extern "C" fn ncclBroadcast(
    _sendbuff: *const c_void,
    _recvbuff: *mut c_void,
    count: usize,
    _datatype: RawDataType,
    _root: c_int,
    comm: CommHandle,
    _stream: ffi::Stream,
) -> RawResult {
    collective(count, comm)
}

#[unsafe(no_mangle)]
pub extern "C" fn ncclAllGather(
    _sendbuff: *const c_void,
    _recvbuff: *mut c_void,
    sendcount: usize,
    _datatype: RawDataType,
    comm: CommHandle,
    _stream: ffi::Stream,
) -> RawResult {
    collective(sendcount, comm)
}

#[unsafe(no_mangle)]
pub extern "C" fn ncclReduceScatter(
    _sendbuff: *const c_void,
    _recvbuff: *mut c_void,
    recvcount: usize,
    _datatype: RawDataType,
    _op: RawRedOp,
    comm: CommHandle,
    _stream: ffi::Stream,
) -> RawResult {
    collective(recvcount, comm)
}

#[allow(clippy::too_many_arguments)]
#[unsafe(no_mangle)]
pub extern "C" fn ncclReduce(
    _sendbuff: *const c_void,
    _recvbuff: *mut c_void,
    count: usize,
    _datatype: RawDataType,
    _op: RawRedOp,
    _root: c_int,
    comm: CommHandle,
    _stream: ffi::Stream,
) -> RawResult {
    collective(count, comm)
}

#[unsafe(no_mangle)]
pub extern "C" fn ncclAllToAll(
    _sendbuff: *const c_void,
    _recvbuff: *mut c_void,
    count: usize,
    _datatype: RawDataType,
    comm: CommHandle,
    _stream: ffi::Stream,
) -> RawResult {
    collective(count, comm)
}

#[unsafe(no_mangle)]
pub extern "C" fn ncclSend(
    _sendbuff: *const c_void,
    count: usize,
    _datatype: RawDataType,
    _peer: c_int,
    comm: CommHandle,
    _stream: ffi::Stream,
) -> RawResult {
    collective(count, comm)
}

#[unsafe(no_mangle)]
pub extern "C" fn ncclRecv(
    _recvbuff: *mut c_void,
    count: usize,
    _datatype: RawDataType,
    _peer: c_int,
    comm: CommHandle,
    _stream: ffi::Stream,
) -> RawResult {
    collective(count, comm)
}

#[unsafe(no_mangle)]
pub extern "C" fn ncclGroupStart() -> RawResult {
    NcclResult::Success.raw()
}

#[unsafe(no_mangle)]
pub extern "C" fn ncclGroupEnd() -> RawResult {
    std::thread::sleep(GROUP_FLUSH_DELAY);
    NcclResult::Success.raw()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::ptr;

    fn init_comm(nranks: c_int, rank: c_int) -> (RawResult, CommHandle) {
        let mut handle: CommHandle = ptr::null_mut();
        let ret = unsafe { ncclCommInitRank(&mut handle, nranks, comm::create_id(), rank) };
        (ret, handle)
    }

    #[test]
    fn test_version() {
        let mut version = 0;
        assert_eq!(unsafe { ncclGetVersion(&mut version) }, 0);
        assert_eq!(version, NCCL_VERSION_CODE);
        assert_eq!(unsafe { ncclGetVersion(ptr::null_mut()) }, 4);
    }

    #[test]
    fn test_query_with_null_output_writes_nothing() {
        let (ret, handle) = init_comm(4, 3);
        assert_eq!(ret, 0);
        assert_eq!(unsafe { ncclCommCount(handle, ptr::null_mut()) }, 4);
        assert_eq!(unsafe { ncclCommUserRank(handle, ptr::null_mut()) }, 4);

        let mut rank = -1;
        assert_eq!(unsafe { ncclCommUserRank(ptr::null_mut(), &mut rank) }, 4);
        assert_eq!(rank, -1);
        assert_eq!(ncclCommDestroy(handle), 0);
    }

    #[test]
    fn test_failed_init_leaves_output_untouched() {
        let sentinel: CommHandle = ptr::without_provenance_mut(0x5a5a);
        let mut handle = sentinel;
        let ret = unsafe { ncclCommInitRank(&mut handle, 2, comm::create_id(), 2) };
        assert_eq!(ret, 4);
        assert_eq!(handle, sentinel);
        assert_eq!(
            unsafe { ncclCommInitRank(ptr::null_mut(), 2, comm::create_id(), 0) },
            4
        );
    }

    #[test]
    fn test_error_strings_are_never_null() {
        for raw in -2..10 {
            let msg = ncclGetErrorString(raw);
            assert!(!msg.is_null());
            assert!(!unsafe { CStr::from_ptr(msg) }.to_bytes().is_empty());
        }
    }
}
