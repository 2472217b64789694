// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Raw C ABI of the NCCL control-plane surface.
//!
//! Enumerations cross the boundary as plain `int`. A caller (or a foreign
//! library) may hand over any value, so neither side transmutes them into Rust
//! enums; see [`crate::catalog`] and [`crate::result`] for checked decoding.

use std::ffi::{c_char, c_int, c_void};
use std::fmt;

/// `ncclResult_t`
pub type RawResult = c_int;

/// `ncclDataType_t`
pub type RawDataType = c_int;

/// `ncclRedOp_t`
pub type RawRedOp = c_int;

/// `cudaStream_t`. Accepted and ignored by the synthetic library.
pub type Stream = *mut c_void;

/// Opaque communicator type. Only ever seen behind a [`CommHandle`].
#[repr(C)]
pub struct OpaqueComm {
    _private: [u8; 0],
}

/// `ncclComm_t`
pub type CommHandle = *mut OpaqueComm;

pub const NCCL_UNIQUE_ID_BYTES: usize = 128;

/// `ncclUniqueId`: out-of-band bootstrap token, passed by value.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct UniqueId {
    pub internal: [c_char; NCCL_UNIQUE_ID_BYTES],
}

impl UniqueId {
    /// Build an id whose leading bytes are `marker`, zero-padded.
    pub fn with_marker(marker: &[u8]) -> Self {
        let mut id = Self::default();
        for (dst, src) in id.internal.iter_mut().zip(marker) {
            *dst = *src as c_char;
        }
        id
    }

    pub fn as_bytes(&self) -> [u8; NCCL_UNIQUE_ID_BYTES] {
        self.internal.map(|b| b as u8)
    }
}

impl Default for UniqueId {
    fn default() -> Self {
        Self {
            internal: [0; NCCL_UNIQUE_ID_BYTES],
        }
    }
}

impl fmt::Debug for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.as_bytes();
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        f.debug_tuple("UniqueId")
            .field(&String::from_utf8_lossy(&bytes[..end]))
            .finish()
    }
}

// Function-pointer signatures of every exported entry point. The synthetic
// library asserts its exports against these, and the driver resolves symbols
// into them, so both sides agree on the ABI at compile time.

pub type GetVersionFn = unsafe extern "C" fn(version: *mut c_int) -> RawResult;
pub type GetUniqueIdFn = unsafe extern "C" fn(unique_id: *mut UniqueId) -> RawResult;
pub type CommInitRankFn = unsafe extern "C" fn(
    comm: *mut CommHandle,
    nranks: c_int,
    comm_id: UniqueId,
    rank: c_int,
) -> RawResult;
pub type CommDestroyFn = unsafe extern "C" fn(comm: CommHandle) -> RawResult;
pub type CommCountFn = unsafe extern "C" fn(comm: CommHandle, count: *mut c_int) -> RawResult;
pub type CommUserRankFn = unsafe extern "C" fn(comm: CommHandle, rank: *mut c_int) -> RawResult;
pub type GetErrorStringFn = unsafe extern "C" fn(result: RawResult) -> *const c_char;

pub type AllReduceFn = unsafe extern "C" fn(
    sendbuff: *const c_void,
    recvbuff: *mut c_void,
    count: usize,
    datatype: RawDataType,
    op: RawRedOp,
    comm: CommHandle,
    stream: Stream,
) -> RawResult;

pub type BroadcastFn = unsafe extern "C" fn(
    sendbuff: *const c_void,
    recvbuff: *mut c_void,
    count: usize,
    datatype: RawDataType,
    root: c_int,
    comm: CommHandle,
    stream: Stream,
) -> RawResult;

pub type AllGatherFn = unsafe extern "C" fn(
    sendbuff: *const c_void,
    recvbuff: *mut c_void,
    sendcount: usize,
    datatype: RawDataType,
    comm: CommHandle,
    stream: Stream,
) -> RawResult;

pub type ReduceScatterFn = unsafe extern "C" fn(
    sendbuff: *const c_void,
    recvbuff: *mut c_void,
    recvcount: usize,
    datatype: RawDataType,
    op: RawRedOp,
    comm: CommHandle,
    stream: Stream,
) -> RawResult;

pub type ReduceFn = unsafe extern "C" fn(
    sendbuff: *const c_void,
    recvbuff: *mut c_void,
    count: usize,
    datatype: RawDataType,
    op: RawRedOp,
    root: c_int,
    comm: CommHandle,
    stream: Stream,
) -> RawResult;

pub type AllToAllFn = unsafe extern "C" fn(
    sendbuff: *const c_void,
    recvbuff: *mut c_void,
    count: usize,
    datatype: RawDataType,
    comm: CommHandle,
    stream: Stream,
) -> RawResult;

pub type SendFn = unsafe extern "C" fn(
    sendbuff: *const c_void,
    count: usize,
    datatype: RawDataType,
    peer: c_int,
    comm: CommHandle,
    stream: Stream,
) -> RawResult;

pub type RecvFn = unsafe extern "C" fn(
    recvbuff: *mut c_void,
    count: usize,
    datatype: RawDataType,
    peer: c_int,
    comm: CommHandle,
    stream: Stream,
) -> RawResult;

pub type GroupStartFn = unsafe extern "C" fn() -> RawResult;
pub type GroupEndFn = unsafe extern "C" fn() -> RawResult;

/// Split an encoded `ncclGetVersion` value (`major * 10000 + minor * 100 + patch`).
pub fn decode_version(code: c_int) -> (c_int, c_int, c_int) {
    (code / 10000, (code / 100) % 100, code % 100)
}
