// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! `ncclResult_t` codes.
//!
//! The synthetic library only ever produces `Success`, `InvalidArgument` and
//! `SystemError`; the rest are kept so results from a real library decode
//! cleanly.

use std::ffi::CStr;
use std::fmt;

use crate::ffi::RawResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum NcclResult {
    Success = 0,
    UnhandledCudaError = 1,
    SystemError = 2,
    InternalError = 3,
    InvalidArgument = 4,
    InvalidUsage = 5,
    RemoteError = 6,
}

impl NcclResult {
    pub fn from_raw(raw: RawResult) -> Option<Self> {
        match raw {
            0 => Some(Self::Success),
            1 => Some(Self::UnhandledCudaError),
            2 => Some(Self::SystemError),
            3 => Some(Self::InternalError),
            4 => Some(Self::InvalidArgument),
            5 => Some(Self::InvalidUsage),
            6 => Some(Self::RemoteError),
            _ => None,
        }
    }

    pub const fn raw(self) -> RawResult {
        self as RawResult
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::UnhandledCudaError => "UnhandledCudaError",
            Self::SystemError => "SystemError",
            Self::InternalError => "InternalError",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidUsage => "InvalidUsage",
            Self::RemoteError => "RemoteError",
        }
    }

    /// Human-readable description, NUL-terminated for `ncclGetErrorString`.
    pub const fn description(self) -> &'static CStr {
        match self {
            Self::Success => c"no error",
            Self::UnhandledCudaError => c"unhandled cuda error",
            Self::SystemError => c"unhandled system error",
            Self::InternalError => c"internal error",
            Self::InvalidArgument => c"invalid argument",
            Self::InvalidUsage => c"invalid usage",
            Self::RemoteError => c"remote process exited or there was a network error",
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<NcclResult> for RawResult {
    fn from(value: NcclResult) -> Self {
        value.raw()
    }
}

impl fmt::Display for NcclResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Description for a raw code that may fall outside the known set.
pub fn describe_raw(raw: RawResult) -> &'static CStr {
    NcclResult::from_raw(raw).map_or(c"unknown result code", NcclResult::description)
}
