// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Types shared by the synthetic NCCL library and the scenario driver.
//!
//! - [`ffi`]: the raw C ABI of the NCCL control-plane surface (handle, stream,
//!   unique id and function-pointer signatures)
//! - [`catalog`]: element types and reduction operators with their widths and
//!   display names
//! - [`result`]: the `ncclResult_t` code set
//!
//! Discriminants follow `nccl.h` so that a tracer decoding raw arguments sees
//! the same values whether it is attached to `libncclsim.so` or a real
//! `libnccl.so`.

pub mod catalog;
pub mod ffi;
pub mod result;

pub use catalog::{ElementType, ReduceOperator, UnknownValue};
pub use ffi::{CommHandle, NCCL_UNIQUE_ID_BYTES, RawDataType, RawRedOp, RawResult, UniqueId};
pub use result::NcclResult;
