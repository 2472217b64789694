// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Synthetic NCCL control plane.
//!
//! Built as `libncclsim.so`, this crate exports the NCCL entry points a
//! collective-communication tracer hooks (`ncclAllReduce`, `ncclSend`,
//! `ncclGroupEnd`, ...) without moving any data or touching a device. Each
//! call has an observable boundary: entry with the caller's arguments, a
//! synthetic, count-scaled delay ([`latency`]), and exit with an
//! `ncclResult_t`.
//!
//! Communicators are tracked by [`comm`]; nothing else in the library holds
//! state, so calls may be issued from any number of threads.

pub mod api;
pub mod comm;
pub mod latency;

pub use api::*;
pub use latency::{GROUP_FLUSH_DELAY, INIT_DELAY, LatencyModel};
