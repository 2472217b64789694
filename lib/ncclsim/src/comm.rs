// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Communicator lifecycle.
//!
//! A `ncclComm_t` handed out by this library is not a pointer to anything: its
//! address is the key of an entry in a process-wide registry. Validating a
//! handle is a registry lookup, so a null, forged or stale handle is rejected
//! without ever being dereferenced.
//!
//! ```text
//! Uninitialized --init(valid rank)--> Live --destroy--> Destroyed (terminal)
//! ```
//!
//! Keys come from a monotonically increasing counter and are never reused,
//! which keeps a destroyed handle invalid for the rest of the process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dashmap::DashMap;
use ncclsim_common::{CommHandle, NcclResult, UniqueId};
use once_cell::sync::Lazy;

use crate::latency::INIT_DELAY;

/// Leading bytes of every id produced by [`create_id`].
pub const UNIQUE_ID_MARKER: &[u8] = b"NCCLSIM_BOOTSTRAP";

// Starts well above zero so no handle ever looks like a small integer or null.
const FIRST_HANDLE_KEY: usize = 0x1000;

static NEXT_KEY: AtomicUsize = AtomicUsize::new(FIRST_HANDLE_KEY);
static REGISTRY: Lazy<DashMap<usize, Arc<Communicator>>> = Lazy::new(DashMap::new);

#[derive(Debug)]
pub struct Communicator {
    key: usize,
    rank: i32,
    world_size: i32,
    alive: AtomicBool,
}

impl Communicator {
    pub fn rank(&self) -> i32 {
        self.rank
    }

    pub fn world_size(&self) -> i32 {
        self.world_size
    }

    pub fn handle(&self) -> CommHandle {
        std::ptr::without_provenance_mut(self.key)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

pub fn create_id() -> UniqueId {
    UniqueId::with_marker(UNIQUE_ID_MARKER)
}

/// Register a live communicator for `rank` in a group of `world_size`.
///
/// The bootstrap id is accepted but not interpreted.
pub fn init(world_size: i32, rank: i32, _bootstrap: &UniqueId) -> Result<CommHandle, NcclResult> {
    if world_size < 1 || rank < 0 || rank >= world_size {
        return Err(NcclResult::InvalidArgument);
    }

    let key = NEXT_KEY.fetch_add(1, Ordering::Relaxed);
    let comm = Arc::new(Communicator {
        key,
        rank,
        world_size,
        alive: AtomicBool::new(true),
    });
    let handle = comm.handle();
    REGISTRY.insert(key, comm);

    std::thread::sleep(INIT_DELAY);
    Ok(handle)
}

/// Resolve a handle to its live communicator.
pub fn lookup(handle: CommHandle) -> Result<Arc<Communicator>, NcclResult> {
    if handle.is_null() {
        return Err(NcclResult::InvalidArgument);
    }
    REGISTRY
        .get(&handle.addr())
        .map(|entry| Arc::clone(entry.value()))
        .filter(|comm| comm.is_alive())
        .ok_or(NcclResult::InvalidArgument)
}

pub fn is_live(handle: CommHandle) -> bool {
    lookup(handle).is_ok()
}

/// Invalidate `handle` and release its registry entry.
///
/// The alive flag is cleared with a swap before the entry is removed, so of
/// two racing destroys exactly one succeeds.
pub fn destroy(handle: CommHandle) -> Result<(), NcclResult> {
    let comm = lookup(handle)?;
    if !comm.alive.swap(false, Ordering::AcqRel) {
        return Err(NcclResult::InvalidArgument);
    }
    REGISTRY.remove(&comm.key);
    Ok(())
}

pub fn rank_of(handle: CommHandle) -> Result<i32, NcclResult> {
    lookup(handle).map(|comm| comm.rank())
}

pub fn world_size_of(handle: CommHandle) -> Result<i32, NcclResult> {
    lookup(handle).map(|comm| comm.world_size())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 0)]
    #[case(2, 1)]
    #[case(8, 0)]
    #[case(8, 7)]
    fn test_init_echoes_rank_and_world_size(#[case] world_size: i32, #[case] rank: i32) {
        let handle = init(world_size, rank, &create_id()).expect("valid rank");
        assert_eq!(rank_of(handle), Ok(rank));
        assert_eq!(world_size_of(handle), Ok(world_size));
        assert_eq!(destroy(handle), Ok(()));
    }

    #[rstest]
    #[case(2, 2)]
    #[case(2, -1)]
    #[case(0, 0)]
    #[case(-4, 0)]
    #[case(1, i32::MAX)]
    fn test_init_rejects_out_of_range_rank(#[case] world_size: i32, #[case] rank: i32) {
        assert_eq!(
            init(world_size, rank, &create_id()),
            Err(NcclResult::InvalidArgument)
        );
    }

    #[test]
    fn test_destroy_is_terminal() {
        let handle = init(4, 2, &create_id()).unwrap();
        assert!(is_live(handle));
        assert_eq!(destroy(handle), Ok(()));
        assert!(!is_live(handle));
        assert_eq!(destroy(handle), Err(NcclResult::InvalidArgument));
        assert_eq!(rank_of(handle), Err(NcclResult::InvalidArgument));
        assert_eq!(world_size_of(handle), Err(NcclResult::InvalidArgument));
    }

    #[test]
    fn test_destroy_leaves_other_communicators_alone() {
        let a = init(2, 0, &create_id()).unwrap();
        let b = init(2, 1, &create_id()).unwrap();
        assert_ne!(a, b);
        destroy(a).unwrap();
        assert_eq!(rank_of(b), Ok(1));
        destroy(b).unwrap();
    }

    #[test]
    fn test_null_and_forged_handles_are_rejected() {
        assert_eq!(lookup(std::ptr::null_mut()).err(), Some(NcclResult::InvalidArgument));
        let forged: CommHandle = std::ptr::without_provenance_mut(0xdead_beef);
        assert_eq!(rank_of(forged), Err(NcclResult::InvalidArgument));
        assert_eq!(destroy(forged), Err(NcclResult::InvalidArgument));
    }

    #[test]
    fn test_racing_destroys_succeed_once() {
        let handle = init(2, 0, &create_id()).unwrap();
        let key = handle.addr();
        let successes = std::thread::scope(|s| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(move || {
                        destroy(std::ptr::without_provenance_mut(key)).is_ok()
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|w| w.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(successes, 1);
    }

    #[test]
    fn test_unique_id_is_deterministic() {
        assert_eq!(create_id(), create_id());
        assert_eq!(&create_id().as_bytes()[..UNIQUE_ID_MARKER.len()], UNIQUE_ID_MARKER);
    }
}
