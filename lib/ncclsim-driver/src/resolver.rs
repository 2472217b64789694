// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Runtime resolution of the NCCL entry points.
//!
//! The driver never links against an NCCL implementation. It opens a shared
//! library with `libloading`, looks every symbol up independently, and hands
//! the result to the scenarios as an immutable [`NcclApi`]. A symbol that is
//! absent leaves its entry empty; scenarios that need it are skipped instead
//! of failing the run.

use std::ffi::{CStr, c_int};
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr;

use libloading::Library;
use ncclsim_common::ffi::{
    AllGatherFn, AllReduceFn, AllToAllFn, BroadcastFn, CommCountFn, CommDestroyFn,
    CommInitRankFn, CommUserRankFn, GetErrorStringFn, GetUniqueIdFn, GetVersionFn, GroupEndFn,
    GroupStartFn, RecvFn, ReduceFn, ReduceScatterFn, SendFn,
};
use ncclsim_common::{CommHandle, ElementType, RawResult, ReduceOperator, UniqueId};

/// File name the synthetic library is built as.
pub const DEFAULT_LIBRARY: &str = "libncclsim.so";

/// Well-known install locations of a real NCCL, probed when the configured
/// library does not exist.
pub const SYSTEM_NCCL_PATHS: &[&str] = &[
    "/usr/lib/x86_64-linux-gnu/libnccl.so.2",
    "/usr/lib/libnccl.so.2",
    "/usr/local/lib/libnccl.so.2",
    "/opt/nvidia/lib/libnccl.so.2",
    "/usr/lib/x86_64-linux-gnu/libnccl.so",
    "/usr/lib/libnccl.so",
];

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
}

/// One resolvable entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetVersion,
    GetUniqueId,
    CommInitRank,
    CommDestroy,
    CommCount,
    CommUserRank,
    GetErrorString,
    AllReduce,
    Broadcast,
    AllGather,
    ReduceScatter,
    Reduce,
    AllToAll,
    Send,
    Recv,
    GroupStart,
    GroupEnd,
}

impl Op {
    pub const ALL: [Op; 17] = [
        Op::GetVersion,
        Op::GetUniqueId,
        Op::CommInitRank,
        Op::CommDestroy,
        Op::CommCount,
        Op::CommUserRank,
        Op::GetErrorString,
        Op::AllReduce,
        Op::Broadcast,
        Op::AllGather,
        Op::ReduceScatter,
        Op::Reduce,
        Op::AllToAll,
        Op::Send,
        Op::Recv,
        Op::GroupStart,
        Op::GroupEnd,
    ];

    pub const fn symbol(self) -> &'static str {
        match self {
            Op::GetVersion => "ncclGetVersion",
            Op::GetUniqueId => "ncclGetUniqueId",
            Op::CommInitRank => "ncclCommInitRank",
            Op::CommDestroy => "ncclCommDestroy",
            Op::CommCount => "ncclCommCount",
            Op::CommUserRank => "ncclCommUserRank",
            Op::GetErrorString => "ncclGetErrorString",
            Op::AllReduce => "ncclAllReduce",
            Op::Broadcast => "ncclBroadcast",
            Op::AllGather => "ncclAllGather",
            Op::ReduceScatter => "ncclReduceScatter",
            Op::Reduce => "ncclReduce",
            Op::AllToAll => "ncclAllToAll",
            Op::Send => "ncclSend",
            Op::Recv => "ncclRecv",
            Op::GroupStart => "ncclGroupStart",
            Op::GroupEnd => "ncclGroupEnd",
        }
    }

    /// Whether NCCL uprobe tracers hook this entry point.
    ///
    /// Communicator management, error strings, and the rooted/all-to-all
    /// collectives are not instrumented, so calls to them produce no event.
    pub const fn is_traced(self) -> bool {
        matches!(
            self,
            Op::GetVersion
                | Op::AllReduce
                | Op::Broadcast
                | Op::AllGather
                | Op::ReduceScatter
                | Op::Send
                | Op::Recv
                | Op::GroupStart
                | Op::GroupEnd
        )
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Resolved entry points, one optional function pointer per [`Op`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiTable {
    pub get_version: Option<GetVersionFn>,
    pub get_unique_id: Option<GetUniqueIdFn>,
    pub comm_init_rank: Option<CommInitRankFn>,
    pub comm_destroy: Option<CommDestroyFn>,
    pub comm_count: Option<CommCountFn>,
    pub comm_user_rank: Option<CommUserRankFn>,
    pub get_error_string: Option<GetErrorStringFn>,
    pub all_reduce: Option<AllReduceFn>,
    pub broadcast: Option<BroadcastFn>,
    pub all_gather: Option<AllGatherFn>,
    pub reduce_scatter: Option<ReduceScatterFn>,
    pub reduce: Option<ReduceFn>,
    pub all_to_all: Option<AllToAllFn>,
    pub send: Option<SendFn>,
    pub recv: Option<RecvFn>,
    pub group_start: Option<GroupStartFn>,
    pub group_end: Option<GroupEndFn>,
}

impl ApiTable {
    fn contains(&self, op: Op) -> bool {
        match op {
            Op::GetVersion => self.get_version.is_some(),
            Op::GetUniqueId => self.get_unique_id.is_some(),
            Op::CommInitRank => self.comm_init_rank.is_some(),
            Op::CommDestroy => self.comm_destroy.is_some(),
            Op::CommCount => self.comm_count.is_some(),
            Op::CommUserRank => self.comm_user_rank.is_some(),
            Op::GetErrorString => self.get_error_string.is_some(),
            Op::AllReduce => self.all_reduce.is_some(),
            Op::Broadcast => self.broadcast.is_some(),
            Op::AllGather => self.all_gather.is_some(),
            Op::ReduceScatter => self.reduce_scatter.is_some(),
            Op::Reduce => self.reduce.is_some(),
            Op::AllToAll => self.all_to_all.is_some(),
            Op::Send => self.send.is_some(),
            Op::Recv => self.recv.is_some(),
            Op::GroupStart => self.group_start.is_some(),
            Op::GroupEnd => self.group_end.is_some(),
        }
    }
}

/// Safe view over an [`ApiTable`].
///
/// Every call passes a null stream, and buffers come from Rust slices. An
/// in-place collective uses the same slice for send and receive. Each method
/// returns `None` when the entry point was not resolved.
///
/// Not `Clone`: the view handed out by [`NcclLibrary::api`] must not outlive
/// the mapping its pointers point into.
#[derive(Debug)]
pub struct NcclApi {
    table: ApiTable,
}

impl NcclApi {
    /// # Safety
    /// Every populated entry must follow the NCCL contract for its signature
    /// when called with host buffers of at least `count * width` bytes and a
    /// null stream, and must stay callable for as long as the returned value
    /// is used.
    pub unsafe fn from_table(table: ApiTable) -> Self {
        Self { table }
    }

    /// An API with nothing resolved.
    pub fn empty() -> Self {
        Self {
            table: ApiTable::default(),
        }
    }

    pub fn table(&self) -> &ApiTable {
        &self.table
    }

    /// Whether every op in `ops` resolved.
    pub fn has(&self, ops: &[Op]) -> bool {
        ops.iter().all(|op| self.table.contains(*op))
    }

    pub fn missing(&self) -> Vec<Op> {
        Op::ALL
            .into_iter()
            .filter(|op| !self.table.contains(*op))
            .collect()
    }

    pub fn get_version(&self) -> Option<(RawResult, c_int)> {
        let f = self.table.get_version?;
        let mut version = 0;
        let ret = unsafe { f(&mut version) };
        Some((ret, version))
    }

    pub fn get_unique_id(&self) -> Option<(RawResult, UniqueId)> {
        let f = self.table.get_unique_id?;
        let mut id = UniqueId::default();
        let ret = unsafe { f(&mut id) };
        Some((ret, id))
    }

    /// The handle is null unless the call succeeded.
    pub fn comm_init_rank(
        &self,
        nranks: c_int,
        id: UniqueId,
        rank: c_int,
    ) -> Option<(RawResult, CommHandle)> {
        let f = self.table.comm_init_rank?;
        let mut comm: CommHandle = ptr::null_mut();
        let ret = unsafe { f(&mut comm, nranks, id, rank) };
        if ret != 0 {
            comm = ptr::null_mut();
        }
        Some((ret, comm))
    }

    pub fn comm_destroy(&self, comm: CommHandle) -> Option<RawResult> {
        let f = self.table.comm_destroy?;
        Some(unsafe { f(comm) })
    }

    pub fn comm_count(&self, comm: CommHandle) -> Option<(RawResult, c_int)> {
        let f = self.table.comm_count?;
        let mut count = -1;
        let ret = unsafe { f(comm, &mut count) };
        Some((ret, count))
    }

    pub fn comm_user_rank(&self, comm: CommHandle) -> Option<(RawResult, c_int)> {
        let f = self.table.comm_user_rank?;
        let mut rank = -1;
        let ret = unsafe { f(comm, &mut rank) };
        Some((ret, rank))
    }

    /// Library-provided text for `result`, if the library exports one.
    pub fn error_string(&self, result: RawResult) -> Option<String> {
        let f = self.table.get_error_string?;
        let msg = unsafe { f(result) };
        if msg.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned())
    }

    pub fn all_reduce(
        &self,
        buf: &mut [u8],
        count: usize,
        datatype: ElementType,
        op: ReduceOperator,
        comm: CommHandle,
    ) -> Option<RawResult> {
        let f = self.table.all_reduce?;
        let p = buf.as_mut_ptr().cast();
        Some(unsafe { f(p, p, count, datatype.raw(), op.raw(), comm, ptr::null_mut()) })
    }

    pub fn broadcast(
        &self,
        buf: &mut [u8],
        count: usize,
        datatype: ElementType,
        root: c_int,
        comm: CommHandle,
    ) -> Option<RawResult> {
        let f = self.table.broadcast?;
        let p = buf.as_mut_ptr().cast();
        Some(unsafe { f(p, p, count, datatype.raw(), root, comm, ptr::null_mut()) })
    }

    pub fn all_gather(
        &self,
        buf: &mut [u8],
        sendcount: usize,
        datatype: ElementType,
        comm: CommHandle,
    ) -> Option<RawResult> {
        let f = self.table.all_gather?;
        let p = buf.as_mut_ptr().cast();
        Some(unsafe { f(p, p, sendcount, datatype.raw(), comm, ptr::null_mut()) })
    }

    pub fn reduce_scatter(
        &self,
        buf: &mut [u8],
        recvcount: usize,
        datatype: ElementType,
        op: ReduceOperator,
        comm: CommHandle,
    ) -> Option<RawResult> {
        let f = self.table.reduce_scatter?;
        let p = buf.as_mut_ptr().cast();
        Some(unsafe { f(p, p, recvcount, datatype.raw(), op.raw(), comm, ptr::null_mut()) })
    }

    pub fn reduce(
        &self,
        buf: &mut [u8],
        count: usize,
        datatype: ElementType,
        op: ReduceOperator,
        root: c_int,
        comm: CommHandle,
    ) -> Option<RawResult> {
        let f = self.table.reduce?;
        let p = buf.as_mut_ptr().cast();
        Some(unsafe { f(p, p, count, datatype.raw(), op.raw(), root, comm, ptr::null_mut()) })
    }

    pub fn all_to_all(
        &self,
        buf: &mut [u8],
        count: usize,
        datatype: ElementType,
        comm: CommHandle,
    ) -> Option<RawResult> {
        let f = self.table.all_to_all?;
        let p = buf.as_mut_ptr().cast();
        Some(unsafe { f(p, p, count, datatype.raw(), comm, ptr::null_mut()) })
    }

    pub fn send(
        &self,
        buf: &[u8],
        count: usize,
        datatype: ElementType,
        peer: c_int,
        comm: CommHandle,
    ) -> Option<RawResult> {
        let f = self.table.send?;
        Some(unsafe { f(buf.as_ptr().cast(), count, datatype.raw(), peer, comm, ptr::null_mut()) })
    }

    pub fn recv(
        &self,
        buf: &mut [u8],
        count: usize,
        datatype: ElementType,
        peer: c_int,
        comm: CommHandle,
    ) -> Option<RawResult> {
        let f = self.table.recv?;
        Some(unsafe {
            f(buf.as_mut_ptr().cast(), count, datatype.raw(), peer, comm, ptr::null_mut())
        })
    }

    pub fn group_start(&self) -> Option<RawResult> {
        let f = self.table.group_start?;
        Some(unsafe { f() })
    }

    pub fn group_end(&self) -> Option<RawResult> {
        let f = self.table.group_end?;
        Some(unsafe { f() })
    }
}

/// Look `op` up in `library`, recording it as missing on failure.
///
/// # Safety
/// `T` must be the function-pointer type of `op`'s C signature.
unsafe fn lookup<T: Copy>(library: &Library, op: Op, missing: &mut Vec<Op>) -> Option<T> {
    match unsafe { library.get::<T>(op.symbol().as_bytes()) } {
        Ok(symbol) => {
            tracing::debug!(symbol = op.symbol(), "resolved");
            Some(*symbol)
        }
        Err(e) => {
            tracing::warn!(
                symbol = op.symbol(),
                error = %e,
                "symbol not found; scenarios that need it will be skipped"
            );
            missing.push(op);
            None
        }
    }
}

/// A loaded NCCL-compatible library and its resolved entry points.
pub struct NcclLibrary {
    path: PathBuf,
    api: NcclApi,
    missing: Vec<Op>,
    _library: Library,
}

impl NcclLibrary {
    /// Load the library at `path` and resolve every [`Op`].
    ///
    /// # Safety
    /// Loading runs the library's initialisers, and its exports are trusted to
    /// have the NCCL signatures they are named after.
    pub unsafe fn open(path: impl AsRef<Path>) -> Result<Self, ResolveError> {
        let path = path.as_ref().to_path_buf();
        let library = unsafe { Library::new(&path) }.map_err(|source| ResolveError::Load {
            path: path.clone(),
            source,
        })?;

        let mut missing = Vec::new();
        let table = unsafe {
            ApiTable {
                get_version: lookup(&library, Op::GetVersion, &mut missing),
                get_unique_id: lookup(&library, Op::GetUniqueId, &mut missing),
                comm_init_rank: lookup(&library, Op::CommInitRank, &mut missing),
                comm_destroy: lookup(&library, Op::CommDestroy, &mut missing),
                comm_count: lookup(&library, Op::CommCount, &mut missing),
                comm_user_rank: lookup(&library, Op::CommUserRank, &mut missing),
                get_error_string: lookup(&library, Op::GetErrorString, &mut missing),
                all_reduce: lookup(&library, Op::AllReduce, &mut missing),
                broadcast: lookup(&library, Op::Broadcast, &mut missing),
                all_gather: lookup(&library, Op::AllGather, &mut missing),
                reduce_scatter: lookup(&library, Op::ReduceScatter, &mut missing),
                reduce: lookup(&library, Op::Reduce, &mut missing),
                all_to_all: lookup(&library, Op::AllToAll, &mut missing),
                send: lookup(&library, Op::Send, &mut missing),
                recv: lookup(&library, Op::Recv, &mut missing),
                group_start: lookup(&library, Op::GroupStart, &mut missing),
                group_end: lookup(&library, Op::GroupEnd, &mut missing),
            }
        };

        tracing::info!(
            path = %path.display(),
            resolved = Op::ALL.len() - missing.len(),
            missing = missing.len(),
            "loaded NCCL library"
        );

        Ok(Self {
            path,
            api: unsafe { NcclApi::from_table(table) },
            missing,
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry points of this library, borrowed for as long as it stays loaded.
    ///
    /// ```compile_fail
    /// # use ncclsim_driver::{NcclApi, NcclLibrary};
    /// fn detach(library: NcclLibrary) -> NcclApi {
    ///     let api = *library.api();
    ///     drop(library);
    ///     api
    /// }
    /// ```
    pub fn api(&self) -> &NcclApi {
        &self.api
    }

    pub fn missing(&self) -> &[Op] {
        &self.missing
    }

    pub fn resolved(&self) -> Vec<Op> {
        Op::ALL
            .into_iter()
            .filter(|op| !self.missing.contains(op))
            .collect()
    }
}

impl fmt::Debug for NcclLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NcclLibrary")
            .field("path", &self.path)
            .field("missing", &self.missing)
            .finish_non_exhaustive()
    }
}

/// Choose the library to open.
///
/// An explicit path is used as given. Otherwise the configured path is used
/// when it exists, then the first existing [`SYSTEM_NCCL_PATHS`] entry, then
/// whatever the dynamic linker cache lists for `libnccl.so`. When nothing
/// exists the configured path is returned so the load error names it.
pub fn locate(explicit: Option<&Path>, configured: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if configured.exists() {
        return configured.to_path_buf();
    }
    SYSTEM_NCCL_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
        .or_else(find_via_ldconfig)
        .map(|found| {
            tracing::info!(
                configured = %configured.display(),
                found = %found.display(),
                "configured library not found; using system NCCL"
            );
            found
        })
        .unwrap_or_else(|| configured.to_path_buf())
}

fn find_via_ldconfig() -> Option<PathBuf> {
    let output = std::process::Command::new("ldconfig")
        .arg("-p")
        .output()
        .inspect_err(|e| tracing::debug!(error = %e, "ldconfig unavailable"))
        .ok()?;
    parse_ldconfig(&String::from_utf8_lossy(&output.stdout))
}

/// First existing `libnccl.so` target in `ldconfig -p` output.
fn parse_ldconfig(listing: &str) -> Option<PathBuf> {
    listing
        .lines()
        .filter(|line| line.contains("libnccl.so"))
        .find_map(|line| {
            line.split("=>")
                .nth(1)
                .map(|target| PathBuf::from(target.trim()))
                .filter(|target| target.exists())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_symbols_are_unique_nccl_names() {
        let names: HashSet<_> = Op::ALL.iter().map(|op| op.symbol()).collect();
        assert_eq!(names.len(), Op::ALL.len());
        assert!(names.iter().all(|name| name.starts_with("nccl")));
    }

    #[test]
    fn test_traced_symbols() {
        let traced: Vec<_> = Op::ALL.into_iter().filter(|op| op.is_traced()).collect();
        assert_eq!(
            traced,
            vec![
                Op::GetVersion,
                Op::AllReduce,
                Op::Broadcast,
                Op::AllGather,
                Op::ReduceScatter,
                Op::Send,
                Op::Recv,
                Op::GroupStart,
                Op::GroupEnd,
            ]
        );
    }

    #[test]
    fn test_empty_api_has_nothing() {
        let api = NcclApi::empty();
        assert!(api.has(&[]));
        assert!(!api.has(&[Op::AllReduce]));
        assert_eq!(api.missing(), Op::ALL.to_vec());
        assert_eq!(api.group_start(), None);
        let ret = api.all_reduce(
            &mut [],
            0,
            ElementType::Float32,
            ReduceOperator::Sum,
            ptr::null_mut(),
        );
        assert_eq!(ret, None);
    }

    #[test]
    fn test_missing_library_is_a_load_error() {
        let err = unsafe { NcclLibrary::open("/nonexistent/libncclsim.so") }.unwrap_err();
        let ResolveError::Load { path, .. } = &err;
        assert_eq!(path, Path::new("/nonexistent/libncclsim.so"));
        assert!(err.to_string().contains("/nonexistent/libncclsim.so"));
    }

    #[test]
    fn test_locate_prefers_explicit_path() {
        let explicit = Path::new("/nonexistent/explicit.so");
        assert_eq!(
            locate(Some(explicit), Path::new("/nonexistent/configured.so")),
            explicit
        );
    }

    #[test]
    fn test_parse_ldconfig_listing() {
        let dir = tempfile::tempdir().unwrap();
        let nccl = dir.path().join("libnccl.so.2");
        std::fs::write(&nccl, b"").unwrap();

        let listing = format!(
            "3 libs found in cache `/etc/ld.so.cache'\n\
             \tlibz.so.1 (libc6,x86-64) => /lib/x86_64-linux-gnu/libz.so.1\n\
             \tlibnccl.so.2 (libc6,x86-64) => /nonexistent/libnccl.so.2\n\
             \tlibnccl.so.2 (libc6,x86-64) => {}\n",
            nccl.display()
        );
        assert_eq!(parse_ldconfig(&listing), Some(nccl));
        assert_eq!(parse_ldconfig("\tlibz.so.1 => /lib/libz.so.1\n"), None);
        assert_eq!(parse_ldconfig(""), None);
    }

    #[test]
    fn test_locate_keeps_existing_configured_path() {
        let here = std::env::current_exe().unwrap();
        assert_eq!(locate(None, &here), here);
    }
}
