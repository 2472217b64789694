// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-size pool of named OS threads.
//!
//! Each worker runs the same task with its own index. All workers are joined
//! before [`WorkerPool::run`] returns, so tasks may borrow from the caller.

use std::thread;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn worker {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {0} panicked")]
    Panicked(String),
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    prefix: String,
    size: usize,
}

impl WorkerPool {
    pub fn new(prefix: impl Into<String>, size: usize) -> Self {
        Self {
            prefix: prefix.into(),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn worker_name(&self, index: usize) -> String {
        format!("{}-{}", self.prefix, index)
    }

    /// Run `task(index)` on every worker and collect the results in index order.
    ///
    /// Every spawned worker is joined even when a later spawn fails.
    pub fn run<T, F>(&self, task: F) -> Result<Vec<T>, PoolError>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        let task = &task;
        thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.size);
            let mut spawn_error = None;
            for index in 0..self.size {
                let name = self.worker_name(index);
                match thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(s, move || task(index))
                {
                    Ok(handle) => handles.push((name, handle)),
                    Err(source) => {
                        spawn_error = Some(PoolError::Spawn { name, source });
                        break;
                    }
                }
            }

            let mut results = Vec::with_capacity(handles.len());
            let mut panicked = None;
            for (name, handle) in handles {
                match handle.join() {
                    Ok(value) => results.push(value),
                    Err(_) => {
                        tracing::error!(worker = %name, "worker panicked");
                        panicked.get_or_insert(PoolError::Panicked(name));
                    }
                }
            }

            match spawn_error.or(panicked) {
                Some(err) => Err(err),
                None => Ok(results),
            }
        })
    }
}
