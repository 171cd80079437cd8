//! Reader/Writer Workload
//!
//! Drives a [`GlobalCache`] from concurrent reader and writer threads. Each
//! thread owns a contiguous slice of the key space and walks it `rounds` times.

use std::ops::Range;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use serde::Serialize;
use tracing::debug;

use crate::cache::GlobalCache;
use crate::config::Config;

/// Value written by every writer.
pub const WRITTEN_VALUE: &str = "hello";

/// Shape of a workload run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    pub readers: usize,
    pub writers: usize,
    pub unique_keys: u64,
    pub rounds: u64,
}

impl Workload {
    pub fn from_config(config: &Config) -> Self {
        Self {
            readers: config.reader_threads,
            writers: config.writer_threads,
            unique_keys: config.unique_keys,
            rounds: config.rounds,
        }
    }
}

/// Operation counts of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkloadReport {
    /// Lookups performed
    pub reads: u64,
    /// Lookups that returned a value
    pub hits: u64,
    /// Writes performed
    pub writes: u64,
}

/// Runs the workload to completion and returns what was performed.
pub fn run<C>(cache: &C, workload: &Workload) -> WorkloadReport
where
    C: GlobalCache<u64, String> + ?Sized,
{
    run_until(cache, workload, &AtomicBool::new(false))
}

/// Like [`run`], but every thread stops at the end of its current round once
/// `stop` is set.
pub fn run_until<C>(cache: &C, workload: &Workload, stop: &AtomicBool) -> WorkloadReport
where
    C: GlobalCache<u64, String> + ?Sized,
{
    let mut report = WorkloadReport::default();

    thread::scope(|scope| {
        let readers: Vec<_> = (0..workload.readers)
            .map(|index| {
                let keys = key_slice(workload.unique_keys, workload.readers, index);
                scope.spawn(move || read_loop(cache, keys, workload.rounds, stop))
            })
            .collect();
        let writers: Vec<_> = (0..workload.writers)
            .map(|index| {
                let keys = key_slice(workload.unique_keys, workload.writers, index);
                scope.spawn(move || write_loop(cache, keys, workload.rounds, stop))
            })
            .collect();

        for handle in readers {
            let (reads, hits) = handle.join().unwrap_or_else(|p| panic::resume_unwind(p));
            report.reads += reads;
            report.hits += hits;
        }
        for handle in writers {
            report.writes += handle.join().unwrap_or_else(|p| panic::resume_unwind(p));
        }
    });

    debug!(?report, "Workload finished");
    report
}

fn read_loop<C>(cache: &C, keys: Range<u64>, rounds: u64, stop: &AtomicBool) -> (u64, u64)
where
    C: GlobalCache<u64, String> + ?Sized,
{
    let mut reads = 0;
    let mut hits = 0;
    for _ in 0..rounds {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        for key in keys.clone() {
            reads += 1;
            if cache.get_if_present(&key).is_some() {
                hits += 1;
            }
        }
    }
    (reads, hits)
}

fn write_loop<C>(cache: &C, keys: Range<u64>, rounds: u64, stop: &AtomicBool) -> u64
where
    C: GlobalCache<u64, String> + ?Sized,
{
    let mut writes = 0;
    for _ in 0..rounds {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        for key in keys.clone() {
            cache.put_or_merge(key, WRITTEN_VALUE.to_string());
            writes += 1;
        }
    }
    writes
}

/// Keys owned by thread `index` out of `parts`; the remainder is left unused.
fn key_slice(total: u64, parts: usize, index: usize) -> Range<u64> {
    if parts == 0 {
        return 0..0;
    }
    let per = total / parts as u64;
    let start = per * index as u64;
    start..start + per
}
