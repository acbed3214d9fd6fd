//! Parallel work scheduler for the hashing stages.
//!
//! Work is classified as I/O-bound (fingerprinting, content digests, where
//! threads mostly wait on the file system) or CPU-bound (perceptual hashing,
//! where decode and transform cost dominates). Each class gets its own rayon
//! pool size: oversubscribed for I/O, one worker per core for CPU.
//!
//! Results are keyed by input identity, never by arrival order, so output is
//! deterministic regardless of completion timing. Inputs whose transform
//! fails or yields nothing are omitted from the result map.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::progress::ProgressCallback;

/// Thread multiplier for I/O-bound pools.
const IO_OVERSUBSCRIPTION: usize = 4;

/// Classification of a batch of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// Dominated by file-system waits; safe to oversubscribe.
    Io,
    /// Dominated by decode/transform cost; one worker per core.
    Cpu,
}

/// Dispatches batches of hashing work across sized thread pools.
#[derive(Clone)]
pub struct Scheduler {
    io_threads: usize,
    cpu_threads: usize,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("io_threads", &self.io_threads)
            .field("cpu_threads", &self.cpu_threads)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        let cores = num_cpus::get();
        Self {
            io_threads: cores * IO_OVERSUBSCRIPTION,
            cpu_threads: cores,
            progress: None,
        }
    }
}

impl Scheduler {
    /// Create a scheduler with default pool sizes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the I/O pool thread count.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the CPU pool thread count.
    #[must_use]
    pub fn with_cpu_threads(mut self, threads: usize) -> Self {
        self.cpu_threads = threads.max(1);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn thread_count(&self, workload: Workload) -> usize {
        match workload {
            Workload::Io => self.io_threads,
            Workload::Cpu => self.cpu_threads,
        }
    }

    /// Apply a pure transform to every input on the pool for `workload`.
    ///
    /// Returns a map from input identity to result. Inputs for which the
    /// transform returns `None` are omitted. The progress callback, if set,
    /// observes `(label, completed, total)` as results arrive, in completion
    /// order; it runs on worker threads and must not block.
    pub fn map<K, V, F>(
        &self,
        workload: Workload,
        label: &str,
        inputs: Vec<K>,
        transform: F,
    ) -> HashMap<K, V>
    where
        K: Eq + Hash + Send + Sync,
        V: Send,
        F: Fn(&K) -> Option<V> + Send + Sync,
    {
        let total = inputs.len();
        if total == 0 {
            return HashMap::new();
        }

        if let Some(ref cb) = self.progress {
            cb.on_stage_start(label, total);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.thread_count(workload))
            .build()
            .unwrap_or_else(|_| {
                log::warn!(
                    "Failed to create custom thread pool, using global pool with {} threads",
                    rayon::current_num_threads()
                );
                rayon::ThreadPoolBuilder::new().build().unwrap()
            });

        let completed = AtomicUsize::new(0);
        let results: Vec<(K, Option<V>)> = pool.install(|| {
            inputs
                .into_par_iter()
                .map(|key| {
                    let value = transform(&key);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(ref cb) = self.progress {
                        cb.on_progress(label, done, total);
                    }
                    (key, value)
                })
                .collect()
        });

        if let Some(ref cb) = self.progress {
            cb.on_stage_end(label);
        }

        results
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CountingCallback {
        events: Mutex<Vec<(String, usize, usize)>>,
    }

    impl CountingCallback {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProgressCallback for CountingCallback {
        fn on_stage_start(&self, label: &str, total: usize) {
            self.events.lock().unwrap().push((label.into(), 0, total));
        }

        fn on_progress(&self, label: &str, completed: usize, total: usize) {
            self.events
                .lock()
                .unwrap()
                .push((label.into(), completed, total));
        }

        fn on_stage_end(&self, _label: &str) {}
    }

    #[test]
    fn test_map_keys_results_by_identity() {
        let scheduler = Scheduler::new().with_io_threads(2);
        let inputs: Vec<u32> = (0..100).collect();
        let out = scheduler.map(Workload::Io, "square", inputs, |n| Some(n * n));

        assert_eq!(out.len(), 100);
        assert_eq!(out[&7], 49);
        assert_eq!(out[&99], 9801);
    }

    #[test]
    fn test_map_omits_failed_inputs() {
        let scheduler = Scheduler::new().with_cpu_threads(2);
        let inputs: Vec<u32> = (0..10).collect();
        let out = scheduler.map(Workload::Cpu, "evens", inputs, |n| {
            if n % 2 == 0 {
                Some(*n)
            } else {
                None
            }
        });

        assert_eq!(out.len(), 5);
        assert!(out.contains_key(&4));
        assert!(!out.contains_key(&5));
    }

    #[test]
    fn test_map_empty_input() {
        let scheduler = Scheduler::new();
        let out: HashMap<u32, u32> =
            scheduler.map(Workload::Io, "noop", Vec::new(), |n| Some(*n));
        assert!(out.is_empty());
    }

    #[test]
    fn test_progress_reaches_total_in_completion_order() {
        let callback = Arc::new(CountingCallback::new());
        let scheduler = Scheduler::new()
            .with_io_threads(4)
            .with_progress(callback.clone());

        let inputs: Vec<u32> = (0..50).collect();
        scheduler.map(Workload::Io, "probe", inputs, |n| Some(*n));

        let events = callback.events.lock().unwrap();
        // Stage start plus one event per item.
        assert_eq!(events.len(), 51);
        // Completion counts are a permutation-insensitive 1..=50.
        let mut counts: Vec<usize> =
            events.iter().skip(1).map(|(_, done, _)| *done).collect();
        counts.sort_unstable();
        assert_eq!(counts, (1..=50).collect::<Vec<_>>());
        assert!(events.iter().skip(1).all(|(_, _, total)| *total == 50));
    }

    #[test]
    fn test_deterministic_output_across_runs() {
        let scheduler = Scheduler::new().with_cpu_threads(8);
        let inputs: Vec<u32> = (0..200).collect();
        let a = scheduler.map(Workload::Cpu, "a", inputs.clone(), |n| Some(n + 1));
        let b = scheduler.map(Workload::Cpu, "b", inputs, |n| Some(n + 1));
        assert_eq!(a, b);
    }
}
