use crate::error::Result;
use parking_lot::{Condvar, Mutex};
use std::num::NonZeroUsize;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

// Decrements the in-flight counter when a task finishes, panicking or not.
struct TaskGuard(Arc<InFlight>);

impl TaskGuard {
    fn enter(in_flight: &Arc<InFlight>) -> Self {
        *in_flight.count.lock() += 1;
        Self(Arc::clone(in_flight))
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        let mut count = self.0.count.lock();
        *count -= 1;
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// Outputs collected from one batch, tagged with the slot that produced them.
#[derive(Debug)]
pub struct Batch<T> {
    results: Vec<(usize, T)>,
    requested: usize,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Tasks whose output did not arrive before the deadline.
    pub fn dropped(&self) -> usize {
        self.requested - self.results.len()
    }

    pub fn slots(&self) -> Vec<usize> {
        self.results.iter().map(|&(slot, _)| slot).collect()
    }

    pub fn into_outputs(self) -> Vec<T> {
        self.results.into_iter().map(|(_, output)| output).collect()
    }
}

/// Fixed-size pool that runs batches of independent tasks with a soft deadline.
///
/// Tasks that miss the deadline keep running on their worker but their output
/// is discarded: each batch gets its own channel, so a late result can never
/// leak into a later batch.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    in_flight: Arc<InFlight>,
    drained: bool,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|index| format!("tsp-worker-{index}"))
            .panic_handler(|_| tracing::error!("Worker task panicked"))
            .build()?;

        Ok(Self {
            pool,
            in_flight: Arc::new(InFlight::default()),
            drained: false,
        })
    }

    /// One worker per available hardware thread.
    pub fn with_available_parallelism() -> Result<Self> {
        let threads = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::new(threads)
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn in_flight(&self) -> usize {
        *self.in_flight.count.lock()
    }

    /// Runs `op` inside the pool, so any rayon parallel iterator it starts
    /// uses these workers rather than the global pool.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        self.pool.install(op)
    }

    /// Runs `task(slot)` for every slot in `0..tasks` and waits at most
    /// `timeout` for the outputs. Results come back ordered by slot.
    #[instrument(level = "debug", skip(self, task))]
    pub fn run_batch<T, F>(&self, tasks: usize, timeout: Duration, task: F) -> Batch<T>
    where
        T: Send + 'static,
        F: Fn(usize) -> T + Send + Sync + 'static,
    {
        let task = Arc::new(task);
        let (tx, rx) = mpsc::channel();

        for slot in 0..tasks {
            let tx = tx.clone();
            let task = Arc::clone(&task);
            let guard = TaskGuard::enter(&self.in_flight);
            self.pool.spawn(move || {
                let _guard = guard;
                let output = task(slot);
                // The receiver is gone once the batch has timed out.
                let _ = tx.send((slot, output));
            });
        }
        drop(tx);

        let deadline = Instant::now() + timeout;
        let mut results = Vec::with_capacity(tasks);
        while results.len() < tasks {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(result) => results.push(result),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        results.sort_unstable_by_key(|&(slot, _)| slot);
        Batch {
            results,
            requested: tasks,
        }
    }

    /// Blocks until no task is running or `timeout` elapses. Returns whether
    /// the pool went idle.
    pub fn drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.in_flight.count.lock();
        while *count > 0 {
            if self.in_flight.idle.wait_until(&mut count, deadline).timed_out() {
                break;
            }
        }
        *count == 0
    }

    /// Drains within `timeout`, then releases the workers. Tasks still
    /// running past the bound are detached; rayon cannot interrupt them.
    pub fn shutdown(mut self, timeout: Duration) -> bool {
        let drained = self.drain(timeout);
        if !drained {
            tracing::warn!(
                in_flight = self.in_flight(),
                "Worker pool did not drain in time, detaching remaining tasks"
            );
        }
        self.drained = true;
        drained
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.drained && !self.drain(DEFAULT_SHUTDOWN_TIMEOUT) {
            tracing::warn!(
                in_flight = self.in_flight(),
                "Worker pool dropped with tasks still running"
            );
        }
    }
}
