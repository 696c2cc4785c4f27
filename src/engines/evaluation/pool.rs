use crate::error::{EvolveError, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::Duration;

const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Shared flag observed by queued and running jobs
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn set(&self, cancelled: bool) {
        self.flag.store(cancelled, Ordering::SeqCst);
    }
}

/// Result slot of one submitted job
pub struct JobHandle<T> {
    rx: Receiver<T>,
}

impl<T> JobHandle<T> {
    /// Block until the job has produced its result
    pub fn wait(self) -> Result<T> {
        self.rx
            .recv()
            .map_err(|_| EvolveError::Pool("job finished without a result".to_string()))
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fixed-size pool; each worker supervises one evaluator process at a time.
///
/// `submit` never blocks. Jobs receive the pool's cancel token, so `drain`
/// can stop queued jobs from starting and kill running processes.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
    cancel: CancelToken,
    in_flight: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("evaluator-{}", i))
            .panic_handler(|_| log::error!("Worker job panicked"))
            .build()
            .map_err(|e| EvolveError::Pool(format!("Failed to build worker pool: {}", e)))?;

        Ok(Self {
            pool,
            workers,
            cancel: CancelToken::default(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn submit<T, F>(&self, job: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancelToken) -> T + Send + 'static,
    {
        let (tx, rx) = channel();
        let token = self.cancel.clone();
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(Arc::clone(&self.in_flight));

        self.pool.spawn(move || {
            let _guard = guard;
            // The receiver may already be gone after an abort
            let _ = tx.send(job(&token));
        });

        JobHandle { rx }
    }

    pub fn cancel(&self) {
        self.cancel.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel everything and wait until no job is queued or running
    pub fn drain(&self) {
        self.cancel();
        let pending = self.in_flight();
        if pending > 0 {
            log::warn!("Draining worker pool: {} job(s) still in flight", pending);
        }
        while self.in_flight() > 0 {
            std::thread::sleep(DRAIN_POLL);
        }
    }

    /// Re-arm the pool after a drain
    pub fn reset(&self) {
        self.cancel.set(false);
    }
}
