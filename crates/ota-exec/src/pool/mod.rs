//! # PoolRunner: bounded fan-out with streaming fan-in.
//!
//! Runs one unit of work per input with at most `cap` units executing at any instant
//! and hands every result to a single consumer as soon as the unit finishes.
//!
//! ## Architecture
//! ```text
//! run(work, inputs) ──► driver task
//!
//! for input in inputs {
//!   ├─► acquire permit (waits while `cap` units are in body)
//!   └─► spawn unit { work(input).await; send Item; drop permit }
//! }
//! join all units ──► mark idle ──► send End
//!
//! consumer: ResultStream::next() ──► Item | Fault | End
//! ```
//!
//! ## Rules
//! - The permit moves into the unit and is released only when its future completes
//! - Results arrive in **completion order**, never batched or reordered
//! - One batch per runner at a time; a second `run` fails fast with [`ExecError::AlreadyRunning`]
//! - A panicking unit becomes [`ExecError::WorkerFault`] on the stream; siblings keep running

mod stream;
pub use stream::ResultStream;
use stream::Delivery;

use std::{
    any::Any,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use futures_util::FutureExt;
use tokio::{
    sync::{Semaphore, mpsc},
    task::JoinSet,
};
use tracing::{debug, trace, warn};

use crate::error::ExecError;

/// Bounded-concurrency task runner.
///
/// Must be used from within a tokio runtime: [`PoolRunner::run`] spawns the batch driver.
#[derive(Debug)]
pub struct PoolRunner {
    cap: usize,
    busy: Arc<AtomicBool>,
}

impl PoolRunner {
    pub fn new(cap: usize) -> Result<Self, ExecError> {
        if cap == 0 {
            return Err(ExecError::InvalidCapacity);
        }
        Ok(Self {
            cap,
            busy: Arc::new(AtomicBool::new(false)),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Returns `true` while a batch is in flight.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Starts a batch and returns the stream its results are delivered on.
    ///
    /// `work` is expected to encode expected failures in its output; a panic is
    /// reported as [`ExecError::WorkerFault`] and should be treated as fatal by the caller.
    pub fn run<I, T, F, Fut>(
        &self,
        work: F,
        inputs: impl IntoIterator<Item = I>,
    ) -> Result<ResultStream<T>, ExecError>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(target: "ota.exec.pool", "run rejected: batch already in flight");
            return Err(ExecError::AlreadyRunning);
        }
        let guard = BusyGuard(Arc::clone(&self.busy));

        let inputs: Vec<I> = inputs.into_iter().collect();
        let total = inputs.len();
        let (tx, rx) = mpsc::unbounded_channel();

        debug!(target: "ota.exec.pool", total, cap = self.cap, "batch started");
        tokio::spawn(drive(self.cap, Arc::new(work), inputs, tx, guard));

        Ok(ResultStream::new(rx, total))
    }
}

/// Clears the busy flag when the batch driver finishes or is torn down.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn drive<I, T, F, Fut>(
    cap: usize,
    work: Arc<F>,
    inputs: Vec<I>,
    tx: mpsc::UnboundedSender<Delivery<T>>,
    guard: BusyGuard,
) where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(cap));
    let mut units = JoinSet::new();

    for (seq, input) in inputs.into_iter().enumerate() {
        // The semaphore is owned here and never closed.
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let work = Arc::clone(&work);
        let tx = tx.clone();

        units.spawn(async move {
            trace!(target: "ota.exec.pool", seq, "unit started");
            let delivery = match AssertUnwindSafe(async move { work(input).await })
                .catch_unwind()
                .await
            {
                Ok(out) => Delivery::Item(out),
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    warn!(target: "ota.exec.pool", seq, %reason, "unit panicked");
                    Delivery::Fault(reason)
                }
            };
            let _ = tx.send(delivery);
            drop(permit);
            trace!(target: "ota.exec.pool", seq, "unit finished");
        });

        while units.try_join_next().is_some() {}
    }
    while units.join_next().await.is_some() {}

    drop(guard);
    debug!(target: "ota.exec.pool", "batch finished");
    let _ = tx.send(Delivery::End);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
