use tokio::sync::mpsc;

use crate::error::ExecError;

/// Tagged message on the batch channel.
pub(super) enum Delivery<T> {
    Item(T),
    Fault(String),
    /// Every submitted unit has completed.
    End,
}

/// Single-consumer stream of results from one [`PoolRunner`](super::PoolRunner) batch.
///
/// `next` yields `Ok(Some(_))` per result in completion order, `Err(WorkerFault)` for a
/// panicked unit and `Ok(None)` once the end marker arrives.
pub struct ResultStream<T> {
    rx: mpsc::UnboundedReceiver<Delivery<T>>,
    total: usize,
    delivered: usize,
    finished: bool,
}

impl<T> ResultStream<T> {
    pub(super) fn new(rx: mpsc::UnboundedReceiver<Delivery<T>>, total: usize) -> Self {
        Self {
            rx,
            total,
            delivered: 0,
            finished: false,
        }
    }

    /// Number of units submitted in this batch.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of units whose result (or fault) has been handed out so far.
    #[inline]
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub async fn next(&mut self) -> Result<Option<T>, ExecError> {
        if self.finished {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(Delivery::Item(item)) => {
                self.delivered += 1;
                Ok(Some(item))
            }
            Some(Delivery::Fault(reason)) => {
                self.delivered += 1;
                Err(ExecError::WorkerFault(reason))
            }
            // A dropped driver without an end marker only happens on runtime shutdown.
            Some(Delivery::End) | None => {
                self.finished = true;
                Ok(None)
            }
        }
    }
}

impl<T> std::fmt::Debug for ResultStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStream")
            .field("total", &self.total)
            .field("delivered", &self.delivered)
            .field("finished", &self.finished)
            .finish()
    }
}
