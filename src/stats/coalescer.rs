//! Single-slot scheduler for expensive batch recomputations.
//!
//! At most one computation runs at a time. A batch submitted while the slot
//! is idle becomes the in-flight batch at once. Batches submitted while one is
//! in flight replace each other in a one-element pending slot, so only the
//! newest one is computed next.

use std::any::Any;
use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, warn};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::WorkerError;

/// Outcome of one computation, tagged with the sequence number `submit` returned
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<R> {
    Finished { seq: u64, result: R },
    Failed { seq: u64, error: WorkerError },
}

impl<R> Completion<R> {
    pub fn seq(&self) -> u64 {
        match self {
            Completion::Finished { seq, .. } | Completion::Failed { seq, .. } => *seq,
        }
    }

    pub fn into_result(self) -> Result<R, WorkerError> {
        match self {
            Completion::Finished { result, .. } => Ok(result),
            Completion::Failed { error, .. } => Err(error),
        }
    }
}

struct Slot<B> {
    /// Claimed by `submit` on an idle slot, not yet picked up by the worker
    current: Option<(u64, B)>,
    pending: Option<(u64, B)>,
    /// A batch is in flight; cleared by the worker when nothing is pending
    busy: bool,
    last_seq: u64,
    closed: bool,
}

struct Shared<B> {
    slot: Mutex<Slot<B>>,
    wake: Notify,
}

impl<B> Shared<B> {
    // The slot holds plain data, so a poisoned lock is still consistent
    fn lock(&self) -> MutexGuard<'_, Slot<B>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a running recomputation worker.
///
/// Dropping the handle closes the slot: the pending batch is discarded and the
/// worker stops after the in-flight computation, which closes the completion
/// channel.
pub struct RecomputeCoalescer<B> {
    shared: Arc<Shared<B>>,
    worker: Option<JoinHandle<()>>,
}

impl<B: Send + 'static> RecomputeCoalescer<B> {
    /// Start the worker task. Must be called from within a tokio runtime.
    pub fn spawn<R, E, F>(compute: F) -> (Self, UnboundedReceiver<Completion<R>>)
    where
        F: Fn(B) -> Result<R, E> + Send + Sync + 'static,
        R: Send + 'static,
        E: Display + Send + 'static,
    {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                current: None,
                pending: None,
                busy: false,
                last_seq: 0,
                closed: false,
            }),
            wake: Notify::new(),
        });
        let (tx, rx) = unbounded_channel();
        let worker = tokio::spawn(run_worker(Arc::clone(&shared), Arc::new(compute), tx));

        (
            Self {
                shared,
                worker: Some(worker),
            },
            rx,
        )
    }

    /// Hand a batch to the worker and return its sequence number.
    ///
    /// Never waits on the running computation. On an idle slot the batch is
    /// in flight immediately; otherwise it replaces any batch still pending.
    pub fn submit(&self, batch: B) -> u64 {
        let (seq, superseded) = {
            let mut slot = self.shared.lock();
            slot.last_seq += 1;
            let seq = slot.last_seq;
            if slot.busy {
                let superseded = slot.pending.replace((seq, batch)).map(|(old, _)| old);
                (seq, superseded)
            } else {
                slot.busy = true;
                slot.current = Some((seq, batch));
                (seq, None)
            }
        };

        if let Some(old) = superseded {
            debug!("Batch {} superseded by batch {}", old, seq);
        }
        self.shared.wake.notify_one();
        seq
    }

    /// Whether a batch is waiting behind the in-flight one
    pub fn has_pending(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    /// Whether a batch is in flight
    pub fn is_busy(&self) -> bool {
        self.shared.lock().busy
    }

    /// Stop accepting batches, let the worker run the pending one if any, and
    /// wait for it to exit
    pub async fn shutdown(mut self) {
        self.close(false);
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                error!("Recompute worker ended abnormally: {}", e);
            }
        }
    }
}

impl<B> RecomputeCoalescer<B> {
    fn close(&self, discard_pending: bool) {
        {
            let mut slot = self.shared.lock();
            if slot.closed {
                return;
            }
            slot.closed = true;
            if discard_pending {
                slot.pending = None;
            }
        }
        self.shared.wake.notify_one();
    }
}

impl<B> Drop for RecomputeCoalescer<B> {
    fn drop(&mut self) {
        self.close(true);
    }
}

async fn run_worker<B, R, E, F>(
    shared: Arc<Shared<B>>,
    compute: Arc<F>,
    completions: UnboundedSender<Completion<R>>,
) where
    B: Send + 'static,
    F: Fn(B) -> Result<R, E> + Send + Sync + 'static,
    R: Send + 'static,
    E: Display + Send + 'static,
{
    let mut next: Option<(u64, B)> = None;
    loop {
        if next.is_none() {
            let (claimed, closed) = {
                let mut slot = shared.lock();
                (slot.current.take(), slot.closed)
            };
            match claimed {
                Some(claimed) => next = Some(claimed),
                None if closed => break,
                None => {
                    shared.wake.notified().await;
                    continue;
                }
            }
        }
        let Some((seq, batch)) = next.take() else {
            continue;
        };

        debug!("Computing batch {}", seq);
        let task = Arc::clone(&compute);
        let completion = match tokio::task::spawn_blocking(move || task(batch)).await {
            Ok(Ok(result)) => Completion::Finished { seq, result },
            Ok(Err(e)) => {
                warn!("Batch {} failed: {}", seq, e);
                Completion::Failed {
                    seq,
                    error: WorkerError::Failed(e.to_string()),
                }
            }
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                error!("Batch {} panicked: {}", seq, message);
                Completion::Failed {
                    seq,
                    error: WorkerError::Panicked(message),
                }
            }
            Err(_) => Completion::Failed {
                seq,
                error: WorkerError::Cancelled,
            },
        };

        // Settle the slot before publishing, so a consumer reacting to this
        // completion already sees it idle
        {
            let mut slot = shared.lock();
            next = slot.pending.take();
            if next.is_none() {
                slot.busy = false;
            }
        }

        if completions.send(completion).is_err() {
            debug!("Completion consumer gone, stopping recompute worker");
            break;
        }
    }
    debug!("Recompute worker stopped");
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
