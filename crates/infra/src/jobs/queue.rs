//! Bounded dispatch queue between the registry and the executor.
//!
//! A tokio `mpsc` channel. Senders are cloned per producer; the receiver is
//! shared behind an async mutex so several consumers can drain the same queue.
//! Dequeue order is enqueue order.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use jobhub_core::Job;

/// Default number of jobs the queue buffers before producers wait.
pub const DEFAULT_QUEUE_CAPACITY: usize = 5;

/// Create a bounded dispatch queue.
///
/// A capacity of zero is raised to one; configuration rejects it earlier.
pub fn dispatch_queue(capacity: usize) -> (DispatchSender, DispatchReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        DispatchSender { tx },
        DispatchReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer side of the dispatch queue.
#[derive(Debug, Clone)]
pub struct DispatchSender {
    tx: mpsc::Sender<Job>,
}

impl DispatchSender {
    /// Push a job, waiting while the queue is full.
    ///
    /// Gives the job back when every receiver has been dropped.
    pub async fn submit(&self, job: Job) -> Result<(), Job> {
        self.tx.send(job).await.map_err(|e| e.0)
    }

    /// Wait for a free slot and hold it until the permit is used or dropped.
    ///
    /// Fails when every receiver has been dropped.
    pub async fn reserve(&self) -> Result<DispatchPermit<'_>, QueueClosed> {
        self.tx
            .reserve()
            .await
            .map(|permit| DispatchPermit { permit })
            .map_err(|_| QueueClosed)
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The receiving side of the dispatch queue is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

/// A reserved queue slot. Dropping it unused frees the slot.
#[derive(Debug)]
pub struct DispatchPermit<'a> {
    permit: mpsc::Permit<'a, Job>,
}

impl DispatchPermit<'_> {
    /// Enqueue `job` into the reserved slot; never waits.
    pub fn send(self, job: Job) {
        self.permit.send(job);
    }
}

/// Consumer side of the dispatch queue.
#[derive(Debug, Clone)]
pub struct DispatchReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl DispatchReceiver {
    /// Next job in enqueue order, or `None` once every sender is gone and the
    /// buffer is empty.
    pub async fn next(&self) -> Option<Job> {
        self.rx.lock().await.recv().await
    }
}
