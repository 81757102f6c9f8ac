//! Single-flight FIFO task runner.
//!
//! One worker drains the queue in order. After every task, whether it
//! succeeded, failed or panicked, the worker waits `spacing` before taking
//! the next one. A failing task is logged and never halts the queue.

use anyhow::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use uuid::Uuid;

type Job = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

struct QueuedTask {
    id: Uuid,
    label: &'static str,
    job: Job,
}

#[derive(Default)]
struct QueueState {
    pending: AtomicUsize,
    processing: AtomicBool,
}

pub struct RequestQueue {
    sender: mpsc::UnboundedSender<QueuedTask>,
    state: Arc<QueueState>,
    worker: JoinHandle<()>,
}

impl RequestQueue {
    /// Spawn the worker on the current tokio runtime.
    pub fn new(spacing: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = Arc::new(QueueState::default());
        let worker = tokio::spawn(drain(receiver, Arc::clone(&state), spacing));
        Self {
            sender,
            state,
            worker,
        }
    }

    /// Append a task. Returns its id for log correlation.
    ///
    /// Once enqueued a task always runs; there is no cancellation.
    pub fn enqueue<F>(&self, label: &'static str, task: F) -> Uuid
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        self.state.pending.fetch_add(1, Ordering::SeqCst);
        let queued = QueuedTask {
            id,
            label,
            job: Box::pin(task),
        };
        if self.sender.send(queued).is_err() {
            self.state.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::error!(task_id = %id, label, "Request queue worker is gone; task dropped");
        } else {
            tracing::debug!(task_id = %id, label, "Task enqueued");
        }
        id
    }

    /// Enqueue a task whose output is delivered through the returned receiver.
    ///
    /// The receiver errors if the task panicked.
    pub fn submit<T, F>(&self, label: &'static str, task: F) -> oneshot::Receiver<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.enqueue(label, async move {
            let output = task.await;
            // The caller may have stopped listening; the work still counts.
            let _ = tx.send(output);
            Ok(())
        });
        rx
    }

    /// Tasks waiting or running.
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::SeqCst)
    }

    pub fn is_processing(&self) -> bool {
        self.state.processing.load(Ordering::SeqCst)
    }

    /// Stop accepting tasks and wait for everything already queued.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.worker.await {
            tracing::warn!("Request queue worker ended abnormally: {e}");
        }
    }
}

async fn drain(
    mut receiver: mpsc::UnboundedReceiver<QueuedTask>,
    state: Arc<QueueState>,
    spacing: Duration,
) {
    while let Some(task) = receiver.recv().await {
        state.processing.store(true, Ordering::SeqCst);
        let QueuedTask { id, label, job } = task;
        tracing::debug!(task_id = %id, label, "Task started");

        // Run on its own task so a panic is contained and reported here.
        match tokio::spawn(job).await {
            Ok(Ok(())) => tracing::debug!(task_id = %id, label, "Task finished"),
            Ok(Err(e)) => tracing::warn!(task_id = %id, label, "Queued task failed: {e:#}"),
            Err(e) => tracing::warn!(task_id = %id, label, "Queued task panicked: {e}"),
        }

        state.pending.fetch_sub(1, Ordering::SeqCst);
        state.processing.store(false, Ordering::SeqCst);
        tokio::time::sleep(spacing).await;
    }
    tracing::debug!("Request queue drained and closed");
}
