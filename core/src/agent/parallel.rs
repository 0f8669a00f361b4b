use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{Agent, AgentRef};
use crate::message::Message;
use crate::{CascadeError, Result};

/// How long `close()` waits for the worker to finish queued work before
/// aborting it.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

struct WorkItem {
    topic: String,
    message: Message,
}

/// Decorates an agent with a bounded FIFO mailbox and a single dedicated
/// worker task.
///
/// Enqueueing into a full mailbox suspends the caller until the worker makes
/// room, which is the backpressure publishers feel. The worker delivers
/// messages to the inner agent strictly in enqueue order; the wrapper is the
/// only task that ever calls the inner agent's `on_message`, so unwrapped
/// agents need no internal synchronisation beyond their own state lock.
pub struct ParallelAgent {
    name: String,
    inner: AgentRef,
    tx: Mutex<Option<mpsc::Sender<WorkItem>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    drain_timeout: Duration,
}

impl ParallelAgent {
    /// Wrap `inner` and start the worker immediately.
    pub fn new(inner: AgentRef, capacity: usize) -> Self {
        Self::with_drain_timeout(inner, capacity, DRAIN_TIMEOUT)
    }

    /// Like [`ParallelAgent::new`], but with a custom bound on how long
    /// `close()` waits for the worker to drain.
    pub fn with_drain_timeout(inner: AgentRef, capacity: usize, drain_timeout: Duration) -> Self {
        let (tx, mut rx) = mpsc::channel::<WorkItem>(capacity.max(1));
        let name = inner.name().to_string();
        let worker_agent = Arc::clone(&inner);
        let worker = tokio::spawn(async move {
            while let Some(item) = rx.recv().await {
                worker_agent.on_message(&item.topic, item.message).await;
            }
        });
        Self {
            name,
            inner,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            drain_timeout,
        }
    }
}

#[async_trait]
impl Agent for ParallelAgent {
    fn name(&self) -> &str {
        &self.name
    }

    /// Forwarded to the inner agent on the caller's task, bypassing the
    /// mailbox. Callers needing atomicity with in-flight work must quiesce
    /// the fabric first.
    async fn reset(&self) {
        self.inner.reset().await;
    }

    async fn on_message(&self, topic: &str, msg: Message) {
        let tx = self.tx.lock().await.clone();
        let Some(tx) = tx else {
            debug!(agent = %self.name, topic, "mailbox closed, dropping message");
            return;
        };
        let item = WorkItem {
            topic: topic.to_string(),
            message: msg,
        };
        if tx.send(item).await.is_err() {
            debug!(agent = %self.name, topic, "mailbox closed during enqueue, dropping message");
        }
    }

    /// Stop accepting new work, let the worker drain what is queued, then
    /// close the inner agent. A worker that fails to drain within the drain
    /// timeout is aborted and reported as `DrainTimeout`.
    async fn close(&self) -> Result<()> {
        self.tx.lock().await.take();

        let mut drain_error = None;
        if let Some(handle) = self.worker.lock().await.take() {
            let abort = handle.abort_handle();
            match timeout(self.drain_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!(agent = %self.name, error = %join_err, "worker terminated abnormally");
                }
                Err(_) => {
                    abort.abort();
                    warn!(agent = %self.name, timeout = ?self.drain_timeout, "worker did not drain, aborted");
                    drain_error = Some(CascadeError::DrainTimeout(
                        self.name.clone(),
                        self.drain_timeout,
                    ));
                }
            }
        }

        self.inner.close().await?;
        match drain_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
