//! # Async Delivery Client
//!
//! One tokio worker draining an unbounded FIFO queue of [`DeliveryTask`]s.
//!
//! ```text
//! enqueue() ──mpsc──→ [worker] ──post_json──→ receiver
//!                         │ failure
//!                         └──→ one retry, fresh window ──→ delivered | dropped
//! ```
//!
//! - Tasks are sent strictly in submission order; a retry delays later tasks.
//! - Retry state lives in the task being sent, never across tasks.
//! - `stop()` closes the queue, lets the worker finish everything already
//!   queued, and joins it.

use parking_lot::Mutex;
use reqwest::Url;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use watcher_telemetry::metrics::{DELIVERIES_DROPPED, DELIVERIES_SUCCEEDED, DELIVERY_ATTEMPTS};

use crate::domain::{
    DeliveryError, DeliveryTask, Message, WatcherError, MAX_SEND_ATTEMPTS, SEND_TIMEOUT,
};
use crate::ports::{HttpTransport, NotificationSink};

/// Snapshot of delivery counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryStats {
    /// Tasks accepted into the queue.
    pub enqueued: u64,
    /// Send attempts, first tries and retries.
    pub attempts: u64,
    /// Tasks the receiver accepted.
    pub delivered: u64,
    /// Tasks given up on after the last attempt, or abandoned unsent.
    pub dropped: u64,
    /// Tasks refused because the client was stopped.
    pub rejected: u64,
}

#[derive(Default)]
struct DeliveryCounters {
    enqueued: AtomicU64,
    attempts: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
}

impl DeliveryCounters {
    fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

pub struct HttpAsyncClient {
    /// `None` once stopped.
    sender: Mutex<Option<mpsc::UnboundedSender<DeliveryTask>>>,
    /// Held until `start` hands it to the worker.
    receiver: Mutex<Option<mpsc::UnboundedReceiver<DeliveryTask>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    transport: Arc<dyn HttpTransport>,
    counters: Arc<DeliveryCounters>,
    /// Window granted to a retry.
    send_window: Duration,
}

impl HttpAsyncClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_send_window(transport, SEND_TIMEOUT)
    }

    pub fn with_send_window(transport: Arc<dyn HttpTransport>, send_window: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
            worker: Mutex::new(None),
            transport,
            counters: Arc::new(DeliveryCounters::default()),
            send_window,
        }
    }

    /// Spawn the worker on the current tokio runtime.
    ///
    /// Tasks queued before `start` are sent first.
    pub fn start(&self) -> Result<(), WatcherError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| WatcherError::NoRuntime(e.to_string()))?;
        let Some(receiver) = self.receiver.lock().take() else {
            return Err(WatcherError::AlreadyRunning);
        };

        let handle = runtime.spawn(run_worker(
            receiver,
            Arc::clone(&self.transport),
            Arc::clone(&self.counters),
        ));
        *self.worker.lock() = Some(handle);
        info!("Delivery worker started");
        Ok(())
    }

    /// Close the queue, deliver what is already queued and join the worker.
    ///
    /// If the worker never started, queued tasks are dropped.
    pub async fn stop(&self) {
        let sender = self.sender.lock().take();
        drop(sender);

        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                error!(error = %e, "Delivery worker terminated abnormally");
            }
            info!("Delivery worker stopped");
            return;
        }

        let receiver = self.receiver.lock().take();
        if let Some(mut receiver) = receiver {
            let mut abandoned = 0u64;
            while receiver.try_recv().is_ok() {
                abandoned += 1;
            }
            if abandoned > 0 {
                self.counters.dropped.fetch_add(abandoned, Ordering::Relaxed);
                DELIVERIES_DROPPED.inc_by(abandoned);
                warn!(abandoned, "Delivery client stopped before start, queued messages dropped");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
            && self
                .worker
                .lock()
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    pub fn stats(&self) -> DeliveryStats {
        self.counters.snapshot()
    }
}

impl NotificationSink for HttpAsyncClient {
    fn enqueue(&self, destination: &Url, message: Message, deadline: Instant) {
        let task = DeliveryTask::new(destination.clone(), message, deadline, self.send_window);
        let task_id = task.id;

        let sent = match self.sender.lock().as_ref() {
            Some(sender) => sender.send(task).is_ok(),
            None => false,
        };

        if sent {
            self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
            debug!(task = %task_id, destination = %destination, "Delivery task queued");
        } else {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(task = %task_id, destination = %destination, "Delivery client stopped, dropping message");
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<DeliveryTask>,
    transport: Arc<dyn HttpTransport>,
    counters: Arc<DeliveryCounters>,
) {
    while let Some(task) = receiver.recv().await {
        deliver(transport.as_ref(), &counters, task).await;
    }
    debug!("Delivery queue closed and drained");
}

/// Send one task: a first attempt plus at most one retry.
async fn deliver(transport: &dyn HttpTransport, counters: &DeliveryCounters, task: DeliveryTask) {
    let body = match serde_json::to_vec(&task.payload) {
        Ok(body) => body,
        Err(e) => {
            error!(task = %task.id, error = %e, "Cannot serialize message, dropping");
            counters.dropped.fetch_add(1, Ordering::Relaxed);
            DELIVERIES_DROPPED.inc();
            return;
        }
    };

    let mut deadline = task.deadline;
    for attempt in 1..=MAX_SEND_ATTEMPTS {
        counters.attempts.fetch_add(1, Ordering::Relaxed);
        DELIVERY_ATTEMPTS.inc();

        let result = match deadline.checked_duration_since(Instant::now()) {
            Some(remaining) if !remaining.is_zero() => {
                transport
                    .post_json(&task.destination, body.clone(), remaining)
                    .await
            }
            _ => Err(DeliveryError::DeadlineExceeded),
        };

        match result {
            Ok(()) => {
                counters.delivered.fetch_add(1, Ordering::Relaxed);
                DELIVERIES_SUCCEEDED.inc();
                debug!(
                    task = %task.id,
                    attempt,
                    actions = task.payload.len(),
                    "Notification delivered"
                );
                return;
            }
            Err(error) if attempt < MAX_SEND_ATTEMPTS && error.is_transient() => {
                warn!(
                    task = %task.id,
                    attempt,
                    destination = %task.destination,
                    %error,
                    "Send failed, retrying"
                );
                deadline = Instant::now() + task.window;
            }
            Err(error) => {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                DELIVERIES_DROPPED.inc();
                warn!(
                    task = %task.id,
                    attempt,
                    destination = %task.destination,
                    actions = task.payload.len(),
                    transient = error.is_transient(),
                    %error,
                    "Send failed, dropping message"
                );
                return;
            }
        }
    }
}
