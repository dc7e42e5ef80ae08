//! Fixed-size worker pool that runs the blocking pipeline off the async
//! runtime.
//!
//! Workers are dedicated OS threads, each holding its own clone of the
//! receiving end of an unbounded crossbeam channel. Each submitted request
//! becomes a job carrying a oneshot reply channel.
//! The caller holds an [`AnalysisTicket`] (the receiving half) and awaits it.
//! Dropping the ticket abandons the result: a worker that dequeues a job
//! whose ticket is gone skips it, and a job already running finishes and its
//! send fails silently. Inference itself is never interrupted.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::{Context as _, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use journal_common::{AnalysisError, AnalysisRequest, AnalysisResult};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::orchestrator::AnalysisPipeline;

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 2;

type Outcome = Result<AnalysisResult, AnalysisError>;

struct Job {
    request: AnalysisRequest,
    reply: oneshot::Sender<Outcome>,
    enqueued_at: Instant,
}

pub struct AnalysisExecutor {
    queue: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl AnalysisExecutor {
    /// Spawn `size` worker threads (at least one) sharing `pipeline`.
    pub fn new(pipeline: Arc<AnalysisPipeline>, size: usize) -> Result<Self> {
        let size = size.max(1);
        let (tx, rx) = unbounded::<Job>();

        let workers = (0..size)
            .map(|id| {
                let rx = rx.clone();
                let pipeline = pipeline.clone();
                std::thread::Builder::new()
                    .name(format!("analysis-worker-{id}"))
                    .spawn(move || worker_loop(id, rx, pipeline))
                    .with_context(|| format!("Failed to spawn analysis worker {id}"))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(workers = size, "Analysis executor started");

        Ok(Self {
            queue: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_closed(&self) -> bool {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    /// Queue `request` for analysis. Never blocks; the ticket resolves to
    /// [`AnalysisError::ExecutorClosed`] once the pool is shut down.
    pub fn submit(&self, request: AnalysisRequest) -> AnalysisTicket {
        let (reply, rx) = oneshot::channel();
        let job = Job {
            request,
            reply,
            enqueued_at: Instant::now(),
        };

        let sender = self.queue.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let queued = sender.is_some_and(|tx| tx.send(job).is_ok());

        if queued {
            AnalysisTicket::pending(rx)
        } else {
            AnalysisTicket::closed()
        }
    }

    /// Stop accepting work, let workers drain queued jobs, then join them.
    /// Blocks the calling thread.
    pub fn shutdown(&self) {
        self.close();
        let workers: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for worker in workers {
            if worker.join().is_err() {
                error!("Analysis worker exited by panic");
            }
        }
        info!("Analysis executor stopped");
    }

    fn close(&self) {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl Drop for AnalysisExecutor {
    fn drop(&mut self) {
        // Closing the queue is enough; workers exit once it drains.
        self.close();
    }
}

/// Pending analysis result. Resolves once a worker finishes the job.
#[must_use = "an analysis ticket does nothing unless awaited"]
pub struct AnalysisTicket {
    rx: Option<oneshot::Receiver<Outcome>>,
}

impl AnalysisTicket {
    fn pending(rx: oneshot::Receiver<Outcome>) -> Self {
        Self { rx: Some(rx) }
    }

    fn closed() -> Self {
        Self { rx: None }
    }
}

impl Future for AnalysisTicket {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.rx.as_mut() {
            Some(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(AnalysisError::ExecutorClosed))),
            None => Poll::Ready(Err(AnalysisError::ExecutorClosed)),
        }
    }
}

fn worker_loop(id: usize, queue: Receiver<Job>, pipeline: Arc<AnalysisPipeline>) {
    for job in queue.iter() {
        if job.reply.is_closed() {
            debug!(worker = id, "Skipping abandoned analysis job");
            continue;
        }

        let queued_ms = job.enqueued_at.elapsed().as_millis() as u64;
        debug!(worker = id, queued_ms, "Analysis job started");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| pipeline.analyze(&job.request)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                error!(worker = id, panic = %message, "Analysis job panicked");
                Err(AnalysisError::WorkerFailed(message))
            });

        if job.reply.send(outcome).is_err() {
            debug!(worker = id, "Analysis result discarded, ticket dropped");
        }
    }
    debug!(worker = id, "Analysis queue closed, worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
