//! Background export worker
//!
//! A single thread drains a queue of export jobs so a UI stays responsive
//! while files are written. Submitting a job snapshots the watermark config
//! and export settings; later edits to the live session do not reach a job
//! that is already queued or running.

use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::pipeline::{export_batch, CancelFlag, ExportEvent};
use super::settings::ExportSettings;
use crate::watermark::{RenderContext, WatermarkConfig};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Export worker is not running")]
    Stopped,

    #[error("Failed to spawn export worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Immutable snapshot of everything a queued export needs
#[derive(Debug)]
pub struct ExportJob {
    pub id: Uuid,
    pub sources: Vec<PathBuf>,
    pub config: WatermarkConfig,
    pub settings: ExportSettings,
    cancel: CancelFlag,
    events: Sender<ExportEvent>,
}

/// Caller side of a submitted job
#[derive(Debug)]
pub struct JobHandle {
    id: Uuid,
    cancel: CancelFlag,
    events: Receiver<ExportEvent>,
}

impl JobHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request cancellation; the job stops before its next file.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn events(&self) -> &Receiver<ExportEvent> {
        &self.events
    }

    /// Block until the job is done and return all of its events.
    pub fn wait(self) -> Vec<ExportEvent> {
        self.events.iter().collect()
    }
}

pub struct ExportWorker {
    queue: Mutex<Option<Sender<ExportJob>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ExportWorker {
    /// Start the worker thread.
    pub fn spawn(ctx: Arc<RenderContext>) -> Result<Self, WorkerError> {
        Self::start(move |job, emit| {
            export_batch(
                &job.sources,
                &job.config,
                &job.settings,
                &ctx,
                &job.cancel,
                emit,
            );
        })
    }

    fn start<F>(execute: F) -> Result<Self, WorkerError>
    where
        F: FnMut(&ExportJob, &mut dyn FnMut(ExportEvent)) + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<ExportJob>();

        let thread = thread::Builder::new()
            .name("export-worker".to_string())
            .spawn(move || run(receiver, execute))?;

        Ok(Self {
            queue: Mutex::new(Some(sender)),
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Queue an export of `sources` with copies of `config` and `settings`.
    pub fn submit(
        &self,
        sources: Vec<PathBuf>,
        config: &WatermarkConfig,
        settings: &ExportSettings,
    ) -> Result<JobHandle, WorkerError> {
        let (events_tx, events_rx) = mpsc::channel();
        let cancel = CancelFlag::new();
        let job = ExportJob {
            id: Uuid::new_v4(),
            sources,
            config: config.clone(),
            settings: settings.clone(),
            cancel: cancel.clone(),
            events: events_tx,
        };
        let id = job.id;
        let files = job.sources.len();

        let queue = self.queue.lock();
        let sender = queue.as_ref().ok_or(WorkerError::Stopped)?;
        sender.send(job).map_err(|_| WorkerError::Stopped)?;
        debug!(job_id = %id, files, "Queued export job");

        Ok(JobHandle {
            id,
            cancel,
            events: events_rx,
        })
    }

    /// Stop accepting jobs, finish the queued ones and join the thread.
    pub fn shutdown(&self) {
        self.queue.lock().take();
        if let Some(thread) = self.thread.lock().take() {
            if thread.join().is_err() {
                tracing::error!("Export worker thread panicked");
            }
        }
    }
}

impl Drop for ExportWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<F>(jobs: Receiver<ExportJob>, mut execute: F)
where
    F: FnMut(&ExportJob, &mut dyn FnMut(ExportEvent)),
{
    info!("Export worker started");

    for job in jobs {
        info!(job_id = %job.id, files = job.sources.len(), "Running export job");
        // A dropped handle only means nobody is listening
        let mut emit = |event| {
            let _ = job.events.send(event);
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| execute(&job, &mut emit)));

        if let Err(payload) = outcome {
            let message = panic_message(payload.as_ref());
            error!(job_id = %job.id, error = %message, "Export job panicked");
            let _ = job.events.send(ExportEvent::Aborted { message });
        }
    }

    info!("Export worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        format!("Export job panicked: {}", text)
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("Export job panicked: {}", text)
    } else {
        "Export job panicked".to_string()
    }
}
