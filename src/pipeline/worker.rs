//! Background pipeline worker.
//!
//! [`PipelineWorker`] moves a [`Pipeline`] onto its own thread and feeds it
//! messages over a channel, so state mutations are serialized without any
//! locking. Decoding and rendering run on a dedicated rayon pool and post
//! their results back to that thread tagged with a ticket. A result whose
//! ticket is no longer the latest is dropped, so the last request wins no
//! matter in which order the jobs finish.

use crate::core::error::{DecodeError, InstafilterError, InstafilterResult, RangeError};
use crate::core::types::{FilterKind, ParameterName, SourceImage};
use crate::pipeline::{decode, Observers, Pipeline, PipelineEvent, PipelineSnapshot, RenderOutcome};
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use log::{debug, error, info};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::thread::{self, JoinHandle};

/// Default number of render threads.
pub const DEFAULT_WORKER_THREADS: usize = 2;

enum Message {
    Load(Vec<u8>),
    Decoded {
        ticket: u64,
        result: Result<SourceImage, DecodeError>,
    },
    SetFilter(FilterKind),
    SetParameter {
        name: ParameterName,
        value: f64,
        reply: Sender<Result<(), RangeError>>,
    },
    Recompute,
    Rendered(RenderOutcome),
    Snapshot(Sender<PipelineSnapshot>),
    Flush(Sender<()>),
    Shutdown,
}

/// Handle to a pipeline running on a background thread.
pub struct PipelineWorker {
    sender: Sender<Message>,
    observers: Observers,
    handle: Option<JoinHandle<()>>,
}

impl PipelineWorker {
    /// Start a worker with [`DEFAULT_WORKER_THREADS`] render threads.
    pub fn spawn(pipeline: Pipeline) -> InstafilterResult<Self> {
        Self::with_threads(pipeline, DEFAULT_WORKER_THREADS)
    }

    /// Start a worker with `threads` render threads (at least one).
    pub fn with_threads(pipeline: Pipeline, threads: usize) -> InstafilterResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("instafilter-render-{}", i))
            .build()
            .map_err(|e| InstafilterError::Worker(e.to_string()))?;

        let (sender, receiver) = unbounded();
        let observers = pipeline.observers().clone();
        let actor = Actor {
            pipeline,
            pool,
            sender: sender.clone(),
            load_ticket: 0,
            in_flight: 0,
            flush_waiters: Vec::new(),
        };

        let handle = thread::Builder::new()
            .name("instafilter-pipeline".to_string())
            .spawn(move || actor.run(receiver))?;

        info!("Pipeline worker started with {} render threads", threads.max(1));
        Ok(Self {
            sender,
            observers,
            handle: Some(handle),
        })
    }

    /// Decode `bytes` in the background and install them as the source.
    ///
    /// A decode failure is reported as [`PipelineEvent::DecodeFailed`] and
    /// leaves the previous source and output in place. If another load is
    /// requested before this one finishes, this one is discarded.
    pub fn load_source(&self, bytes: Vec<u8>) -> InstafilterResult<()> {
        self.send(Message::Load(bytes))
    }

    /// Replace the current filter and recompute in the background.
    pub fn set_filter_kind(&self, kind: FilterKind) -> InstafilterResult<()> {
        self.send(Message::SetFilter(kind))
    }

    /// Update one slider and recompute in the background.
    ///
    /// Range validation happens before this returns.
    pub fn set_parameter(&self, name: ParameterName, value: f64) -> InstafilterResult<()> {
        let (reply, response) = bounded(1);
        self.send(Message::SetParameter { name, value, reply })?;
        response.recv().map_err(|e| InstafilterError::Worker(e.to_string()))??;
        Ok(())
    }

    /// Recompute the output in the background.
    pub fn recompute(&self) -> InstafilterResult<()> {
        self.send(Message::Recompute)
    }

    /// Capture the observable state as of all messages sent so far.
    ///
    /// Jobs still running are not waited for; use [`flush`](Self::flush)
    /// first to see their results.
    pub fn snapshot(&self) -> InstafilterResult<PipelineSnapshot> {
        let (reply, response) = bounded(1);
        self.send(Message::Snapshot(reply))?;
        response.recv().map_err(|e| InstafilterError::Worker(e.to_string()))
    }

    /// Block until no decode or render is in flight.
    pub fn flush(&self) -> InstafilterResult<()> {
        let (reply, response) = bounded(1);
        self.send(Message::Flush(reply))?;
        response.recv().map_err(|e| InstafilterError::Worker(e.to_string()))
    }

    /// Subscribe to pipeline events.
    ///
    /// Callbacks run on the worker thread.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback);
    }

    /// Stop the worker and wait for its thread to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn send(&self, message: Message) -> InstafilterResult<()> {
        self.sender
            .send(message)
            .map_err(|_| InstafilterError::Worker("pipeline thread has exited".to_string()))
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.sender.send(Message::Shutdown);
            if handle.join().is_err() {
                error!("Pipeline worker thread panicked");
            }
        }
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PipelineWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineWorker")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

/// State owned by the worker thread.
struct Actor {
    pipeline: Pipeline,
    pool: ThreadPool,
    sender: Sender<Message>,
    load_ticket: u64,
    in_flight: usize,
    flush_waiters: Vec<Sender<()>>,
}

impl Actor {
    fn run(mut self, receiver: Receiver<Message>) {
        while let Ok(message) = receiver.recv() {
            if !self.handle(message) {
                break;
            }
            if self.in_flight == 0 {
                for waiter in self.flush_waiters.drain(..) {
                    let _ = waiter.send(());
                }
            }
        }
        debug!("Pipeline worker stopped");
    }

    /// Returns `false` on shutdown.
    fn handle(&mut self, message: Message) -> bool {
        match message {
            Message::Load(bytes) => self.spawn_decode(bytes),
            Message::Decoded { ticket, result } => {
                self.in_flight -= 1;
                if ticket != self.load_ticket {
                    debug!("Dropping stale decode {} (latest is {})", ticket, self.load_ticket);
                    return true;
                }
                match result {
                    Ok(source) => {
                        self.pipeline.install_source(source);
                        self.spawn_render();
                    }
                    Err(error) => self.pipeline.report_decode_failure(&error),
                }
            }
            Message::SetFilter(kind) => {
                self.pipeline.select_filter(kind);
                self.spawn_render();
            }
            Message::SetParameter { name, value, reply } => {
                let result = self.pipeline.assign_parameter(name, value);
                let accepted = result.is_ok();
                let _ = reply.send(result);
                if accepted {
                    self.spawn_render();
                }
            }
            Message::Recompute => self.spawn_render(),
            Message::Rendered(outcome) => {
                self.in_flight -= 1;
                self.pipeline.commit_render(outcome);
            }
            Message::Snapshot(reply) => {
                let _ = reply.send(self.pipeline.snapshot());
            }
            Message::Flush(reply) => self.flush_waiters.push(reply),
            Message::Shutdown => return false,
        }
        true
    }

    fn spawn_decode(&mut self, bytes: Vec<u8>) {
        self.load_ticket += 1;
        self.in_flight += 1;

        let ticket = self.load_ticket;
        let decoder = self.pipeline.decoder();
        let sender = self.sender.clone();
        self.pool.spawn(move || {
            let result = decode::decode_guarded(decoder.as_ref(), &bytes);
            let _ = sender.send(Message::Decoded { ticket, result });
        });
    }

    fn spawn_render(&mut self) {
        let Some(job) = self.pipeline.prepare_render() else {
            return;
        };
        self.in_flight += 1;

        let engine = self.pipeline.engine();
        let sender = self.sender.clone();
        self.pool.spawn(move || {
            let outcome = job.run(engine.as_ref());
            let _ = sender.send(Message::Rendered(outcome));
        });
    }
}
