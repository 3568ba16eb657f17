use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use thiserror::Error;

use crate::pipeline::lip_reading_pipeline::{LipReadingPipeline, TickOutcome};
use crate::pipeline::pipeline_controller::PipelineController;
use crate::shared::error::PipelineError;
use crate::shared::raw_frame::RawFrame;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("frame worker is no longer running")]
    Disconnected,
    #[error("frame worker panicked")]
    Panicked,
}

/// Result of one tick, tagged with the frame it came from.
#[derive(Debug)]
pub struct TickReport {
    pub index: usize,
    pub outcome: Result<TickOutcome, PipelineError>,
}

/// Runs a [`LipReadingPipeline`] on a dedicated thread with camera-style
/// backpressure: at most one frame waits while a tick is running, and a
/// newer frame replaces it.
///
/// Layout: `submit → [slot of 1] → worker (process_frame) → reports`
pub struct LatestFrameWorker {
    frame_tx: Option<Sender<RawFrame>>,
    // Producer-side handle on the slot, used to evict a stale frame.
    evict_rx: Receiver<RawFrame>,
    report_rx: Receiver<TickReport>,
    controller: Arc<PipelineController>,
    dropped: AtomicUsize,
    handle: Option<JoinHandle<LipReadingPipeline>>,
}

impl LatestFrameWorker {
    pub fn spawn(pipeline: LipReadingPipeline) -> Self {
        let controller = Arc::clone(pipeline.controller());
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<RawFrame>(1);
        let (report_tx, report_rx) = crossbeam_channel::unbounded::<TickReport>();
        let evict_rx = frame_rx.clone();

        let handle = spawn_worker(pipeline, frame_rx, report_tx);

        Self {
            frame_tx: Some(frame_tx),
            evict_rx,
            report_rx,
            controller,
            dropped: AtomicUsize::new(0),
            handle: Some(handle),
        }
    }

    /// Hands a frame to the worker without blocking.
    ///
    /// If an earlier frame is still waiting it is discarded and counted as
    /// dropped. Intended for a single producer.
    pub fn submit(&mut self, frame: RawFrame) -> Result<(), WorkerError> {
        if self.handle.as_ref().map_or(true, |h| h.is_finished()) {
            return Err(WorkerError::Disconnected);
        }
        let tx = self.frame_tx.as_ref().ok_or(WorkerError::Disconnected)?;

        let mut frame = frame;
        loop {
            match tx.try_send(frame) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(rejected)) => {
                    // The worker may have taken the waiting frame in the meantime;
                    // then the slot is free and the next attempt succeeds.
                    if let Ok(stale) = self.evict_rx.try_recv() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        log::debug!("Dropping frame {} for frame {}", stale.index, rejected.index);
                    }
                    frame = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return Err(WorkerError::Disconnected),
            }
        }
    }

    /// Shared controller, for `start`/`stop` from the caller's thread.
    pub fn controller(&self) -> &Arc<PipelineController> {
        &self.controller
    }

    /// Frames replaced before the worker got to them.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Tick reports produced so far, without waiting.
    pub fn drain_reports(&self) -> Vec<TickReport> {
        self.report_rx.try_iter().collect()
    }

    /// Blocking access to the report stream.
    pub fn reports(&self) -> &Receiver<TickReport> {
        &self.report_rx
    }

    /// Lets the worker finish any waiting frame, joins it and returns the
    /// pipeline with the reports not yet drained.
    pub fn shutdown(mut self) -> Result<(LipReadingPipeline, Vec<TickReport>), WorkerError> {
        drop(self.frame_tx.take());
        let handle = self.handle.take().ok_or(WorkerError::Disconnected)?;
        let pipeline = handle.join().map_err(|_| WorkerError::Panicked)?;
        Ok((pipeline, self.drain_reports()))
    }
}

fn spawn_worker(
    mut pipeline: LipReadingPipeline,
    frame_rx: Receiver<RawFrame>,
    report_tx: Sender<TickReport>,
) -> JoinHandle<LipReadingPipeline> {
    std::thread::spawn(move || {
        for frame in frame_rx.iter() {
            let outcome = pipeline.process_frame(&frame);
            // Nobody listening is fine; keep ticking until the producer hangs up.
            let _ = report_tx.send(TickReport {
                index: frame.index,
                outcome,
            });
        }
        pipeline
    })
}
