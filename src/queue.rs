//! In-memory background generation: a job store plus a single worker that
//! drains an unbounded channel and runs one generation at a time on the
//! blocking pool.

use crate::data::{GeneratedReport, GenerationResult, SchedulingInput, StoredEntry, TimetableId};
use crate::error::GenerationError;
use crate::solver::{self, CancellationToken};
use log::{error, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;

const NO_SOLUTION_MESSAGE: &str = "Scheduling algorithm could not find a valid solution.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimetableStatus {
    Generating,
    Draft,
    Failed,
}

/// A timetable as seen by API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timetable {
    pub id: TimetableId,
    pub status: TimetableStatus,
    /// Last reported search progress; it can move backwards while generating.
    pub progress: u32,
    pub quality_score: Option<f64>,
    pub error_message: Option<String>,
    pub entries: Vec<StoredEntry>,
    pub reports: Vec<GeneratedReport>,
}

impl Timetable {
    fn generating(id: TimetableId) -> Self {
        Self {
            id,
            status: TimetableStatus::Generating,
            progress: 0,
            quality_score: None,
            error_message: None,
            entries: Vec::new(),
            reports: Vec::new(),
        }
    }
}

struct Job {
    timetable: Timetable,
    input: Arc<SchedulingInput>,
    cancellation: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Requested,
    NotGenerating,
    NotFound,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("the generation worker has stopped")]
    WorkerStopped,
}

/// Timetables and their generation jobs, keyed by id.
#[derive(Default)]
pub struct TimetableStore {
    jobs: RwLock<HashMap<TimetableId, Job>>,
    next_id: AtomicU32,
}

impl TimetableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&self, input: Arc<SchedulingInput>) -> (TimetableId, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let cancellation = CancellationToken::new();
        self.jobs.write().insert(
            id,
            Job {
                timetable: Timetable::generating(id),
                input,
                cancellation: cancellation.clone(),
            },
        );
        (id, cancellation)
    }

    pub fn get(&self, id: TimetableId) -> Option<Timetable> {
        self.jobs.read().get(&id).map(|job| job.timetable.clone())
    }

    /// The input snapshot a timetable was generated from.
    pub fn input(&self, id: TimetableId) -> Option<Arc<SchedulingInput>> {
        self.jobs.read().get(&id).map(|job| job.input.clone())
    }

    pub fn cancel(&self, id: TimetableId) -> CancelOutcome {
        match self.jobs.read().get(&id) {
            None => CancelOutcome::NotFound,
            Some(job) if job.timetable.status != TimetableStatus::Generating => {
                CancelOutcome::NotGenerating
            }
            Some(job) => {
                job.cancellation.cancel();
                CancelOutcome::Requested
            }
        }
    }

    fn set_progress(&self, id: TimetableId, percent: u32) {
        if let Some(job) = self.jobs.write().get_mut(&id) {
            job.timetable.progress = percent;
        }
    }

    fn complete(&self, id: TimetableId, outcome: Result<GenerationResult, GenerationError>) {
        let mut jobs = self.jobs.write();
        let Some(job) = jobs.get_mut(&id) else {
            warn!("Timetable {id} disappeared before its generation finished.");
            return;
        };
        let timetable = &mut job.timetable;
        match outcome {
            Ok(result) => {
                timetable.reports = result.reports;
                if result.success {
                    timetable.status = TimetableStatus::Draft;
                    timetable.progress = 100;
                    timetable.quality_score = result.quality_score;
                    timetable.entries = (1..)
                        .zip(result.entries)
                        .map(|(id, lesson)| StoredEntry { id, lesson })
                        .collect();
                } else {
                    timetable.status = TimetableStatus::Failed;
                    timetable.error_message = Some(NO_SOLUTION_MESSAGE.to_string());
                }
            }
            Err(e) => {
                timetable.status = TimetableStatus::Failed;
                timetable.error_message = Some(e.to_string());
            }
        }
        info!(
            "Timetable {} generation completed with status {:?}.",
            id, timetable.status
        );
    }

    fn fail(&self, id: TimetableId, message: String) {
        if let Some(job) = self.jobs.write().get_mut(&id) {
            job.timetable.status = TimetableStatus::Failed;
            job.timetable.error_message = Some(message);
        }
    }
}

struct GenerationRequest {
    timetable_id: TimetableId,
    input: Arc<SchedulingInput>,
    cancellation: CancellationToken,
}

/// Accepts generation requests and hands them to the background worker.
#[derive(Clone)]
pub struct GenerationQueue {
    sender: mpsc::UnboundedSender<GenerationRequest>,
    store: Arc<TimetableStore>,
}

impl GenerationQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn start(store: Arc<TimetableStore>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(receiver, store.clone()));
        Self { sender, store }
    }

    pub fn store(&self) -> &Arc<TimetableStore> {
        &self.store
    }

    /// Registers a new timetable in `Generating` state and queues its generation.
    pub fn enqueue(&self, input: SchedulingInput) -> Result<TimetableId, QueueError> {
        let input = Arc::new(input);
        let (timetable_id, cancellation) = self.store.create(input.clone());
        let request = GenerationRequest {
            timetable_id,
            input,
            cancellation,
        };
        if self.sender.send(request).is_err() {
            self.store.fail(timetable_id, QueueError::WorkerStopped.to_string());
            return Err(QueueError::WorkerStopped);
        }
        Ok(timetable_id)
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<GenerationRequest>,
    store: Arc<TimetableStore>,
) {
    info!("Timetable generation worker started.");
    while let Some(request) = receiver.recv().await {
        let id = request.timetable_id;
        info!("Starting generation for timetable {id}.");
        let job_store = store.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let progress = |percent: u32| job_store.set_progress(id, percent);
            solver::generate(&request.input, Some(&progress), &request.cancellation)
        })
        .await;

        match outcome {
            Ok(result) => store.complete(id, result),
            Err(e) => {
                error!("Generation task for timetable {id} panicked: {e}");
                store.fail(id, e.to_string());
            }
        }
    }
    info!("Timetable generation worker stopped.");
}
