use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::pipeline::{derive_view, EnrichmentPipeline, FilterCriteria, PipelineEvent, RunId, RunSummary};
use crate::types::EnrichedContact;

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Loading,
    Complete,
    Failed,
}

impl RunStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Failed)
    }
}

/// Published view of the latest run. Cheap to clone; the contact list is shared.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub run_id: RunId,
    pub status: RunStatus,
    /// Contacts expected in this run, known once the fetch succeeded
    pub total: Option<usize>,
    pub contacts: Arc<Vec<EnrichedContact>>,
    pub error: Option<FetchError>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    pub fn idle() -> Self {
        Self {
            run_id: 0,
            status: RunStatus::Idle,
            total: None,
            contacts: Arc::new(Vec::new()),
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Reset for a newer run. Older run ids are ignored.
    pub fn begin(&mut self, run_id: RunId) -> bool {
        if run_id <= self.run_id {
            return false;
        }
        *self = Self { run_id, status: RunStatus::Loading, ..Self::idle() };
        true
    }

    /// Apply a pipeline event; events from any other run are discarded
    pub fn apply(&mut self, event: PipelineEvent) -> bool {
        if event.run_id() != self.run_id {
            debug!("Discarding event from superseded run {}", event.run_id());
            return false;
        }
        match event {
            PipelineEvent::Started { total, .. } => self.total = Some(total),
            PipelineEvent::Snapshot { contacts, .. } => {
                // snapshots only ever grow within a run
                if contacts.len() < self.contacts.len() {
                    return false;
                }
                self.contacts = contacts;
            }
            PipelineEvent::Completed { .. } => self.status = RunStatus::Complete,
            PipelineEvent::Failed { error, .. } => {
                self.status = RunStatus::Failed;
                self.contacts = Arc::new(Vec::new());
                self.error = Some(error);
            }
        }
        self.updated_at = Utc::now();
        true
    }

    pub fn view(&self, criteria: &FilterCriteria) -> Vec<&EnrichedContact> {
        derive_view(&self.contacts, criteria)
    }
}

/// Owner of the published contact state.
///
/// Runs send events over a channel; a single subscriber task folds them into
/// a `watch` channel that readers clone from. Starting a new run supersedes
/// (and aborts) the previous one.
#[derive(Clone)]
pub struct ContactSession {
    inner: Arc<Inner>,
}

struct Inner {
    pipeline: Arc<EnrichmentPipeline>,
    next_run: AtomicU64,
    state_tx: watch::Sender<SessionState>,
    events_tx: mpsc::Sender<PipelineEvent>,
    in_flight: Mutex<Option<JoinHandle<RunSummary>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.in_flight.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl ContactSession {
    /// Create the session and spawn its event subscriber. Requires a Tokio runtime.
    pub fn start(pipeline: Arc<EnrichmentPipeline>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::idle());
        let (events_tx, mut events_rx) = mpsc::channel::<PipelineEvent>(EVENT_BUFFER);

        let inner = Arc::new(Inner {
            pipeline,
            next_run: AtomicU64::new(1),
            state_tx,
            events_tx,
            in_flight: Mutex::new(None),
        });

        // Hold only a weak handle so dropping the last session ends the loop
        let weak = Arc::downgrade(&inner);
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                inner.state_tx.send_if_modified(|state| state.apply(event));
            }
        });

        Self { inner }
    }

    /// Start a new fetch-and-enrich run, superseding any run in flight
    pub fn refresh(&self) -> RunId {
        let mut slot = self.inner.in_flight.lock().unwrap_or_else(|p| p.into_inner());

        let run_id = self.inner.next_run.fetch_add(1, Ordering::SeqCst);
        self.inner.state_tx.send_if_modified(|state| state.begin(run_id));

        if let Some(previous) = slot.take() {
            if !previous.is_finished() {
                info!("Superseding in-flight run with run {}", run_id);
            }
            previous.abort();
        }

        let pipeline = self.inner.pipeline.clone();
        let events = self.inner.events_tx.clone();
        *slot = Some(tokio::spawn(async move { pipeline.run(run_id, events).await }));

        info!("🚀 Started contact run {}", run_id);
        run_id
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.state_tx.borrow().clone()
    }

    /// Wait until the given run has completed or failed.
    ///
    /// Returns `None` if the run was superseded first.
    pub async fn wait_for_run(&self, run_id: RunId) -> Option<SessionState> {
        let mut rx = self.subscribe();
        let state = rx
            .wait_for(|s| s.run_id > run_id || (s.run_id == run_id && s.status.is_finished()))
            .await
            .ok()?
            .clone();
        (state.run_id == run_id).then_some(state)
    }
}
