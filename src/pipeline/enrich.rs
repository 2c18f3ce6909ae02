use metrics::{counter, histogram};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::app::ports::ContactSourcePort;
use crate::error::FetchError;
use crate::metrics::{
    FETCH_ERRORS_TOTAL, PIPELINE_CONTACTS_ENRICHED_TOTAL, PIPELINE_RUNS_TOTAL,
    PIPELINE_RUN_DURATION_SECONDS,
};
use crate::pipeline::normalize::ContactNormalizer;
use crate::pipeline::resolver::CoordinateResolver;
use crate::types::{CoordinateSource, EnrichedContact};

/// Monotonically increasing identifier of one fetch-and-enrich run
pub type RunId = u64;

/// Messages emitted by a pipeline run, in order:
/// `Started`, one or more `Snapshot`s, `Completed`; or a lone `Failed`.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Started { run_id: RunId, total: usize },
    /// Immutable copy of everything enriched so far in this run
    Snapshot { run_id: RunId, contacts: Arc<Vec<EnrichedContact>> },
    Completed { run_id: RunId, total: usize },
    Failed { run_id: RunId, error: FetchError },
}

impl PipelineEvent {
    pub fn run_id(&self) -> RunId {
        match self {
            PipelineEvent::Started { run_id, .. }
            | PipelineEvent::Snapshot { run_id, .. }
            | PipelineEvent::Completed { run_id, .. }
            | PipelineEvent::Failed { run_id, .. } => *run_id,
        }
    }
}

/// Outcome of a complete pipeline run
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunSummary {
    pub run_id: RunId,
    pub total: usize,
    pub resolved: usize,
    pub fallback: usize,
    pub snapshots: usize,
    #[serde(
        rename = "error",
        serialize_with = "serialize_error_message",
        skip_serializing_if = "Option::is_none"
    )]
    pub fetch_error: Option<FetchError>,
    /// Set when the subscriber went away before the run finished
    pub abandoned: bool,
}

impl RunSummary {
    fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            total: 0,
            resolved: 0,
            fallback: 0,
            snapshots: 0,
            fetch_error: None,
            abandoned: false,
        }
    }
}

fn serialize_error_message<S: Serializer>(
    error: &Option<FetchError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Fetch → normalize → resolve, strictly one contact at a time.
///
/// The pipeline owns its accumulator; observers only ever see the cloned
/// snapshots it sends.
pub struct EnrichmentPipeline {
    source: Arc<dyn ContactSourcePort>,
    normalizer: ContactNormalizer,
    resolver: CoordinateResolver,
    publish_every: usize,
}

impl EnrichmentPipeline {
    pub fn new(
        source: Arc<dyn ContactSourcePort>,
        normalizer: ContactNormalizer,
        resolver: CoordinateResolver,
        publish_every: usize,
    ) -> Self {
        Self {
            source,
            normalizer,
            resolver,
            publish_every: publish_every.max(1),
        }
    }

    #[instrument(skip(self, events))]
    pub async fn run(&self, run_id: RunId, events: mpsc::Sender<PipelineEvent>) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::new(run_id);
        counter!(PIPELINE_RUNS_TOTAL).increment(1);

        info!("📡 Fetching contacts for run {}", run_id);
        let raw = match self.source.fetch_contacts().await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Error fetching contacts ({}): {}", e.kind(), e);
                counter!(FETCH_ERRORS_TOTAL, "kind" => e.kind()).increment(1);
                summary.fetch_error = Some(e.clone());
                if events.send(PipelineEvent::Failed { run_id, error: e }).await.is_err() {
                    summary.abandoned = true;
                }
                return summary;
            }
        };

        let contacts = self.normalizer.normalize_batch(&raw);
        let total = contacts.len();
        summary.total = total;
        info!("✅ Fetched {} contacts, starting enrichment", total);

        if events.send(PipelineEvent::Started { run_id, total }).await.is_err() {
            summary.abandoned = true;
            return summary;
        }

        let mut enriched: Vec<EnrichedContact> = Vec::with_capacity(total);
        if total == 0 {
            // observers still get one (empty) snapshot before completion
            if !self.publish(run_id, &enriched, &events, &mut summary).await {
                return summary;
            }
        }

        for contact in contacts {
            let (coordinates, source) = self.resolver.resolve_with_source(&contact.address).await;
            match source {
                CoordinateSource::Resolved => summary.resolved += 1,
                CoordinateSource::Fallback => {
                    debug!(contact_id = %contact.id, "Using fallback coordinate");
                    summary.fallback += 1;
                }
            }
            enriched.push(EnrichedContact { contact, coordinates, coordinate_source: source });

            let done = enriched.len();
            if done % self.publish_every == 0 || done == total {
                if !self.publish(run_id, &enriched, &events, &mut summary).await {
                    return summary;
                }
            }
        }

        counter!(PIPELINE_CONTACTS_ENRICHED_TOTAL).increment(total as u64);
        histogram!(PIPELINE_RUN_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        info!(
            "🏁 Run {} enriched {} contacts ({} resolved, {} fallback)",
            run_id, total, summary.resolved, summary.fallback
        );

        if events.send(PipelineEvent::Completed { run_id, total }).await.is_err() {
            summary.abandoned = true;
        }
        summary
    }

    /// Send a snapshot; `false` means nobody is listening and the run should stop
    async fn publish(
        &self,
        run_id: RunId,
        enriched: &[EnrichedContact],
        events: &mpsc::Sender<PipelineEvent>,
        summary: &mut RunSummary,
    ) -> bool {
        debug!("Publishing snapshot of {} contacts", enriched.len());
        let snapshot = PipelineEvent::Snapshot { run_id, contacts: Arc::new(enriched.to_vec()) };
        if events.send(snapshot).await.is_err() {
            warn!("Subscriber dropped, abandoning run {}", run_id);
            summary.abandoned = true;
            return false;
        }
        summary.snapshots += 1;
        true
    }
}
