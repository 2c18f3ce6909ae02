#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contact_map::app::ports::{ContactSourcePort, GeocoderPort};
use contact_map::error::{FetchError, GeocodeError};
use contact_map::pipeline::{
    ContactNormalizer, CoordinateResolver, DefaultRolePolicy, EnrichmentPipeline,
    FallbackCoordinates, RequestSpacer,
};
use contact_map::types::{Coordinates, RawContactRecord};

/// Returns one scripted batch per call; the last batch repeats
pub struct ScriptedSource {
    batches: Vec<(Duration, Result<Vec<RawContactRecord>, FetchError>)>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn ok(records: Vec<RawContactRecord>) -> Self {
        Self::sequence(vec![(Duration::ZERO, Ok(records))])
    }

    pub fn err(error: FetchError) -> Self {
        Self::sequence(vec![(Duration::ZERO, Err(error))])
    }

    pub fn sequence(batches: Vec<(Duration, Result<Vec<RawContactRecord>, FetchError>)>) -> Self {
        Self { batches, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactSourcePort for ScriptedSource {
    async fn fetch_contacts(&self) -> Result<Vec<RawContactRecord>, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, result) = &self.batches[n.min(self.batches.len() - 1)];
        if !delay.is_zero() {
            tokio::time::sleep(*delay).await;
        }
        result.clone()
    }
}

/// Geocoder answering from a fixed address table; anything else is a transport error
pub struct TableGeocoder {
    pub table: HashMap<String, Coordinates>,
    pub lookups: AtomicUsize,
}

impl TableGeocoder {
    pub fn new(entries: &[(&str, Coordinates)]) -> Self {
        Self {
            table: entries.iter().map(|(a, c)| (a.to_string(), *c)).collect(),
            lookups: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GeocoderPort for TableGeocoder {
    async fn lookup(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(address)
            .copied()
            .map(Some)
            .ok_or_else(|| GeocodeError::Transport(format!("no route to geocoder for {address}")))
    }
}

pub fn pipeline_with(
    source: Arc<dyn ContactSourcePort>,
    geocoder: Arc<dyn GeocoderPort>,
    policy: Arc<dyn DefaultRolePolicy>,
) -> EnrichmentPipeline {
    EnrichmentPipeline::new(
        source,
        ContactNormalizer::new(policy),
        CoordinateResolver::new(
            geocoder,
            Arc::new(RequestSpacer::new(Duration::ZERO)),
            Arc::new(FallbackCoordinates::with_seed(11)),
        ),
        5,
    )
}

pub fn record(id: &str, first: &str, last: &str, address: &str, roles: Option<&str>) -> RawContactRecord {
    let mut r = RawContactRecord::new(id)
        .with_property("firstname", first)
        .with_property("lastname", last)
        .with_property("address", address);
    if let Some(roles) = roles {
        r = r.with_property("project_role", roles);
    }
    r
}

/// Serve a router on an ephemeral local port
pub async fn spawn_stub(app: Router) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .expect("stub server")
            .serve(app.into_make_service())
            .await
            .expect("stub server crashed");
    });
    addr
}
