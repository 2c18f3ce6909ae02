use metrics::{counter, histogram};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::app::ports::{GeocoderPort, RateLimiterPort};
use crate::constants::{FALLBACK_JITTER_DEGREES, FALLBACK_LAT, FALLBACK_LNG};
use crate::metrics::{GEOCODE_DURATION_SECONDS, GEOCODE_REQUESTS_TOTAL};
use crate::types::{CoordinateSource, Coordinates};

/// Jittered point near the continental US centre, used whenever an address
/// cannot be resolved
pub struct FallbackCoordinates {
    rng: Mutex<StdRng>,
}

impl FallbackCoordinates {
    pub fn new() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    pub fn sample(&self) -> Coordinates {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        let j = FALLBACK_JITTER_DEGREES;
        Coordinates::new(
            FALLBACK_LAT + rng.gen_range(-j..=j),
            FALLBACK_LNG + rng.gen_range(-j..=j),
        )
    }

    /// Whether a coordinate lies inside the fallback jitter box
    pub fn contains(c: &Coordinates) -> bool {
        (c.lat - FALLBACK_LAT).abs() <= FALLBACK_JITTER_DEGREES
            && (c.lng - FALLBACK_LNG).abs() <= FALLBACK_JITTER_DEGREES
    }
}

impl Default for FallbackCoordinates {
    fn default() -> Self {
        Self::new()
    }
}

/// Address → coordinate, never failing.
///
/// Every external lookup passes through the shared rate limiter first. Blank
/// addresses skip both the limiter and the lookup.
#[derive(Clone)]
pub struct CoordinateResolver {
    geocoder: Arc<dyn GeocoderPort>,
    limiter: Arc<dyn RateLimiterPort>,
    fallback: Arc<FallbackCoordinates>,
}

impl CoordinateResolver {
    pub fn new(
        geocoder: Arc<dyn GeocoderPort>,
        limiter: Arc<dyn RateLimiterPort>,
        fallback: Arc<FallbackCoordinates>,
    ) -> Self {
        Self { geocoder, limiter, fallback }
    }

    pub async fn resolve(&self, address: &str) -> Coordinates {
        self.resolve_with_source(address).await.0
    }

    #[instrument(skip(self))]
    pub async fn resolve_with_source(&self, address: &str) -> (Coordinates, CoordinateSource) {
        let address = address.trim();
        if address.is_empty() {
            debug!("Blank address, using fallback coordinate");
            counter!(GEOCODE_REQUESTS_TOTAL, "outcome" => "skipped").increment(1);
            return (self.fallback.sample(), CoordinateSource::Fallback);
        }

        self.limiter.acquire().await;

        let started = Instant::now();
        let result = self.geocoder.lookup(address).await;
        histogram!(GEOCODE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        match result {
            Ok(Some(coords)) if coords.is_valid() => {
                counter!(GEOCODE_REQUESTS_TOTAL, "outcome" => "resolved").increment(1);
                (coords, CoordinateSource::Resolved)
            }
            Ok(Some(coords)) => {
                warn!(lat = coords.lat, lng = coords.lng, "Geocoder returned out-of-range coordinate");
                counter!(GEOCODE_REQUESTS_TOTAL, "outcome" => "invalid").increment(1);
                (self.fallback.sample(), CoordinateSource::Fallback)
            }
            Ok(None) => {
                warn!("No geocoding results found");
                counter!(GEOCODE_REQUESTS_TOTAL, "outcome" => "not_found").increment(1);
                (self.fallback.sample(), CoordinateSource::Fallback)
            }
            Err(e) => {
                warn!("Geocoding error: {}", e);
                counter!(GEOCODE_REQUESTS_TOTAL, "outcome" => "error").increment(1);
                (self.fallback.sample(), CoordinateSource::Fallback)
            }
        }
    }
}
