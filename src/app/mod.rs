pub mod ports;
pub mod session;

use std::sync::Arc;

use crate::app::ports::{ContactSourcePort, GeocoderPort};
use crate::config::Config;
use crate::pipeline::{
    ContactNormalizer, CoordinateResolver, DefaultRolePolicy, EnrichmentPipeline,
    FallbackCoordinates, RandomRolePolicy, RequestSpacer,
};

/// Wire the enrichment pipeline from configuration and its two external ports.
///
/// `seed` makes the placeholder role assignment and fallback jitter reproducible.
pub fn build_pipeline(
    config: &Config,
    source: Arc<dyn ContactSourcePort>,
    geocoder: Arc<dyn GeocoderPort>,
    seed: Option<u64>,
) -> EnrichmentPipeline {
    let (policy, fallback): (Arc<dyn DefaultRolePolicy>, FallbackCoordinates) = match seed {
        Some(seed) => (
            Arc::new(RandomRolePolicy::with_seed(seed)),
            FallbackCoordinates::with_seed(seed),
        ),
        None => (Arc::new(RandomRolePolicy::new()), FallbackCoordinates::new()),
    };

    let resolver = CoordinateResolver::new(
        geocoder,
        Arc::new(RequestSpacer::new(config.geocoder.min_interval())),
        Arc::new(fallback),
    );

    EnrichmentPipeline::new(
        source,
        ContactNormalizer::new(policy),
        resolver,
        config.pipeline.publish_every,
    )
}
