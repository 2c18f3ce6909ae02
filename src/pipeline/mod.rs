pub mod enrich;
pub mod filter;
pub mod normalize;
pub mod rate_limiter;
pub mod resolver;

pub use enrich::{EnrichmentPipeline, PipelineEvent, RunId, RunSummary};
pub use filter::{derive_view, FilterCriteria};
pub use normalize::{ContactNormalizer, DefaultRolePolicy, FixedRolePolicy, RandomRolePolicy};
pub use rate_limiter::RequestSpacer;
pub use resolver::{CoordinateResolver, FallbackCoordinates};
