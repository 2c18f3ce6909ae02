use async_trait::async_trait;

use crate::error::{FetchError, GeocodeError};
use crate::types::{Coordinates, RawContactRecord};

/// Supplier of the raw CRM contact batch (the proxy gateway side)
#[async_trait]
pub trait ContactSourcePort: Send + Sync {
    async fn fetch_contacts(&self) -> Result<Vec<RawContactRecord>, FetchError>;
}

/// Read-only address lookup against an external geocoding service.
///
/// `Ok(None)` means the service answered but found nothing.
#[async_trait]
pub trait GeocoderPort: Send + Sync {
    async fn lookup(&self, address: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

/// Gate in front of an external service; `acquire` returns once the next call may go out
#[async_trait]
pub trait RateLimiterPort: Send + Sync {
    async fn acquire(&self);
}
