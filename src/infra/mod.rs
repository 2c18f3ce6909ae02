pub mod hubspot;
pub mod nominatim;

pub use hubspot::HubSpotClient;
pub use nominatim::NominatimGeocoder;
