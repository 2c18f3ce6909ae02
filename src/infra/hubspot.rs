use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::app::ports::ContactSourcePort;
use crate::config::HubSpotConfig;
use crate::constants::{HUBSPOT_CONTACTS_PATH, HUBSPOT_PROPERTIES};
use crate::error::{FetchError, Result};
use crate::types::RawContactRecord;

/// Read-only HubSpot CRM client. Holds the private-app token so callers never see it.
pub struct HubSpotClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    limit: u32,
}

impl HubSpotClient {
    pub fn new(config: &HubSpotConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            limit: config.limit,
        })
    }

    pub fn contacts_url(&self) -> String {
        format!("{}{}", self.base_url, HUBSPOT_CONTACTS_PATH)
    }

    /// Fetch the contacts page exactly as HubSpot returns it
    #[instrument(skip(self))]
    pub async fn fetch_contacts_raw(&self) -> std::result::Result<Value, FetchError> {
        let token = match self.token.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => {
                warn!("No HubSpot token configured");
                return Err(FetchError::Unauthorized);
            }
        };

        debug!("Requesting {}", self.contacts_url());
        let response = self
            .client
            .get(self.contacts_url())
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .query(&[
                ("properties", HUBSPOT_PROPERTIES.join(",")),
                ("limit", self.limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("HubSpot API error: {} {}", status.as_u16(), body);
            return Err(FetchError::Upstream { status: status.as_u16(), body });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))
    }
}

/// Pull the `results` array out of a contacts page
pub fn parse_contacts_page(page: Value) -> std::result::Result<Vec<RawContactRecord>, FetchError> {
    let results = match page {
        Value::Object(mut map) => map.remove("results"),
        _ => None,
    }
    .ok_or_else(|| FetchError::InvalidResponse("missing `results` array".into()))?;

    serde_json::from_value(results).map_err(|e| FetchError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl ContactSourcePort for HubSpotClient {
    async fn fetch_contacts(&self) -> std::result::Result<Vec<RawContactRecord>, FetchError> {
        let page = self.fetch_contacts_raw().await?;
        let records = parse_contacts_page(page)?;
        info!("Fetched {} contacts from HubSpot", records.len());
        Ok(records)
    }
}
