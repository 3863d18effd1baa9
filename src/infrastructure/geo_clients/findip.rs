use super::IspLookup;
use crate::domain::app_config::GeoApiConfig;
use crate::domain::traffic::ResolutionResult;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

/// Client for the findip.net geolocation API.
///
/// Holds a single pooled `reqwest::Client`, shared by every lookup of a batch.
pub struct FindIpClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl FindIpClient {
    pub fn new(config: &GeoApiConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &GeoApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn lookup_url(&self, ip: &str) -> String {
        format!("{}/{}/?token={}", self.base_url, ip, self.token)
    }

    fn isp_from_body(body: &serde_json::Value) -> ResolutionResult {
        match body.get("traits") {
            Some(traits) => match traits.get("isp").and_then(|isp| isp.as_str()) {
                Some(isp) => ResolutionResult::resolved(isp),
                None => ResolutionResult::Unknown,
            },
            None => ResolutionResult::Unknown,
        }
    }
}

#[async_trait]
impl IspLookup for FindIpClient {
    async fn lookup(&self, ip: &str) -> ResolutionResult {
        let response = match self.client.get(self.lookup_url(ip)).send().await {
            Ok(response) => response,
            Err(e) => return ResolutionResult::transport(e.to_string()),
        };

        let status = response.status();
        if status != StatusCode::OK {
            debug!(ip, status = status.as_u16(), "ISP lookup rejected");
            return ResolutionResult::status(status.as_u16());
        }

        match response.json::<serde_json::Value>().await {
            Ok(body) => Self::isp_from_body(&body),
            Err(e) => ResolutionResult::transport(e.to_string()),
        }
    }
}
