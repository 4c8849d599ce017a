//! reqwest-backed cloud client

use crate::client::CloudClient;
use crate::error::CloudError;
use crate::types::{WhoAmIBody, WhoAmIRequest, WhoAmIResponse, TEAM_ID_HEADER, TOKEN_HEADER};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Plain lookups give up after this long; registration lookups are held open
/// by the server and have no client-side timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// URL of the identity endpoint on `address`
pub fn whoami_url(address: &str, wait_for_registration: bool) -> String {
    let mut url = format!("https://{}/api/whoami", address);
    if wait_for_registration {
        url.push_str("?wait_for_registration=true");
    }
    url
}

#[derive(Debug, Clone, Default)]
pub struct HttpCloudClient {
    http_client: Client,
}

impl HttpCloudClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl CloudClient for HttpCloudClient {
    async fn whoami(&self, request: &WhoAmIRequest) -> Result<WhoAmIResponse, CloudError> {
        let url = whoami_url(&request.address, request.wait_for_registration);
        log::debug!("POST {}", url);

        let mut builder = self
            .http_client
            .post(&url)
            .header(TOKEN_HEADER, &request.token)
            .json(&WhoAmIBody {
                version: request.version.clone(),
            });
        if !request.team_id.is_empty() {
            builder = builder.header(TEAM_ID_HEADER, &request.team_id);
        }
        if !request.wait_for_registration {
            builder = builder.timeout(REQUEST_TIMEOUT);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CloudError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whoami_url() {
        assert_eq!(
            whoami_url("cloud.example.com", false),
            "https://cloud.example.com/api/whoami"
        );
        assert_eq!(
            whoami_url("cloud.example.com", true),
            "https://cloud.example.com/api/whoami?wait_for_registration=true"
        );
    }
}
