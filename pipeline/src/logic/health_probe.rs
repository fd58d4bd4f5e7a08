use std::time::Duration;

use http_client::{HttpClient, HttpResponse};
use log::{debug, info};
use ship_defs::{DeployError, HealthResponse, HealthStatus};
use ship_utils::join_url;

pub const HEALTHY_STATUS: &str = "healthy";

/// Single `GET <base>/health` with a bounded timeout. Retrying is up to the caller.
pub struct HealthProbe {
    http: HttpClient,
}

impl HealthProbe {
    pub fn new(timeout: Duration) -> Result<Self, DeployError> {
        Ok(HealthProbe {
            http: HttpClient::new(timeout)?,
        })
    }

    pub async fn probe(&self, base_url: &str) -> HealthStatus {
        let url = join_url(base_url, "/health");
        info!("Probing {}", url);
        match self.http.get(&url).await {
            Ok(response) => evaluate_health(&url, &response),
            Err(e) => {
                debug!("Health probe of {} failed: {}", url, e);
                HealthStatus::unreachable(&url, e.to_string())
            }
        }
    }
}

/// A response arrived, so the service is reachable; healthy needs 2xx and `status == "healthy"`.
pub fn evaluate_health(url: &str, response: &HttpResponse) -> HealthStatus {
    let parsed: Option<HealthResponse> = response.json().ok();
    let declared_healthy = parsed
        .as_ref()
        .map(|h| h.status.eq_ignore_ascii_case(HEALTHY_STATUS))
        .unwrap_or(false);
    HealthStatus {
        url: url.to_string(),
        reachable: true,
        healthy: response.is_success() && declared_healthy,
        status_code: Some(response.status),
        service: parsed.as_ref().and_then(|h| h.service.clone()),
        version: parsed.as_ref().and_then(|h| h.version.clone()),
        body: response.body.clone(),
        error: None,
    }
}
