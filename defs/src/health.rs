use serde::{Deserialize, Serialize};

use crate::DeployError;

/// Body served by the bot's `GET /health`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct HealthStatus {
    pub url: String,
    pub reachable: bool,
    pub healthy: bool,
    pub status_code: Option<u16>,
    pub service: Option<String>,
    pub version: Option<String>,
    pub body: String,
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn unreachable(url: &str, error: String) -> Self {
        HealthStatus {
            url: url.to_string(),
            reachable: false,
            healthy: false,
            status_code: None,
            service: None,
            version: None,
            body: String::new(),
            error: Some(error),
        }
    }

    /// Why the probe is not healthy, or `None` when it is.
    pub fn failure_reason(&self) -> Option<String> {
        if self.healthy {
            return None;
        }
        if !self.reachable {
            return Some(
                self.error
                    .clone()
                    .unwrap_or_else(|| "no response".to_string()),
            );
        }
        match self.status_code {
            Some(code) if !(200..300).contains(&code) => Some(format!("HTTP {}", code)),
            _ => Some(format!(
                "status field is not \"healthy\" (body: {})",
                self.body.chars().take(200).collect::<String>()
            )),
        }
    }

    pub fn into_result(self) -> Result<HealthStatus, DeployError> {
        match self.failure_reason() {
            None => Ok(self),
            Some(reason) => Err(DeployError::HealthCheckFailed {
                url: self.url,
                reason,
            }),
        }
    }
}
