use std::time::Duration;

use http_client::HttpClient;
use ship_defs::{CallLogRecord, CallLogsResponse, DeployError};
use ship_utils::join_url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallLogs {
    Records(Vec<CallLogRecord>),
    /// The bot answered 503: no database behind `/logs`.
    DatabaseNotConfigured,
}

/// Reads recent calls from the bot's `/logs` endpoint.
pub struct CallLogInspector {
    http: HttpClient,
}

impl CallLogInspector {
    pub fn new(timeout: Duration) -> Result<Self, DeployError> {
        Ok(CallLogInspector {
            http: HttpClient::new(timeout)?,
        })
    }

    pub async fn recent(&self, base_url: &str) -> Result<CallLogs, DeployError> {
        let url = join_url(base_url, "/logs");
        let response = self.http.get(&url).await.map_err(|e| DeployError::Http {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        if response.status == 503 {
            return Ok(CallLogs::DatabaseNotConfigured);
        }
        if !response.is_success() {
            return Err(DeployError::Http {
                url,
                reason: format!("HTTP {}", response.status),
            });
        }
        let parsed: CallLogsResponse = response.json().map_err(|e| DeployError::Http {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        Ok(CallLogs::Records(parsed.logs))
    }
}
