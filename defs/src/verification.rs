use serde::{Deserialize, Serialize};

use crate::{DeployError, HttpMethod};

pub const HEALTH_CHECK: &str = "health endpoint";
pub const ANSWER_CHECK: &str = "answer endpoint";
pub const ROOT_CHECK: &str = "root endpoint";
pub const LOGS_CHECK: &str = "logs endpoint";

/// How a check judges the response it gets.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// 2xx and a JSON body whose `status` is `healthy`.
    Healthy,
    /// 2xx or 3xx.
    Success,
    /// Anything below 500.
    NoServerError,
    /// Below 500, or 503 reported as a warning (the endpoint exists but a
    /// backing service is not configured).
    NoServerErrorAllowUnavailable,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct EndpointCheck {
    pub name: String,
    #[serde(default)]
    pub method: HttpMethod,
    pub path: String,
    #[serde(default = "default_expectation")]
    pub expect: Expectation,
    /// POST a synthetic inbound-call form, as the telephony provider would.
    #[serde(default)]
    pub call_form: bool,
}

fn default_expectation() -> Expectation {
    Expectation::NoServerError
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    pub passed: bool,
    pub status_code: Option<u16>,
    pub message: Option<String>,
    #[serde(default)]
    pub warning: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct VerificationReport {
    pub base_url: String,
    pub checks: Vec<CheckResult>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn into_result(self) -> Result<VerificationReport, DeployError> {
        if self.passed() {
            return Ok(self);
        }
        if let Some(health) = self.check(HEALTH_CHECK).filter(|c| !c.passed) {
            return Err(DeployError::HealthCheckFailed {
                url: health.url.clone(),
                reason: health
                    .message
                    .clone()
                    .unwrap_or_else(|| "not healthy".to_string()),
            });
        }
        Err(DeployError::EndpointUnreachable {
            failed: self
                .failed_checks()
                .iter()
                .map(|c| c.name.clone())
                .collect(),
        })
    }
}
