use thiserror::Error;

use crate::PipelineState;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("The workspace {0} is not linked to a project")]
    TargetNotLinked(String),

    #[error("Required secrets are not set on the target: {}", .missing.join(", "))]
    ConfigurationIncomplete { missing: Vec<String> },

    #[error("Build failed: {reason}")]
    BuildFailed { reason: String, excerpt: String },

    #[error("The platform refused to provide a public domain: {0}")]
    DomainUnavailable(String),

    #[error("Health check failed for {url}: {reason}")]
    HealthCheckFailed { url: String, reason: String },

    #[error("Endpoints did not respond correctly: {}", .failed.join(", "))]
    EndpointUnreachable { failed: Vec<String> },

    #[error("Failed to update the answer URL of {number}: {reason}")]
    RebindWriteFailed { number: String, reason: String },

    #[error("Answer URL of {number} reads back as {actual} after writing {expected}")]
    RebindVerificationFailed {
        number: String,
        expected: String,
        actual: String,
    },

    #[error("No phone number configured for the webhook update")]
    MissingPhoneNumber,

    #[error("Operator declined the {0} gate")]
    GateDeclined(String),

    #[error("Cancelled by operator")]
    Cancelled,

    #[error("Command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    #[error("Request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("Failed to read or write pipeline state: {0}")]
    State(String),

    #[error("Other error occurred: {0}")]
    Other(#[from] anyhow::Error),
}

impl DeployError {
    /// Short remediation printed under the error message.
    pub fn hint(&self) -> String {
        match self {
            DeployError::TargetNotLinked(dir) => {
                format!("run `railway link` in {} and re-run", dir)
            }
            DeployError::ConfigurationIncomplete { missing } => missing
                .iter()
                .map(|key| format!("set missing secret {} before re-running", key))
                .collect::<Vec<_>>()
                .join("\n"),
            DeployError::BuildFailed { .. } => {
                "check the build log excerpt above, fix the descriptor or secrets, then re-run"
                    .to_string()
            }
            DeployError::DomainUnavailable(_) => {
                "generate a domain in the platform dashboard, then re-run".to_string()
            }
            DeployError::HealthCheckFailed { .. } => {
                "inspect the runtime logs with `callship logs`".to_string()
            }
            DeployError::EndpointUnreachable { .. } => {
                "run `callship verify` for the full report and `callship logs` for details"
                    .to_string()
            }
            DeployError::RebindWriteFailed { number, .. }
            | DeployError::RebindVerificationFailed { number, .. } => format!(
                "set the Answer URL of {} manually in the provider console (method POST)",
                number
            ),
            DeployError::MissingPhoneNumber => {
                "set PLIVO_PHONE_NUMBER (see `callship numbers`) and re-run".to_string()
            }
            DeployError::GateDeclined(_) => "re-run once the manual step is done".to_string(),
            DeployError::Cancelled => "re-run to resume from the last completed stage".to_string(),
            DeployError::Command { .. } => {
                "make sure the railway CLI is installed and logged in (`callship doctor`)"
                    .to_string()
            }
            DeployError::Http { .. } => "check network access and credentials".to_string(),
            DeployError::State(_) => "remove .callship/state.json to start over".to_string(),
            DeployError::Other(_) => String::new(),
        }
    }
}

/// A stage failure: the transition that was attempted and why it failed.
#[derive(Error, Debug)]
#[error("Stage {from} -> {to} failed: {source}")]
pub struct StageError {
    pub from: PipelineState,
    pub to: PipelineState,
    #[source]
    pub source: DeployError,
}
