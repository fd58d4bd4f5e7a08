mod call_log;
mod errors;
mod health;
mod pipeline;
mod provider;
mod secrets;
mod target;
mod verification;
mod webhook;

pub use call_log::{CallCompleteness, CallLogRecord, CallLogsResponse};
pub use errors::{DeployError, StageError};
pub use health::{HealthResponse, HealthStatus};
pub use pipeline::{Gate, PipelineRecord, PipelineState};
pub use provider::{ConfirmationSource, Deployer, SecretSource, StateStore, TelephonyProvider};
pub use secrets::{SecretKey, SecretSet, SecretValue};
pub use target::{BuildDescriptor, BuildVariant, DeploymentTarget, LinkStatus, ReleaseHandle};
pub use verification::{
    CheckResult, EndpointCheck, Expectation, VerificationReport, ANSWER_CHECK, HEALTH_CHECK,
    LOGS_CHECK, ROOT_CHECK,
};
pub use webhook::{BindingClass, HttpMethod, RebindOutcome, WebhookBinding};
