use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    BuildDescriptor, DeployError, DeploymentTarget, Gate, HttpMethod, LinkStatus, PipelineRecord,
    ReleaseHandle, SecretKey, SecretSet, SecretValue, WebhookBinding,
};

/// Remote operations against the hosting platform.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn version(&self) -> Result<String, DeployError>;
    async fn whoami(&self) -> Result<String, DeployError>;
    /// `None` when the workdir is not linked to any project.
    async fn status(&self, target: &DeploymentTarget) -> Result<Option<LinkStatus>, DeployError>;
    /// Names of the variables currently set on the service.
    async fn list_variables(
        &self,
        target: &DeploymentTarget,
    ) -> Result<BTreeSet<String>, DeployError>;
    async fn set_variables(
        &self,
        target: &DeploymentTarget,
        secrets: &SecretSet,
    ) -> Result<(), DeployError>;
    async fn current_domain(&self, target: &DeploymentTarget)
        -> Result<Option<String>, DeployError>;
    async fn generate_domain(&self, target: &DeploymentTarget) -> Result<String, DeployError>;
    /// Builds and releases, blocking until the platform reports a terminal result.
    async fn build(
        &self,
        target: &DeploymentTarget,
        descriptor: &BuildDescriptor,
        cancel: CancellationToken,
    ) -> Result<ReleaseHandle, DeployError>;
    async fn stream_logs(
        &self,
        target: &DeploymentTarget,
        cancel: CancellationToken,
    ) -> Result<(), DeployError>;
    async fn down(&self, target: &DeploymentTarget) -> Result<(), DeployError>;
}

/// The telephony provider's number management API.
#[async_trait]
pub trait TelephonyProvider: Send + Sync {
    async fn get_binding(&self, number: &str) -> Result<WebhookBinding, DeployError>;
    async fn update_binding(
        &self,
        number: &str,
        answer_url: &str,
        method: HttpMethod,
    ) -> Result<(), DeployError>;
    async fn list_bindings(&self) -> Result<Vec<WebhookBinding>, DeployError>;
}

/// Returns once an operator has asserted that a manual step is done.
#[async_trait]
pub trait ConfirmationSource: Send + Sync {
    async fn confirm(&self, gate: Gate, prompt: &str) -> Result<bool, DeployError>;
}

#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn secret_for(&self, key: SecretKey) -> Result<Option<SecretValue>, DeployError>;
}

pub trait StateStore: Send + Sync {
    fn load(&self, workdir: &Path) -> Result<Option<PipelineRecord>, DeployError>;
    fn save(&self, record: &PipelineRecord) -> Result<(), DeployError>;
}
