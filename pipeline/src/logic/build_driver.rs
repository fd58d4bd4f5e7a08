use log::info;
use ship_defs::{
    BuildDescriptor, DeployError, Deployer, DeploymentTarget, ReleaseHandle, SecretKey,
};
use tokio_util::sync::CancellationToken;

use super::config_binder::ensure_secrets_set;

/// Builds the workspace with the chosen descriptor and waits for the release.
/// Nothing is built unless the variant's required secrets are set remotely.
pub struct BuildDriver<'a> {
    deployer: &'a dyn Deployer,
}

impl<'a> BuildDriver<'a> {
    pub fn new(deployer: &'a dyn Deployer) -> Self {
        BuildDriver { deployer }
    }

    pub async fn release(
        &self,
        target: &DeploymentTarget,
        descriptor: &BuildDescriptor,
        cancel: CancellationToken,
    ) -> Result<ReleaseHandle, DeployError> {
        if !target.linked {
            return Err(DeployError::TargetNotLinked(
                target.workdir.display().to_string(),
            ));
        }
        check_descriptor(target, descriptor)?;
        ensure_secrets_set(
            self.deployer,
            target,
            SecretKey::required_for(descriptor.variant),
        )
        .await?;

        info!(
            "Building {} variant of {} from {}",
            descriptor.variant,
            target.display_name(),
            descriptor.path.display()
        );
        let handle = self.deployer.build(target, descriptor, cancel).await?;
        info!(
            "Release finished at {} (deployment {})",
            handle.finished_at,
            handle.deployment_id.as_deref().unwrap_or("unknown")
        );
        Ok(handle)
    }
}

/// The descriptor must exist in the workdir before anything is uploaded.
pub fn check_descriptor(
    target: &DeploymentTarget,
    descriptor: &BuildDescriptor,
) -> Result<(), DeployError> {
    let path = target.workdir.join(&descriptor.path);
    if path.is_file() {
        return Ok(());
    }
    Err(DeployError::BuildFailed {
        reason: format!(
            "container descriptor {} not found in {}",
            descriptor.path.display(),
            target.workdir.display()
        ),
        excerpt: String::new(),
    })
}
