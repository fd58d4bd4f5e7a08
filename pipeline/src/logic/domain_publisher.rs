use log::info;
use ship_defs::{DeployError, Deployer, DeploymentTarget};
use ship_utils::normalize_domain;

/// Get-or-create for the target's public host name.
pub struct DomainPublisher<'a> {
    deployer: &'a dyn Deployer,
}

impl<'a> DomainPublisher<'a> {
    pub fn new(deployer: &'a dyn Deployer) -> Self {
        DomainPublisher { deployer }
    }

    /// Returns the existing domain unchanged, whatever it looks like; otherwise generates one.
    pub async fn publish(&self, target: &DeploymentTarget) -> Result<String, DeployError> {
        if let Some(domain) = self.existing(target).await? {
            info!("{} already has domain {}", target.display_name(), domain);
            return Ok(domain);
        }
        let generated = normalize_domain(&self.deployer.generate_domain(target).await?);
        if generated.is_empty() {
            return Err(DeployError::DomainUnavailable(
                "the platform returned an empty domain".to_string(),
            ));
        }
        info!("Generated domain {} for {}", generated, target.display_name());
        Ok(generated)
    }

    pub async fn existing(&self, target: &DeploymentTarget) -> Result<Option<String>, DeployError> {
        Ok(self
            .deployer
            .current_domain(target)
            .await?
            .map(|d| normalize_domain(&d))
            .filter(|d| !d.is_empty()))
    }
}
