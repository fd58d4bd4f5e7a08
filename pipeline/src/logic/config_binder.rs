use std::collections::BTreeSet;

use log::info;
use ship_defs::{DeployError, Deployer, DeploymentTarget, SecretKey, SecretSet, SecretSource};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindSummary {
    pub already_set: Vec<SecretKey>,
    pub newly_set: Vec<SecretKey>,
}

/// Puts the required secrets on the target and confirms them by reading the
/// remote key list back.
pub struct ConfigurationBinder<'a> {
    deployer: &'a dyn Deployer,
    secrets: &'a dyn SecretSource,
}

impl<'a> ConfigurationBinder<'a> {
    pub fn new(deployer: &'a dyn Deployer, secrets: &'a dyn SecretSource) -> Self {
        ConfigurationBinder { deployer, secrets }
    }

    pub async fn bind(
        &self,
        target: &DeploymentTarget,
        required: &[SecretKey],
    ) -> Result<BindSummary, DeployError> {
        ensure_linked(target)?;
        let remote = self.deployer.list_variables(target).await?;
        let (already_set, missing) = partition(required, &remote);

        let mut values = SecretSet::new();
        for key in missing {
            match self.secrets.secret_for(key).await? {
                Some(value) => {
                    info!("Setting {} = {}", key, value.masked());
                    values.insert(key, value);
                }
                None => info!("No value available for {}", key),
            }
        }
        if !values.is_empty() {
            self.deployer.set_variables(target, &values).await?;
        }

        self.read_back(target, required).await?;
        Ok(BindSummary {
            already_set,
            newly_set: values.keys().collect(),
        })
    }

    /// Read-only: fails unless every required key is already set remotely.
    pub async fn confirm(
        &self,
        target: &DeploymentTarget,
        required: &[SecretKey],
    ) -> Result<(), DeployError> {
        ensure_linked(target)?;
        self.read_back(target, required).await
    }

    async fn read_back(
        &self,
        target: &DeploymentTarget,
        required: &[SecretKey],
    ) -> Result<(), DeployError> {
        ensure_secrets_set(self.deployer, target, required).await
    }
}

/// Fails with `ConfigurationIncomplete` unless every key in `required` is set remotely.
pub async fn ensure_secrets_set(
    deployer: &dyn Deployer,
    target: &DeploymentTarget,
    required: &[SecretKey],
) -> Result<(), DeployError> {
    let remote = deployer.list_variables(target).await?;
    let (_, missing) = partition(required, &remote);
    if missing.is_empty() {
        return Ok(());
    }
    Err(DeployError::ConfigurationIncomplete {
        missing: missing.iter().map(|k| k.to_string()).collect(),
    })
}

fn ensure_linked(target: &DeploymentTarget) -> Result<(), DeployError> {
    if target.linked {
        Ok(())
    } else {
        Err(DeployError::TargetNotLinked(
            target.workdir.display().to_string(),
        ))
    }
}

fn partition(required: &[SecretKey], remote: &BTreeSet<String>) -> (Vec<SecretKey>, Vec<SecretKey>) {
    required
        .iter()
        .copied()
        .partition(|key| remote.contains(key.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{InMemoryDeployer, StaticSecretSource};
    use pretty_assertions::assert_eq;
    use ship_defs::BuildVariant;

    fn linked_target() -> DeploymentTarget {
        let mut target = DeploymentTarget::new("/tmp/bot");
        target.linked = true;
        target
    }

    #[tokio::test]
    async fn test_sets_only_missing_keys() {
        let deployer = InMemoryDeployer::linked("p-1", "demo.up.example");
        deployer
            .state()
            .variables
            .insert("OPENAI_API_KEY".to_string(), "sk-existing".to_string());
        let required = SecretKey::required_for(BuildVariant::Pipeline);
        let secrets = StaticSecretSource::with_keys(required);

        let summary = ConfigurationBinder::new(&deployer, &secrets)
            .bind(&linked_target(), required)
            .await
            .unwrap();

        assert_eq!(summary.already_set, vec![SecretKey::OpenaiApiKey]);
        assert_eq!(summary.newly_set.len(), required.len() - 1);
        assert!(!secrets.requested().contains(&SecretKey::OpenaiApiKey));
        assert_eq!(deployer.state().set_variable_calls, 1);
        assert_eq!(
            deployer.state().variables.get("OPENAI_API_KEY").map(String::as_str),
            Some("sk-existing")
        );
    }

    #[tokio::test]
    async fn test_missing_value_is_reported_by_name() {
        let deployer = InMemoryDeployer::linked("p-1", "demo.up.example");
        let required = SecretKey::required_for(BuildVariant::Pipeline);
        let secrets = StaticSecretSource::with_keys(&[
            SecretKey::OpenaiApiKey,
            SecretKey::DeepgramApiKey,
            SecretKey::ElevenlabsApiKey,
            SecretKey::PlivoAuthId,
            SecretKey::PlivoAuthToken,
        ]);

        let err = ConfigurationBinder::new(&deployer, &secrets)
            .bind(&linked_target(), required)
            .await
            .unwrap_err();

        assert_eq!(err.hint(), "set missing secret POSTGRES_URL before re-running");
    }

    #[tokio::test]
    async fn test_read_back_catches_dropped_write() {
        let deployer = InMemoryDeployer::linked("p-1", "demo.up.example");
        deployer.state().drop_variable_writes = true;
        let required = &[SecretKey::OpenaiApiKey];
        let secrets = StaticSecretSource::with_keys(required);

        let result = ConfigurationBinder::new(&deployer, &secrets)
            .bind(&linked_target(), required)
            .await;

        match result {
            Err(DeployError::ConfigurationIncomplete { missing }) => {
                assert_eq!(missing, vec!["OPENAI_API_KEY".to_string()])
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_confirm_never_writes() {
        let deployer = InMemoryDeployer::linked("p-1", "demo.up.example");
        let secrets = StaticSecretSource::with_keys(&[SecretKey::OpenaiApiKey]);
        let binder = ConfigurationBinder::new(&deployer, &secrets);

        assert!(binder
            .confirm(&linked_target(), &[SecretKey::OpenaiApiKey])
            .await
            .is_err());
        assert_eq!(deployer.mutation_count(), 0);
        assert!(secrets.requested().is_empty());
    }

    #[tokio::test]
    async fn test_unlinked_target() {
        let deployer = InMemoryDeployer::default();
        let secrets = StaticSecretSource::default();
        let result = ConfigurationBinder::new(&deployer, &secrets)
            .bind(&DeploymentTarget::new("/tmp/bot"), &[SecretKey::OpenaiApiKey])
            .await;
        assert!(matches!(result, Err(DeployError::TargetNotLinked(_))));
    }
}
