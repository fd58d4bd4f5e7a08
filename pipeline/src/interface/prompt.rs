use async_trait::async_trait;
use inquire::{Confirm, InquireError, Password, PasswordDisplayMode};
use ship_defs::{ConfirmationSource, DeployError, Gate, SecretKey, SecretSource, SecretValue};

fn map_prompt_error(e: InquireError) -> DeployError {
    match e {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            DeployError::Cancelled
        }
        other => DeployError::Other(anyhow::anyhow!("Prompt failed: {}", other)),
    }
}

/// Treats every gate as already satisfied (`--yes`).
pub struct AutoConfirm;

#[async_trait]
impl ConfirmationSource for AutoConfirm {
    async fn confirm(&self, gate: Gate, prompt: &str) -> Result<bool, DeployError> {
        log::info!("Auto-confirming {} gate: {}", gate, prompt);
        Ok(true)
    }
}

/// Yes/no question on the terminal, defaulting to no.
pub async fn ask_yes_no(prompt: &str) -> Result<bool, DeployError> {
    let prompt = prompt.to_string();
    // inquire blocks on stdin
    tokio::task::spawn_blocking(move || {
        Confirm::new(&prompt)
            .with_default(false)
            .prompt()
            .map_err(map_prompt_error)
    })
    .await
    .map_err(|e| DeployError::Other(anyhow::anyhow!("Prompt task failed: {}", e)))?
}

/// Asks the operator on the terminal.
pub struct InquireConfirmation;

#[async_trait]
impl ConfirmationSource for InquireConfirmation {
    async fn confirm(&self, _gate: Gate, prompt: &str) -> Result<bool, DeployError> {
        ask_yes_no(prompt).await
    }
}

/// Secrets from the process environment, optionally falling back to a masked prompt.
pub struct EnvSecretSource {
    allow_prompt: bool,
}

impl EnvSecretSource {
    pub fn new(allow_prompt: bool) -> Self {
        EnvSecretSource { allow_prompt }
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn secret_for(&self, key: SecretKey) -> Result<Option<SecretValue>, DeployError> {
        if let Some(value) = std::env::var(key.as_str())
            .ok()
            .map(SecretValue::new)
            .filter(|v| !v.is_empty())
        {
            log::debug!("Using {} from the environment: {}", key, value);
            return Ok(Some(value));
        }
        if !self.allow_prompt {
            return Ok(None);
        }

        let message = format!("{} (leave empty to skip):", key);
        let answer = tokio::task::spawn_blocking(move || {
            Password::new(&message)
                .without_confirmation()
                .with_display_mode(PasswordDisplayMode::Masked)
                .prompt()
                .map_err(map_prompt_error)
        })
        .await
        .map_err(|e| DeployError::Other(anyhow::anyhow!("Prompt task failed: {}", e)))??;

        Ok(Some(SecretValue::new(answer)).filter(|v| !v.is_empty()))
    }
}
