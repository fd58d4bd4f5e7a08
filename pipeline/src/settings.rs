use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use ship_defs::{
    BuildDescriptor, BuildVariant, DeployError, EndpointCheck, Expectation, HttpMethod,
    ANSWER_CHECK, HEALTH_CHECK, LOGS_CHECK, ROOT_CHECK,
};

pub const DEFAULT_PLIVO_API_BASE: &str = "https://api.plivo.com/v1";

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PlivoSettings {
    pub auth_id: Option<String>,
    pub auth_token: Option<String>,
    pub api_base: String,
}

impl Default for PlivoSettings {
    fn default() -> Self {
        PlivoSettings {
            auth_id: None,
            auth_token: None,
            api_base: DEFAULT_PLIVO_API_BASE.to_string(),
        }
    }
}

/// `callship.yaml` plus environment overrides.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Project the workspace is expected to be linked to, by id or name.
    pub project: Option<String>,
    pub variant: BuildVariant,
    pub descriptor: Option<PathBuf>,
    pub phone_number: Option<String>,
    pub public_scheme: String,
    pub health_timeout_secs: u64,
    pub check_timeout_secs: u64,
    pub parallelism: usize,
    pub extra_endpoints: Vec<EndpointCheck>,
    pub railway_bin: String,
    pub build_log_lines: usize,
    pub plivo: PlivoSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            project: None,
            variant: BuildVariant::Pipeline,
            descriptor: None,
            phone_number: None,
            public_scheme: "https".to_string(),
            health_timeout_secs: 5,
            check_timeout_secs: 10,
            parallelism: 4,
            extra_endpoints: vec![],
            railway_bin: "railway".to_string(),
            build_log_lines: 40,
            plivo: PlivoSettings::default(),
        }
    }
}

impl Settings {
    /// Reads `config` (or the discovered config file) and applies environment overrides.
    pub fn load(workdir: &Path, config: Option<&Path>) -> Result<Settings, DeployError> {
        let path = match config {
            Some(path) => Some(path.to_path_buf()),
            None => ship_utils::config_path::find_config_file(workdir),
        };

        let mut settings = match path {
            Some(path) => {
                log::info!("Reading configuration from {}", path.display());
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e)
                })?;
                Settings::from_yaml(&content)?
            }
            None => Settings::default(),
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_yaml(content: &str) -> Result<Settings, DeployError> {
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| DeployError::Other(anyhow::anyhow!("Invalid configuration: {}", e)))
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("PLIVO_AUTH_ID") {
            self.plivo.auth_id = Some(v);
        }
        if let Some(v) = lookup("PLIVO_AUTH_TOKEN") {
            self.plivo.auth_token = Some(v);
        }
        if let Some(v) = lookup("PLIVO_API_BASE") {
            self.plivo.api_base = v;
        }
        if let Some(v) = lookup("PLIVO_PHONE_NUMBER") {
            self.phone_number = Some(v);
        }
        if let Some(v) = lookup("RAILWAY_BIN") {
            self.railway_bin = v;
        }
        if let Some(v) = lookup("CALLSHIP_PUBLIC_SCHEME") {
            self.public_scheme = v;
        }
        if let Some(v) = lookup("CALLSHIP_CHECK_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.check_timeout_secs = secs,
                Err(_) => log::warn!("Ignoring invalid CALLSHIP_CHECK_TIMEOUT_SECS={}", v),
            }
        }
    }

    pub fn descriptor(&self) -> BuildDescriptor {
        match &self.descriptor {
            Some(path) => BuildDescriptor::with_path(self.variant, path),
            None => BuildDescriptor::for_variant(self.variant),
        }
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs.max(1))
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs.max(1))
    }

    /// Canonical battery followed by the configured extra endpoints.
    pub fn verifier_checks(&self) -> Vec<EndpointCheck> {
        let mut checks = default_checks();
        checks.extend(self.extra_endpoints.iter().cloned());
        checks
    }
}

pub fn default_checks() -> Vec<EndpointCheck> {
    vec![
        EndpointCheck {
            name: HEALTH_CHECK.to_string(),
            method: HttpMethod::Get,
            path: "/health".to_string(),
            expect: Expectation::Healthy,
            call_form: false,
        },
        EndpointCheck {
            name: ANSWER_CHECK.to_string(),
            method: HttpMethod::Post,
            path: "/answer".to_string(),
            expect: Expectation::Success,
            call_form: true,
        },
        EndpointCheck {
            name: ROOT_CHECK.to_string(),
            method: HttpMethod::Get,
            path: "/".to_string(),
            expect: Expectation::NoServerError,
            call_form: false,
        },
        EndpointCheck {
            name: LOGS_CHECK.to_string(),
            method: HttpMethod::Get,
            path: "/logs".to_string(),
            expect: Expectation::NoServerErrorAllowUnavailable,
            call_form: false,
        },
    ]
}
