use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One remote project/environment, addressed through the local directory the
/// platform CLI is run from.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub workdir: PathBuf,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub linked: bool,
    #[serde(default)]
    pub domain: Option<String>,
}

impl DeploymentTarget {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        DeploymentTarget {
            workdir: workdir.into(),
            project_id: None,
            project_name: None,
            environment: None,
            linked: false,
            domain: None,
        }
    }

    pub fn apply_link(&mut self, status: &LinkStatus) {
        self.project_id = Some(status.project_id.clone());
        self.project_name = status.project_name.clone();
        self.environment = status.environment.clone();
        self.linked = true;
    }

    pub fn display_name(&self) -> String {
        match (&self.project_name, &self.project_id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => id.clone(),
            (None, None) => self.workdir.display().to_string(),
        }
    }
}

/// What the platform reports about the workspace link.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LinkStatus {
    pub project_id: String,
    pub project_name: Option<String>,
    pub environment: Option<String>,
    pub service: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BuildVariant {
    /// Telephony voice pipeline serving `/answer` and the audio WebSocket.
    #[default]
    Pipeline,
    /// Agent worker variant sharing the repository; no public HTTP surface.
    Agent,
}

impl BuildVariant {
    pub fn default_descriptor(&self) -> &'static str {
        match self {
            BuildVariant::Pipeline => "Dockerfile",
            BuildVariant::Agent => "Dockerfile.livekit",
        }
    }

    pub fn serves_webhooks(&self) -> bool {
        matches!(self, BuildVariant::Pipeline)
    }

    pub fn call_log_table(&self) -> &'static str {
        match self {
            BuildVariant::Pipeline => "receptionist_call_logs",
            BuildVariant::Agent => "livekit_receptionist_call_logs",
        }
    }
}

impl std::fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildVariant::Pipeline => write!(f, "pipeline"),
            BuildVariant::Agent => write!(f, "agent"),
        }
    }
}

impl std::str::FromStr for BuildVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pipeline" => Ok(BuildVariant::Pipeline),
            "agent" | "livekit" => Ok(BuildVariant::Agent),
            other => Err(format!(
                "unknown variant '{}', expected 'pipeline' or 'agent'",
                other
            )),
        }
    }
}

/// The container descriptor a build is made from, relative to the workdir.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct BuildDescriptor {
    pub variant: BuildVariant,
    pub path: PathBuf,
}

impl BuildDescriptor {
    pub fn for_variant(variant: BuildVariant) -> Self {
        BuildDescriptor {
            variant,
            path: PathBuf::from(variant.default_descriptor()),
        }
    }

    pub fn with_path(variant: BuildVariant, path: impl AsRef<Path>) -> Self {
        BuildDescriptor {
            variant,
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ReleaseHandle {
    pub descriptor: PathBuf,
    pub deployment_id: Option<String>,
    pub build_logs_url: Option<String>,
    pub finished_at: String,
}
