use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{BuildVariant, DeploymentTarget, ReleaseHandle};

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Init,
    Linked,
    Configured,
    Deployed,
    Published,
    Verified,
    Rewired,
    Done,
}

impl PipelineState {
    pub const ORDER: [PipelineState; 8] = [
        PipelineState::Init,
        PipelineState::Linked,
        PipelineState::Configured,
        PipelineState::Deployed,
        PipelineState::Published,
        PipelineState::Verified,
        PipelineState::Rewired,
        PipelineState::Done,
    ];

    pub fn next(&self) -> Option<PipelineState> {
        let idx = Self::ORDER.iter().position(|s| s == self)?;
        Self::ORDER.get(idx + 1).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Init => "init",
            PipelineState::Linked => "linked",
            PipelineState::Configured => "configured",
            PipelineState::Deployed => "deployed",
            PipelineState::Published => "published",
            PipelineState::Verified => "verified",
            PipelineState::Rewired => "rewired",
            PipelineState::Done => "done",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PipelineState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipelineState::ORDER
            .iter()
            .find(|state| state.as_str() == s.to_lowercase())
            .copied()
            .ok_or_else(|| format!("unknown pipeline state '{}'", s))
    }
}

/// Manual steps outside this tool that an operator must confirm.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Gate {
    Link,
    Secrets,
}

impl Gate {
    pub fn prompt(&self, target: &DeploymentTarget) -> String {
        match self {
            Gate::Link => format!(
                "Has `railway link` been run in {} for the project to deploy to?",
                target.workdir.display()
            ),
            Gate::Secrets => format!(
                "Ready to set the required secrets on {}?",
                target.display_name()
            ),
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gate::Link => write!(f, "link"),
            Gate::Secrets => write!(f, "secrets"),
        }
    }
}

/// Persisted progress of one target through the pipeline.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PipelineRecord {
    pub target: DeploymentTarget,
    pub state: PipelineState,
    #[serde(default)]
    pub variant: BuildVariant,
    #[serde(default)]
    pub release: Option<ReleaseHandle>,
    #[serde(default)]
    pub confirmed_gates: BTreeSet<Gate>,
    #[serde(default)]
    pub updated_at: String,
}

impl PipelineRecord {
    pub fn new(target: DeploymentTarget, variant: BuildVariant) -> Self {
        PipelineRecord {
            target,
            state: PipelineState::Init,
            variant,
            release: None,
            confirmed_gates: BTreeSet::new(),
            updated_at: String::new(),
        }
    }

    /// Move back to `state`. Never moves forward.
    pub fn rewind_to(&mut self, state: PipelineState) {
        if state >= self.state {
            return;
        }
        self.state = state;
        if state < PipelineState::Deployed {
            self.release = None;
        }
        if state < PipelineState::Linked {
            self.target.linked = false;
            self.confirmed_gates.clear();
        } else if state < PipelineState::Configured {
            self.confirmed_gates.remove(&Gate::Secrets);
        }
    }
}
