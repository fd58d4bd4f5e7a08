use std::path::{Path, PathBuf};

use colored::Colorize;
use ship_defs::{
    BuildVariant, DeployError, DeploymentTarget, PipelineRecord, PipelineState, StageError,
    StateStore,
};
use ship_pipeline::{FileStateStore, PlivoClient, RailwayCli, Settings};
use ship_utils::{base_url_for_domain, parse_base_url};
use tokio_util::sync::CancellationToken;

pub struct Context {
    pub workdir: PathBuf,
    pub settings: Settings,
    pub store: FileStateStore,
}

impl Context {
    pub fn load(workdir: &Path, config: Option<&Path>) -> Context {
        let workdir = match workdir.canonicalize() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!(
                    "{} workdir {}: {}",
                    "error:".red().bold(),
                    workdir.display(),
                    e
                );
                std::process::exit(1);
            }
        };
        let settings = match Settings::load(&workdir, config) {
            Ok(settings) => settings,
            Err(e) => exit_with(&e),
        };
        Context {
            workdir,
            settings,
            store: FileStateStore,
        }
    }

    pub fn with_build(mut self, variant: Option<BuildVariant>, descriptor: Option<PathBuf>) -> Self {
        if let Some(variant) = variant {
            self.settings.variant = variant;
        }
        if descriptor.is_some() {
            self.settings.descriptor = descriptor;
        }
        self
    }

    pub fn deployer(&self) -> RailwayCli {
        RailwayCli::new(&self.settings.railway_bin, self.settings.build_log_lines)
    }

    pub fn telephony(&self) -> PlivoClient {
        match PlivoClient::new(&self.settings.plivo, self.settings.check_timeout()) {
            Ok(client) => client,
            Err(e) => exit_with(&e),
        }
    }

    /// The persisted record, or a fresh one at `Init`.
    pub fn record(&self) -> PipelineRecord {
        match self.store.load(&self.workdir) {
            Ok(Some(record)) => record,
            Ok(None) => PipelineRecord::new(
                DeploymentTarget::new(&self.workdir),
                self.settings.variant,
            ),
            Err(e) => exit_with(&e),
        }
    }

    pub fn save(&self, record: &PipelineRecord) {
        if let Err(e) = self.store.save(record) {
            exit_with(&e);
        }
    }

    /// An explicit URL, else the domain recorded for the workspace.
    pub fn base_url(&self, url: Option<&str>) -> String {
        if let Some(url) = url {
            return match parse_base_url(url) {
                Ok(url) => url,
                Err(e) => exit_with(&DeployError::Other(e)),
            };
        }
        match self.record().target.domain {
            Some(domain) => base_url_for_domain(&domain, &self.settings.public_scheme),
            None => exit_with(&DeployError::DomainUnavailable(
                "no domain recorded yet; run `callship domain` or pass a URL".to_string(),
            )),
        }
    }
}

/// Single-stage commands move the record forward only from the stage right before them.
pub fn advance(record: &mut PipelineRecord, to: PipelineState) -> bool {
    let Some(prev) = PipelineState::ORDER
        .iter()
        .position(|s| *s == to)
        .and_then(|i| i.checked_sub(1))
        .map(|i| PipelineState::ORDER[i])
    else {
        return false;
    };
    if record.state == prev {
        record.state = to;
        true
    } else {
        false
    }
}

pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{}", "Cancelling...".yellow());
            child.cancel();
        }
    });
    token
}

pub fn print_error(e: &DeployError) {
    eprintln!("{} {}", "error:".red().bold(), e);
    if let DeployError::BuildFailed { excerpt, .. } = e {
        if !excerpt.is_empty() {
            eprintln!("{}", "--- build log (last lines) ---".dimmed());
            eprintln!("{}", excerpt);
        }
    }
    let hint = e.hint();
    if !hint.is_empty() {
        for line in hint.lines() {
            eprintln!("{} {}", "hint:".yellow().bold(), line);
        }
    }
}

pub fn exit_with(e: &DeployError) -> ! {
    print_error(e);
    std::process::exit(1);
}

pub fn exit_with_stage(e: &StageError) -> ! {
    eprintln!(
        "{} stage {} -> {} failed",
        "error:".red().bold(),
        e.from.to_string().bold(),
        e.to.to_string().bold()
    );
    exit_with(&e.source);
}
