use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use ship_defs::{
    BuildDescriptor, DeployError, Deployer, DeploymentTarget, LinkStatus, ReleaseHandle, SecretSet,
};
use ship_utils::{
    get_timestamp, normalize_domain, run_command_with_input, run_generic_command, CommandOutcome,
    CommandResult,
};
use tokio_util::sync::CancellationToken;

const DOCKERFILE_PATH_VARIABLE: &str = "RAILWAY_DOCKERFILE_PATH";
const PUBLIC_DOMAIN_VARIABLE: &str = "RAILWAY_PUBLIC_DOMAIN";

/// `Deployer` backed by the `railway` CLI, run from the target's workdir.
#[derive(Clone, Debug)]
pub struct RailwayCli {
    bin: String,
    build_log_lines: usize,
}

impl RailwayCli {
    pub fn new(bin: &str, build_log_lines: usize) -> Self {
        RailwayCli {
            bin: bin.to_string(),
            build_log_lines,
        }
    }

    fn command(&self, workdir: Option<&Path>, args: &[&str]) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.bin);
        cmd.args(args);
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Runs quietly; `display` is what gets reported, so values never leak into errors.
    async fn run(
        &self,
        workdir: Option<&Path>,
        args: &[&str],
        display: &str,
    ) -> Result<CommandResult, DeployError> {
        log::debug!("Running {}", display);
        let mut cmd = self.command(workdir, args);
        let outcome = run_generic_command(&mut cmd, 500, false, &CancellationToken::new())
            .await
            .map_err(|e| DeployError::Command {
                command: display.to_string(),
                reason: e.to_string(),
            })?;
        match outcome {
            CommandOutcome::Finished(result) if result.success => Ok(result),
            CommandOutcome::Finished(result) => Err(DeployError::Command {
                command: display.to_string(),
                reason: result.excerpt(),
            }),
            CommandOutcome::Cancelled => Err(DeployError::Cancelled),
        }
    }

    async fn variables(&self, target: &DeploymentTarget) -> Result<BTreeMap<String, String>, DeployError> {
        let result = self
            .run(
                Some(&target.workdir),
                &["variables", "--json"],
                "railway variables --json",
            )
            .await?;
        parse_variables(&result.stdout)
    }

    /// One `railway variables` call per key; the value goes over stdin so it
    /// never shows up in the process list.
    async fn set_raw(
        &self,
        target: &DeploymentTarget,
        pairs: &[(String, String)],
    ) -> Result<(), DeployError> {
        for (key, value) in pairs {
            let display = format!("railway variables --skip-deploys --set-from-stdin {}", key);
            log::debug!("Running {}", display);
            let mut cmd = self.command(
                Some(&target.workdir),
                &["variables", "--skip-deploys", "--set-from-stdin", key.as_str()],
            );
            let result = run_command_with_input(&mut cmd, value, 500)
                .await
                .map_err(|e| DeployError::Command {
                    command: display.clone(),
                    reason: e.to_string(),
                })?;
            if !result.success {
                return Err(DeployError::Command {
                    command: display,
                    reason: result.excerpt(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Deployer for RailwayCli {
    async fn version(&self) -> Result<String, DeployError> {
        let result = self.run(None, &["--version"], "railway --version").await?;
        Ok(result.stdout.trim().to_string())
    }

    async fn whoami(&self) -> Result<String, DeployError> {
        let result = self.run(None, &["whoami"], "railway whoami").await?;
        Ok(result.stdout.trim().to_string())
    }

    async fn status(&self, target: &DeploymentTarget) -> Result<Option<LinkStatus>, DeployError> {
        match self
            .run(
                Some(&target.workdir),
                &["status", "--json"],
                "railway status --json",
            )
            .await
        {
            Ok(result) => parse_status(&result.stdout).map(Some),
            Err(DeployError::Command { reason, .. }) if is_not_linked(&reason) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_variables(
        &self,
        target: &DeploymentTarget,
    ) -> Result<BTreeSet<String>, DeployError> {
        Ok(self.variables(target).await?.into_keys().collect())
    }

    async fn set_variables(
        &self,
        target: &DeploymentTarget,
        secrets: &SecretSet,
    ) -> Result<(), DeployError> {
        let pairs: Vec<(String, String)> = secrets
            .iter()
            .map(|(key, value)| (key.as_str().to_string(), value.expose().to_string()))
            .collect();
        self.set_raw(target, &pairs).await
    }

    async fn current_domain(
        &self,
        target: &DeploymentTarget,
    ) -> Result<Option<String>, DeployError> {
        let variables = self.variables(target).await?;
        Ok(variables
            .get(PUBLIC_DOMAIN_VARIABLE)
            .map(|d| normalize_domain(d))
            .filter(|d| !d.is_empty()))
    }

    async fn generate_domain(&self, target: &DeploymentTarget) -> Result<String, DeployError> {
        let result = self
            .run(
                Some(&target.workdir),
                &["domain", "--json"],
                "railway domain --json",
            )
            .await
            .map_err(|e| match e {
                DeployError::Command { reason, .. } => DeployError::DomainUnavailable(reason),
                other => other,
            })?;
        parse_domain(&result.stdout).ok_or_else(|| {
            DeployError::DomainUnavailable(format!(
                "no domain found in output: {}",
                result.stdout.trim()
            ))
        })
    }

    async fn build(
        &self,
        target: &DeploymentTarget,
        descriptor: &BuildDescriptor,
        cancel: CancellationToken,
    ) -> Result<ReleaseHandle, DeployError> {
        let descriptor_path = descriptor.path.to_string_lossy().to_string();
        // Always set, the platform default included.
        self.set_raw(
            target,
            &[(DOCKERFILE_PATH_VARIABLE.to_string(), descriptor_path.clone())],
        )
        .await?;

        println!("Building {} from {} ...", target.display_name(), descriptor_path);
        let mut cmd = self.command(Some(&target.workdir), &["up", "--ci"]);
        let outcome = run_generic_command(&mut cmd, self.build_log_lines, true, &cancel)
            .await
            .map_err(|e| DeployError::BuildFailed {
                reason: format!("could not start `railway up`: {}", e),
                excerpt: String::new(),
            })?;

        let result = match outcome {
            CommandOutcome::Cancelled => return Err(DeployError::Cancelled),
            CommandOutcome::Finished(result) => result,
        };
        if !result.success {
            return Err(DeployError::BuildFailed {
                reason: match result.exit_code {
                    Some(code) => format!("`railway up` exited with status {}", code),
                    None => "`railway up` was terminated".to_string(),
                },
                excerpt: result.excerpt(),
            });
        }

        let (deployment_id, build_logs_url) =
            parse_release_output(&format!("{}\n{}", result.stdout, result.stderr));
        Ok(ReleaseHandle {
            descriptor: descriptor.path.clone(),
            deployment_id,
            build_logs_url,
            finished_at: get_timestamp(),
        })
    }

    async fn stream_logs(
        &self,
        target: &DeploymentTarget,
        cancel: CancellationToken,
    ) -> Result<(), DeployError> {
        let mut cmd = self.command(Some(&target.workdir), &["logs"]);
        let outcome = run_generic_command(&mut cmd, 20, true, &cancel)
            .await
            .map_err(|e| DeployError::Command {
                command: "railway logs".to_string(),
                reason: e.to_string(),
            })?;
        match outcome {
            CommandOutcome::Cancelled => Ok(()),
            CommandOutcome::Finished(result) if result.success => Ok(()),
            CommandOutcome::Finished(result) => Err(DeployError::Command {
                command: "railway logs".to_string(),
                reason: result.excerpt(),
            }),
        }
    }

    async fn down(&self, target: &DeploymentTarget) -> Result<(), DeployError> {
        self.run(Some(&target.workdir), &["down", "--yes"], "railway down --yes")
            .await?;
        Ok(())
    }
}

fn is_not_linked(reason: &str) -> bool {
    let reason = reason.to_lowercase();
    reason.contains("no linked project") || reason.contains("not linked")
}

fn parse_status(stdout: &str) -> Result<LinkStatus, DeployError> {
    let json: Value = serde_json::from_str(stdout.trim())
        .map_err(|e| anyhow::anyhow!("Unexpected `railway status` output: {}", e))?;
    let project_id = json
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("`railway status` output has no project id"))?;
    let first_node_name = |field: &str| {
        json.get(field)
            .and_then(|v| v.get("edges"))
            .and_then(|v| v.as_array())
            .and_then(|edges| edges.first())
            .and_then(|edge| edge.get("node"))
            .and_then(|node| node.get("name"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    };
    Ok(LinkStatus {
        project_id: project_id.to_string(),
        project_name: json
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        environment: first_node_name("environments"),
        service: first_node_name("services"),
    })
}

fn parse_variables(stdout: &str) -> Result<BTreeMap<String, String>, DeployError> {
    let json: Value = serde_json::from_str(stdout.trim())
        .map_err(|e| anyhow::anyhow!("Unexpected `railway variables` output: {}", e))?;
    let object = json
        .as_object()
        .ok_or_else(|| anyhow::anyhow!("`railway variables --json` did not return an object"))?;
    Ok(object
        .iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect())
}

fn parse_domain(stdout: &str) -> Option<String> {
    if let Ok(json) = serde_json::from_str::<Value>(stdout.trim()) {
        if let Some(domain) = json.get("domain").and_then(|v| v.as_str()) {
            return Some(normalize_domain(domain));
        }
    }
    let re = Regex::new(r"https://([A-Za-z0-9.-]+\.[A-Za-z]{2,})").ok()?;
    re.captures(stdout)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pulls the deployment id and build-logs URL out of `railway up` output.
fn parse_release_output(output: &str) -> (Option<String>, Option<String>) {
    let url_re = match Regex::new(r"https://\S+") {
        Ok(re) => re,
        Err(_) => return (None, None),
    };
    let logs_url = url_re
        .find_iter(output)
        .map(|m| m.as_str().to_string())
        .find(|url| url.contains("id="));
    let deployment_id = logs_url.as_deref().and_then(|url| {
        url.split(['?', '&'])
            .find_map(|part| part.strip_prefix("id="))
            .map(|id| id.to_string())
    });
    (deployment_id, logs_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_status() {
        let stdout = r#"{
            "id": "5f1c2d3e-aaaa-bbbb-cccc-1234567890ab",
            "name": "acme-receptionist",
            "environments": {"edges": [{"node": {"id": "e1", "name": "production"}}]},
            "services": {"edges": [{"node": {"id": "s1", "name": "bot"}}]}
        }"#;
        let status = parse_status(stdout).unwrap();
        assert_eq!(
            status,
            LinkStatus {
                project_id: "5f1c2d3e-aaaa-bbbb-cccc-1234567890ab".to_string(),
                project_name: Some("acme-receptionist".to_string()),
                environment: Some("production".to_string()),
                service: Some("bot".to_string()),
            }
        );
    }

    #[test]
    fn test_not_linked_detection() {
        assert!(is_not_linked(
            "No linked project found. Run railway link to connect to a project"
        ));
        assert!(!is_not_linked("Unauthorized. Please login with `railway login`"));
    }

    #[test]
    fn test_parse_variables_keeps_keys() {
        let stdout = r#"{"OPENAI_API_KEY":"sk-1","PORT":"8080","RAILWAY_PUBLIC_DOMAIN":"demo.up.railway.app"}"#;
        let vars = parse_variables(stdout).unwrap();
        assert_eq!(
            vars.keys().cloned().collect::<Vec<_>>(),
            vec!["OPENAI_API_KEY", "PORT", "RAILWAY_PUBLIC_DOMAIN"]
        );
        assert_eq!(vars["RAILWAY_PUBLIC_DOMAIN"], "demo.up.railway.app");
    }

    #[test]
    fn test_parse_domain_json_and_text() {
        assert_eq!(
            parse_domain(r#"{"domain": "https://demo.up.railway.app"}"#),
            Some("demo.up.railway.app".to_string())
        );
        assert_eq!(
            parse_domain("Service Domain created:\n🚀 https://demo-production.up.railway.app\n"),
            Some("demo-production.up.railway.app".to_string())
        );
        assert_eq!(parse_domain("nothing here"), None);
    }

    #[test]
    fn test_parse_release_output() {
        let output = "Indexed\nCompressed [====] 100%\nUploaded\n  Build Logs: https://railway.com/project/p1/service/s1?id=9a8b7c6d-1111&\nDeploy complete\n";
        let (id, url) = parse_release_output(output);
        assert_eq!(id.as_deref(), Some("9a8b7c6d-1111"));
        assert_eq!(
            url.as_deref(),
            Some("https://railway.com/project/p1/service/s1?id=9a8b7c6d-1111&")
        );
        assert_eq!(parse_release_output("Deploy complete"), (None, None));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_secret_values_stay_off_the_command_line() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("railway");
        std::fs::write(
            &bin,
            "#!/bin/sh\necho \"$@\" >> args.log\ncat >> stdin.log\necho >> stdin.log\n",
        )
        .unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let railway = RailwayCli::new(bin.to_str().unwrap(), 10);
        railway
            .set_raw(
                &DeploymentTarget::new(dir.path()),
                &[
                    ("OPENAI_API_KEY".to_string(), "sk-live-123".to_string()),
                    ("POSTGRES_URL".to_string(), "postgres://u:pw@db/x".to_string()),
                ],
            )
            .await
            .unwrap();

        let args = std::fs::read_to_string(dir.path().join("args.log")).unwrap();
        assert_eq!(
            args,
            "variables --skip-deploys --set-from-stdin OPENAI_API_KEY\n\
             variables --skip-deploys --set-from-stdin POSTGRES_URL\n"
        );
        let stdin = std::fs::read_to_string(dir.path().join("stdin.log")).unwrap();
        assert_eq!(stdin, "sk-live-123\npostgres://u:pw@db/x\n");
    }
}
