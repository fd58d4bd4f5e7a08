use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use ship_defs::{
    BuildDescriptor, ConfirmationSource, DeployError, Deployer, DeploymentTarget, Gate, HttpMethod,
    LinkStatus, PipelineRecord, ReleaseHandle, SecretKey, SecretSet, SecretSource, SecretValue,
    StateStore, TelephonyProvider, WebhookBinding,
};
use ship_utils::get_timestamp;
use tokio_util::sync::CancellationToken;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryDeployerState {
    pub link: Option<LinkStatus>,
    pub variables: BTreeMap<String, String>,
    pub domain: Option<String>,
    /// What `generate_domain` creates; `None` simulates a platform refusal.
    pub domain_to_generate: Option<String>,
    /// Excerpt returned by the next build, which then fails.
    pub fail_next_build: Option<String>,
    /// Accept variable writes without storing them.
    pub drop_variable_writes: bool,
    pub releases: Vec<ReleaseHandle>,
    pub logs: Vec<String>,
    pub set_variable_calls: usize,
    pub build_calls: usize,
    pub generate_domain_calls: usize,
    pub down_calls: usize,
}

/// `Deployer` that keeps everything in memory and counts every mutation.
#[derive(Default)]
pub struct InMemoryDeployer {
    state: Mutex<InMemoryDeployerState>,
}

impl InMemoryDeployer {
    pub fn new(state: InMemoryDeployerState) -> Self {
        InMemoryDeployer {
            state: Mutex::new(state),
        }
    }

    pub fn linked(project_id: &str, domain_to_generate: &str) -> Self {
        InMemoryDeployer::new(InMemoryDeployerState {
            link: Some(LinkStatus {
                project_id: project_id.to_string(),
                project_name: Some(project_id.to_string()),
                environment: Some("production".to_string()),
                service: None,
            }),
            domain_to_generate: Some(domain_to_generate.to_string()),
            ..Default::default()
        })
    }

    pub fn state(&self) -> MutexGuard<'_, InMemoryDeployerState> {
        lock(&self.state)
    }

    pub fn mutation_count(&self) -> usize {
        let state = self.state();
        state.set_variable_calls + state.build_calls + state.generate_domain_calls + state.down_calls
    }
}

#[async_trait]
impl Deployer for InMemoryDeployer {
    async fn version(&self) -> Result<String, DeployError> {
        Ok("railway 0.0.0-in-memory".to_string())
    }

    async fn whoami(&self) -> Result<String, DeployError> {
        Ok("Logged in as operator@example.com".to_string())
    }

    async fn status(&self, _target: &DeploymentTarget) -> Result<Option<LinkStatus>, DeployError> {
        Ok(self.state().link.clone())
    }

    async fn list_variables(
        &self,
        _target: &DeploymentTarget,
    ) -> Result<BTreeSet<String>, DeployError> {
        Ok(self.state().variables.keys().cloned().collect())
    }

    async fn set_variables(
        &self,
        _target: &DeploymentTarget,
        secrets: &SecretSet,
    ) -> Result<(), DeployError> {
        let mut state = self.state();
        state.set_variable_calls += 1;
        if state.drop_variable_writes {
            return Ok(());
        }
        for (key, value) in secrets.iter() {
            state
                .variables
                .insert(key.as_str().to_string(), value.expose().to_string());
        }
        Ok(())
    }

    async fn current_domain(
        &self,
        _target: &DeploymentTarget,
    ) -> Result<Option<String>, DeployError> {
        Ok(self.state().domain.clone())
    }

    async fn generate_domain(&self, _target: &DeploymentTarget) -> Result<String, DeployError> {
        let mut state = self.state();
        state.generate_domain_calls += 1;
        match state.domain_to_generate.clone() {
            Some(domain) => {
                state.domain = Some(domain.clone());
                Ok(domain)
            }
            None => Err(DeployError::DomainUnavailable(
                "domain quota exhausted".to_string(),
            )),
        }
    }

    async fn build(
        &self,
        _target: &DeploymentTarget,
        descriptor: &BuildDescriptor,
        cancel: CancellationToken,
    ) -> Result<ReleaseHandle, DeployError> {
        let mut state = self.state();
        state.build_calls += 1;
        if cancel.is_cancelled() {
            return Err(DeployError::Cancelled);
        }
        if let Some(excerpt) = state.fail_next_build.take() {
            return Err(DeployError::BuildFailed {
                reason: "`railway up` exited with status 1".to_string(),
                excerpt,
            });
        }
        let handle = ReleaseHandle {
            descriptor: descriptor.path.clone(),
            deployment_id: Some(format!("deploy-{}", state.build_calls)),
            build_logs_url: None,
            finished_at: get_timestamp(),
        };
        state.releases.push(handle.clone());
        Ok(handle)
    }

    async fn stream_logs(
        &self,
        _target: &DeploymentTarget,
        _cancel: CancellationToken,
    ) -> Result<(), DeployError> {
        for line in self.state().logs.iter() {
            println!("{}", line);
        }
        Ok(())
    }

    async fn down(&self, _target: &DeploymentTarget) -> Result<(), DeployError> {
        let mut state = self.state();
        state.down_calls += 1;
        state.releases.pop();
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryTelephonyState {
    pub bindings: BTreeMap<String, WebhookBinding>,
    /// Accept writes without storing them, like an eventually-consistent provider.
    pub drop_writes: bool,
    pub reject_writes: bool,
    pub reads: usize,
    pub writes: usize,
}

#[derive(Default)]
pub struct InMemoryTelephony {
    state: Mutex<InMemoryTelephonyState>,
}

impl InMemoryTelephony {
    pub fn with_binding(number: &str, answer_url: &str) -> Self {
        let telephony = InMemoryTelephony::default();
        telephony.state().bindings.insert(
            number.to_string(),
            WebhookBinding {
                number: number.to_string(),
                answer_url: Some(answer_url.to_string()),
                answer_method: Some(HttpMethod::Post),
            },
        );
        telephony
    }

    pub fn state(&self) -> MutexGuard<'_, InMemoryTelephonyState> {
        lock(&self.state)
    }
}

#[async_trait]
impl TelephonyProvider for InMemoryTelephony {
    async fn get_binding(&self, number: &str) -> Result<WebhookBinding, DeployError> {
        let mut state = self.state();
        state.reads += 1;
        state
            .bindings
            .get(number)
            .cloned()
            .ok_or_else(|| DeployError::Http {
                url: format!("memory://numbers/{}", number),
                reason: "HTTP 404: number not found".to_string(),
            })
    }

    async fn update_binding(
        &self,
        number: &str,
        answer_url: &str,
        method: HttpMethod,
    ) -> Result<(), DeployError> {
        let mut state = self.state();
        state.writes += 1;
        if state.reject_writes {
            return Err(DeployError::RebindWriteFailed {
                number: number.to_string(),
                reason: "HTTP 403: forbidden".to_string(),
            });
        }
        if state.drop_writes {
            return Ok(());
        }
        state.bindings.insert(
            number.to_string(),
            WebhookBinding {
                number: number.to_string(),
                answer_url: Some(answer_url.to_string()),
                answer_method: Some(method),
            },
        );
        Ok(())
    }

    async fn list_bindings(&self) -> Result<Vec<WebhookBinding>, DeployError> {
        let mut state = self.state();
        state.reads += 1;
        Ok(state.bindings.values().cloned().collect())
    }
}

/// Answers gates from a script, falling back to a fixed answer.
pub struct ScriptedConfirmation {
    answers: Mutex<VecDeque<bool>>,
    fallback: bool,
    asked: Mutex<Vec<Gate>>,
}

impl ScriptedConfirmation {
    pub fn always(answer: bool) -> Self {
        ScriptedConfirmation::scripted(vec![], answer)
    }

    pub fn scripted(answers: Vec<bool>, fallback: bool) -> Self {
        ScriptedConfirmation {
            answers: Mutex::new(answers.into()),
            fallback,
            asked: Mutex::new(vec![]),
        }
    }

    pub fn asked(&self) -> Vec<Gate> {
        lock(&self.asked).clone()
    }
}

#[async_trait]
impl ConfirmationSource for ScriptedConfirmation {
    async fn confirm(&self, gate: Gate, _prompt: &str) -> Result<bool, DeployError> {
        lock(&self.asked).push(gate);
        Ok(lock(&self.answers).pop_front().unwrap_or(self.fallback))
    }
}

#[derive(Default)]
pub struct StaticSecretSource {
    secrets: SecretSet,
    requested: Mutex<Vec<SecretKey>>,
}

impl StaticSecretSource {
    pub fn new(secrets: SecretSet) -> Self {
        StaticSecretSource {
            secrets,
            requested: Mutex::new(vec![]),
        }
    }

    /// A source holding a placeholder value for every key in `keys`.
    pub fn with_keys(keys: &[SecretKey]) -> Self {
        let mut secrets = SecretSet::new();
        for key in keys {
            secrets.insert(*key, SecretValue::new(format!("test-{}", key.as_str().to_lowercase())));
        }
        StaticSecretSource::new(secrets)
    }

    pub fn requested(&self) -> Vec<SecretKey> {
        lock(&self.requested).clone()
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn secret_for(&self, key: SecretKey) -> Result<Option<SecretValue>, DeployError> {
        lock(&self.requested).push(key);
        Ok(self.secrets.get(key).cloned())
    }
}

#[derive(Default)]
pub struct MemoryStateStore {
    records: Mutex<HashMap<PathBuf, PipelineRecord>>,
    saves: Mutex<usize>,
}

impl MemoryStateStore {
    pub fn saves(&self) -> usize {
        *lock(&self.saves)
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, workdir: &Path) -> Result<Option<PipelineRecord>, DeployError> {
        Ok(lock(&self.records).get(workdir).cloned())
    }

    fn save(&self, record: &PipelineRecord) -> Result<(), DeployError> {
        *lock(&self.saves) += 1;
        lock(&self.records).insert(record.target.workdir.clone(), record.clone());
        Ok(())
    }
}
