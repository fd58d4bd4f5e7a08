use log::{info, warn};
use ship_defs::{
    BuildDescriptor, ConfirmationSource, DeployError, Deployer, Gate, PipelineRecord,
    PipelineState, RebindOutcome, SecretKey, SecretSource, StageError, StateStore,
    TelephonyProvider, VerificationReport,
};
use ship_utils::base_url_for_domain;
use tokio_util::sync::CancellationToken;

use crate::settings::Settings;

use super::{
    build_driver::BuildDriver, config_binder::ConfigurationBinder,
    domain_publisher::DomainPublisher, rebinder::WebhookRebinder, verifier::Verifier,
};

/// The remote services and operator inputs a run talks to.
pub struct Capabilities<'a> {
    pub deployer: &'a dyn Deployer,
    pub telephony: &'a dyn TelephonyProvider,
    pub confirmation: &'a dyn ConfirmationSource,
    pub secrets: &'a dyn SecretSource,
    pub store: &'a dyn StateStore,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub descriptor: BuildDescriptor,
    pub phone_number: Option<String>,
    pub public_scheme: String,
    /// Project id or name the workdir must be linked to, if set.
    pub expected_project: Option<String>,
    /// Rewind the record to this state before running.
    pub from: Option<PipelineState>,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        PipelineOptions {
            descriptor: settings.descriptor(),
            phone_number: settings.phone_number.clone(),
            public_scheme: settings.public_scheme.clone(),
            expected_project: settings.project.clone(),
            from: None,
        }
    }
}

pub struct Orchestrator<'a> {
    caps: Capabilities<'a>,
    verifier: &'a Verifier,
    options: PipelineOptions,
    cancel: CancellationToken,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        caps: Capabilities<'a>,
        verifier: &'a Verifier,
        options: PipelineOptions,
        cancel: CancellationToken,
    ) -> Self {
        Orchestrator {
            caps,
            verifier,
            options,
            cancel,
        }
    }

    /// Drives `record` to `Done`, saving after every completed transition.
    /// A record that is already `Done` is only confirmed, never mutated remotely.
    pub async fn run(&self, mut record: PipelineRecord) -> Result<PipelineRecord, StageError> {
        if let Some(from) = self.options.from {
            if from < record.state {
                info!("Rewinding pipeline from {} to {}", record.state, from);
                record.rewind_to(from);
                self.save(&record, from, from)?;
            }
        }
        let variant = self.options.descriptor.variant;
        if record.variant != variant {
            if record.state < PipelineState::Deployed {
                let configured = record.state >= PipelineState::Configured;
                if configured {
                    info!(
                        "Switching from the {} to the {} variant, binding its secrets again",
                        record.variant, variant
                    );
                    record.rewind_to(PipelineState::Linked);
                }
                record.variant = variant;
                if configured {
                    self.save(&record, PipelineState::Linked, PipelineState::Linked)?;
                }
            } else {
                warn!(
                    "Target was deployed as the {} variant; use --from configured to switch to {}",
                    record.variant, variant
                );
            }
        }

        if record.state == PipelineState::Done {
            println!("Pipeline already done for {}, confirming", record.target.display_name());
            self.confirm_done(&record)
                .await
                .map_err(|source| StageError {
                    from: PipelineState::Done,
                    to: PipelineState::Done,
                    source,
                })?;
            return Ok(record);
        }

        while let Some(next) = record.state.next() {
            let from = record.state;
            if self.cancel.is_cancelled() {
                return Err(StageError {
                    from,
                    to: next,
                    source: DeployError::Cancelled,
                });
            }
            println!("==> {} -> {}", from, next);
            self.transition(&mut record, next)
                .await
                .map_err(|source| StageError {
                    from,
                    to: next,
                    source,
                })?;
            record.state = next;
            self.save(&record, from, next)?;
        }
        println!("Pipeline done for {}", record.target.display_name());
        Ok(record)
    }

    fn save(
        &self,
        record: &PipelineRecord,
        from: PipelineState,
        to: PipelineState,
    ) -> Result<(), StageError> {
        self.caps
            .store
            .save(record)
            .map_err(|source| StageError { from, to, source })
    }

    async fn transition(
        &self,
        record: &mut PipelineRecord,
        next: PipelineState,
    ) -> Result<(), DeployError> {
        match next {
            PipelineState::Init => Ok(()),
            PipelineState::Linked => {
                self.gate(record, Gate::Link).await?;
                self.link(record).await
            }
            PipelineState::Configured => {
                self.gate(record, Gate::Secrets).await?;
                let summary = ConfigurationBinder::new(self.caps.deployer, self.caps.secrets)
                    .bind(&record.target, SecretKey::required_for(record.variant))
                    .await?;
                println!(
                    "    secrets: {} already set, {} newly set",
                    summary.already_set.len(),
                    summary.newly_set.len()
                );
                Ok(())
            }
            PipelineState::Deployed => {
                let handle = BuildDriver::new(self.caps.deployer)
                    .release(&record.target, &self.options.descriptor, self.cancel.clone())
                    .await?;
                record.release = Some(handle);
                Ok(())
            }
            PipelineState::Published
            | PipelineState::Verified
            | PipelineState::Rewired
                if !record.variant.serves_webhooks() =>
            {
                println!("    {} variant has no public webhook, passing through", record.variant);
                Ok(())
            }
            PipelineState::Published => {
                let domain = DomainPublisher::new(self.caps.deployer)
                    .publish(&record.target)
                    .await?;
                println!("    domain: {}", domain);
                record.target.domain = Some(domain);
                Ok(())
            }
            PipelineState::Verified => {
                let base_url = self.base_url(record)?;
                let report = self.verifier.verify(&base_url).await;
                print_report(&report);
                report.into_result().map(|_| ())
            }
            PipelineState::Rewired => {
                let number = self
                    .options
                    .phone_number
                    .as_deref()
                    .ok_or(DeployError::MissingPhoneNumber)?;
                let base_url = self.base_url(record)?;
                match WebhookRebinder::new(self.caps.telephony)
                    .rebind(number, &base_url)
                    .await?
                {
                    RebindOutcome::AlreadyCorrect(binding) => {
                        println!("    {} already correct: {}", number, binding.describe())
                    }
                    RebindOutcome::Updated { previous, current } => println!(
                        "    {} updated: {} -> {}",
                        number,
                        previous.describe(),
                        current.describe()
                    ),
                }
                Ok(())
            }
            PipelineState::Done => Ok(()),
        }
    }

    async fn gate(&self, record: &mut PipelineRecord, gate: Gate) -> Result<(), DeployError> {
        confirm_gate(record, gate, self.caps.confirmation, self.caps.store).await
    }

    async fn link(&self, record: &mut PipelineRecord) -> Result<(), DeployError> {
        let status = self
            .caps
            .deployer
            .status(&record.target)
            .await?
            .ok_or_else(|| DeployError::TargetNotLinked(record.target.workdir.display().to_string()))?;

        if let Some(expected) = self.options.expected_project.as_deref() {
            let matches = status.project_id == expected
                || status.project_name.as_deref() == Some(expected);
            if !matches {
                return Err(DeployError::Other(anyhow::anyhow!(
                    "{} is linked to project {}, expected {}",
                    record.target.workdir.display(),
                    status.project_name.as_deref().unwrap_or(&status.project_id),
                    expected
                )));
            }
        }
        record.target.apply_link(&status);
        println!("    linked to {}", record.target.display_name());
        Ok(())
    }

    fn base_url(&self, record: &PipelineRecord) -> Result<String, DeployError> {
        record
            .target
            .domain
            .as_deref()
            .map(|domain| base_url_for_domain(domain, &self.options.public_scheme))
            .ok_or_else(|| DeployError::DomainUnavailable("no domain recorded for the target".to_string()))
    }

    /// Reads only: secrets, domain, endpoints, binding.
    async fn confirm_done(&self, record: &PipelineRecord) -> Result<(), DeployError> {
        ConfigurationBinder::new(self.caps.deployer, self.caps.secrets)
            .confirm(&record.target, SecretKey::required_for(record.variant))
            .await?;
        println!("    secrets confirmed");
        if !record.variant.serves_webhooks() {
            return Ok(());
        }

        let domain = DomainPublisher::new(self.caps.deployer)
            .existing(&record.target)
            .await?
            .ok_or_else(|| DeployError::DomainUnavailable("the target has no domain".to_string()))?;
        if record.target.domain.as_deref() != Some(domain.as_str()) {
            warn!(
                "Domain changed since the pipeline finished: {} (recorded {})",
                domain,
                record.target.domain.as_deref().unwrap_or("none")
            );
        }
        let base_url = base_url_for_domain(&domain, &self.options.public_scheme);

        let report = self.verifier.verify(&base_url).await;
        print_report(&report);
        report.into_result()?;

        if let Some(number) = self.options.phone_number.as_deref() {
            let binding = WebhookRebinder::new(self.caps.telephony)
                .confirm(number, &base_url)
                .await?;
            println!("    {} answers at {}", number, binding.describe());
        }
        Ok(())
    }
}

fn print_report(report: &VerificationReport) {
    for check in &report.checks {
        let marker = match (check.passed, check.warning) {
            (true, false) => "PASS",
            (true, true) => "WARN",
            (false, _) => "FAIL",
        };
        println!(
            "    [{}] {} {} {}{}",
            marker,
            check.name,
            check.method,
            check.url,
            check
                .message
                .as_deref()
                .map(|m| format!(" ({})", m))
                .unwrap_or_default()
        );
    }
}

/// Asks once per record; a confirmed gate is saved straight away, before the
/// stage it guards runs.
pub async fn confirm_gate(
    record: &mut PipelineRecord,
    gate: Gate,
    confirmation: &dyn ConfirmationSource,
    store: &dyn StateStore,
) -> Result<(), DeployError> {
    if record.confirmed_gates.contains(&gate) {
        info!("{} gate already confirmed", gate);
        return Ok(());
    }
    let prompt = gate.prompt(&record.target);
    if !confirmation.confirm(gate, &prompt).await? {
        return Err(DeployError::GateDeclined(gate.to_string()));
    }
    record.confirmed_gates.insert(gate);
    store.save(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{
        InMemoryDeployer, InMemoryTelephony, MemoryStateStore, ScriptedConfirmation,
        StaticSecretSource,
    };
    use crate::settings::default_checks;
    use pretty_assertions::assert_eq;
    use ship_defs::{BuildVariant, DeploymentTarget};
    use std::time::Duration;

    struct Fixture {
        dir: tempfile::TempDir,
        deployer: InMemoryDeployer,
        telephony: InMemoryTelephony,
        confirmation: ScriptedConfirmation,
        secrets: StaticSecretSource,
        store: MemoryStateStore,
        verifier: Verifier,
    }

    impl Fixture {
        fn agent() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("Dockerfile.livekit"), "FROM python:3.11\n").unwrap();
            Fixture {
                dir,
                deployer: InMemoryDeployer::linked("p-1", "demo.up.example"),
                telephony: InMemoryTelephony::default(),
                confirmation: ScriptedConfirmation::always(true),
                secrets: StaticSecretSource::with_keys(&SecretKey::ALL),
                store: MemoryStateStore::default(),
                verifier: Verifier::new(default_checks(), Duration::from_secs(1), 4).unwrap(),
            }
        }

        fn orchestrator(&self) -> Orchestrator<'_> {
            Orchestrator::new(
                Capabilities {
                    deployer: &self.deployer,
                    telephony: &self.telephony,
                    confirmation: &self.confirmation,
                    secrets: &self.secrets,
                    store: &self.store,
                },
                &self.verifier,
                PipelineOptions {
                    descriptor: BuildDescriptor::for_variant(BuildVariant::Agent),
                    phone_number: None,
                    public_scheme: "https".to_string(),
                    expected_project: None,
                    from: None,
                },
                CancellationToken::new(),
            )
        }

        fn record(&self) -> PipelineRecord {
            PipelineRecord::new(DeploymentTarget::new(self.dir.path()), BuildVariant::Agent)
        }
    }

    #[tokio::test]
    async fn test_agent_variant_passes_through_webhook_stages() {
        let fixture = Fixture::agent();
        let record = fixture.orchestrator().run(fixture.record()).await.unwrap();

        assert_eq!(record.state, PipelineState::Done);
        assert_eq!(record.target.domain, None);
        assert_eq!(fixture.deployer.state().generate_domain_calls, 0);
        assert_eq!(fixture.confirmation.asked(), vec![Gate::Link, Gate::Secrets]);
        assert_eq!(fixture.telephony.state().reads, 0);
    }

    #[tokio::test]
    async fn test_declined_gate_halts_at_init() {
        let mut fixture = Fixture::agent();
        fixture.confirmation = ScriptedConfirmation::always(false);
        let err = fixture
            .orchestrator()
            .run(fixture.record())
            .await
            .unwrap_err();

        assert_eq!(err.from, PipelineState::Init);
        assert_eq!(err.to, PipelineState::Linked);
        assert!(matches!(err.source, DeployError::GateDeclined(_)));
        assert_eq!(fixture.store.saves(), 0);
    }

    #[tokio::test]
    async fn test_confirmed_gate_is_saved_before_the_stage_runs() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStateStore::default();
        let confirmation = ScriptedConfirmation::always(true);
        let mut record = PipelineRecord::new(DeploymentTarget::new(dir.path()), BuildVariant::Pipeline);

        confirm_gate(&mut record, Gate::Link, &confirmation, &store)
            .await
            .unwrap();

        let saved = store.load(dir.path()).unwrap().unwrap();
        assert!(saved.confirmed_gates.contains(&Gate::Link));
        assert_eq!(saved.state, PipelineState::Init);

        // Asked once per record.
        confirm_gate(&mut record, Gate::Link, &confirmation, &store)
            .await
            .unwrap();
        assert_eq!(confirmation.asked(), vec![Gate::Link]);
        assert_eq!(store.saves(), 1);
    }

    #[tokio::test]
    async fn test_declined_gate_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStateStore::default();
        let mut record = PipelineRecord::new(DeploymentTarget::new(dir.path()), BuildVariant::Pipeline);

        let err = confirm_gate(&mut record, Gate::Link, &ScriptedConfirmation::always(false), &store)
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::GateDeclined(_)));
        assert!(record.confirmed_gates.is_empty());
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn test_unlinked_workdir() {
        let fixture = Fixture::agent();
        fixture.deployer.state().link = None;
        let err = fixture
            .orchestrator()
            .run(fixture.record())
            .await
            .unwrap_err();
        assert!(matches!(err.source, DeployError::TargetNotLinked(_)));

        let saved = fixture.store.load(fixture.dir.path()).unwrap().unwrap();
        assert_eq!(saved.state, PipelineState::Init);
        assert!(saved.confirmed_gates.contains(&Gate::Link));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let fixture = Fixture::agent();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let orchestrator = Orchestrator::new(
            Capabilities {
                deployer: &fixture.deployer,
                telephony: &fixture.telephony,
                confirmation: &fixture.confirmation,
                secrets: &fixture.secrets,
                store: &fixture.store,
            },
            &fixture.verifier,
            PipelineOptions {
                descriptor: BuildDescriptor::for_variant(BuildVariant::Agent),
                phone_number: None,
                public_scheme: "https".to_string(),
                expected_project: None,
                from: None,
            },
            cancel,
        );
        let err = orchestrator.run(fixture.record()).await.unwrap_err();
        assert!(matches!(err.source, DeployError::Cancelled));
    }

    struct CancellingSecrets {
        inner: StaticSecretSource,
        cancel: CancellationToken,
    }

    #[async_trait::async_trait]
    impl SecretSource for CancellingSecrets {
        async fn secret_for(
            &self,
            key: SecretKey,
        ) -> Result<Option<ship_defs::SecretValue>, DeployError> {
            self.cancel.cancel();
            self.inner.secret_for(key).await
        }
    }

    #[tokio::test]
    async fn test_cancel_during_configuration_stops_before_build() {
        let fixture = Fixture::agent();
        let cancel = CancellationToken::new();
        let secrets = CancellingSecrets {
            inner: StaticSecretSource::with_keys(&SecretKey::ALL),
            cancel: cancel.clone(),
        };
        let orchestrator = Orchestrator::new(
            Capabilities {
                deployer: &fixture.deployer,
                telephony: &fixture.telephony,
                confirmation: &fixture.confirmation,
                secrets: &secrets,
                store: &fixture.store,
            },
            &fixture.verifier,
            fixture.orchestrator().options,
            cancel,
        );

        let err = orchestrator.run(fixture.record()).await.unwrap_err();

        assert_eq!(err.from, PipelineState::Configured);
        assert_eq!(err.to, PipelineState::Deployed);
        assert!(matches!(err.source, DeployError::Cancelled));
        let saved = fixture.store.load(fixture.dir.path()).unwrap().unwrap();
        assert_eq!(saved.state, PipelineState::Configured);
        assert_eq!(saved.release, None);
        assert_eq!(fixture.deployer.state().build_calls, 0);
    }

    #[tokio::test]
    async fn test_variant_switch_after_configured_binds_new_secrets() {
        let mut fixture = Fixture::agent();
        fixture.secrets = StaticSecretSource::with_keys(SecretKey::required_for(BuildVariant::Pipeline));
        std::fs::write(fixture.dir.path().join("Dockerfile"), "FROM python:3.11\n").unwrap();

        // Configured as the pipeline variant, whose build then failed.
        let mut record =
            PipelineRecord::new(DeploymentTarget::new(fixture.dir.path()), BuildVariant::Pipeline);
        let mut pipeline = fixture.orchestrator();
        pipeline.options.descriptor = BuildDescriptor::for_variant(BuildVariant::Pipeline);
        fixture.deployer.state().fail_next_build = Some("ERROR: build failed".to_string());
        let err = pipeline.run(record.clone()).await.unwrap_err();
        assert_eq!(err.from, PipelineState::Configured);
        record = fixture.store.load(fixture.dir.path()).unwrap().unwrap();
        assert_eq!(record.state, PipelineState::Configured);

        // Re-run as the agent variant without the LiveKit keys available.
        let err = fixture.orchestrator().run(record).await.unwrap_err();

        assert_eq!(err.from, PipelineState::Linked);
        assert_eq!(err.to, PipelineState::Configured);
        match &err.source {
            DeployError::ConfigurationIncomplete { missing } => {
                assert!(missing.contains(&"LIVEKIT_API_KEY".to_string()))
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let saved = fixture.store.load(fixture.dir.path()).unwrap().unwrap();
        assert_eq!(saved.state, PipelineState::Linked);
        assert_eq!(saved.variant, BuildVariant::Agent);
        assert_eq!(fixture.deployer.state().build_calls, 1);
        assert!(!fixture
            .deployer
            .state()
            .variables
            .contains_key("LIVEKIT_API_KEY"));
    }

    #[tokio::test]
    async fn test_rewind_forces_rebuild() {
        let fixture = Fixture::agent();
        let done = fixture.orchestrator().run(fixture.record()).await.unwrap();
        assert_eq!(fixture.deployer.state().build_calls, 1);

        let mut orchestrator = fixture.orchestrator();
        orchestrator.options.from = Some(PipelineState::Configured);
        let rebuilt = orchestrator.run(done).await.unwrap();

        assert_eq!(rebuilt.state, PipelineState::Done);
        assert_eq!(fixture.deployer.state().build_calls, 2);
        assert_eq!(fixture.confirmation.asked().len(), 2);
    }

    #[tokio::test]
    async fn test_expected_project_mismatch() {
        let fixture = Fixture::agent();
        let mut orchestrator = fixture.orchestrator();
        orchestrator.options.expected_project = Some("other-project".to_string());
        let err = orchestrator.run(fixture.record()).await.unwrap_err();
        assert_eq!(err.to, PipelineState::Linked);
        assert!(err.to_string().contains("expected other-project"));
    }
}
