mod build_driver;
mod call_logs;
mod config_binder;
mod domain_publisher;
mod health_probe;
mod orchestrator;
mod preflight;
mod rebinder;
mod verifier;

pub use build_driver::{check_descriptor, BuildDriver};
pub use call_logs::{CallLogInspector, CallLogs};
pub use config_binder::{BindSummary, ConfigurationBinder};
pub use domain_publisher::DomainPublisher;
pub use health_probe::{evaluate_health, HealthProbe};
pub use orchestrator::{confirm_gate, Capabilities, Orchestrator, PipelineOptions};
pub use preflight::{run_preflight, PreflightCheck};
pub use rebinder::{answer_url_for, WebhookRebinder};
pub use verifier::{evaluate_check, Verifier};
