mod in_memory;
mod plivo;
mod prompt;
mod railway;
mod state_file;

pub use in_memory::{
    InMemoryDeployer, InMemoryDeployerState, InMemoryTelephony, InMemoryTelephonyState,
    MemoryStateStore, ScriptedConfirmation, StaticSecretSource,
};
pub use plivo::{normalize_number, PlivoClient};
pub use prompt::{ask_yes_no, AutoConfirm, EnvSecretSource, InquireConfirmation};
pub use railway::RailwayCli;
pub use state_file::FileStateStore;
