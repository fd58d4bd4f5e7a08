mod cmd;
pub mod config_path;
mod logging;
mod string_utils;
mod time;

pub use cmd::{run_command_with_input, run_generic_command, CommandOutcome, CommandResult};
pub use logging::setup_logging;
pub use string_utils::{
    base_url_for_domain, join_url, normalize_domain, parse_base_url, truncate,
};
pub use time::get_timestamp;
