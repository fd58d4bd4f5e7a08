mod interface;
mod logic;
mod settings;

pub use interface::*;
pub use logic::*;
pub use settings::{default_checks, PlivoSettings, Settings, DEFAULT_PLIVO_API_BASE};
