pub mod check;
pub mod pipeline;
pub mod stage;
pub mod webhook;
