#[allow(clippy::module_inception)]
mod cli;
mod log_level;

pub use cli::{Cli, Command, KindArg};
pub use log_level::LogLevel;
