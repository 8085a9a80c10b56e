pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ConfigArgs};
pub use commands::run;
