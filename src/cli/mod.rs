//! Command-line interface for cloudport.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, TemplateArgs};
pub use output::OutputFormatter;
