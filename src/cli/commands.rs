//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Provider;

/// Cloudport - create and manage compute nodes on Azure and `ProfitBricks`.
#[derive(Parser, Debug)]
#[command(name = "cloudport")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "CLOUDPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Provider to use instead of the configured default.
    #[arg(short, long, global = true, env = "CLOUDPORT_PROVIDER")]
    pub provider: Option<Provider>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter configuration.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration.
    Validate {
        /// Show warnings too.
        #[arg(short, long)]
        warnings: bool,
    },

    /// List locations.
    Locations,

    /// List hardware profiles.
    Hardware,

    /// List images.
    Images,

    /// Show one image.
    Image {
        /// Image id.
        id: String,
    },

    /// List nodes.
    Nodes {
        /// Only nodes of this group.
        #[arg(short, long)]
        group: Option<String>,
    },

    /// Show one node.
    Node {
        /// Node id.
        id: String,
    },

    /// Show the steps creating a node would take.
    Plan {
        /// Group the node would join.
        group: String,

        /// Template to create from.
        #[command(flatten)]
        template: TemplateArgs,
    },

    /// Create nodes in a group.
    Create {
        /// Group the nodes join.
        group: String,

        /// Number of nodes.
        #[arg(short = 'n', long, default_value = "1")]
        count: u32,

        /// Template to create from.
        #[command(flatten)]
        template: TemplateArgs,
    },

    /// Destroy a node, or every node of a group.
    Destroy {
        /// Node id.
        #[arg(required_unless_present = "group", conflicts_with = "group")]
        id: Option<String>,

        /// Destroy every node of this group.
        #[arg(short, long)]
        group: Option<String>,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Reboot a node.
    Reboot {
        /// Node id.
        id: String,
    },

    /// Stop a node without destroying it.
    Suspend {
        /// Node id.
        id: String,
    },

    /// Start a suspended node.
    Resume {
        /// Node id.
        id: String,
    },
}

/// What to create nodes from.
#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    /// Location id.
    #[arg(short, long)]
    pub location: String,

    /// Hardware profile id.
    #[arg(long)]
    pub hardware: String,

    /// Image id.
    #[arg(short, long)]
    pub image: String,

    /// Login user.
    #[arg(long)]
    pub login_user: Option<String>,

    /// Login password.
    #[arg(long, env = "CLOUDPORT_LOGIN_PASSWORD", hide_env_values = true)]
    pub login_password: Option<String>,

    /// File holding the SSH public key to authorise.
    #[arg(long)]
    pub public_key_file: Option<PathBuf>,

    /// Inbound port to open (repeatable).
    #[arg(long = "inbound-port")]
    pub inbound_ports: Vec<u16>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_create_arguments() {
        let cli = Cli::try_parse_from([
            "cloudport",
            "--provider",
            "profitbricks",
            "create",
            "web",
            "-n",
            "2",
            "--location",
            "de/fkb",
            "--hardware",
            "cores=2,ram=2048,disk=20",
            "--image",
            "img-1",
            "--inbound-port",
            "22",
            "--inbound-port",
            "80",
        ])
        .expect("parsed");

        assert_eq!(cli.provider, Some(Provider::Profitbricks));
        match cli.command {
            Commands::Create { group, count, template } => {
                assert_eq!(group, "web");
                assert_eq!(count, 2);
                assert_eq!(template.location, "de/fkb");
                assert_eq!(template.inbound_ports, vec![22, 80]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_destroy_needs_a_target() {
        assert!(Cli::try_parse_from(["cloudport", "destroy"]).is_err());
        assert!(Cli::try_parse_from(["cloudport", "destroy", "dc/srv", "--group", "web"]).is_err());

        let cli = Cli::try_parse_from(["cloudport", "destroy", "--group", "web", "--yes"]).expect("parsed");
        assert!(matches!(
            cli.command,
            Commands::Destroy { id: None, group: Some(_), yes: true }
        ));
    }
}
