//! Cloudport CLI entrypoint.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cloudport::azure::AzureComputeServiceAdapter;
use cloudport::cli::{Cli, Commands, OutputFormatter, TemplateArgs};
use cloudport::compute::{ComputeService, ComputeServiceAdapter, Poller, Template, TemplateOptions};
use cloudport::config::{
    find_config_file, CloudportConfig, ConfigParser, ConfigValidator, Provider,
};
use cloudport::error::{CloudportError, ConfigError, ImageError, Result};
use cloudport::profitbricks::ProfitBricksComputeServiceAdapter;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const CONFIG_TEMPLATE: &str = include_str!("../templates/cloudport.yaml");
const ENV_TEMPLATE: &str = include_str!("../templates/.env.example");

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(cli.config.as_deref(), warnings, &formatter),
        command => {
            let config = load_config(cli.config.as_deref())?;
            let provider = cli.provider.unwrap_or(config.default_provider);
            info!("Using provider {provider}");

            match provider {
                Provider::Azure => {
                    let azure = config.azure.ok_or_else(|| not_configured(provider))?;
                    let running = Poller::for_node_running(&azure.timeouts);
                    let service = ComputeService::new(AzureComputeServiceAdapter::new(azure)?, running);
                    dispatch(&service, command, &formatter).await
                }
                Provider::Profitbricks => {
                    let pb = config.profitbricks.ok_or_else(|| not_configured(provider))?;
                    let running = Poller::for_node_running(&pb.timeouts);
                    let service =
                        ComputeService::new(ProfitBricksComputeServiceAdapter::new(pb)?, running);
                    dispatch(&service, command, &formatter).await
                }
            }
        }
    }
}

/// Runs a provider command against `service`.
async fn dispatch<A: ComputeServiceAdapter>(
    service: &ComputeService<A>,
    command: Commands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let output = match command {
        Commands::Locations => formatter.format_locations(&service.list_locations().await?),
        Commands::Hardware => formatter.format_hardware(&service.list_hardware_profiles().await?),
        Commands::Images => formatter.format_images(&service.list_images().await?),
        Commands::Image { id } => formatter.format_image(&id, service.get_image(&id).await?.as_ref()),
        Commands::Nodes { group } => {
            let mut nodes = service.list_nodes().await?;
            if let Some(group) = group {
                nodes.retain(|n| n.group.as_deref() == Some(group.as_str()));
            }
            formatter.format_nodes(&nodes)
        }
        Commands::Node { id } => formatter.format_node(&id, service.get_node(&id).await?.as_ref()),
        Commands::Plan { group, template } => {
            let template = build_template(service, &template).await?;
            formatter.format_plan(&group, &service.plan_creation(&group, &template)?)
        }
        Commands::Create { group, count, template } => {
            let template = build_template(service, &template).await?;
            formatter.format_created(&service.create_nodes_in_group(&group, count, template).await?)
        }
        Commands::Destroy { id, group, yes } => {
            let target = match (&id, &group) {
                (Some(id), _) => format!("node {id}"),
                (None, Some(group)) => format!("every node of group {group}"),
                (None, None) => return Err(CloudportError::internal("nothing to destroy")),
            };
            if !yes && !confirm(&format!("This destroys {target}. Type 'destroy' to confirm: "), "destroy")? {
                eprintln!("Destruction cancelled.");
                return Ok(());
            }

            let destroyed = match (id, group) {
                (Some(id), _) => {
                    service.destroy_node(&id).await?;
                    vec![id]
                }
                (None, Some(group)) => service.destroy_nodes_in_group(&group).await?,
                (None, None) => Vec::new(),
            };
            formatter.format_done("destroyed", &destroyed)
        }
        Commands::Reboot { id } => {
            service.reboot_node(&id).await?;
            formatter.format_done("rebooted", &[id])
        }
        Commands::Suspend { id } => {
            service.suspend_node(&id).await?;
            formatter.format_done("suspended", &[id])
        }
        Commands::Resume { id } => {
            service.resume_node(&id).await?;
            formatter.format_done("resumed", &[id])
        }
        Commands::Init { .. } | Commands::Validate { .. } => {
            return Err(CloudportError::internal("command does not use a provider"));
        }
    };

    print!("{output}");
    Ok(())
}

/// Resolves the image and assembles the template the flags describe.
async fn build_template<A: ComputeServiceAdapter>(
    service: &ComputeService<A>,
    args: &TemplateArgs,
) -> Result<Template> {
    let image = service
        .get_image(&args.image)
        .await?
        .ok_or_else(|| ImageError::NotFound { id: args.image.clone() })?;

    let public_key = match &args.public_key_file {
        Some(path) => Some(std::fs::read_to_string(path)?.trim().to_string()),
        None => None,
    };

    Ok(Template::new(&args.location, &args.hardware, image).with_options(TemplateOptions {
        login_user: args.login_user.clone(),
        login_password: args.login_password.clone(),
        public_key,
        inbound_ports: args.inbound_ports.clone(),
        ..TemplateOptions::default()
    }))
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing cloudport configuration in: {}", path.display());

    let config_path = path.join("cloudport.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&config_path, CONFIG_TEMPLATE)?;
    eprintln!("Created: {}", config_path.display());

    std::fs::write(&env_path, ENV_TEMPLATE)?;
    eprintln!("Created: {}", env_path.display());

    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        if !existing.lines().any(|l| l.trim() == ".env") {
            let mut file = std::fs::OpenOptions::new().append(true).open(&gitignore_path)?;
            writeln!(file, "\n# cloudport credentials\n.env")?;
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nNext steps:");
    eprintln!("  1. Copy .env.example to .env and fill in your credentials");
    eprintln!("  2. Edit cloudport.yaml");
    eprintln!("  3. Run 'cloudport validate'");
    eprintln!("  4. Run 'cloudport locations' to check access");

    Ok(())
}

fn cmd_validate(config_path: Option<&Path>, show_warnings: bool, formatter: &OutputFormatter) -> Result<()> {
    let config = load_unvalidated(config_path)?;
    let result = ConfigValidator::new().validate(&config)?;
    print!("{}", formatter.format_validation(&result, show_warnings));
    Ok(())
}

/// Loads `.env`, the configuration file if there is one, and the environment.
fn load_unvalidated(config_path: Option<&Path>) -> Result<CloudportConfig> {
    let config_file = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::current_dir().ok().and_then(find_config_file),
    };

    let base: PathBuf = config_file
        .as_deref()
        .and_then(Path::parent)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;

    match &config_file {
        Some(file) => debug!("Loading configuration from: {}", file.display()),
        None => debug!("No configuration file found, using the environment only"),
    }
    parser.load_with_env(config_file.as_deref())
}

fn load_config(config_path: Option<&Path>) -> Result<CloudportConfig> {
    let config = load_unvalidated(config_path)?;
    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

fn not_configured(provider: Provider) -> CloudportError {
    ConfigError::ProviderNotConfigured {
        provider: provider.to_string(),
    }
    .into()
}

fn confirm(prompt: &str, expected: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim() == expected)
}
