//! NodeRent provisioning CLI
//!
//! A command-line tool for rendering container deployments and branding
//! scripts, and for evaluating node heartbeats offline.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{branding, catalog, health, render, Context};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// NodeRent provisioning CLI
#[derive(Parser)]
#[command(name = "nrctl")]
#[command(author, version, about = "CLI for NodeRent node provisioning", long_about = None)]
pub struct Cli {
    /// Template catalog JSON file (uses the built-in catalog if not specified)
    #[arg(long, env = "NRCTL_CATALOG", global = true)]
    pub catalog: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the container name for a template and user
    Name {
        /// Template display name
        template: String,

        /// User identifier
        user_id: String,
    },

    /// Render deployment artifacts
    #[command(subcommand)]
    Render(RenderCommands),

    /// Render branding artifacts
    #[command(subcommand)]
    Branding(BrandingCommands),

    /// Evaluate heartbeat telemetry
    #[command(subcommand)]
    Health(HealthCommands),

    /// Show static policy tables and templates
    #[command(subcommand)]
    Catalog(CatalogCommands),
}

#[derive(Subcommand)]
pub enum RenderCommands {
    /// Imperative launch command
    Command(DeploymentArgs),

    /// Declarative compose manifest
    Manifest(DeploymentArgs),

    /// End-to-end script: launch, wait until running, apply branding
    Deploy {
        #[command(flatten)]
        deployment: DeploymentArgs,

        #[command(flatten)]
        branding: BrandingArgs,

        /// Maximum running-state checks before branding anyway
        #[arg(long, default_value_t = 30)]
        max_attempts: u32,

        /// Seconds between running-state checks
        #[arg(long, default_value_t = 2)]
        interval: u32,

        /// Deliver branding as a one-line command instead of a script
        #[arg(long)]
        oneliner: bool,
    },
}

/// Deployment flags shared by the render commands
#[derive(Args, Debug, Clone)]
pub struct DeploymentArgs {
    /// Container image (defaults to the catalog template's image)
    #[arg(long)]
    pub image: Option<String>,

    /// Catalog template id to seed the deployment from
    #[arg(long)]
    pub template: Option<String>,

    /// Template category used for default ports
    #[arg(long)]
    pub category: Option<String>,

    /// Port to expose; repeat for several
    #[arg(long = "port", short = 'p')]
    pub ports: Vec<u16>,

    /// Number of GPUs to reserve
    #[arg(long)]
    pub gpus: Option<u32>,

    /// Environment variable as KEY=VALUE; repeat for several
    #[arg(long = "env", short = 'e')]
    pub env: Vec<String>,

    /// Volume mount as host:container; repeat for several
    #[arg(long = "volume")]
    pub volumes: Vec<String>,

    /// Command overriding the image default
    #[arg(long)]
    pub cmd: Option<String>,

    /// Name used for the container name prefix (defaults to the template name)
    #[arg(long)]
    pub template_name: Option<String>,

    /// User identifier used for the container name suffix
    #[arg(long)]
    pub user_id: String,
}

/// Branding context flags
#[derive(Args, Debug, Clone)]
pub struct BrandingArgs {
    /// Instance identifier shown in the banner and prompt
    #[arg(long)]
    pub instance_id: String,

    #[arg(long, default_value = "")]
    pub region: String,

    #[arg(long, default_value = "")]
    pub plan: String,

    /// Rental expiry shown in the banner
    #[arg(long, default_value = "")]
    pub expires_at: String,

    /// Login user shown in the prompt
    #[arg(long, default_value = "root")]
    pub username: String,
}

#[derive(Subcommand)]
pub enum BrandingCommands {
    /// Full idempotent branding script
    Script(BrandingArgs),

    /// Single-line branding command
    Oneliner(BrandingArgs),

    /// Login banner only
    Motd(BrandingArgs),

    /// Script removing all branding
    Cleanup,
}

#[derive(Subcommand)]
pub enum HealthCommands {
    /// Evaluate heartbeat samples from a JSON file
    Evaluate {
        /// JSON file with an array of samples or an object with a `samples` array
        file: PathBuf,
    },

    /// Format a duration in hours as uptime
    Uptime {
        /// Duration in hours
        #[arg(allow_negative_numbers = true)]
        hours: f64,
    },
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// Known GPU models
    Gpus {
        /// Only GPUs with at least this much memory (GB)
        #[arg(long)]
        min_memory: Option<u32>,
    },

    /// Rental regions
    Regions,

    /// Default ports per template category
    Ports,

    /// Deployment templates
    Templates,

    /// Resource and container status labels
    Statuses,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = Context::load(cli.catalog, cli.format)?;

    // Execute command
    match cli.command {
        Commands::Name { template, user_id } => {
            render::show_name(&template, &user_id, ctx.format)?;
        }
        Commands::Render(render_cmd) => match render_cmd {
            RenderCommands::Command(args) => {
                render::render_command(&ctx, &args)?;
            }
            RenderCommands::Manifest(args) => {
                render::render_manifest(&ctx, &args)?;
            }
            RenderCommands::Deploy {
                deployment,
                branding,
                max_attempts,
                interval,
                oneliner,
            } => {
                let options = render::DeployOptions {
                    max_attempts,
                    interval,
                    oneliner,
                };
                render::render_deploy(&ctx, &deployment, &branding, options)?;
            }
        },
        Commands::Branding(branding_cmd) => match branding_cmd {
            BrandingCommands::Script(args) => branding::show_script(&ctx, &args),
            BrandingCommands::Oneliner(args) => branding::show_oneliner(&ctx, &args),
            BrandingCommands::Motd(args) => branding::show_motd(&ctx, &args),
            BrandingCommands::Cleanup => branding::show_cleanup(&ctx),
        },
        Commands::Health(health_cmd) => match health_cmd {
            HealthCommands::Evaluate { file } => {
                health::evaluate_file(&file, ctx.format).await?;
            }
            HealthCommands::Uptime { hours } => {
                health::show_uptime(hours, ctx.format);
            }
        },
        Commands::Catalog(catalog_cmd) => match catalog_cmd {
            CatalogCommands::Gpus { min_memory } => catalog::show_gpus(min_memory, ctx.format),
            CatalogCommands::Regions => catalog::show_regions(ctx.format),
            CatalogCommands::Ports => catalog::show_ports(ctx.format),
            CatalogCommands::Templates => catalog::show_templates(&ctx),
            CatalogCommands::Statuses => catalog::show_statuses(ctx.format),
        },
    }

    Ok(())
}
