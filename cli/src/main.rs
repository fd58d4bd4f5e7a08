mod commands;
mod render;
mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ship_defs::{BuildVariant, PipelineState};

use crate::utils::Context;

#[derive(Parser)]
#[command(name = "callship")]
#[command(about = "Deploy the voice receptionist bot and point its phone number at it")]
#[command(version = env!("APP_VERSION"))]
struct Cli {
    /// Directory linked to the hosting project
    #[arg(long, global = true, default_value = ".")]
    workdir: PathBuf,

    /// Configuration file (defaults to ./callship.yaml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress at info level (LOG_LEVEL takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the platform CLI is installed and logged in
    Doctor,

    /// Confirm the workspace link and record the target
    Link {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Set the required secrets on the target and read them back
    Secrets {
        /// Only use values from the environment
        #[arg(long)]
        no_prompt: bool,
    },

    /// Build and release the workspace
    Up {
        /// Build variant: pipeline or agent
        #[arg(long)]
        variant: Option<BuildVariant>,

        /// Container descriptor, relative to the workdir
        #[arg(long)]
        descriptor: Option<PathBuf>,
    },

    /// Get or create the public domain
    Domain,

    /// Probe <URL>/health, e.g. http://localhost:8000
    Health { url: String },

    /// Run the endpoint checks against a URL (defaults to the recorded domain)
    Verify { url: Option<String> },

    /// Point the phone number's answer URL at <URL>/answer
    Rebind {
        url: Option<String>,

        /// Phone number (defaults to PLIVO_PHONE_NUMBER)
        #[arg(long)]
        number: Option<String>,
    },

    /// List the account's numbers and where they answer
    Numbers,

    /// Show recent calls recorded by the bot
    Calls {
        url: Option<String>,

        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Stream runtime logs until Ctrl-C
    Logs,

    /// Remove the latest deployment
    Down {
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the recorded pipeline state
    Status {
        /// Print the raw record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every stage in order, resuming from the recorded state
    Deploy {
        /// Treat the manual gates as confirmed
        #[arg(short, long)]
        yes: bool,

        /// Rewind to this state first, e.g. `configured` to force a rebuild
        #[arg(long)]
        from: Option<PipelineState>,

        #[arg(long)]
        variant: Option<BuildVariant>,

        #[arg(long)]
        descriptor: Option<PathBuf>,

        /// Only use secret values from the environment
        #[arg(long)]
        no_prompt: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = ship_utils::setup_logging(cli.verbose) {
        eprintln!("Failed to set up logging: {}", e);
    }

    let ctx = Context::load(&cli.workdir, cli.config.as_deref());

    match cli.command {
        Commands::Doctor => commands::check::handle_doctor(&ctx).await,
        Commands::Link { yes } => commands::stage::handle_link(&ctx, yes).await,
        Commands::Secrets { no_prompt } => commands::stage::handle_secrets(&ctx, no_prompt).await,
        Commands::Up {
            variant,
            descriptor,
        } => commands::stage::handle_up(&ctx.with_build(variant, descriptor)).await,
        Commands::Domain => commands::stage::handle_domain(&ctx).await,
        Commands::Health { url } => commands::check::handle_health(&ctx, &url).await,
        Commands::Verify { url } => commands::check::handle_verify(&ctx, url.as_deref()).await,
        Commands::Rebind { url, number } => {
            commands::webhook::handle_rebind(&ctx, url.as_deref(), number.as_deref()).await
        }
        Commands::Numbers => commands::webhook::handle_numbers(&ctx).await,
        Commands::Calls { url, limit } => {
            commands::check::handle_calls(&ctx, url.as_deref(), limit).await
        }
        Commands::Logs => commands::stage::handle_logs(&ctx).await,
        Commands::Down { yes } => commands::stage::handle_down(&ctx, yes).await,
        Commands::Status { json } => commands::pipeline::handle_status(&ctx, json),
        Commands::Deploy {
            yes,
            from,
            variant,
            descriptor,
            no_prompt,
        } => {
            commands::pipeline::handle_deploy(&ctx.with_build(variant, descriptor), yes, from, no_prompt)
                .await
        }
    }
}
