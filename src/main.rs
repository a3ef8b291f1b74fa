// ProofGate - Main Entry Point
//
// CLI front-end for the proof scheduling library:
// - Resolve the execution mode for this host
// - Exercise the per-principal rate limits
// - Print the effective configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use proofgate::config::Config;
use proofgate::rate_limit::RateLimiter;
use proofgate::router::ExecutionRouter;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// ProofGate: admission control and scheduling for proof workloads
#[derive(Parser, Debug)]
#[command(name = "proofgate")]
#[command(version = "0.1.0")]
#[command(about = "Admission control and scheduling for ZK proof workloads", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to a config file (default: XDG config directory)
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect capabilities, probe the remote backend and resolve the mode
    ResolveMode {
        /// Discard any cached resolution and probe again
        #[arg(long)]
        force: bool,
    },
    /// Run admission checks for a principal and report each decision
    CheckLimits {
        /// Principal identifier to check
        principal: String,

        /// Number of consecutive admission checks to run
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Print the effective configuration as TOML
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(filter.into())
                .from_env_lossy(),
        )
        .init();

    proofgate::metrics::init_metrics();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match args.command {
        Commands::ResolveMode { force } => {
            let router = ExecutionRouter::from_config(&config.router)?;
            let context = router.initialize_with(force).await?;
            info!(
                mode = %context.mode,
                remote_available = context.remote_available,
                local_proving = context.capabilities.local_proving,
                "execution mode resolved"
            );
            println!("{}", serde_json::to_string_pretty(&context)?);
        }
        Commands::CheckLimits { principal, count } => {
            let limiter = RateLimiter::new(config.rate_limit.clone());
            for i in 1..=count {
                let decision = limiter.check(&principal).await;
                if decision.allowed {
                    println!("check {i}: allowed (remaining/minute: {})", decision.remaining.minute);
                } else {
                    println!(
                        "check {i}: denied ({}, retry after {} ms)",
                        decision
                            .limit_type
                            .map(|t| t.as_str())
                            .unwrap_or("unknown"),
                        decision.retry_after_ms.unwrap_or(0)
                    );
                }
            }
        }
        Commands::ShowConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
