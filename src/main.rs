use clap::Parser;
use profiteer::cli::{Cli, Commands};
use profiteer::config::Config;
use profiteer::runtime;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let mut config = match Config::load(&args.config) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Failed to load config: {e}");
                    std::process::exit(1);
                }
            };

            if let Some(ref level) = args.log_level {
                config.logging.level = level.clone();
            }
            if args.json_logs {
                config.logging.format = "json".to_string();
            }
            if args.no_full_cycle {
                config.scheduler.full_cycle_enabled = false;
            }
            if args.rotating {
                config.scheduler.rotating_enabled = true;
            }
            if args.no_webhook {
                config.webhook.enabled = false;
            }

            config.init_logging();
            info!("profiteer starting");

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::select! {
                result = runtime::run(config, shutdown_rx) => {
                    if let Err(e) = result {
                        error!(error = %e, "Fatal error");
                        std::process::exit(1);
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    let _ = shutdown_tx.send(true);
                }
            }

            info!("profiteer stopped");
        }
        Commands::Check(args) => match Config::load(&args.config) {
            Ok(_) => println!("Configuration OK: {}", args.config.display()),
            Err(e) => {
                eprintln!("Configuration invalid: {e}");
                std::process::exit(1);
            }
        },
    }
}
