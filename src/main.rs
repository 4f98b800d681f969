use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use salus::api::ApiClient;
use salus::config::Config;
use salus::session::{Persona, SessionManager};
use salus::web_server::{self, AppState};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the chat web server.
    Serve {
        #[arg(
            long,
            env = "SALUS_PORT",
            default_value_t = 8080,
            help = "Port for the web server."
        )]
        port: u16,
    },
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for environment variables like API keys)
    dotenvy::dotenv().ok();

    // Initialize tracing (logging) subscriber
    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,salus=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config::from_env().context("Invalid configuration")?;
            info!(
                model = %config.model,
                api_base_url = %config.api_base_url,
                "Salus starting"
            );

            let api = ApiClient::from_config(&config);
            let sessions = SessionManager::new(api.clone(), Persona::healthcare(&config.model));
            let state = AppState::new(api, sessions, config.poll)
                .context("Failed to initialize web state")?;

            // Run the server in its own task so the main task can watch for Ctrl-C.
            let mut server_handle = tokio::spawn(async move {
                if let Err(e) = web_server::start_web_server(port, state).await {
                    error!("Web server failed: {:?}", e);
                }
            });

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, shutting down...");
                }
                res = &mut server_handle => {
                    match res {
                        Ok(_) => info!("Web server task completed unexpectedly."),
                        Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                        Err(e) => error!("Web server task failed: {:?}", e),
                    }
                }
            }

            if !server_handle.is_finished() {
                server_handle.abort();
            }
            info!("Shutdown complete.");
        }
    }

    Ok(())
}
