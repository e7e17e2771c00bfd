use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use astrovista::{ApiServer, AppConfig};

#[derive(Parser)]
#[command(name = "astrovista")]
#[command(about = "AstroVista APOD API server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Server {
        /// Host to bind (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "astrovista=info,astrovista_cache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();

    match cli.command {
        Commands::Server { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            println!("Starting API server on {}", config.addr());
            ApiServer::new(config).start().await?;
        }

        Commands::Config => {
            println!("Listen address:       {}", config.addr());
            println!(
                "Remote cache:         {}",
                if config.remote.url.is_some() { "configured" } else { "disabled" }
            );
            println!(
                "Write token:          {}",
                if config.internal_api_token.is_some() { "set" } else { "unset" }
            );
            println!(
                "Rate limit:           {} per {:?}",
                config.rate_limit.limit, config.rate_limit.window
            );
            println!("Cache TTLs:           {:?}", config.ttls);
            println!("Translation timeout:  {:?}", config.translation_timeout);
        }
    }

    Ok(())
}
