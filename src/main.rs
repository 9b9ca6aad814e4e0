use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pcbook::commands::{self, client::ClientAction};
use pcbook::config::ClientConfig;

#[derive(Parser)]
#[command(name = "pcbook")]
#[command(version, about = "Laptop catalog server and client")]
struct Cli {
    /// Write logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the catalog server
    Serve {
        /// Server config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a demo client against a server
    Client {
        /// Client config file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Server address (host:port)
        #[arg(short, long)]
        address: Option<String>,
        #[arg(short, long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[command(subcommand)]
        action: ClientAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    commands::init_logging(cli.log_json);

    match cli.command {
        Commands::Serve { config, port } => commands::serve::execute(config.as_deref(), port).await,
        Commands::Client {
            config,
            address,
            username,
            password,
            action,
        } => {
            let mut client_config = match config {
                Some(path) => ClientConfig::load_from(path)?,
                None => ClientConfig::default(),
            };
            if let Some(address) = address {
                client_config.address = address;
            }
            if let Some(username) = username {
                client_config.username = username;
            }
            if let Some(password) = password {
                client_config.password = password;
            }
            commands::client::execute(client_config, action).await
        },
    }
}
