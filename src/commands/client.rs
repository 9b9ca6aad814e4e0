//! `pcbook client`: exercise a running server.

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;

use crate::auth::{AuthClient, ClientAuthInterceptor, default_auth_methods};
use crate::client::LaptopClient;
use crate::config::ClientConfig;
use crate::model::{Filter, Memory, MemoryUnit};
use crate::rpc;
use crate::sample;

/// What the client does once logged in.
#[derive(Debug, Clone, Subcommand)]
pub enum ClientAction {
    /// Create random laptops
    Create {
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Create random laptops, then search with a filter
    Search {
        /// Random laptops to create before searching
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
        #[arg(long, default_value_t = 3000.0)]
        max_price: f64,
        #[arg(long, default_value_t = 4)]
        min_cores: u32,
        #[arg(long, default_value_t = 2.5)]
        min_ghz: f64,
        #[arg(long, default_value_t = 8)]
        min_ram_gb: u64,
    },
    /// Create a laptop and upload an image for it
    Upload {
        #[arg(short, long)]
        image: PathBuf,
    },
    /// Create laptops and rate each with a random score
    Rate {
        #[arg(short = 'n', long, default_value_t = 3)]
        count: usize,
        /// Rating rounds over the same laptops
        #[arg(short, long, default_value_t = 1)]
        rounds: usize,
    },
}

/// Log in, then run `action` against the server.
///
/// # Errors
///
/// Returns an error if the config is invalid, the initial login fails, or
/// any call fails.
pub async fn execute(config: ClientConfig, action: ClientAction) -> Result<()> {
    let validation = config.validate()?;
    for warning in &validation.warnings {
        tracing::warn!("{warning}");
    }

    let channel = rpc::connect(&config.address, config.retry_config())
        .await
        .with_context(|| format!("Failed to connect to {}", config.address))?;
    let auth_client = AuthClient::new(channel.clone(), &config.username, &config.password)
        .with_timeout(config.call_timeout());

    let interceptor =
        ClientAuthInterceptor::new(auth_client, default_auth_methods(), config.token_refresh())
            .await
            .with_context(|| format!("Failed to log in to {}", config.address))?;
    let client = LaptopClient::with_auth(channel, interceptor.clone())
        .with_timeout(config.call_timeout());

    let result = run_action(&client, action).await;
    interceptor.shutdown();
    result
}

async fn run_action(client: &LaptopClient, action: ClientAction) -> Result<()> {
    match action {
        ClientAction::Create { count } => {
            for _ in 0..count {
                let id = client.create_laptop(sample::new_laptop()).await?;
                println!("created laptop {id}");
            }
        },
        ClientAction::Search {
            count,
            max_price,
            min_cores,
            min_ghz,
            min_ram_gb,
        } => {
            for _ in 0..count {
                client.create_laptop(sample::new_laptop()).await?;
            }
            let filter = Filter {
                max_price_usd: Some(max_price),
                min_cpu_cores: min_cores,
                min_cpu_ghz: min_ghz,
                min_ram: Some(Memory::new(min_ram_gb, MemoryUnit::Gigabyte)),
            };
            let found = client.search_laptop(filter).await?;
            println!("found {} laptops", found.len());
            for laptop in found {
                println!(
                    "  {} {} {}: {} cores, {} GHz, ${:.2}",
                    laptop.id,
                    laptop.brand,
                    laptop.name,
                    laptop.cpu.number_cores,
                    laptop.cpu.min_ghz,
                    laptop.price_usd
                );
            }
        },
        ClientAction::Upload { image } => {
            let laptop_id = client.create_laptop(sample::new_laptop()).await?;
            // The server adds the leading dot.
            let image_type = image
                .extension()
                .and_then(|ext| ext.to_str())
                .with_context(|| format!("Image has no extension: {}", image.display()))?;
            let file = tokio::fs::File::open(&image)
                .await
                .with_context(|| format!("Failed to open image: {}", image.display()))?;

            let response = client.upload_image(&laptop_id, image_type, file).await?;
            println!(
                "uploaded image {} ({} bytes) for laptop {laptop_id}",
                response.id, response.size
            );
        },
        ClientAction::Rate { count, rounds } => {
            let mut laptop_ids = Vec::with_capacity(count);
            for _ in 0..count {
                laptop_ids.push(client.create_laptop(sample::new_laptop()).await?);
            }
            for round in 1..=rounds {
                let scores: Vec<f64> = (0..count).map(|_| sample::random_laptop_score()).collect();
                let replies = client.rate_laptop(&laptop_ids, &scores).await?;
                println!("round {round}:");
                for reply in replies {
                    println!(
                        "  laptop {} rated {} times, average {:.2}",
                        reply.laptop_id, reply.rated_count, reply.average_score
                    );
                }
            }
        },
    }
    Ok(())
}
