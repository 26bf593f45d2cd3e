use anyhow::Context;
use caching_proxy::cache::{Cache, CacheStore};
use caching_proxy::config::Config;
use caching_proxy::server::ProxyServer;
use clap::Parser;
use std::path::PathBuf;

/// Caching HTTP proxy - forwards requests to an origin and caches successful GET/HEAD responses
#[derive(Parser, Debug)]
#[command(name = "caching-proxy")]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Origin server URL to forward requests to
    #[arg(long)]
    origin: Option<String>,

    /// Clear the cache and exit
    #[arg(long)]
    clear_cache: bool,

    /// Optional YAML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind to
    #[arg(long)]
    address: Option<String>,
}

impl Args {
    /// Load the config file (if any) and apply flag overrides
    fn into_config(self) -> Result<Config, caching_proxy::config::ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(address) = self.address {
            config.server.address = address;
        }
        if let Some(origin) = self.origin {
            config.origin.url = origin;
        }

        Ok(config)
    }
}

fn clear_cache(config: &Config) -> anyhow::Result<()> {
    let store = CacheStore::with_dir(config.cache.dir()).context("Failed to open cache")?;
    store.clear().context("Failed to clear cache")?;
    Ok(())
}

fn main() {
    if let Err(e) = caching_proxy::logging::init_subscriber() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let args = Args::parse();
    let clear = args.clear_cache;

    let config = args.into_config().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    if clear {
        if let Err(e) = clear_cache(&config) {
            tracing::error!(error = %format!("{:#}", e), "Failed to clear cache");
            eprintln!("Failed to clear cache: {:#}", e);
            std::process::exit(1);
        }
        println!("Cache cleared successfully");
        return;
    }

    let server = ProxyServer::new(config).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        eprintln!("{}", e);
        std::process::exit(1);
    });

    println!(
        "Starting caching proxy server on port {}",
        server.config().server.port
    );
    println!("Proxying requests to: {}", server.config().origin.url);

    if let Err(e) = server.run() {
        tracing::error!(error = %e, "Failed to start server");
        eprintln!("Failed to start server: {}", e);
        std::process::exit(1);
    }
}
