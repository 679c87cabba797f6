//! corsprox CLI
//!
//! Usage:
//!   corsprox --target https://example.com/api [OPTIONS]

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use corsprox::{ConfigOverrides, ProxyConfig, ProxyServer};
use tracing::info;

// ANSI color codes
const BLUE: &str = "\x1b[34m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Reverse proxy that adds CORS headers in front of a single upstream API
#[derive(Parser, Debug)]
#[command(name = "corsprox")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Upstream API base URL, e.g. https://example.com/api
    #[arg(short, long, env = "CORSPROX_TARGET")]
    target: Option<String>,

    /// Port to listen on [default: 3001]
    #[arg(short, long, env = "CORSPROX_PORT")]
    port: Option<u16>,

    /// Path prefix of proxied requests [default: proxy]
    #[arg(long, env = "CORSPROX_PATH")]
    path: Option<String>,

    /// Access-Control-Allow-Origin value [default: *]
    #[arg(long, env = "CORSPROX_ALLOW_ORIGIN")]
    allow_origin: Option<String>,

    /// Access-Control-Allow-Methods value [default: "GET, POST, PUT, DELETE, OPTIONS"]
    #[arg(long, env = "CORSPROX_ALLOW_METHODS")]
    allow_methods: Option<String>,

    /// Access-Control-Allow-Headers value [default: "Content-Type, Authorization"]
    #[arg(long, env = "CORSPROX_ALLOW_HEADERS")]
    allow_headers: Option<String>,

    /// Address to listen on [default: 0.0.0.0]
    #[arg(long, env = "CORSPROX_BIND")]
    bind: Option<IpAddr>,

    /// Abort upstream calls after this many milliseconds (unbounded by default)
    #[arg(long, env = "CORSPROX_UPSTREAM_TIMEOUT_MS")]
    upstream_timeout_ms: Option<u64>,

    /// YAML config file; command-line values take precedence
    #[arg(short, long, env = "CORSPROX_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            bind_address: self.bind,
            path_prefix: self.path.clone(),
            target_base_url: self.target.clone(),
            allow_origin: self.allow_origin.clone(),
            allow_methods: self.allow_methods.clone(),
            allow_headers: self.allow_headers.clone(),
            upstream_timeout_ms: self.upstream_timeout_ms,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_banner(config: &ProxyConfig, addr: SocketAddr) {
    println!(
        "{BOLD}🚀 Proxy started at http://localhost:{}/{}/{RESET}",
        addr.port(),
        config.path_prefix
    );
    let entries = [
        ("Port", addr.port().to_string()),
        ("Path", config.path_prefix.clone()),
        ("Target URL", config.target_base_url.clone()),
        ("Allow Origin", config.cors.allow_origin.clone()),
        ("Allow Methods", config.cors.allow_methods.clone()),
        ("Allow Headers", config.cors.allow_headers.clone()),
    ];
    for (key, value) in entries {
        println!("{BLUE}   {key}: {value}{RESET}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = args
        .overrides()
        .resolve(args.config.as_deref())
        .context("Invalid configuration")?;

    let server = ProxyServer::new(config)?.bind().await?;
    print_banner(server.config(), server.local_addr());

    tokio::select! {
        _ = server.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            info!("Shutting down");
        }
    }

    Ok(())
}
