use std::{net::SocketAddr, path::Path, sync::Arc};

use api_relay::{
    adapters::{HttpClientAdapter, HttpHandler},
    config::{ConfigValidator, RelayConfig, load_config},
    core::RelayService,
    metrics,
    tracing_setup::{self, LogFormat},
    utils::GracefulShutdown,
};
use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Configuration file; optional, defaults and RELAY__* variables apply without it
    #[clap(short, long, global = true)]
    config: Option<String>,

    /// Log output format: json or pretty
    #[clap(long, global = true, default_value = "json")]
    log_format: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate configuration and print the resolved origin
    Validate,
    /// Write a commented default configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "relay.toml")]
        output: String,
    },
    /// Start the relay server (default)
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let config_path = args.config.as_deref();

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Validate => validate_config_command(config_path).await,
        Commands::Init { output } => init_config_command(&output).await,
        Commands::Serve => {
            let log_format: LogFormat = args.log_format.parse()?;
            tracing_setup::init_tracing(log_format)
                .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
            serve(config_path).await
        }
    }
}

async fn serve(config_path: Option<&str>) -> Result<()> {
    metrics::init_metrics()?;

    tracing::info!(
        "Loading configuration from {}",
        config_path.unwrap_or("defaults and environment")
    );
    let config: RelayConfig = load_config(config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path:?}"))?;
    ConfigValidator::validate(&config).context("Invalid configuration")?;

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;

    let config = Arc::new(config);
    let http_client = Arc::new(
        HttpClientAdapter::new(&config.upstream).context("Failed to create HTTP client adapter")?,
    );
    let relay = Arc::new(
        RelayService::new(config.clone(), http_client).context("Failed to build relay service")?,
    );
    let app = HttpHandler::new(relay.clone()).router();

    let graceful_shutdown = Arc::new(GracefulShutdown::new());
    let signal_handler_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    tracing::info!(
        "api-relay listening on {} ({}/* -> {})",
        addr,
        relay.router().prefix().trim_end_matches('/'),
        relay.origin()
    );

    let shutdown_for_server = graceful_shutdown.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = shutdown_for_server.wait_for_shutdown_signal().await;
        tracing::info!("Shutdown signal received: {:?}", reason);
    });

    let drain_timeout = graceful_shutdown.drain_timeout();
    let server = tokio::spawn(async move { server.await });

    // Bound the drain once shutdown has started.
    let result = tokio::select! {
        result = server => result.context("Server task panicked")?.context("Server error"),
        _ = async {
            graceful_shutdown.wait_for_shutdown_signal().await;
            tokio::time::sleep(drain_timeout).await;
        } => {
            tracing::warn!("In-flight requests did not drain within {:?}", drain_timeout);
            Ok(())
        }
    };

    tracing::info!("Graceful shutdown completed");
    result
}

/// Validate configuration and exit
async fn validate_config_command(config_path: Option<&str>) -> Result<()> {
    if let Some(path) = config_path {
        println!("🔍 Validating configuration file: {path}");
        if !Path::new(path).exists() {
            eprintln!("❌ Error: Configuration file '{path}' not found");
            std::process::exit(1);
        }
    } else {
        println!("🔍 Validating configuration from defaults and environment");
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    match ConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!("   • Route Prefix: {}", config.route_prefix);
            println!("   • Origin: {}", config.origin_url());
            println!(
                "   • Upstream Timeout: {}",
                config
                    .upstream
                    .timeout_secs
                    .map_or_else(|| "transport default".to_string(), |s| format!("{s}s"))
            );
            println!(
                "   • Binary Passthrough: {}",
                config.forwarding.binary_passthrough
            );
            println!("   • Health Endpoint: {}", config.health.enabled);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure the origin URL starts with http:// or https://");
            println!("   • Verify listen address format (e.g., '0.0.0.0:3000')");
            println!("   • Use a plain route prefix such as '/api' (no trailing slash)");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(output: &str) -> Result<()> {
    let path = Path::new(output);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{output}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# api-relay configuration

# The address to listen on
listen_addr = "0.0.0.0:3000"

# Requests under this prefix are relayed to <origin>/api/<rest>
route_prefix = "/api"

# Origin selection: internal_url, else public_url, else http://backend:8000.
# INTERNAL_API_URL and PUBLIC_API_URL (or NEXT_PUBLIC_API_URL) fill in
# whichever is left unset here.
[origin]
# internal_url = "http://backend:8000"
# public_url = "https://api.example.com"

[upstream]
# Per-call timeout; unset relies on the transport's own behaviour
# timeout_secs = 60

[forwarding]
# Forward bodies with unrecognised content types as raw bytes
binary_passthrough = false
# max_body_bytes = 10485760

[health]
enabled = true
path = "/health"
probe_origin = false
upstream_path = "/api/health"
timeout_secs = 5
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {output}");
    println!("   Run 'api-relay --config {output} serve' to start the server");
    Ok(())
}
