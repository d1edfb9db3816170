//! s3gate - HTTP Gateway for S3 Object Storage
//!
//! Serves the JSON REST API in front of the configured S3 endpoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s3gate::api::HttpServer;
use s3gate::config::{GatewayConfig, LoggingConfig};
use s3gate::error::Result;
use s3gate::storage::S3Store;

/// s3gate - HTTP Gateway for S3 Object Storage
#[derive(Parser)]
#[command(name = "s3gate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (optional; environment variables apply on top)
    #[arg(short, long, default_value = "s3gate.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve,

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "s3gate.toml")]
        output: PathBuf,
    },

    /// Validate configuration (file plus environment)
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => run_serve(&cli.config, cli.log_level.as_deref()).await,
        Commands::Init { output } => run_init(output),
        Commands::Validate => run_validate(&cli.config),
    }
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig, level_override: Option<&str>) {
    let level = level_override.unwrap_or(&logging.level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Start the gateway
async fn run_serve(config_path: &Path, level_override: Option<&str>) -> Result<()> {
    let config = match GatewayConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration from {:?}: {}", config_path, e);
            eprintln!("Set AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY and UPLOAD_BUCKET or provide a config file");
            return Err(e);
        }
    };

    init_logging(&config.logging, level_override);

    tracing::info!("Starting s3gate v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        region = %config.aws.region,
        endpoint = config.aws.endpoint_url.as_deref().unwrap_or("(aws default)"),
        upload_bucket = %config.upload.bucket,
        "Storage configured"
    );

    let store = Arc::new(S3Store::from_config(&config.aws));
    let server = HttpServer::new(&config, store)?;

    server.start(shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received shutdown signal"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}

/// Initialize configuration file
fn run_init(output: PathBuf) -> Result<()> {
    let config_content = r#"# s3gate Configuration
# Environment variables (PORT, AWS_REGION, AWS_ACCESS_KEY_ID,
# AWS_SECRET_ACCESS_KEY, AWS_ENDPOINT_URL, UPLOAD_BUCKET) override these values.

[server]
host = "0.0.0.0"
port = 3000
cors_enabled = true
max_upload_bytes = 524288000

[aws]
region = "us-east-1"
access_key_id = ""
secret_access_key = ""
# endpoint_url = "http://localhost:9000"
force_path_style = false

[upload]
bucket = ""
key_prefix = "uploads/"
content_type = "application/vnd.android.package-archive"
url_expiry_secs = 3600

[logging]
level = "info"
format = "pretty"
"#;

    std::fs::write(&output, config_content)?;
    println!("Configuration file created: {}", output.display());
    println!("\nFill in the credentials and upload bucket, or export them as environment variables.");
    println!("Then start with: s3gate --config {} serve", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: &Path) -> Result<()> {
    match GatewayConfig::load(config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Listen:         {}:{}", config.server.host, config.server.port);
            println!("  CORS:           {}", config.server.cors_enabled);
            println!("  Region:         {}", config.aws.region);
            println!(
                "  Endpoint:       {}",
                config.aws.endpoint_url.as_deref().unwrap_or("(aws default)")
            );
            println!("  Upload Bucket:  {}", config.upload.bucket);
            println!("  Key Prefix:     {}", config.upload.key_prefix);
            println!("  URL Expiry:     {} s", config.upload.url_expiry_secs);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}
