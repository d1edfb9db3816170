//! s3gatectl - Command line client for an s3gate server
//!
//! Usage:
//!   s3gatectl buckets                 - List buckets
//!   s3gatectl objects <bucket>        - List objects in a bucket
//!   s3gatectl get <bucket> <key>      - Download an object
//!   s3gatectl upload <file>           - Upload a file and print its download URL
//!   s3gatectl hello                   - Check that the server answers

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

/// s3gate Control Tool
#[derive(Parser)]
#[command(name = "s3gatectl")]
#[command(version, about = "Browse, download and upload through an s3gate server", long_about = None)]
struct Cli {
    /// Path to config file, used to find the server port
    #[arg(short, long, default_value = "s3gate.toml")]
    config: PathBuf,

    /// Server base URL (overrides config)
    #[arg(short, long)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List buckets
    Buckets,
    /// List objects in a bucket
    Objects {
        bucket: String,
        /// Only keys starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
        /// Page size
        #[arg(long)]
        max_keys: Option<u32>,
        /// Continuation token from a previous page
        #[arg(long)]
        token: Option<String>,
    },
    /// Download an object
    Get {
        bucket: String,
        key: String,
        /// Output file (defaults to the last segment of the key)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Ask the server for an attachment disposition
        #[arg(long)]
        download: bool,
    },
    /// Upload a file
    Upload { file: PathBuf },
    /// Smoke test
    Hello,
}

// ============ API Response Types ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketEntry {
    name: Option<String>,
    creation_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListBucketsResponse {
    count: usize,
    buckets: Vec<BucketEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectEntry {
    key: Option<String>,
    size: Option<i64>,
    last_modified: Option<String>,
    storage_class: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListObjectsResponse {
    bucket: String,
    #[serde(default)]
    is_truncated: Option<bool>,
    #[serde(default)]
    next_continuation_token: Option<String>,
    count: usize,
    objects: Vec<ObjectEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    download_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// ============ Config ============

#[derive(Debug, Deserialize, Default)]
struct Config {
    #[serde(default)]
    server: ServerSection,
}

#[derive(Debug, Deserialize, Default)]
struct ServerSection {
    port: Option<u16>,
}

fn resolve_endpoint(cli: &Cli) -> String {
    if let Some(endpoint) = &cli.endpoint {
        return endpoint.trim_end_matches('/').to_string();
    }

    let port = std::fs::read_to_string(&cli.config)
        .ok()
        .and_then(|content| toml::from_str::<Config>(&content).ok())
        .and_then(|config| config.server.port)
        .unwrap_or(3000);

    format!("http://127.0.0.1:{}", port)
}

// ============ Main ============

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let endpoint = resolve_endpoint(&cli);
    let client = reqwest::Client::new();

    let result = match &cli.command {
        Commands::Buckets => list_buckets(&client, &endpoint).await,
        Commands::Objects { bucket, prefix, max_keys, token } => {
            list_objects(&client, &endpoint, bucket, prefix.as_deref(), *max_keys, token.as_deref()).await
        }
        Commands::Get { bucket, key, output, download } => {
            get_object(&client, &endpoint, bucket, key, output.as_deref(), *download).await
        }
        Commands::Upload { file } => upload(&client, &endpoint, file).await,
        Commands::Hello => hello(&client, &endpoint).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

// ============ Commands ============

async fn list_buckets(client: &reqwest::Client, endpoint: &str) -> anyhow::Result<()> {
    let response = client.get(format!("{}/api/buckets", endpoint)).send().await?;
    let info: ListBucketsResponse = parse_json(response).await?;

    println!("{:<40} {}", "BUCKET", "CREATED");
    println!("{}", "-".repeat(70));
    for bucket in &info.buckets {
        println!(
            "{:<40} {}",
            bucket.name.as_deref().unwrap_or("-"),
            bucket.creation_date.as_deref().unwrap_or("-")
        );
    }
    println!();
    println!("{} bucket(s)", info.count);

    Ok(())
}

async fn list_objects(
    client: &reqwest::Client,
    endpoint: &str,
    bucket: &str,
    prefix: Option<&str>,
    max_keys: Option<u32>,
    token: Option<&str>,
) -> anyhow::Result<()> {
    let mut query: Vec<(&str, String)> = Vec::new();
    if let Some(prefix) = prefix {
        query.push(("prefix", prefix.to_string()));
    }
    if let Some(max_keys) = max_keys {
        query.push(("maxKeys", max_keys.to_string()));
    }
    if let Some(token) = token {
        query.push(("continuationToken", token.to_string()));
    }

    let url = format!("{}/api/buckets/{}/objects", endpoint, encode_segment(bucket));
    let response = client.get(url).query(&query).send().await?;
    let listing: ListObjectsResponse = parse_json(response).await?;

    println!("{:<50} {:>12} {:<26} {}", "KEY", "SIZE", "LAST MODIFIED", "CLASS");
    println!("{}", "-".repeat(100));
    for object in &listing.objects {
        println!(
            "{:<50} {:>12} {:<26} {}",
            object.key.as_deref().unwrap_or("-"),
            object.size.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
            object.last_modified.as_deref().unwrap_or("-"),
            object.storage_class.as_deref().unwrap_or("-")
        );
    }
    println!();
    println!("{} object(s) in {}", listing.count, listing.bucket);

    if listing.is_truncated == Some(true) {
        if let Some(next) = &listing.next_continuation_token {
            println!("More results available: --token {}", next);
        }
    }

    Ok(())
}

async fn get_object(
    client: &reqwest::Client,
    endpoint: &str,
    bucket: &str,
    key: &str,
    output: Option<&Path>,
    download: bool,
) -> anyhow::Result<()> {
    // Each key character is encoded so slashes and '%' survive the server's single decode
    let url = format!(
        "{}/api/buckets/{}/objects/{}",
        endpoint,
        encode_segment(bucket),
        utf8_percent_encode(key, NON_ALPHANUMERIC)
    );

    let mut request = client.get(url);
    if download {
        request = request.query(&[("download", "true")]);
    }
    let response = request.send().await?;

    if response.status() == reqwest::StatusCode::NO_CONTENT {
        println!("Object has no body");
        return Ok(());
    }
    if !response.status().is_success() {
        bail!(describe_error(response).await);
    }

    let target = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(key.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("download")),
    };

    let mut file = tokio::fs::File::create(&target)
        .await
        .with_context(|| format!("creating {}", target.display()))?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    println!("Wrote {} bytes to {}", written, target.display());
    Ok(())
}

async fn upload(client: &reqwest::Client, endpoint: &str, path: &Path) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("upload path has no file name")?
        .to_string();

    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    let len = file.metadata().await?.len();

    let body = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::new(file));
    let part = reqwest::multipart::Part::stream_with_length(body, len).file_name(file_name);
    let form = reqwest::multipart::Form::new().part("apk", part);

    let response = client
        .post(format!("{}/upload", endpoint))
        .multipart(form)
        .send()
        .await?;
    let uploaded: UploadResponse = parse_json(response).await?;

    println!("Uploaded {} ({} bytes)", path.display(), len);
    println!("Download URL: {}", uploaded.download_url);
    Ok(())
}

async fn hello(client: &reqwest::Client, endpoint: &str) -> anyhow::Result<()> {
    let response = client.get(format!("{}/hello", endpoint)).send().await?;
    let body: serde_json::Value = parse_json(response).await?;
    println!("{}", body);
    Ok(())
}

// ============ Helpers ============

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, NON_ALPHANUMERIC).to_string()
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> anyhow::Result<T> {
    if !response.status().is_success() {
        bail!(describe_error(response).await);
    }
    Ok(response.json().await?)
}

async fn describe_error(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(ErrorEnvelope { error: Some(error), .. }) => format!("API error: {} ({})", error, status),
        Ok(ErrorEnvelope { message: Some(message), code, .. }) => format!(
            "API error: {} [{}] ({})",
            message,
            code.as_deref().unwrap_or("UNKNOWN"),
            status
        ),
        _ => format!("API error: {}", status),
    }
}
