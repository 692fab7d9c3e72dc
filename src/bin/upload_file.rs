//! Upload a single file to the configured Beekeeper folder.
//!
//! Reads the same BEEKEEPER_* variables (or `.env`) as the batch uploader.
//! Any failure is fatal and exits non-zero.

use anyhow::Context;
use beekeeper_upload::{api::ApiClient, init_tracing};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "upload_file", about = "Upload one file to the Beekeeper document library")]
struct Cli {
    /// Path to the local file
    file: PathBuf,
    /// Name to give the file in Beekeeper (defaults to the local file name)
    #[arg(long)]
    name: Option<String>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let api = ApiClient::from_env().context(
        "Failed to create API client. Set BEEKEEPER_TOKEN, BEEKEEPER_TENANT_URL and BEEKEEPER_TARGET_FOLDER_ID",
    )?;

    let artifact = api
        .upload_file(&cli.file, cli.name.as_deref())
        .with_context(|| format!("Upload of {} failed", cli.file.display()))?;

    let out = serde_json::to_string_pretty(&artifact).context("Serialize artifact")?;
    println!("{}", out);
    Ok(())
}
