// Entrypoint for the batch uploader.
// - No flags: every file in `./folderUploadFiles` is uploaded with its own name.
// - A missing folder exits with status 1; per-file failures are only logged.

use anyhow::Context;
use beekeeper_upload::{api::ApiClient, batch, init_tracing};
use std::path::Path;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let api = ApiClient::from_env().context(
        "Failed to create API client. Set BEEKEEPER_TOKEN, BEEKEEPER_TENANT_URL and BEEKEEPER_TARGET_FOLDER_ID",
    )?;

    let dir = std::env::current_dir()
        .context("Failed to resolve working directory")?
        .join(Path::new(batch::DEFAULT_UPLOAD_DIR));

    // Returning the error gives exit status 1.
    batch::run_batch(&api, &dir)?;
    Ok(())
}
