// Library root
// -----------
// Uploads local files into a Beekeeper document library folder. The two
// binaries (`main.rs` for whole folders, `bin/upload_file.rs` for a single
// file) are thin wrappers over these modules.
//
// Module responsibilities:
// - `mime`: extension to content-type mapping.
// - `config`: token, tenant URL and target folder, read once at startup.
// - `error`: typed failures for uploads, configuration and batches.
// - `api`: the four-step upload against the Beekeeper API.
// - `batch`: folder enumeration and per-file error isolation.
pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod mime;

pub use api::{ApiClient, Artifact, FileInfo, UploadToken};
pub use config::Config;
pub use error::{BatchError, ConfigError, Step, UploadError};

/// Initialize tracing for the binaries. `RUST_LOG` overrides the default
/// `info` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
