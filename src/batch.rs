// Batch driver: uploads every regular file of a directory, one at a time.
// A failing file is logged and skipped; only a missing directory stops the
// run.

use crate::api::{log_uploaded, ApiClient, Artifact, LocalFile};
use crate::error::{BatchError, UploadError};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// Directory the batch binary reads, relative to the working directory.
pub const DEFAULT_UPLOAD_DIR: &str = "folderUploadFiles";

/// Anything that can push one local file to the document library. The
/// batch driver reports each outcome itself, after its spinner is cleared.
pub trait FileUploader {
    fn upload_file(&self, path: &Path, override_name: Option<&str>)
        -> Result<Artifact, UploadError>;
}

impl FileUploader for ApiClient {
    fn upload_file(
        &self,
        path: &Path,
        override_name: Option<&str>,
    ) -> Result<Artifact, UploadError> {
        let file = LocalFile::inspect(path, override_name)?;
        self.upload(&file)
    }
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// File name and the artifact created for it.
    pub uploaded: Vec<(String, Artifact)>,
    /// File name and the reason its upload failed.
    pub failed: Vec<(String, UploadError)>,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty() && self.failed.is_empty()
    }
}

/// List the regular files directly inside `dir`, sorted by name.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::DirectoryNotFound(dir.to_path_buf()));
    }
    let read_err = |source: std::io::Error| BatchError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if entry.file_type().map_err(read_err)?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Upload every file in `dir` with its original name. Per-file errors are
/// logged and collected; they never abort the batch.
pub fn run_batch(uploader: &dyn FileUploader, dir: &Path) -> Result<BatchReport, BatchError> {
    let files = list_files(dir)?;
    let mut report = BatchReport::default();

    if files.is_empty() {
        info!("No files to upload.");
        return Ok(report);
    }
    info!(count = files.len(), dir = %dir.display(), "uploading files");

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let spinner = spinner(&name);
        let result = uploader.upload_file(&path, None);
        spinner.finish_and_clear();

        match result {
            Ok(artifact) => {
                log_uploaded(&name, &artifact);
                report.uploaded.push((name, artifact));
            }
            Err(e) => {
                error!(
                    file = %name,
                    step = ?e.step(),
                    status = ?e.status(),
                    "Error uploading {}: {}",
                    name,
                    e
                );
                report.failed.push((name, e));
            }
        }
    }

    info!(
        uploaded = report.uploaded.len(),
        failed = report.failed.len(),
        "batch finished"
    );
    Ok(report)
}

/// indicatif spinner shown while a file is in flight. Hidden automatically
/// when stderr is not a terminal.
fn spinner(name: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Uploading {}...", name));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use mockito::Server;
    use serde_json::json;
    use std::cell::RefCell;
    use std::sync::{Arc, Mutex};

    /// Shared buffer the test subscriber writes formatted events into.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    /// Run `f` with info-level events captured into the returned buffer.
    fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buf = LogBuffer::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        (out, buf.contents())
    }

    /// Uploader that fails the token step for the listed file names.
    struct FakeUploader {
        fail: Vec<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeUploader {
        fn new(fail: Vec<&'static str>) -> Self {
            FakeUploader {
                fail,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl FileUploader for FakeUploader {
        fn upload_file(
            &self,
            path: &Path,
            override_name: Option<&str>,
        ) -> Result<Artifact, UploadError> {
            assert!(override_name.is_none());
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.calls.borrow_mut().push(name.clone());
            if self.fail.iter().any(|f| *f == name) {
                return Err(UploadError::Token {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            Ok(serde_json::from_value(json!({"id": name, "type": "file"})).unwrap())
        }
    }

    #[test]
    fn failed_file_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("b.pdf"), "b").unwrap();

        let uploader = FakeUploader::new(vec!["b.pdf"]);
        let report = run_batch(&uploader, dir.path()).unwrap();

        assert_eq!(*uploader.calls.borrow(), vec!["a.txt", "b.pdf"]);
        assert_eq!(report.uploaded.len(), 1);
        assert_eq!(report.uploaded[0].0, "a.txt");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "b.pdf");
        assert!(matches!(
            report.failed[0].1,
            UploadError::Token { status: 503, .. }
        ));
    }

    #[test]
    fn token_failure_is_logged_and_next_file_still_uploads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("b.pdf"), "b").unwrap();
        let mut server = Server::new();

        // Files go in name order: a.txt takes the first token, b.pdf the second.
        let token_ok = server
            .mock("GET", "/api/2/files/file/upload/token")
            .with_body(
                json!({
                    "upload_url": format!("{}/storage", server.url()),
                    "additional_form_data": [{"name": "key", "value": "uploads/a.txt"}],
                })
                .to_string(),
            )
            .expect(1)
            .create();
        let token_down = server
            .mock("GET", "/api/2/files/file/upload/token")
            .with_status(503)
            .with_body("maintenance")
            .expect(1)
            .create();
        let storage = server
            .mock("POST", "/storage")
            .with_status(204)
            .expect(1)
            .create();
        let register = server
            .mock("POST", "/api/2/files/file/upload")
            .with_body(
                json!({
                    "id": 1,
                    "key": "uploads/a.txt",
                    "media_type": "text/plain",
                    "size": 1,
                    "url": "https://cdn.example.com/a.txt",
                    "userid": 5,
                })
                .to_string(),
            )
            .expect(1)
            .create();
        let artifact = server
            .mock("POST", "/api/2/artifacts/folder-1/children")
            .with_status(201)
            .with_body(r#"{"id": 10, "name": "a.txt"}"#)
            .expect(1)
            .create();

        let api = ApiClient::new(&Config::new("t", server.url(), "folder-1")).unwrap();
        let (report, logs) = capture_logs(|| run_batch(&api, dir.path()));
        let report = report.unwrap();

        token_ok.assert();
        token_down.assert();
        storage.assert();
        register.assert();
        artifact.assert();

        assert_eq!(report.uploaded.len(), 1);
        assert_eq!(report.uploaded[0].0, "a.txt");
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(
            report.failed[0].1,
            UploadError::Token { status: 503, .. }
        ));

        let errors: Vec<&str> = logs.lines().filter(|l| l.contains("ERROR")).collect();
        assert_eq!(errors.len(), 1, "{logs}");
        assert!(errors[0].contains("Error uploading b.pdf"), "{logs}");
        assert!(errors[0].contains("maintenance"), "{logs}");
        assert!(logs.contains("Uploaded a.txt -> artifact 10"), "{logs}");
    }

    #[test]
    fn continues_after_an_early_failure() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["1.txt", "2.txt", "3.txt"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }

        let uploader = FakeUploader::new(vec!["1.txt"]);
        let report = run_batch(&uploader, dir.path()).unwrap();

        assert_eq!(uploader.calls.borrow().len(), 3);
        assert_eq!(report.uploaded.len(), 2);
        assert_eq!(report.failed.len(), 1);
    }

    #[test]
    fn subdirectories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("deep.txt"), "x").unwrap();
        std::fs::write(dir.path().join("top.csv"), "x").unwrap();

        let files = list_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("top.csv")]);
    }

    #[test]
    fn empty_directory_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = FakeUploader::new(vec![]);

        let report = run_batch(&uploader, dir.path()).unwrap();
        assert!(report.is_empty());
        assert!(uploader.calls.borrow().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("folderUploadFiles");
        let uploader = FakeUploader::new(vec![]);

        let err = run_batch(&uploader, &missing).unwrap_err();
        assert!(matches!(err, BatchError::DirectoryNotFound(ref p) if p == &missing));
    }
}
