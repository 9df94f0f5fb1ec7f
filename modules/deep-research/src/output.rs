use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use deep_research_common::{FileCollisionError, WriteError};

pub const MAX_NAME_ATTEMPTS: u32 = 100;

/// Writes reports under `dir` without ever overwriting an existing file.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    max_attempts: u32,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_attempts: MAX_NAME_ATTEMPTS,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `base.md`, then `base-1.md`, `base-2.md`, ... until one can be created
    /// exclusively. Gives up after the attempt cap.
    pub async fn write(&self, base: &str, contents: &str) -> Result<PathBuf, WriteError> {
        for attempt in 0..self.max_attempts {
            let path = self.dir.join(candidate(base, attempt));
            let file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            let file = match file {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "File exists, trying next name");
                    continue;
                }
                Err(source) => return Err(WriteError::Io { path, source }),
            };

            let path = fill(path, file, contents).await?;
            info!(path = %path.display(), bytes = contents.len(), "Report written");
            return Ok(path);
        }

        Err(FileCollisionError {
            dir: self.dir.clone(),
            base: base.to_string(),
            attempts: self.max_attempts,
        }
        .into())
    }
}

/// Write `contents` into the freshly created file at `path`. A partial file is
/// removed so a failed write never leaves a truncated report behind.
async fn fill<W: AsyncWrite + Unpin>(
    path: PathBuf,
    mut sink: W,
    contents: &str,
) -> Result<PathBuf, WriteError> {
    let written = async {
        sink.write_all(contents.as_bytes()).await?;
        sink.flush().await
    }
    .await;
    drop(sink);

    match written {
        Ok(()) => Ok(path),
        Err(source) => {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove partial report");
            }
            Err(WriteError::Io { path, source })
        }
    }
}

fn candidate(base: &str, attempt: u32) -> String {
    match attempt {
        0 => format!("{base}.md"),
        n => format!("{base}-{n}.md"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Accepts nothing: every write fails as if the disk were full.
    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::Error::other("no space left on device")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn candidates_count_up_from_the_bare_name() {
        assert_eq!(candidate("caffeine-sleep", 0), "caffeine-sleep.md");
        assert_eq!(candidate("caffeine-sleep", 1), "caffeine-sleep-1.md");
        assert_eq!(candidate("caffeine-sleep", 99), "caffeine-sleep-99.md");
    }

    #[tokio::test]
    async fn existing_files_are_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.md"), "old").unwrap();
        let writer = ReportWriter::new(dir.path());

        let first = writer.write("report", "new").await.unwrap();
        let second = writer.write("report", "newer").await.unwrap();

        assert_eq!(first, dir.path().join("report-1.md"));
        assert_eq!(second, dir.path().join("report-2.md"));
        assert_eq!(std::fs::read_to_string(dir.path().join("report.md")).unwrap(), "old");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "newer");
    }

    #[tokio::test]
    async fn gives_up_after_one_hundred_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.md"), "").unwrap();
        for n in 1..100 {
            std::fs::write(dir.path().join(format!("report-{n}.md")), "").unwrap();
        }
        let writer = ReportWriter::new(dir.path());

        let err = writer.write("report", "body").await.unwrap_err();

        match err {
            WriteError::Collision(e) => {
                assert_eq!(e.attempts, 100);
                assert_eq!(e.base, "report");
            }
            other => panic!("expected collision, got {other:?}"),
        }
        assert!(!dir.path().join("report-100.md").exists());
    }

    #[tokio::test]
    async fn failed_write_removes_the_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        std::fs::write(&path, "# Repo").unwrap();

        let err = fill(path.clone(), FullDisk, "# Report body").await.unwrap_err();

        match err {
            WriteError::Io { path: failed, source } => {
                assert_eq!(failed, path);
                assert_eq!(source.to_string(), "no space left on device");
            }
            other => panic!("expected io error, got {other:?}"),
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("missing"));
        let err = writer.write("report", "body").await.unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
    }
}
