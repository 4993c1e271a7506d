//! Request-scoped staging of uploaded files.
//!
//! Every upload is written to its own randomly named file in the staging
//! directory before it is forwarded. The file lives exactly as long as its
//! [`StagedUpload`]: dropping the guard removes it, whichever way the request
//! ends.

use std::path::Path;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use futures_util::{Stream, StreamExt};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

const DEFAULT_FILE_NAME: &str = "upload";

/// Errors raised while writing an upload to disk.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("staging I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload stream broken: {0}")]
    Multipart(#[from] MultipartError),
}

impl StagingError {
    /// The inbound body ran past the configured size limit mid-file.
    pub fn is_too_large(&self) -> bool {
        matches!(self, StagingError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE)
    }
}

/// An uploaded file held in temporary storage for one request.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    file_name: String,
    len: u64,
}

impl StagedUpload {
    /// Write `chunks` to a fresh temporary file inside `dir`.
    ///
    /// `file_name` is the client-supplied name, kept for forwarding only; it
    /// never influences the on-disk path.
    pub async fn stage<S, E>(
        file_name: Option<&str>,
        chunks: S,
        dir: &Path,
    ) -> Result<Self, StagingError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        StagingError: From<E>,
    {
        tokio::fs::create_dir_all(dir).await?;

        let file = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(dir)?;
        let mut writer = tokio::fs::File::from_std(file.reopen()?);

        let mut chunks = std::pin::pin!(chunks);
        let mut len = 0u64;
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            len += chunk.len() as u64;
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;

        let file_name = file_name
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();

        tracing::debug!(
            path = %file.path().display(),
            file_name = %file_name,
            bytes = len,
            "Upload staged"
        );

        Ok(Self { file, file_name, len })
    }

    /// Open the staged bytes for reading.
    pub async fn open(&self) -> std::io::Result<tokio::fs::File> {
        tokio::fs::File::open(self.file.path()).await
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tokio::io::AsyncReadExt;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok::<_, std::io::Error>(Bytes::from_static(*p)))
                .collect::<Vec<_>>(),
        )
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_stage_writes_all_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedUpload::stage(
            Some("night.edf"),
            chunks(&[b"0       ", b"patient ", b"\x00\xff"]),
            dir.path(),
        )
        .await
        .unwrap();

        assert_eq!(staged.file_name(), "night.edf");
        assert_eq!(staged.len(), 18);
        assert!(staged.path().starts_with(dir.path()));

        let mut contents = Vec::new();
        staged.open().await.unwrap().read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"0       patient \x00\xff");
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedUpload::stage(None, chunks(&[b"abc"]), dir.path())
            .await
            .unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(staged.file_name(), DEFAULT_FILE_NAME);

        drop(staged);
        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_broken_stream_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let broken = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
        ]);

        let err = StagedUpload::stage(Some("a.edf"), broken, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, StagingError::Io(_)));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_creates_missing_staging_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("uploads");
        let staged = StagedUpload::stage(Some(""), chunks(&[]), &dir).await.unwrap();

        assert!(dir.is_dir());
        assert!(staged.is_empty());
        assert_eq!(staged.file_name(), DEFAULT_FILE_NAME);
    }

    #[tokio::test]
    async fn test_concurrent_uploads_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = StagedUpload::stage(Some("same.edf"), chunks(&[b"a"]), dir.path());
        let b = StagedUpload::stage(Some("same.edf"), chunks(&[b"b"]), dir.path());
        let (a, b) = tokio::join!(a, b);
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.path(), b.path());
        assert_eq!(entries(dir.path()), 2);
    }
}
