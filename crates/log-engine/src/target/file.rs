use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::TargetError;
use crate::format::Format;
use crate::record::LogRec;
use crate::target::Target;

/// Append-only file target.
///
/// Each call to [`write`](Target::write) appends exactly one encoded line.
pub struct FileTarget {
    path: PathBuf,
    file: tokio::fs::File,
    format: Format,
}

impl FileTarget {
    /// Open (or create) the file at `path` in append mode.
    ///
    /// Parent directories are created automatically if they do not exist.
    pub async fn open(path: impl AsRef<Path>, format: Format) -> Result<Self, TargetError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(TargetError::CreateDir)?;
            }
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(TargetError::OpenFile)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Target for FileTarget {
    async fn write(&mut self, rec: &LogRec) -> Result<(), TargetError> {
        let line = self.format.encode(rec)?;
        self.file
            .write_all(&line)
            .await
            .map_err(TargetError::Write)
    }

    async fn flush(&mut self) -> Result<(), TargetError> {
        self.file.flush().await.map_err(TargetError::Flush)
    }
}
