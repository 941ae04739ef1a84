use crate::domain::ports::{RemoteDocument, RemoteStore};
use crate::error::{BotError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Document store serving files from a local directory.
///
/// Useful for development and tests: the revision token is derived from the
/// file's modification time and size, so editing a document invalidates the
/// cache the same way a remote revision bump would.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn local_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn stat(&self, path: &Path) -> Result<(String, String)> {
        let meta = std::fs::metadata(path)
            .map_err(|err| BotError::Fetch(format!("{}: {err}", path.display())))?;
        let modified: DateTime<Utc> = meta
            .modified()
            .map_err(|err| BotError::Fetch(format!("{}: {err}", path.display())))?
            .into();
        let rev = format!("{}-{}", modified.timestamp_millis(), meta.len());
        Ok((rev, modified.to_rfc3339()))
    }
}

#[async_trait]
impl RemoteStore for LocalDirStore {
    async fn get_metadata(&self, path: &str) -> Result<String> {
        let local = self.local_path(path);
        let (rev, _) = self.stat(&local)?;
        Ok(rev)
    }

    async fn download(&self, path: &str) -> Result<RemoteDocument> {
        let local = self.local_path(path);
        let (rev, server_modified) = self.stat(&local)?;
        let bytes = std::fs::read(&local)
            .map_err(|err| BotError::Fetch(format!("{}: {err}", local.display())))?;
        Ok(RemoteDocument {
            bytes,
            rev,
            server_modified,
        })
    }
}
