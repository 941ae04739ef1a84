use crate::domain::ports::RemoteStoreRef;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Revision metadata persisted next to each cached blob.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct CacheMeta {
    rev: String,
    server_modified: String,
}

/// Local cache of remote documents, keyed by a hash of the remote path.
///
/// Each entry is a blob file plus a `.meta.json` sidecar holding the
/// revision token. A cached entry is revalidated with a metadata-only call
/// before reuse; only a changed or missing revision triggers a full
/// download. Concurrent resolutions of the same path may both download; the
/// blob and sidecar are each replaced atomically, so the last full
/// replacement wins without locking.
#[derive(Clone)]
pub struct RemoteFileCache {
    store: RemoteStoreRef,
    cache_dir: PathBuf,
}

impl RemoteFileCache {
    pub fn new(store: RemoteStoreRef, cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self { store, cache_dir })
    }

    fn cache_key(remote_path: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(remote_path.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn blob_path(&self, remote_path: &str) -> PathBuf {
        self.cache_dir.join(Self::cache_key(remote_path))
    }

    fn meta_path(&self, remote_path: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.meta.json", Self::cache_key(remote_path)))
    }

    /// Returns a local path for `remote_path`, downloading only when the
    /// cached revision is stale or absent.
    pub async fn resolve(&self, remote_path: &str) -> Result<PathBuf> {
        let blob = self.blob_path(remote_path);
        let meta = self.meta_path(remote_path);

        if blob.exists() && meta.exists() {
            match self.cached_rev(&meta) {
                Ok(cached_rev) => match self.store.get_metadata(remote_path).await {
                    Ok(current_rev) if current_rev == cached_rev => {
                        debug!(path = remote_path, "cache hit, revision unchanged");
                        return Ok(blob);
                    }
                    Ok(_) => {
                        debug!(path = remote_path, "revision changed, refetching");
                    }
                    Err(err) => {
                        warn!(path = remote_path, error = %err, "metadata check failed, refetching");
                    }
                },
                Err(err) => {
                    warn!(path = remote_path, error = %err, "unreadable cache sidecar, refetching");
                }
            }
        }

        let document = self.store.download(remote_path).await?;

        let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(&document.bytes)?;
        tmp.persist(&blob).map_err(|e| e.error)?;

        let sidecar = CacheMeta {
            rev: document.rev,
            server_modified: document.server_modified,
        };
        let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(&serde_json::to_vec(&sidecar)?)?;
        tmp.persist(&meta).map_err(|e| e.error)?;

        Ok(blob)
    }

    fn cached_rev(&self, meta_path: &Path) -> Result<String> {
        let raw = std::fs::read(meta_path)?;
        let meta: CacheMeta = serde_json::from_slice(&raw)?;
        Ok(meta.rev)
    }
}
