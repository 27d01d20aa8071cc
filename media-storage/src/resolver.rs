//! Turns a caller-supplied media path into a file on local disk.
//!
//! Local files win. When a file is missing and remote storage is configured,
//! the object is downloaded once to the path the caller asked for; later
//! calls find it locally and never touch the network again.

use crate::transport::{HttpStorageTransport, ObjectRequest, StorageTransport};
use instagate_core::{RemoteStorage, StorageError, StorageSettings};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct MediaResolver {
    storage: Option<RemoteStorage>,
    working_dir: PathBuf,
    transport: Arc<dyn StorageTransport>,
}

impl MediaResolver {
    pub fn new(
        settings: &StorageSettings,
        working_dir: PathBuf,
        transport: Arc<dyn StorageTransport>,
    ) -> Self {
        let storage = settings.remote();
        if storage.is_none() {
            info!("Remote storage not configured, serving media from local disk only");
        }

        Self {
            storage,
            working_dir: normalize_lexically(&working_dir),
            transport,
        }
    }

    pub fn with_http_transport(
        settings: &StorageSettings,
        working_dir: PathBuf,
    ) -> Result<Self, StorageError> {
        let transport = Arc::new(HttpStorageTransport::new()?);
        Ok(Self::new(settings, working_dir, transport))
    }

    pub fn is_remote_enabled(&self) -> bool {
        self.storage.is_some()
    }

    /// Returns a local path for `path`, downloading it from remote storage
    /// when it is missing locally.
    ///
    /// Without remote storage the absolute path is returned even if nothing
    /// exists there; the caller decides how to report that.
    pub async fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let absolute = self.absolutize(path);

        if tokio::fs::try_exists(&absolute).await.unwrap_or(false) {
            debug!("Media {} found locally", absolute.display());
            return Ok(absolute);
        }

        let Some(remote) = &self.storage else {
            return Ok(absolute);
        };

        let key = self.object_key(&absolute, path);
        let request = ObjectRequest {
            url: format!(
                "{}/storage/v1/object/{}/{}",
                remote.base_url, remote.bucket, key
            ),
            service_key: remote.service_key.clone(),
        };

        info!("Fetching media {} from bucket {}", key, remote.bucket);
        let response = self.transport.get(&request).await.map_err(|e| {
            warn!("Remote storage unreachable for {}: {}", path, e);
            upstream_fetch(path, e)
        })?;

        if response.is_failure() {
            warn!(
                "Remote storage returned {} for {}, treating as missing",
                response.status, key
            );
            return Err(StorageError::NotFound {
                path: path.to_string(),
            });
        }

        let target = absolute.clone();
        let body = response.body.clone();
        tokio::task::spawn_blocking(move || persist_atomically(&target, &body))
            .await
            .map_err(|e| upstream_fetch(path, e))?
            .map_err(|e| upstream_fetch(path, e))?;

        info!(
            "Stored {} bytes of {} at {}",
            response.body.len(),
            key,
            absolute.display()
        );
        Ok(absolute)
    }

    fn absolutize(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            normalize_lexically(candidate)
        } else {
            normalize_lexically(&self.working_dir.join(candidate))
        }
    }

    /// Object key for `absolute`: its location relative to the working
    /// directory with `/` separators. Paths outside the working directory fall
    /// back to the original string with every leading `.` and `/` stripped.
    fn object_key(&self, absolute: &Path, original: &str) -> String {
        match absolute.strip_prefix(&self.working_dir) {
            Ok(relative) => {
                let key = relative
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(part) => Some(part.to_string_lossy()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("/");
                if key.is_empty() {
                    ".".to_string()
                } else {
                    key
                }
            }
            Err(_) => original
                .trim_start_matches(['.', '/'])
                .to_string(),
        }
    }
}

fn upstream_fetch<E>(path: &str, error: E) -> StorageError
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let boxed: Box<dyn std::error::Error + Send + Sync> = error.into();
    let source: Box<dyn std::error::Error + Send + Sync> = match boxed.downcast::<StorageError>() {
        Ok(storage_error) => match *storage_error {
            StorageError::Transport(cause) => cause,
            other => Box::new(other),
        },
        Err(other) => other,
    };

    StorageError::UpstreamFetch {
        path: path.to_string(),
        source,
    }
}

/// Writes `body` to a temp file beside `target` and renames it into place.
/// On failure the temp file is removed and `target` is left untouched.
fn persist_atomically(target: &Path, body: &[u8]) -> std::io::Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut file = tempfile::NamedTempFile::new_in(parent)?;
    file.write_all(body)?;
    file.as_file().sync_all()?;
    file.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Collapses `.` and `..` without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                ) && normalized.pop();
                if !popped && !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
