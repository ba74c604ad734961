use super::{ObjectStore, UploadError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Objects as files in one directory, served under `base_url`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    base_url: String,
}

impl LocalStore {
    /// Create the store, creating `root` if needed.
    pub fn new(root: impl AsRef<Path>, base_url: &str) -> Result<Self, UploadError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            UploadError::Config(format!(
                "Failed to create storage directory {}: {e}",
                root.display()
            ))
        })?;
        Ok(Self {
            root,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Object names are flat: no separators, no parent references.
    fn object_path(&self, name: &str) -> Result<PathBuf, UploadError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(UploadError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

impl ObjectStore for LocalStore {
    fn put(&self, name: &str, bytes: &[u8], _mime_type: &str) -> Result<String, UploadError> {
        let path = self.object_path(name)?;
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), size = bytes.len(), "Wrote object");
        Ok(name.to_string())
    }

    #[cfg(unix)]
    fn grant_public_read(&self, remote_id: &str) -> Result<(), UploadError> {
        use std::os::unix::fs::PermissionsExt;
        let path = self.object_path(remote_id)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644))?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn grant_public_read(&self, remote_id: &str) -> Result<(), UploadError> {
        self.object_path(remote_id)?;
        Ok(())
    }

    fn public_url(&self, remote_id: &str) -> String {
        format!("{}/{remote_id}", self.base_url)
    }

    fn thumbnail_url(&self, remote_id: &str, width: u32) -> String {
        format!("{}?w={width}", self.public_url(remote_id))
    }
}
