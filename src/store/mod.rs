//! Remote object storage for processed images.
//!
//! The pipeline never talks to storage itself. Once an image is processed,
//! [`upload`] names it `<uuid>.<ext>`, hands the bytes to an [`ObjectStore`]
//! and makes the object publicly readable. The caller persists the returned
//! [`StoredObject`] identifiers with its catalog record.
//!
//! Two stores ship with the crate:
//! - [`LocalStore`]: a directory served by some web server.
//! - [`DriveStore`]: a Google Drive folder via the v3 REST API.

mod drive;
mod local;

pub use drive::{DriveCredentials, DriveStore};
pub use local::LocalStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::imaging::ProcessedImage;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{during} returned HTTP {status}: {body}")]
    Status {
        during: &'static str,
        status: u16,
        body: String,
    },
    #[error("Unexpected response during {during}: {message}")]
    Response {
        during: &'static str,
        message: String,
    },
    #[error("Invalid object name: {0}")]
    InvalidName(String),
    #[error("Store configuration error: {0}")]
    Config(String),
}

/// Identifiers returned for one uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    /// Opaque id assigned by the store.
    pub remote_id: String,
    /// Locally generated id, also the object's file stem.
    pub stable_id: Uuid,
    pub url: String,
}

/// An object store the processed images are uploaded to.
pub trait ObjectStore: Sync {
    /// Store `bytes` under `name` and return the store's id for the object.
    fn put(&self, name: &str, bytes: &[u8], mime_type: &str) -> Result<String, UploadError>;

    /// Make the object readable by anyone holding its URL.
    fn grant_public_read(&self, remote_id: &str) -> Result<(), UploadError>;

    fn public_url(&self, remote_id: &str) -> String;

    fn thumbnail_url(&self, remote_id: &str, width: u32) -> String;
}

/// `<uuid>.<ext>`
pub fn object_name(stable_id: Uuid, image: &ProcessedImage) -> String {
    format!("{stable_id}.{}", image.format.extension())
}

/// Upload a processed image under a fresh UUID v4, in a single attempt.
///
/// Retrying callers go through [`crate::ingest::publish`], which keeps the
/// object the store already accepted.
pub fn upload(store: &dyn ObjectStore, image: &ProcessedImage) -> Result<StoredObject, UploadError> {
    let stable_id = Uuid::new_v4();
    let name = object_name(stable_id, image);
    let remote_id = store.put(&name, &image.bytes, image.format.mime_type())?;
    store.grant_public_read(&remote_id)?;
    Ok(stored_object(store, remote_id, stable_id, image))
}

/// The identifiers of an object that has been put and made public.
pub fn stored_object(
    store: &dyn ObjectStore,
    remote_id: String,
    stable_id: Uuid,
    image: &ProcessedImage,
) -> StoredObject {
    let url = store.public_url(&remote_id);
    info!(%stable_id, remote_id = %remote_id, size = image.len(), "Image uploaded");
    StoredObject {
        remote_id,
        stable_id,
        url,
    }
}

/// Build the store selected in config.
pub fn from_config(config: &StoreConfig) -> Result<Box<dyn ObjectStore>, UploadError> {
    match config.backend {
        StoreBackend::Local => Ok(Box::new(LocalStore::new(
            &config.local.root,
            &config.local.base_url,
        )?)),
        StoreBackend::Drive => Ok(Box::new(DriveStore::from_config(
            &config.drive,
            config.timeout_secs,
        )?)),
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::{EncodeStage, OutputFormat};
    use std::sync::Mutex;

    /// In-memory store that can be told to fail its first `failures` puts
    /// or its first `grant_failures` permission grants.
    pub struct MemoryStore {
        pub failures: Mutex<usize>,
        pub grant_failures: Mutex<usize>,
        pub objects: Mutex<Vec<(String, Vec<u8>, String)>>,
        pub public: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::failing(0)
        }

        pub fn failing(failures: usize) -> Self {
            Self {
                failures: Mutex::new(failures),
                grant_failures: Mutex::new(0),
                objects: Mutex::new(Vec::new()),
                public: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_grants(grant_failures: usize) -> Self {
            let store = Self::new();
            *store.grant_failures.lock().unwrap() = grant_failures;
            store
        }

        pub fn names(&self) -> Vec<String> {
            self.objects
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _, _)| name.clone())
                .collect()
        }
    }

    impl ObjectStore for MemoryStore {
        fn put(&self, name: &str, bytes: &[u8], mime_type: &str) -> Result<String, UploadError> {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(UploadError::Status {
                    during: "upload",
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            self.objects
                .lock()
                .unwrap()
                .push((name.to_string(), bytes.to_vec(), mime_type.to_string()));
            Ok(format!("mem-{name}"))
        }

        fn grant_public_read(&self, remote_id: &str) -> Result<(), UploadError> {
            let mut failures = self.grant_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(UploadError::Status {
                    during: "permission grant",
                    status: 500,
                    body: "backend error".into(),
                });
            }
            self.public.lock().unwrap().push(remote_id.to_string());
            Ok(())
        }

        fn public_url(&self, remote_id: &str) -> String {
            format!("mem://{remote_id}")
        }

        fn thumbnail_url(&self, remote_id: &str, width: u32) -> String {
            format!("mem://{remote_id}?w={width}")
        }
    }

    pub fn processed(format: OutputFormat, bytes: &[u8]) -> ProcessedImage {
        ProcessedImage {
            bytes: bytes.to_vec(),
            format,
            width: 1,
            height: 1,
            original_width: 1,
            original_height: 1,
            stage: EncodeStage::FirstPass,
        }
    }

    #[test]
    fn upload_names_object_uuid_dot_ext() {
        let store = MemoryStore::new();
        let stored = upload(&store, &processed(OutputFormat::Jpeg, b"abc")).unwrap();

        let objects = store.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        let (name, bytes, mime) = &objects[0];
        assert_eq!(name, &format!("{}.jpg", stored.stable_id));
        assert_eq!(bytes, b"abc");
        assert_eq!(mime, "image/jpeg");
        assert_eq!(stored.stable_id.get_version_num(), 4);
    }

    #[test]
    fn upload_grants_public_read_and_returns_url() {
        let store = MemoryStore::new();
        let stored = upload(&store, &processed(OutputFormat::WebP, b"x")).unwrap();

        assert_eq!(*store.public.lock().unwrap(), vec![stored.remote_id.clone()]);
        assert_eq!(stored.url, format!("mem://{}", stored.remote_id));
    }

    #[test]
    fn upload_failure_skips_permission() {
        let store = MemoryStore::failing(1);
        let result = upload(&store, &processed(OutputFormat::Png, b"x"));

        assert!(matches!(result, Err(UploadError::Status { status: 503, .. })));
        assert!(store.public.lock().unwrap().is_empty());
    }

    #[test]
    fn each_upload_gets_a_fresh_id() {
        let store = MemoryStore::new();
        let image = processed(OutputFormat::Png, b"x");
        let a = upload(&store, &image).unwrap();
        let b = upload(&store, &image).unwrap();
        assert_ne!(a.stable_id, b.stable_id);
    }

    #[test]
    fn status_error_message() {
        let err = UploadError::Status {
            during: "permission grant",
            status: 403,
            body: "forbidden".into(),
        };
        assert_eq!(err.to_string(), "permission grant returned HTTP 403: forbidden");
    }
}
