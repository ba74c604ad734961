//! Upload orchestration: validate, process, publish.
//!
//! Processing and publishing are separate steps so a failed upload can be
//! retried with the bytes already encoded. The pipeline runs once per
//! image whatever happens at the store.

use crate::catalog::ContextSettings;
use crate::imaging::{
    CompressionTier, FormatChoice, ImageBackend, ProcessError, ProcessedImage, SourceImage,
    process,
};
use crate::store::{ObjectStore, StoredObject, UploadError, object_name, stored_object};
use crate::validation::{ValidationError, validate_upload};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Processing failed: {0}")]
    Processing(#[from] ProcessError),
    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),
}

/// Per-request overrides of the context's default format and tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    pub format: Option<FormatChoice>,
    pub tier: Option<CompressionTier>,
}

/// A processed and uploaded image.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub image: ProcessedImage,
    pub stored: StoredObject,
}

/// Validate the upload against the context's limits and run the pipeline.
pub fn prepare(
    backend: &impl ImageBackend,
    source: &SourceImage,
    settings: &ContextSettings,
    options: IngestOptions,
) -> Result<ProcessedImage, ProcessError> {
    let filename = source
        .filename
        .as_deref()
        .ok_or_else(|| ValidationError::InvalidFilename("<unnamed upload>".into()))?;
    validate_upload(filename, &source.bytes, settings.limits())?;

    let profile = settings.profile(options.format, options.tier);
    process(backend, source, &profile)
}

/// Upload an already processed image, trying up to `attempts` times.
///
/// Every try reuses the same bytes and the same stable id. Once the store
/// has accepted the object only the permission grant is retried, so a
/// flaky grant never leaves a second, private copy behind. `attempts`
/// bounds the tries across both steps.
pub fn publish(
    store: &dyn ObjectStore,
    image: &ProcessedImage,
    attempts: u32,
) -> Result<StoredObject, UploadError> {
    let stable_id = Uuid::new_v4();
    let name = object_name(stable_id, image);
    let mut retry = Retry::new(attempts);

    let remote_id = retry.run("upload", || {
        store.put(&name, &image.bytes, image.format.mime_type())
    })?;
    retry.run("permission grant", || store.grant_public_read(&remote_id))?;
    Ok(stored_object(store, remote_id, stable_id, image))
}

/// Attempt counter shared by the steps of one publish.
struct Retry {
    attempt: u32,
    attempts: u32,
}

impl Retry {
    fn new(attempts: u32) -> Self {
        Self {
            attempt: 1,
            attempts: attempts.max(1),
        }
    }

    fn run<T>(
        &mut self,
        step: &'static str,
        mut op: impl FnMut() -> Result<T, UploadError>,
    ) -> Result<T, UploadError> {
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if self.attempt < self.attempts => {
                    warn!(
                        step,
                        attempt = self.attempt,
                        attempts = self.attempts,
                        error = %e,
                        "Upload step failed, retrying"
                    );
                    self.attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// [`prepare`] then [`publish`].
pub fn ingest(
    backend: &impl ImageBackend,
    store: &dyn ObjectStore,
    source: &SourceImage,
    settings: &ContextSettings,
    options: IngestOptions,
    attempts: u32,
) -> Result<Ingested, IngestError> {
    let image = prepare(backend, source, settings, options)?;
    let stored = publish(store, &image, attempts)?;
    info!(
        stable_id = %stored.stable_id,
        url = %stored.url,
        "Image ingested"
    );
    Ok(Ingested { image, stored })
}
