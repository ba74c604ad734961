//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two codec operations the pipeline
//! needs: decode (with container verification) and encode. Everything in
//! between (color normalization, resizing, ladder bookkeeping) is pure and
//! lives in [`operations`](super::operations).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests swap in a mock
//! that returns scripted encode sizes so the fallback ladders can be
//! exercised without real pixels.

use super::params::{EncodeParams, OutputFormat};
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Unsupported image container: {0}")]
    UnsupportedContainer(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Raw uploaded bytes plus the MIME type the client declared for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub filename: Option<String>,
}

impl SourceImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Read a file from disk, declaring its MIME type from the extension the
    /// way a browser would for a form upload.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let mime = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(OutputFormat::from_extension)
            .map(|f| f.mime_type())
            .unwrap_or("application/octet-stream");
        let source = Self::new(bytes, mime);
        Ok(match path.file_name() {
            Some(name) => source.with_filename(name.to_string_lossy()),
            None => source,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Trait for image codec backends.
///
/// Implementations must be deterministic: identical input and parameters
/// produce identical bytes.
pub trait ImageBackend: Sync {
    /// Decode the source, failing when the container is unreadable, is not
    /// one of JPEG/PNG/WebP, or fails structural verification.
    fn decode(&self, source: &SourceImage) -> Result<DynamicImage, BackendError>;

    /// Encode an already normalized and resized image.
    fn encode(&self, image: &DynamicImage, params: &EncodeParams)
    -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::{ColorType, GenericImageView};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Mock backend that records operations and returns scripted encode sizes.
    /// Uses Mutex (not RefCell) so it is Sync like the real backend.
    pub struct MockBackend {
        pub image: Option<DynamicImage>,
        /// Sizes returned by successive encodes; `default_size` once drained.
        pub encode_sizes: Mutex<VecDeque<usize>>,
        pub default_size: usize,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode {
            mime_type: String,
        },
        Encode {
            params: EncodeParams,
            width: u32,
            height: u32,
            color: ColorType,
        },
    }

    impl MockBackend {
        /// Decodes to `image`; every encode returns `default_size` bytes.
        pub fn with_image(image: DynamicImage, default_size: usize) -> Self {
            Self {
                image: Some(image),
                encode_sizes: Mutex::new(VecDeque::new()),
                default_size,
                operations: Mutex::new(Vec::new()),
            }
        }

        /// Decodes to `image`; encodes return `sizes` in order, then `default_size`.
        pub fn with_sizes(image: DynamicImage, sizes: Vec<usize>, default_size: usize) -> Self {
            Self {
                encode_sizes: Mutex::new(sizes.into()),
                ..Self::with_image(image, default_size)
            }
        }

        /// Every decode fails.
        pub fn undecodable() -> Self {
            Self {
                image: None,
                encode_sizes: Mutex::new(VecDeque::new()),
                default_size: 0,
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        /// Parameters of every recorded encode, in order.
        pub fn encoded_params(&self) -> Vec<EncodeParams> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Encode { params, .. } => Some(params),
                    RecordedOp::Decode { .. } => None,
                })
                .collect()
        }

        /// Dimensions of every recorded encode, in order.
        pub fn encoded_dimensions(&self) -> Vec<(u32, u32)> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Encode { width, height, .. } => Some((width, height)),
                    RecordedOp::Decode { .. } => None,
                })
                .collect()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, source: &SourceImage) -> Result<DynamicImage, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Decode {
                mime_type: source.mime_type.clone(),
            });
            self.image
                .clone()
                .ok_or_else(|| BackendError::Decode("mock image is not decodable".into()))
        }

        fn encode(
            &self,
            image: &DynamicImage,
            params: &EncodeParams,
        ) -> Result<Vec<u8>, BackendError> {
            let (width, height) = image.dimensions();
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                params: *params,
                width,
                height,
                color: image.color(),
            });
            let size = self
                .encode_sizes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.default_size);
            Ok(vec![0u8; size])
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::with_image(DynamicImage::new_rgb8(4, 4), 10);
        let source = SourceImage::new(vec![1, 2, 3], "image/png");

        let img = backend.decode(&source).unwrap();
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Decode {
                mime_type: "image/png".into()
            }]
        );
    }

    #[test]
    fn mock_returns_scripted_sizes_then_default() {
        let backend = MockBackend::with_sizes(DynamicImage::new_rgb8(2, 2), vec![5, 7], 1);
        let img = DynamicImage::new_rgb8(2, 2);
        let params = EncodeParams::fallback(OutputFormat::Jpeg, 90, 0);

        assert_eq!(backend.encode(&img, &params).unwrap().len(), 5);
        assert_eq!(backend.encode(&img, &params).unwrap().len(), 7);
        assert_eq!(backend.encode(&img, &params).unwrap().len(), 1);
        assert_eq!(backend.encoded_params().len(), 3);
    }

    #[test]
    fn mock_undecodable_errors() {
        let backend = MockBackend::undecodable();
        let result = backend.decode(&SourceImage::new(vec![], "image/jpeg"));
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn source_from_path_declares_mime_from_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("Photo.PNG");
        std::fs::write(&path, b"bytes").unwrap();

        let source = SourceImage::from_path(&path).unwrap();
        assert_eq!(source.mime_type, "image/png");
        assert_eq!(source.filename.as_deref(), Some("Photo.PNG"));
        assert_eq!(source.len(), 5);
    }

    #[test]
    fn source_from_path_unknown_extension_is_octet_stream() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let source = SourceImage::from_path(&path).unwrap();
        assert_eq!(source.mime_type, "application/octet-stream");
    }

    #[test]
    fn unsupported_container_message() {
        assert_eq!(
            BackendError::UnsupportedContainer("Gif".into()).to_string(),
            "Unsupported image container: Gif"
        );
    }
}
