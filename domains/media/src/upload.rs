//! Upload a captured image to object storage

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use league_backend::ObjectStorage;

use crate::error::UploadError;
use crate::reader::read_resource;

pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

pub struct ImageUploader {
    storage: Arc<dyn ObjectStorage>,
    http: reqwest::Client,
    last_stamp: AtomicI64,
}

impl std::fmt::Debug for ImageUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUploader").finish_non_exhaustive()
    }
}

impl ImageUploader {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            storage,
            http: reqwest::Client::new(),
            last_stamp: AtomicI64::new(0),
        }
    }

    /// `<nanos>.jpg`, strictly increasing within this uploader
    pub fn next_filename(&self) -> String {
        let now = Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_else(|| Utc::now().timestamp_micros() * 1_000);
        let previous = self
            .last_stamp
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        format!("{}.jpg", now.max(previous + 1))
    }

    /// Read the image at `uri`, store it in `bucket` and return its public URL
    pub async fn upload(&self, uri: &str, bucket: &str) -> Result<String, UploadError> {
        let bytes = read_resource(&self.http, uri).await.map_err(|e| {
            tracing::error!(uri, error = %e, "Failed to read image");
            e
        })?;

        let filename = self.next_filename();
        let size = bytes.len();
        self.storage
            .upload(bucket, &filename, bytes, IMAGE_CONTENT_TYPE)
            .await
            .map_err(|e| {
                tracing::error!(bucket, filename = %filename, error = %e, "Failed to upload image");
                e
            })?;

        let url = self.storage.public_url(bucket, &filename);
        tracing::info!(bucket, filename = %filename, size, "Image uploaded");
        Ok(url)
    }
}
