//! Capture/upload flow for one screen
//!
//! Each entity id gets its own state machine. Entities upload independently;
//! a new capture for an entity whose upload is in flight is refused with
//! `UploadError::Busy`. On any failure the entity row is left as it was.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::capture::{CaptureSource, CapturedImage, ImageSource};
use crate::domain::state::{CaptureContext, CaptureEvent, CaptureState, CaptureStateMachine};
use crate::error::UploadError;
use crate::owner::ImageOwner;
use crate::upload::ImageUploader;
use league_common::StateError;

#[derive(Debug, Default)]
struct Entry {
    state: CaptureState,
    image: Option<CapturedImage>,
}

pub struct CaptureFlow {
    source: Arc<dyn ImageSource>,
    uploader: Arc<ImageUploader>,
    owner: Arc<dyn ImageOwner>,
    bucket: String,
    entries: Mutex<HashMap<i64, Entry>>,
}

impl std::fmt::Debug for CaptureFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureFlow")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl CaptureFlow {
    pub fn new(
        source: Arc<dyn ImageSource>,
        uploader: Arc<ImageUploader>,
        owner: Arc<dyn ImageOwner>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            source,
            uploader,
            owner,
            bucket: bucket.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn state(&self, entity_id: i64) -> CaptureState {
        self.lock()
            .get(&entity_id)
            .map(|e| e.state)
            .unwrap_or_default()
    }

    /// Image held for `entity_id` while capturing
    pub fn captured(&self, entity_id: i64) -> Option<CapturedImage> {
        self.lock().get(&entity_id).and_then(|e| e.image.clone())
    }

    /// Entity ids with an upload in flight
    pub fn uploading(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .lock()
            .iter()
            .filter(|(_, e)| e.state.is_busy())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn step(entity_id: i64, entry: &mut Entry, event: CaptureEvent) -> Result<(), UploadError> {
        let ctx = CaptureContext {
            has_image: entry.image.is_some(),
        };
        let next = CaptureStateMachine::transition(entry.state, event, &ctx).map_err(|e| {
            if entry.state.is_busy() && event == CaptureEvent::StartCapture {
                UploadError::Busy { entity_id }
            } else {
                UploadError::InvalidTransition(e)
            }
        })?;
        tracing::debug!(entity_id, from = %entry.state, to = %next, %event, "Capture transition");
        entry.state = next;
        Ok(())
    }

    fn apply(&self, entity_id: i64, event: CaptureEvent) -> Result<CaptureState, UploadError> {
        let mut entries = self.lock();
        let entry = entries.entry(entity_id).or_default();
        Self::step(entity_id, entry, event)?;
        let state = entry.state;
        if state == CaptureState::Idle {
            entries.remove(&entity_id);
        }
        Ok(state)
    }

    async fn acquire(
        &self,
        entity_id: i64,
        source: CaptureSource,
    ) -> Result<Option<CapturedImage>, UploadError> {
        let image = self.source.capture(source).await.map_err(|e| {
            tracing::warn!(entity_id, %source, error = %e, "Capture failed");
            UploadError::from(e)
        })?;
        let Some(image) = image else {
            return Ok(None);
        };
        match self.lock().get_mut(&entity_id) {
            Some(entry) => {
                entry.image = Some(image.clone());
                Ok(Some(image))
            }
            None => {
                tracing::debug!(entity_id, "Capture cancelled while the picker was open");
                Ok(None)
            }
        }
    }

    /// Back out of capturing unless the entry was already cancelled
    fn abandon(&self, entity_id: i64) -> Result<(), UploadError> {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(&entity_id) else {
            return Ok(());
        };
        Self::step(entity_id, entry, CaptureEvent::Cancel)?;
        if entry.state == CaptureState::Idle {
            entries.remove(&entity_id);
        }
        Ok(())
    }

    /// Open the camera or library for `entity_id`.
    ///
    /// Returns `Ok(None)` and goes back to idle when the user backs out or
    /// `cancel` runs before the picker returns.
    pub async fn start_capture(
        &self,
        entity_id: i64,
        source: CaptureSource,
    ) -> Result<Option<CapturedImage>, UploadError> {
        self.apply(entity_id, CaptureEvent::StartCapture)?;

        match self.acquire(entity_id, source).await {
            Ok(Some(image)) => Ok(Some(image)),
            Ok(None) => {
                self.abandon(entity_id)?;
                Ok(None)
            }
            Err(e) => {
                self.abandon(entity_id)?;
                Err(e)
            }
        }
    }

    /// Capture again; backing out keeps the previous image
    pub async fn retake(
        &self,
        entity_id: i64,
        source: CaptureSource,
    ) -> Result<Option<CapturedImage>, UploadError> {
        self.apply(entity_id, CaptureEvent::Retake)?;
        match self.acquire(entity_id, source).await? {
            Some(image) => Ok(Some(image)),
            None => Ok(self.captured(entity_id)),
        }
    }

    pub fn cancel(&self, entity_id: i64) -> Result<(), UploadError> {
        self.apply(entity_id, CaptureEvent::Cancel)?;
        Ok(())
    }

    /// Upload the held image and attach its URL to the entity
    pub async fn confirm(&self, entity_id: i64) -> Result<String, UploadError> {
        let image = {
            let mut entries = self.lock();
            let entry = entries.entry(entity_id).or_default();
            let result = Self::step(entity_id, entry, CaptureEvent::Confirm);
            let image = entry.image.take();
            if entry.state == CaptureState::Idle {
                entries.remove(&entity_id);
            }
            result?;
            image
        };
        let Some(image) = image else {
            return Err(StateError::GuardFailed("no image captured".to_string()).into());
        };

        tracing::info!(entity_id, bucket = %self.bucket, "Uploading image");
        let result = match self.uploader.upload(&image.uri, &self.bucket).await {
            Ok(url) => self
                .owner
                .attach_image(entity_id, &url)
                .await
                .map(|_| url)
                .map_err(|source| UploadError::Attach { entity_id, source }),
            Err(e) => Err(e),
        };

        match result {
            Ok(url) => {
                self.apply(entity_id, CaptureEvent::UploadSucceeded)?;
                tracing::info!(entity_id, url = %url, "Image attached");
                Ok(url)
            }
            Err(e) => {
                tracing::error!(entity_id, error = %e, "Image upload failed");
                self.apply(entity_id, CaptureEvent::UploadFailed)?;
                self.apply(entity_id, CaptureEvent::Dismiss)?;
                Err(e)
            }
        }
    }

    /// Capture then upload in one step; `Ok(None)` when the user backs out
    pub async fn capture_and_upload(
        &self,
        entity_id: i64,
        source: CaptureSource,
    ) -> Result<Option<String>, UploadError> {
        if self.start_capture(entity_id, source).await?.is_none() {
            return Ok(None);
        }
        self.confirm(entity_id).await.map(Some)
    }
}
