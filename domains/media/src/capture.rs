//! Image sources
//!
//! The device camera and photo library sit behind `ImageSource`; the flow
//! only sees a local URI or `None` when the user backs out.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::error::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureSource {
    Camera,
    Library,
}

impl std::fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::Library => write!(f, "photo library"),
        }
    }
}

/// A captured image not yet uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// `file://` URI, plain path, or `http(s)://` URL
    pub uri: String,
}

impl CapturedImage {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    /// Take or pick an image; `Ok(None)` when the user backs out
    async fn capture(&self, source: CaptureSource) -> Result<Option<CapturedImage>, CaptureError>;
}

/// Scripted outcome for the next capture
#[derive(Debug, Clone)]
pub enum MockCapture {
    Image(CapturedImage),
    Cancelled,
    Fail(CaptureError),
}

/// Image source that replays scripted outcomes in order.
///
/// When the script is exhausted every capture backs out.
#[derive(Debug, Default)]
pub struct MockImageSource {
    script: Mutex<VecDeque<MockCapture>>,
    requests: Mutex<Vec<CaptureSource>>,
    delay: Mutex<Duration>,
}

impl MockImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_image(&self, uri: impl Into<String>) -> &Self {
        self.push(MockCapture::Image(CapturedImage::new(uri)))
    }

    pub fn push_cancel(&self) -> &Self {
        self.push(MockCapture::Cancelled)
    }

    pub fn deny_permission(&self, source: CaptureSource) -> &Self {
        self.push(MockCapture::Fail(CaptureError::PermissionDenied(source)))
    }

    pub fn push(&self, outcome: MockCapture) -> &Self {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
        self
    }

    /// Time the user spends in the picker before each outcome
    pub fn set_delay(&self, delay: Duration) -> &Self {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
        self
    }

    /// Sources requested so far
    pub fn requests(&self) -> Vec<CaptureSource> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl ImageSource for MockImageSource {
    async fn capture(&self, source: CaptureSource) -> Result<Option<CapturedImage>, CaptureError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(source);

        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(MockCapture::Image(image)) => Ok(Some(image)),
            Some(MockCapture::Fail(err)) => Err(err),
            Some(MockCapture::Cancelled) | None => Ok(None),
        }
    }
}
