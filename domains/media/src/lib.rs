//! League Media Domain
//!
//! Capture an image from the camera or photo library, upload it to object
//! storage and attach its public URL to a team shield or player photo.

pub mod capture;
pub mod domain;
pub mod error;
pub mod flow;
pub mod owner;
pub mod reader;
pub mod upload;

pub use capture::{CaptureSource, CapturedImage, ImageSource, MockCapture, MockImageSource};
pub use domain::state::{CaptureContext, CaptureEvent, CaptureState, CaptureStateMachine};
pub use error::{CaptureError, ReadError, UploadError};
pub use flow::CaptureFlow;
pub use owner::ImageOwner;
pub use upload::{ImageUploader, IMAGE_CONTENT_TYPE};
