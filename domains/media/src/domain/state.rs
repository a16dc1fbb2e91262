//! Capture/upload state machine
//!
//! One instance per entity:
//! - `Idle` → `Capturing` on `StartCapture`
//! - `Capturing` loops on `Retake`, returns to `Idle` on `Cancel`, moves to
//!   `Uploading` on `Confirm` once an image is held
//! - `Uploading` → `Idle` on `UploadSucceeded`, → `Failed` on `UploadFailed`
//! - `Failed` → `Idle` on `Dismiss`

pub use league_common::StateError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
    Uploading,
    Failed,
}

impl CaptureState {
    pub fn valid_transitions(&self) -> &'static [CaptureState] {
        match self {
            Self::Idle => &[Self::Capturing],
            Self::Capturing => &[Self::Capturing, Self::Idle, Self::Uploading],
            Self::Uploading => &[Self::Idle, Self::Failed],
            Self::Failed => &[Self::Idle],
        }
    }

    /// An upload for this entity is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Uploading)
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Capturing => write!(f, "capturing"),
            Self::Uploading => write!(f, "uploading"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    StartCapture,
    Retake,
    Cancel,
    Confirm,
    UploadSucceeded,
    UploadFailed,
    Dismiss,
}

impl std::fmt::Display for CaptureEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StartCapture => write!(f, "start_capture"),
            Self::Retake => write!(f, "retake"),
            Self::Cancel => write!(f, "cancel"),
            Self::Confirm => write!(f, "confirm"),
            Self::UploadSucceeded => write!(f, "upload_succeeded"),
            Self::UploadFailed => write!(f, "upload_failed"),
            Self::Dismiss => write!(f, "dismiss"),
        }
    }
}

/// Guard inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureContext {
    pub has_image: bool,
}

pub struct CaptureStateMachine;

impl CaptureStateMachine {
    pub fn transition(
        current: CaptureState,
        event: CaptureEvent,
        ctx: &CaptureContext,
    ) -> Result<CaptureState, StateError> {
        let next = match (current, event) {
            (CaptureState::Idle, CaptureEvent::StartCapture) => CaptureState::Capturing,

            (CaptureState::Capturing, CaptureEvent::Retake) => CaptureState::Capturing,
            (CaptureState::Capturing, CaptureEvent::Cancel) => CaptureState::Idle,
            (CaptureState::Capturing, CaptureEvent::Confirm) => {
                if !ctx.has_image {
                    return Err(StateError::GuardFailed("no image captured".to_string()));
                }
                CaptureState::Uploading
            }

            (CaptureState::Uploading, CaptureEvent::UploadSucceeded) => CaptureState::Idle,
            (CaptureState::Uploading, CaptureEvent::UploadFailed) => CaptureState::Failed,

            (CaptureState::Failed, CaptureEvent::Dismiss) => CaptureState::Idle,

            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }

    pub fn can_transition(current: CaptureState, event: CaptureEvent, ctx: &CaptureContext) -> bool {
        Self::transition(current, event, ctx).is_ok()
    }
}
