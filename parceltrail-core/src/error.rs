//! Error types for parcel scanning, resolution and collaborator writes

use crate::types::ParcelRef;

/// Classified reasons a camera could not be acquired
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraFault {
    /// The operator (or platform policy) refused camera access
    #[error("Camera permission denied")]
    PermissionDenied,

    /// No camera hardware is present or the requested device is gone
    #[error("No camera device available")]
    NoDevice,

    /// The platform offers no camera API at all
    #[error("Camera access is not supported on this platform")]
    Unsupported,

    /// Anything the backend could not classify
    #[error("Camera error: {0}")]
    Unknown(String),
}

/// Errors reported by the code scanner to its caller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScannerError {
    /// `open` was called while a camera stream is still held
    #[error("Scanner already holds an open camera stream")]
    AlreadyOpen,

    /// The operation needs a live stream and there is none
    #[error("Scanner is not streaming")]
    NotStreaming,

    /// Manual entry was empty or whitespace only
    #[error("Manual entry is empty")]
    EmptyManualEntry,

    /// Camera acquisition failed; terminal for this session
    #[error(transparent)]
    Camera(#[from] CameraFault),
}

/// Errors turning a decoded payload into a parcel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Payload does not end in `<kind>/<id>`
    #[error("Malformed identifier: {0:?}")]
    MalformedIdentifier(String),

    /// Well-formed identifier that the store does not know
    #[error("Parcel {0} not found")]
    NotFound(ParcelRef),

    /// The store failed while looking the parcel up
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced by an external parcel store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The referenced parcel does not exist
    #[error("Parcel {0} not found")]
    NotFound(ParcelRef),

    /// The store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write
    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Outcome of the paired writes performed when an operator confirms a scan
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmError {
    /// Exactly one of the two writes landed; nothing was rolled back
    #[error(
        "Status update incomplete (event recorded: {recorded}, status updated: {status_updated}): {cause}"
    )]
    StatusUpdateIncomplete {
        /// Whether the scan event was recorded.
        recorded: bool,
        /// Whether the parcel status was updated.
        status_updated: bool,
        /// The error from the write that failed.
        cause: StoreError,
    },

    /// Neither write landed
    #[error("Scan confirmation failed: {0}")]
    Failed(StoreError),
}
