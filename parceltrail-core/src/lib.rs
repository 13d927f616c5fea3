//! # Parceltrail Core
//!
//! Parcel identification and lifecycle reconstruction for a parcel
//! tracking service.
//!
//! ## Modules
//!
//! - `constants`: Stage status tables and scanner defaults
//! - `types`: Core types (ParcelRef, ScanEvent, Message)
//! - `error`: Classified errors for scanning, resolution and store writes
//! - `scanner`: Camera decode loop with scoped stream ownership
//! - `resolver`: Decoded payload to parcel reference
//! - `lookup`: Identifier lookup with free-text fallback
//! - `stage`: Monotonic delivery stage derivation
//! - `trail`: Scan/message trail merging and milestone extraction
//! - `store`: External store contracts and an in-memory store

#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod lookup;
pub mod resolver;
pub mod scanner;
pub mod stage;
pub mod store;
pub mod trail;
pub mod types;

// Re-export commonly used types
pub use error::{CameraFault, ConfirmError, ResolveError, ScannerError, StoreError};
pub use stage::{DeliveryStage, StageStatus};
pub use trail::{InteractionRecord, Milestone, Trail};
pub use types::{Message, ParcelKind, ParcelRef, ScanEvent, Timestamp};

/// Result type alias for scanner operations
pub type Result<T> = core::result::Result<T, ScannerError>;
