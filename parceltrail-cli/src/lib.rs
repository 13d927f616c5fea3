//! Library entry for parceltrail-cli used by integration tests and embedding.

pub mod commands;
pub mod replay;

// Re-export commands for convenience
pub use commands::*;
