//! Decoded payload to parcel reference

use crate::constants::PAYLOAD_SEPARATOR;
use crate::error::ResolveError;
use crate::types::{ParcelKind, ParcelRef};

#[cfg(feature = "logging")]
use tracing::debug;

/// Parse a decoded payload into a [`ParcelRef`]
///
/// The payload is a `/`-delimited token sequence, typically a tracking URL
/// such as `https://track.example/box/B-1001`. The last segment is the
/// parcel id and the one before it names the kind (`box` or `sack`).
/// Surrounding whitespace is ignored. Anything else is rejected with
/// [`ResolveError::MalformedIdentifier`]; a caller may then rescan or fall
/// back to a free-text search.
pub fn resolve(payload: &str) -> Result<ParcelRef, ResolveError> {
    let trimmed = payload.trim();
    let malformed = || ResolveError::MalformedIdentifier(payload.to_string());

    let mut segments = trimmed.rsplit(PAYLOAD_SEPARATOR);
    let id = segments.next().filter(|s| !s.is_empty()).ok_or_else(malformed)?;
    let kind_segment = segments.next().ok_or_else(malformed)?;
    let kind = ParcelKind::from_segment(kind_segment).ok_or_else(malformed)?;

    #[cfg(feature = "logging")]
    debug!("Resolved payload {:?} to {}/{}", payload, kind, id);

    Ok(ParcelRef::new(kind, id))
}
