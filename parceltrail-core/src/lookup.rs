//! Scan-or-search parcel lookup

use crate::error::ResolveError;
use crate::resolver::resolve;
use crate::store::{ParcelStore, ParcelSummary};

#[cfg(feature = "logging")]
use tracing::debug;

/// Result of looking up operator input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The input was a well-formed identifier of a known parcel
    Found(ParcelSummary),

    /// The input was not an identifier; free-text matches across all kinds
    Candidates(Vec<ParcelSummary>),
}

/// Look up a decoded payload or typed text
///
/// Identifiers go straight to the store. Input that is not an identifier
/// falls back to a free-text search, so an operator can still find a parcel
/// whose label will not scan. A well-formed identifier the store does not
/// know is reported as [`ResolveError::NotFound`].
pub fn lookup<S>(store: &S, input: &str) -> Result<Lookup, ResolveError>
where
    S: ParcelStore + ?Sized,
{
    match resolve(input) {
        Ok(parcel) => match store.resolve_parcel(&parcel)? {
            Some(summary) => Ok(Lookup::Found(summary)),
            None => Err(ResolveError::NotFound(parcel)),
        },
        Err(ResolveError::MalformedIdentifier(_)) => {
            #[cfg(feature = "logging")]
            debug!("Input {:?} is not an identifier, searching", input);

            Ok(Lookup::Candidates(store.search_parcels(input)?))
        }
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{ParcelKind, ParcelRef};

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.register(ParcelRef::new(ParcelKind::Box, "B-1001"), "packed");
        store.register(ParcelRef::new(ParcelKind::Sack, "S-1001"), "packed");
        store
    }

    #[test]
    fn test_lookup_identifier() {
        let found = lookup(&store(), "https://t.example/box/B-1001").unwrap();
        match found {
            Lookup::Found(summary) => assert_eq!(summary.parcel.id, "B-1001"),
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_unknown_identifier() {
        assert_eq!(
            lookup(&store(), "box/B-9"),
            Err(ResolveError::NotFound(ParcelRef::new(ParcelKind::Box, "B-9")))
        );
    }

    #[test]
    fn test_lookup_falls_back_to_search() {
        match lookup(&store(), "1001").unwrap() {
            Lookup::Candidates(hits) => assert_eq!(hits.len(), 2),
            other => panic!("expected candidates, got {:?}", other),
        }
    }
}
