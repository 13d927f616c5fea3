//! Fuzzing entry points for parceltrail-core
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_resolve

use chrono::DateTime;
use parceltrail_core::{ParcelKind, ParcelRef, ScanEvent};

pub fn fuzz_resolve(data: &[u8]) {
    use parceltrail_core::resolver::resolve;

    // Resolve arbitrary text - should never panic
    let _ = resolve(&String::from_utf8_lossy(data));
}

/// Interpret bytes as (timestamp, status) pairs and run both engines
pub fn fuzz_history(data: &[u8]) {
    use parceltrail_core::{stage::compute, trail::merge};

    let parcel = ParcelRef::new(ParcelKind::Box, "fuzz");
    let history: Vec<ScanEvent> = data
        .chunks(8)
        .filter_map(|chunk| {
            let secs = i64::from(*chunk.first()?) * 3_600;
            let status = String::from_utf8_lossy(&chunk[1..]).into_owned();
            Some(ScanEvent::new(
                parcel.clone(),
                DateTime::from_timestamp(secs, 0)?,
                status,
            ))
        })
        .collect();

    // Neither engine may fail on malformed input
    let _ = compute(&history);
    let _ = merge(history, Vec::new());
}
