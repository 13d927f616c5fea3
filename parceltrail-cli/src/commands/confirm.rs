use crate::commands::{load_store, parse_parcel, save_store};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use parceltrail_core::{
    stage::stages_for_status,
    store::{confirm_scan, ParcelStore},
    ConfirmError, ScanEvent,
};
use tracing::{info, warn};

/// Details of an operator-confirmed scan
#[derive(Debug, Default)]
pub struct ConfirmArgs<'a> {
    pub parcel: &'a str,
    pub status: &'a str,
    pub at: Option<&'a str>,
    pub location: Option<&'a str>,
    pub comment: Option<&'a str>,
    pub photo: Option<&'a str>,
}

/// How far a confirmed scan got into the store
#[derive(Debug)]
pub enum Confirmation {
    /// Scan recorded and status updated
    Complete,
    /// Exactly one of the two writes landed
    Incomplete(ConfirmError),
}

pub fn execute(store_path: &str, args: &ConfirmArgs<'_>) -> Result<()> {
    let event = build_event(args)?;
    let mut store = load_store(store_path)?;

    match record(&mut store, &event)? {
        Confirmation::Complete => {
            save_store(store_path, &store)?;
            println!("Confirmed: {} is now {}", event.parcel, event.status);
            Ok(())
        }
        Confirmation::Incomplete(e) => {
            // One write landed; persist it so the store reflects what happened
            save_store(store_path, &store)?;
            bail!("{}; check {} manually", e, event.parcel)
        }
    }
}

/// Build the scan event described by the command arguments
pub fn build_event(args: &ConfirmArgs<'_>) -> Result<ScanEvent> {
    let parcel = parse_parcel(args.parcel)?;
    let timestamp = match args.at {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("Invalid --at timestamp: {}", raw))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    if stages_for_status(args.status).is_empty() {
        warn!(
            "Status {:?} matches no delivery stage; it will appear in the trail only",
            args.status
        );
    }

    let mut event = ScanEvent::new(parcel, timestamp, args.status);
    event.location = args.location.map(str::to_string);
    event.comment = args.comment.map(str::to_string);
    event.photo_ref = args.photo.map(str::to_string);
    Ok(event)
}

/// Write a confirmed scan to `store`.
///
/// Fails only when neither write landed; a partial write comes back as
/// [`Confirmation::Incomplete`] so the caller can still persist it.
pub fn record<S>(store: &mut S, event: &ScanEvent) -> Result<Confirmation>
where
    S: ParcelStore + ?Sized,
{
    match confirm_scan(store, event) {
        Ok(()) => {
            info!("Recorded {} scan for {}", event.status, event.parcel);
            Ok(Confirmation::Complete)
        }
        Err(e @ ConfirmError::StatusUpdateIncomplete { .. }) => {
            warn!("Partial write for {}: {}", event.parcel, e);
            Ok(Confirmation::Incomplete(e))
        }
        Err(e @ ConfirmError::Failed(_)) => Err(e.into()),
    }
}
