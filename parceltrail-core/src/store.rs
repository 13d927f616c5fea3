//! Contracts with the external parcel store, plus an in-memory implementation

use crate::error::{ConfirmError, StoreError};
use crate::types::{Message, ParcelRef, ScanEvent};
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Registration-side view of a parcel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelSummary {
    /// Identity
    pub parcel: ParcelRef,

    /// Last status written by `update_parcel_status`
    pub status: String,

    /// Recipient name, if registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Acknowledgement of a successful write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack;

/// Backing store holding parcels, scans and messages
///
/// Reads may return rows in any order and return an empty list, never an
/// error, when there is simply no history.
pub trait ParcelStore {
    /// All scan events of a parcel
    fn fetch_scan_history(&self, parcel: &ParcelRef) -> Result<Vec<ScanEvent>, StoreError>;

    /// Every scan event the store holds, across all parcels
    fn fetch_all_scans(&self) -> Result<Vec<ScanEvent>, StoreError>;

    /// Messages about a parcel, or the global feed when `parcel` is `None`
    fn fetch_messages(&self, parcel: Option<&ParcelRef>) -> Result<Vec<Message>, StoreError>;

    /// Look up a parcel; `Ok(None)` when it does not exist
    fn resolve_parcel(&self, parcel: &ParcelRef) -> Result<Option<ParcelSummary>, StoreError>;

    /// Free-text search across all parcel kinds
    fn search_parcels(&self, text: &str) -> Result<Vec<ParcelSummary>, StoreError>;

    /// Append a scan event
    fn record_scan_event(&mut self, event: &ScanEvent) -> Result<Ack, StoreError>;

    /// Overwrite the parcel's current status
    fn update_parcel_status(&mut self, parcel: &ParcelRef, status: &str)
        -> Result<Ack, StoreError>;
}

/// Record a confirmed scan and update the parcel status
///
/// Both writes are attempted independently; they are not atomic as a pair.
/// If only one lands the caller gets
/// [`ConfirmError::StatusUpdateIncomplete`] and must treat the parcel as
/// inconsistent; nothing is rolled back here.
pub fn confirm_scan<S>(store: &mut S, event: &ScanEvent) -> Result<(), ConfirmError>
where
    S: ParcelStore + ?Sized,
{
    let recorded = store.record_scan_event(event);
    let updated = store.update_parcel_status(&event.parcel, &event.status);

    match (recorded, updated) {
        (Ok(_), Ok(_)) => {
            #[cfg(feature = "logging")]
            debug!("Confirmed {} scan for {}", event.status, event.parcel);
            Ok(())
        }
        (Err(cause), Ok(_)) => {
            #[cfg(feature = "logging")]
            warn!("Status of {} updated but scan event not recorded: {}", event.parcel, cause);
            Err(ConfirmError::StatusUpdateIncomplete {
                recorded: false,
                status_updated: true,
                cause,
            })
        }
        (Ok(_), Err(cause)) => {
            #[cfg(feature = "logging")]
            warn!("Scan event for {} recorded but status not updated: {}", event.parcel, cause);
            Err(ConfirmError::StatusUpdateIncomplete {
                recorded: true,
                status_updated: false,
                cause,
            })
        }
        (Err(cause), Err(_)) => Err(ConfirmError::Failed(cause)),
    }
}

/// In-memory store, loadable from JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    /// Registered parcels
    #[serde(default)]
    pub parcels: Vec<ParcelSummary>,

    /// Scan events in insertion order
    #[serde(default)]
    pub scans: Vec<ScanEvent>,

    /// Messages in insertion order
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parcel with an initial status
    pub fn register(&mut self, parcel: ParcelRef, status: impl Into<String>) -> &mut ParcelSummary {
        self.parcels.push(ParcelSummary {
            parcel,
            status: status.into(),
            recipient: None,
            description: None,
        });
        let last = self.parcels.len() - 1;
        &mut self.parcels[last]
    }

    /// Append a message
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn summary_mut(&mut self, parcel: &ParcelRef) -> Option<&mut ParcelSummary> {
        self.parcels.iter_mut().find(|p| &p.parcel == parcel)
    }
}

impl ParcelStore for MemoryStore {
    fn fetch_scan_history(&self, parcel: &ParcelRef) -> Result<Vec<ScanEvent>, StoreError> {
        Ok(self
            .scans
            .iter()
            .filter(|s| &s.parcel == parcel)
            .cloned()
            .collect())
    }

    fn fetch_all_scans(&self) -> Result<Vec<ScanEvent>, StoreError> {
        Ok(self.scans.clone())
    }

    fn fetch_messages(&self, parcel: Option<&ParcelRef>) -> Result<Vec<Message>, StoreError> {
        Ok(match parcel {
            None => self.messages.clone(),
            Some(parcel) => self
                .messages
                .iter()
                .filter(|m| m.parcel.as_ref() == Some(parcel))
                .cloned()
                .collect(),
        })
    }

    fn resolve_parcel(&self, parcel: &ParcelRef) -> Result<Option<ParcelSummary>, StoreError> {
        Ok(self.parcels.iter().find(|p| &p.parcel == parcel).cloned())
    }

    fn search_parcels(&self, text: &str) -> Result<Vec<ParcelSummary>, StoreError> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let contains = |field: Option<&String>| {
            field.is_some_and(|value| value.to_lowercase().contains(&needle))
        };

        Ok(self
            .parcels
            .iter()
            .filter(|p| {
                p.parcel.id.to_lowercase().contains(&needle)
                    || contains(p.recipient.as_ref())
                    || contains(p.description.as_ref())
            })
            .cloned()
            .collect())
    }

    fn record_scan_event(&mut self, event: &ScanEvent) -> Result<Ack, StoreError> {
        if self.summary_mut(&event.parcel).is_none() {
            return Err(StoreError::NotFound(event.parcel.clone()));
        }
        self.scans.push(event.clone());
        Ok(Ack)
    }

    fn update_parcel_status(
        &mut self,
        parcel: &ParcelRef,
        status: &str,
    ) -> Result<Ack, StoreError> {
        let summary = self
            .summary_mut(parcel)
            .ok_or_else(|| StoreError::NotFound(parcel.clone()))?;
        summary.status = status.to_string();
        Ok(Ack)
    }
}
