//! Interaction trail: scans and messages merged into one ordered view

use crate::constants::{SOURCE_KEY_SEPARATOR, SYNTHETIC_KEY_SEPARATOR};
use crate::stage::{is_unrecognized, DeliveryStage};
use crate::types::{Message, ParcelRef, ScanEvent, Timestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Which source a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// A status scan
    Scan,
    /// A chat or notification message
    Message,
}

impl Origin {
    /// Key prefix for this origin
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Scan => "scan",
            Origin::Message => "message",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The source row behind a trail record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum TrailPayload {
    /// Status scan
    Scan(ScanEvent),
    /// Chat or notification message
    Message(Message),
}

impl TrailPayload {
    /// Discriminant of this payload
    pub fn origin(&self) -> Origin {
        match self {
            TrailPayload::Scan(_) => Origin::Scan,
            TrailPayload::Message(_) => Origin::Message,
        }
    }

    /// When the underlying row was created
    pub fn timestamp(&self) -> Timestamp {
        match self {
            TrailPayload::Scan(scan) => scan.timestamp,
            TrailPayload::Message(message) => message.timestamp,
        }
    }

    /// Upstream identifier, if the source had one
    fn source_id(&self) -> Option<&str> {
        match self {
            TrailPayload::Scan(scan) => scan.id.as_deref(),
            TrailPayload::Message(message) => message.id.as_deref(),
        }
    }

    /// Parcel the row concerns
    pub fn parcel(&self) -> Option<&ParcelRef> {
        match self {
            TrailPayload::Scan(scan) => Some(&scan.parcel),
            TrailPayload::Message(message) => message.parcel.as_ref(),
        }
    }
}

/// One entry of the merged trail
///
/// `key` is unique within the merge that produced it. Keys built from
/// upstream ids (`scan:41`) survive refetches; generated keys (`scan#3`)
/// only hold for one merge and may change when the same data is merged again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Key for UI state within this merge
    pub key: String,

    /// Whether `key` was generated rather than taken from the source
    pub synthetic_key: bool,

    /// Ordering timestamp (scan time or message creation time)
    pub timestamp: Timestamp,

    /// The source row
    pub payload: TrailPayload,

    #[serde(skip)]
    seq: usize,
}

impl InteractionRecord {
    /// Which source this record came from
    pub fn origin(&self) -> Origin {
        self.payload.origin()
    }
}

/// Milestone categories, in delivery order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    /// First time the parcel was received
    FirstReceived,
    /// First time the parcel was in transit
    FirstInTransit,
    /// First time the parcel went out for delivery
    FirstOutForDelivery,
    /// First delivery
    FirstDelivered,
}

impl MilestoneKind {
    /// All categories in order
    pub const ALL: [MilestoneKind; 4] = [
        MilestoneKind::FirstReceived,
        MilestoneKind::FirstInTransit,
        MilestoneKind::FirstOutForDelivery,
        MilestoneKind::FirstDelivered,
    ];

    /// Stage whose predicate defines this category
    pub fn stage(self) -> DeliveryStage {
        match self {
            MilestoneKind::FirstReceived => DeliveryStage::Received,
            MilestoneKind::FirstInTransit => DeliveryStage::InTransit,
            MilestoneKind::FirstOutForDelivery => DeliveryStage::OutForDelivery,
            MilestoneKind::FirstDelivered => DeliveryStage::Delivered,
        }
    }
}

/// The earliest scan of a milestone category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Category
    pub kind: MilestoneKind,

    /// Time of the first matching scan
    pub timestamp: Timestamp,

    /// The matching scan
    pub event: ScanEvent,
}

/// Merged interaction trail
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trail {
    /// Records, newest first
    pub records: Vec<InteractionRecord>,

    /// Milestones in category order; categories with no scan are absent
    pub milestones: Vec<Milestone>,
}

/// Trail statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrailStats {
    /// Number of scan records
    pub scans: usize,

    /// Number of message records
    pub messages: usize,

    /// Scans whose status belongs to no stage
    pub unrecognized_statuses: usize,

    /// Records keyed with a generated key
    pub synthetic_keys: usize,
}

impl Trail {
    /// Get statistics about this trail
    pub fn stats(&self) -> TrailStats {
        let mut stats = TrailStats {
            scans: 0,
            messages: 0,
            unrecognized_statuses: 0,
            synthetic_keys: 0,
        };

        for record in &self.records {
            match &record.payload {
                TrailPayload::Scan(scan) => {
                    stats.scans += 1;
                    if is_unrecognized(&scan.status) {
                        stats.unrecognized_statuses += 1;
                    }
                }
                TrailPayload::Message(_) => stats.messages += 1,
            }
            if record.synthetic_key {
                stats.synthetic_keys += 1;
            }
        }

        stats
    }

    /// Look up a record by key
    pub fn record(&self, key: &str) -> Option<&InteractionRecord> {
        self.records.iter().find(|r| r.key == key)
    }
}

/// Merge scans and messages into one trail
///
/// This function:
/// 1. Tags every scan and message with its origin and timestamp
/// 2. Keys each record by its upstream id, or by `origin#n` when the id is
///    missing or already taken within this merge
/// 3. Sorts newest first; ties fall back to origin (scans first) and then
///    input position, so the same inputs always give the same order
/// 4. Extracts milestones from the scans
///
/// Both collections may arrive in any order and may be empty. Nothing here
/// fails: unknown statuses stay in the trail and just never form milestones.
pub fn merge(scans: Vec<ScanEvent>, messages: Vec<Message>) -> Trail {
    #[cfg(feature = "logging")]
    debug!(
        "Merging {} scans and {} messages into trail",
        scans.len(),
        messages.len()
    );

    let milestones = extract_milestones(&scans);

    let payloads = scans
        .into_iter()
        .map(TrailPayload::Scan)
        .chain(messages.into_iter().map(TrailPayload::Message));

    let mut taken: HashSet<String> = HashSet::new();
    let mut records: Vec<InteractionRecord> = payloads
        .enumerate()
        .map(|(seq, payload)| {
            let origin = payload.origin();
            let upstream = payload
                .source_id()
                .map(|id| format!("{}{}{}", origin, SOURCE_KEY_SEPARATOR, id))
                .filter(|key| !taken.contains(key));

            let (key, synthetic_key) = match upstream {
                Some(key) => (key, false),
                None => {
                    #[cfg(feature = "logging")]
                    {
                        if payload.source_id().is_some() {
                            warn!(
                                "Duplicate {} id {:?} in one merge, using generated key",
                                origin,
                                payload.source_id()
                            );
                        }
                    }
                    (format!("{}{}{}", origin, SYNTHETIC_KEY_SEPARATOR, seq), true)
                }
            };
            taken.insert(key.clone());

            InteractionRecord {
                key,
                synthetic_key,
                timestamp: payload.timestamp(),
                payload,
                seq,
            }
        })
        .collect();

    records.sort_by(newest_first);

    #[cfg(feature = "logging")]
    debug!(
        "Trail merge complete: {} records, {} milestones",
        records.len(),
        milestones.len()
    );

    Trail {
        records,
        milestones,
    }
}

/// Merge only the records concerning one parcel
///
/// Messages without a parcel belong to the global feed and are dropped.
pub fn merge_for(parcel: &ParcelRef, scans: Vec<ScanEvent>, messages: Vec<Message>) -> Trail {
    let scans = scans.into_iter().filter(|s| &s.parcel == parcel).collect();
    let messages = messages
        .into_iter()
        .filter(|m| m.parcel.as_ref() == Some(parcel))
        .collect();
    merge(scans, messages)
}

/// Earliest scan of each milestone category
///
/// Scans are ordered ascending by time and the first match per category
/// wins. Categories without a matching scan are omitted.
pub fn extract_milestones(scans: &[ScanEvent]) -> Vec<Milestone> {
    let mut ascending: Vec<&ScanEvent> = scans.iter().collect();
    // Stable sort keeps input order for equal timestamps
    ascending.sort_by_key(|scan| scan.timestamp);

    MilestoneKind::ALL
        .into_iter()
        .filter_map(|kind| {
            ascending
                .iter()
                .find(|scan| kind.stage().matches(&scan.status))
                .map(|scan| Milestone {
                    kind,
                    timestamp: scan.timestamp,
                    event: (*scan).clone(),
                })
        })
        .collect()
}

fn newest_first(a: &InteractionRecord, b: &InteractionRecord) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| a.origin().cmp(&b.origin()))
        .then_with(|| a.seq.cmp(&b.seq))
}
