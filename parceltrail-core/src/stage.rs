//! Delivery stage derivation from an unordered scan history

use crate::constants::{
    normalize_status, DELIVERED_STATUSES, EXPECTING_STATUSES, IN_TRANSIT_STATUSES,
    OUT_FOR_DELIVERY_STATUSES, RECEIVED_STATUSES, STAGE_COUNT,
};
use crate::types::{ScanEvent, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "logging")]
use tracing::debug;

/// Ordered delivery stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStage {
    /// Registered, not yet handed over
    Expecting,
    /// Taken in at a depot
    Received,
    /// Moving between depots
    InTransit,
    /// On the courier's vehicle
    OutForDelivery,
    /// Handed to the recipient
    Delivered,
}

impl DeliveryStage {
    /// All stages in order
    pub const ALL: [DeliveryStage; STAGE_COUNT] = [
        DeliveryStage::Expecting,
        DeliveryStage::Received,
        DeliveryStage::InTransit,
        DeliveryStage::OutForDelivery,
        DeliveryStage::Delivered,
    ];

    /// Position in the stage order (0..=4)
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Stage at a position, if any
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Raw statuses belonging to this stage (already normalized)
    pub fn statuses(self) -> &'static [&'static str] {
        match self {
            DeliveryStage::Expecting => EXPECTING_STATUSES,
            DeliveryStage::Received => RECEIVED_STATUSES,
            DeliveryStage::InTransit => IN_TRANSIT_STATUSES,
            DeliveryStage::OutForDelivery => OUT_FOR_DELIVERY_STATUSES,
            DeliveryStage::Delivered => DELIVERED_STATUSES,
        }
    }

    /// Whether a raw status string satisfies this stage's predicate
    pub fn matches(self, status: &str) -> bool {
        let normalized = normalize_status(status);
        self.statuses().contains(&normalized.as_str())
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            DeliveryStage::Expecting => "Expecting",
            DeliveryStage::Received => "Received",
            DeliveryStage::InTransit => "In transit",
            DeliveryStage::OutForDelivery => "Out for delivery",
            DeliveryStage::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for DeliveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stages a raw status belongs to.
///
/// Usually zero or one; more than one only if the status tables overlap.
pub fn stages_for_status(status: &str) -> Vec<DeliveryStage> {
    let normalized = normalize_status(status);
    DeliveryStage::ALL
        .into_iter()
        .filter(|stage| stage.statuses().contains(&normalized.as_str()))
        .collect()
}

/// Whether a status belongs to no stage at all
pub fn is_unrecognized(status: &str) -> bool {
    stages_for_status(status).is_empty()
}

/// Derived progress of one parcel
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StageStatus {
    current: Option<DeliveryStage>,
    latest: BTreeMap<DeliveryStage, ScanEvent>,
    /// Event time and estimate of the newest scan carrying an estimate
    eta: Option<(Timestamp, Timestamp)>,
}

impl StageStatus {
    /// Highest stage reached, or `None` for an empty or unrecognized history
    pub fn current_stage(&self) -> Option<DeliveryStage> {
        self.current
    }

    /// Index of the highest stage reached, -1 when nothing has been reached
    pub fn current_stage_index(&self) -> i32 {
        self.current.map_or(-1, |stage| stage.index() as i32)
    }

    /// Whether any event in the history matched `stage`
    pub fn is_completed(&self, stage: DeliveryStage) -> bool {
        self.latest.contains_key(&stage)
    }

    /// Completed stages in stage order
    pub fn completed_stages(&self) -> Vec<DeliveryStage> {
        self.latest.keys().copied().collect()
    }

    /// Most recent event matching `stage`
    pub fn latest_event(&self, stage: DeliveryStage) -> Option<&ScanEvent> {
        self.latest.get(&stage)
    }

    /// Delivery estimate of the newest scan that carries one.
    ///
    /// Every event in the history counts, including ones with unrecognized
    /// statuses and ones superseded as a stage's latest event.
    pub fn estimated_delivery(&self) -> Option<Timestamp> {
        self.eta.map(|(_, eta)| eta)
    }

    /// Share of the stage track covered, 0..=100
    pub fn progress_percent(&self) -> u8 {
        match self.current {
            None => 0,
            Some(stage) => ((stage.index() * 100) / (STAGE_COUNT - 1)) as u8,
        }
    }
}

/// Compute the stage status of a parcel from its full scan history
///
/// This function:
/// 1. Tests every event against every stage predicate
/// 2. Marks a stage completed as soon as one event matches, whatever the order
/// 3. Keeps the most recent matching event per stage for detail display
/// 4. Takes the current stage as the highest completed one
///
/// The current stage never drops below the highest stage the history
/// reaches, even when the chronologically latest event matches an earlier
/// stage. Unrecognized statuses are skipped. An empty history yields no
/// current stage.
pub fn compute(history: &[ScanEvent]) -> StageStatus {
    let mut latest: BTreeMap<DeliveryStage, ScanEvent> = BTreeMap::new();
    let mut eta: Option<(Timestamp, Timestamp)> = None;
    #[cfg(feature = "logging")]
    let mut unrecognized = 0usize;

    for event in history {
        if let Some(estimate) = event.estimated_delivery {
            if eta.map_or(true, |(seen, _)| event.timestamp > seen) {
                eta = Some((event.timestamp, estimate));
            }
        }

        let stages = stages_for_status(&event.status);

        #[cfg(feature = "logging")]
        {
            if stages.is_empty() {
                unrecognized += 1;
                debug!("Ignoring unrecognized status {:?} for stage purposes", event.status);
            }
        }

        for stage in stages {
            let newer = latest
                .get(&stage)
                .map_or(true, |kept| event.timestamp > kept.timestamp);
            if newer {
                latest.insert(stage, event.clone());
            }
        }
    }

    let current = latest.keys().next_back().copied();

    #[cfg(feature = "logging")]
    debug!(
        "Stage computation: {} events, {} stages completed, {} unrecognized, current {:?}",
        history.len(),
        latest.len(),
        unrecognized,
        current
    );

    StageStatus {
        current,
        latest,
        eta,
    }
}
