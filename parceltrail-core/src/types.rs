//! Core data model: parcels, scan events and messages

use crate::constants::{KIND_BOX, KIND_SACK};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Point in time attached to scans and messages
pub type Timestamp = DateTime<Utc>;

/// The two kinds of trackable shipment unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParcelKind {
    /// A single box
    Box,
    /// A sack grouping several items
    Sack,
}

impl ParcelKind {
    /// All kinds, in search order
    pub const ALL: [ParcelKind; 2] = [ParcelKind::Box, ParcelKind::Sack];

    /// Parse a payload segment (`box` / `sack`, ASCII case-insensitive)
    pub fn from_segment(segment: &str) -> Option<Self> {
        if segment.eq_ignore_ascii_case(KIND_BOX) {
            Some(ParcelKind::Box)
        } else if segment.eq_ignore_ascii_case(KIND_SACK) {
            Some(ParcelKind::Sack)
        } else {
            None
        }
    }

    /// Canonical segment name
    pub fn as_str(&self) -> &'static str {
        match self {
            ParcelKind::Box => KIND_BOX,
            ParcelKind::Sack => KIND_SACK,
        }
    }
}

impl fmt::Display for ParcelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a parcel: its kind plus an opaque id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParcelRef {
    /// Box or sack
    pub kind: ParcelKind,

    /// Opaque identifier assigned at registration
    pub id: String,
}

impl ParcelRef {
    /// Create a new parcel reference
    pub fn new(kind: ParcelKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for ParcelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// A status scan recorded by an operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    /// Upstream row identifier, when the store provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Parcel the scan belongs to
    pub parcel: ParcelRef,

    /// When the scan happened
    pub timestamp: Timestamp,

    /// Raw status string as entered upstream
    pub status: String,

    /// Where the scan happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Free-form operator note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Reference to a proof photo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,

    /// Delivery estimate given at scan time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<Timestamp>,
}

impl ScanEvent {
    /// Create a scan event with no optional details
    pub fn new(parcel: ParcelRef, timestamp: Timestamp, status: impl Into<String>) -> Self {
        Self {
            id: None,
            parcel,
            timestamp,
            status: status.into(),
            location: None,
            comment: None,
            photo_ref: None,
            estimated_delivery: None,
        }
    }

    /// Set the upstream identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the scan location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the operator comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the proof photo reference
    pub fn with_photo(mut self, photo_ref: impl Into<String>) -> Self {
        self.photo_ref = Some(photo_ref.into());
        self
    }

    /// Set the delivery estimate
    pub fn with_estimated_delivery(mut self, eta: Timestamp) -> Self {
        self.estimated_delivery = Some(eta);
        self
    }
}

/// Who sent or receives a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Parcel sender or recipient
    Customer,
    /// Warehouse or delivery staff
    Staff,
    /// Back-office administrator
    Admin,
    /// Automated notifications
    System,
}

/// How a message reached its recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    /// In-app chat
    Chat,
    /// E-mail notification
    Email,
    /// Text message
    Sms,
    /// Push notification
    Push,
}

/// A chat or notification message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Upstream row identifier, when the store provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Parcel the message concerns; `None` for general conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parcel: Option<ParcelRef>,

    /// Sender
    pub sender_role: Role,

    /// Recipient
    pub recipient_role: Role,

    /// Creation time
    pub timestamp: Timestamp,

    /// Message body
    pub content: String,

    /// Delivery channel
    pub channel: DeliveryChannel,
}

impl Message {
    /// Create a chat message between two roles
    pub fn new(
        sender_role: Role,
        recipient_role: Role,
        timestamp: Timestamp,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            parcel: None,
            sender_role,
            recipient_role,
            timestamp,
            content: content.into(),
            channel: DeliveryChannel::Chat,
        }
    }

    /// Set the upstream identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach the message to a parcel
    pub fn about(mut self, parcel: ParcelRef) -> Self {
        self.parcel = Some(parcel);
        self
    }

    /// Set the delivery channel
    pub fn via(mut self, channel: DeliveryChannel) -> Self {
        self.channel = channel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_segment() {
        assert_eq!(ParcelKind::from_segment("box"), Some(ParcelKind::Box));
        assert_eq!(ParcelKind::from_segment("SACK"), Some(ParcelKind::Sack));
        assert_eq!(ParcelKind::from_segment("crate"), None);
        assert_eq!(ParcelKind::from_segment(""), None);
    }

    #[test]
    fn test_parcel_ref_display() {
        let parcel = ParcelRef::new(ParcelKind::Sack, "S-0042");
        assert_eq!(parcel.to_string(), "sack/S-0042");
    }

    #[test]
    fn test_scan_event_json_shape() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let event = ScanEvent::new(ParcelRef::new(ParcelKind::Box, "B1"), at, "received")
            .with_location("Depot 3");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["parcel"]["kind"], "box");
        assert_eq!(json["location"], "Depot 3");
        assert!(json.get("comment").is_none());

        let back: ScanEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
