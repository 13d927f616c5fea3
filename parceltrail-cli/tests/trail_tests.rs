use std::fs;
use tempfile::tempdir;

use chrono::DateTime;
use parceltrail_cli::commands::{confirm, save_store, stage, trail};
use parceltrail_core::{
    store::{Ack, MemoryStore, ParcelStore, ParcelSummary},
    types::Role,
    ConfirmError, Message, ParcelKind, ParcelRef, ScanEvent, StoreError, Timestamp,
};
use serde_json::Value;

fn at(secs: i64) -> Timestamp {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn parcel() -> ParcelRef {
    ParcelRef::new(ParcelKind::Box, "B-1001")
}

/// Helper: store with an out-of-order history and a few messages
fn write_store(dir: &std::path::Path) -> String {
    let mut store = MemoryStore::new();
    store.register(parcel(), "delivered");
    store.register(ParcelRef::new(ParcelKind::Sack, "S-1"), "packed");
    store.scans = vec![
        ScanEvent::new(parcel(), at(10), "packed").with_id("1"),
        ScanEvent::new(parcel(), at(40), "delivered")
            .with_id("3")
            .with_location("Front door"),
        ScanEvent::new(parcel(), at(20), "in_transit"),
        ScanEvent::new(ParcelRef::new(ParcelKind::Sack, "S-1"), at(15), "packed"),
    ];
    store.push_message(
        Message::new(Role::Customer, Role::Staff, at(30), "Any update?").about(parcel()),
    );
    store.push_message(Message::new(Role::Admin, Role::Staff, at(5), "Depot closed Sunday"));

    let path = dir.join("store.json");
    fs::write(&path, serde_json::to_string_pretty(&store).unwrap()).unwrap();
    path.to_str().unwrap().to_string()
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_trail_for_parcel() {
    let td = tempdir().unwrap();
    let store = write_store(td.path());
    let output = td.path().join("trail.json");

    trail::execute(&store, Some("box/B-1001"), output.to_str().unwrap()).unwrap();

    let out = read_json(&output);
    let records = out["records"].as_array().unwrap();
    assert_eq!(records.len(), 4);

    let keys: Vec<_> = records.iter().map(|r| r["key"].as_str().unwrap()).collect();
    assert_eq!(keys, vec!["scan:3", "message#3", "scan#2", "scan:1"]);

    let milestones = out["milestones"].as_array().unwrap();
    assert_eq!(milestones.len(), 2);
    assert_eq!(milestones[0]["kind"], "first_in_transit");
    assert_eq!(milestones[1]["kind"], "first_delivered");

    assert_eq!(out["stats"]["scans"], 3);
    assert_eq!(out["stats"]["messages"], 1);
    assert_eq!(out["stats"]["synthetic_keys"], 2);
}

#[test]
fn test_trail_global_feed() {
    let td = tempdir().unwrap();
    let store = write_store(td.path());
    let output = td.path().join("feed.json");

    trail::execute(&store, None, output.to_str().unwrap()).unwrap();

    let out = read_json(&output);
    assert_eq!(out["records"].as_array().unwrap().len(), 6);
    assert_eq!(out["stats"]["messages"], 2);
    assert_eq!(out["stats"]["scans"], 4);
}

#[test]
fn test_stage_report() {
    let td = tempdir().unwrap();
    let store = write_store(td.path());
    let output = td.path().join("stage.json");

    stage::execute(&store, "box/B-1001", Some(output.to_str().unwrap())).unwrap();

    let out = read_json(&output);
    assert_eq!(out["current_stage"], "delivered");
    assert_eq!(out["current_stage_index"], 4);
    assert_eq!(out["progress_percent"], 100);

    let completed: Vec<_> = out["stages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["completed"].as_bool().unwrap())
        .collect();
    assert_eq!(completed, vec![true, false, true, false, true]);
    assert_eq!(out["stages"][4]["latest"]["location"], "Front door");
}

#[test]
fn test_stage_for_parcel_without_history() {
    let td = tempdir().unwrap();
    let store = write_store(td.path());
    let output = td.path().join("stage.json");

    stage::execute(&store, "box/NEW-1", Some(output.to_str().unwrap())).unwrap();

    let out = read_json(&output);
    assert!(out["current_stage"].is_null());
    assert_eq!(out["current_stage_index"], -1);
}

#[test]
fn test_confirm_then_stage() {
    let td = tempdir().unwrap();
    let store = write_store(td.path());

    confirm::execute(
        &store,
        &confirm::ConfirmArgs {
            parcel: "sack/S-1",
            status: "Out for delivery",
            at: Some("2024-05-01T09:30:00Z"),
            location: Some("Van 12"),
            ..Default::default()
        },
    )
    .unwrap();

    let saved: MemoryStore = serde_json::from_str(&fs::read_to_string(&store).unwrap()).unwrap();
    let summary = saved
        .parcels
        .iter()
        .find(|p| p.parcel.id == "S-1")
        .unwrap();
    assert_eq!(summary.status, "Out for delivery");
    assert_eq!(saved.scans.len(), 5);

    let output = td.path().join("stage.json");
    stage::execute(&store, "sack/S-1", Some(output.to_str().unwrap())).unwrap();
    let out = read_json(&output);
    assert_eq!(out["current_stage"], "out_for_delivery");
}

#[test]
fn test_confirm_unknown_parcel_fails_without_writing() {
    let td = tempdir().unwrap();
    let store = write_store(td.path());
    let before = fs::read_to_string(&store).unwrap();

    let err = confirm::execute(
        &store,
        &confirm::ConfirmArgs {
            parcel: "box/GHOST",
            status: "received",
            ..Default::default()
        },
    )
    .unwrap_err();

    assert!(err.to_string().contains("Scan confirmation failed"));
    assert_eq!(fs::read_to_string(&store).unwrap(), before);
}

/// Store whose status service is down while scan writes still land
struct StatusServiceDown(MemoryStore);

impl ParcelStore for StatusServiceDown {
    fn fetch_scan_history(&self, parcel: &ParcelRef) -> Result<Vec<ScanEvent>, StoreError> {
        self.0.fetch_scan_history(parcel)
    }

    fn fetch_all_scans(&self) -> Result<Vec<ScanEvent>, StoreError> {
        self.0.fetch_all_scans()
    }

    fn fetch_messages(&self, parcel: Option<&ParcelRef>) -> Result<Vec<Message>, StoreError> {
        self.0.fetch_messages(parcel)
    }

    fn resolve_parcel(&self, parcel: &ParcelRef) -> Result<Option<ParcelSummary>, StoreError> {
        self.0.resolve_parcel(parcel)
    }

    fn search_parcels(&self, text: &str) -> Result<Vec<ParcelSummary>, StoreError> {
        self.0.search_parcels(text)
    }

    fn record_scan_event(&mut self, event: &ScanEvent) -> Result<Ack, StoreError> {
        self.0.record_scan_event(event)
    }

    fn update_parcel_status(&mut self, _: &ParcelRef, _: &str) -> Result<Ack, StoreError> {
        Err(StoreError::Unavailable("status service down".into()))
    }
}

#[test]
fn test_confirm_keeps_landed_write_when_status_update_fails() {
    let td = tempdir().unwrap();
    let path = write_store(td.path());
    let loaded: MemoryStore = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let mut store = StatusServiceDown(loaded);

    let event = confirm::build_event(&confirm::ConfirmArgs {
        parcel: "sack/S-1",
        status: "received",
        at: Some("2024-05-01T09:30:00Z"),
        ..Default::default()
    })
    .unwrap();

    match confirm::record(&mut store, &event).unwrap() {
        confirm::Confirmation::Incomplete(ConfirmError::StatusUpdateIncomplete {
            recorded,
            status_updated,
            ..
        }) => {
            assert!(recorded);
            assert!(!status_updated);
        }
        other => panic!("unexpected confirmation {:?}", other),
    }

    save_store(&path, &store.0).unwrap();
    let saved: MemoryStore = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved.scans.len(), 5);
    assert_eq!(saved.scans.last().map(|s| s.status.as_str()), Some("received"));
    let summary = saved
        .parcels
        .iter()
        .find(|p| p.parcel.id == "S-1")
        .unwrap();
    assert_eq!(summary.status, "packed");
}

#[test]
fn test_confirm_record_fails_when_nothing_lands() {
    let mut store = StatusServiceDown(MemoryStore::new());
    let event = ScanEvent::new(parcel(), at(10), "received");

    let err = confirm::record(&mut store, &event).unwrap_err();
    assert!(err.to_string().contains("Scan confirmation failed"));
    assert!(store.0.scans.is_empty());
}
