//! Integration tests for the scan → resolve → fetch → stage/trail flow

use bytes::Bytes;
use chrono::DateTime;
use parceltrail_core::{
    lookup::{lookup, Lookup},
    resolver::resolve,
    scanner::{
        CameraDevice, CameraProvider, CameraRequest, CodeDecoder, CodeScanner, Facing, Frame,
        FrameScheduler, ScannerConfig, TickId, TickOutcome, VideoStream,
    },
    stage::{compute, DeliveryStage},
    store::{confirm_scan, MemoryStore, ParcelStore},
    trail::{merge_for, MilestoneKind},
    CameraFault, ParcelKind, ParcelRef, ResolveError, ScanEvent, ScannerError, Timestamp,
};
use parceltrail_core::{Message, types::Role};
use std::collections::VecDeque;
use std::time::Duration;

fn at(secs: i64) -> Timestamp {
    DateTime::from_timestamp(secs, 0).unwrap()
}

struct ScriptedStream(VecDeque<&'static str>);

impl VideoStream for ScriptedStream {
    fn capture(&mut self) -> Option<Frame> {
        self.0
            .pop_front()
            .map(|text| Frame::new(64, 64, Bytes::from(text)))
    }

    fn stop(&mut self) {}
}

struct ScriptedCamera(Vec<&'static str>);

impl CameraProvider for ScriptedCamera {
    type Stream = ScriptedStream;

    fn open(&mut self, _: &CameraRequest) -> Result<ScriptedStream, CameraFault> {
        if self.0.is_empty() {
            return Err(CameraFault::NoDevice);
        }
        Ok(ScriptedStream(self.0.iter().copied().collect()))
    }

    fn devices(&self) -> Vec<CameraDevice> {
        vec![CameraDevice {
            id: "cam0".into(),
            label: "Rear".into(),
            facing: Facing::Environment,
        }]
    }
}

/// Treats any frame starting with `QR:` as carrying the rest as payload
struct PrefixDecoder;

impl CodeDecoder for PrefixDecoder {
    fn decode(&mut self, frame: &Frame) -> Option<String> {
        let text = std::str::from_utf8(&frame.data).ok()?;
        text.strip_prefix("QR:").map(str::to_string)
    }
}

#[derive(Default)]
struct QueueScheduler {
    next: u64,
    queue: VecDeque<TickId>,
}

impl FrameScheduler for QueueScheduler {
    fn schedule(&mut self) -> TickId {
        self.next += 1;
        self.queue.push_back(TickId(self.next));
        TickId(self.next)
    }

    fn cancel(&mut self, tick: TickId) {
        self.queue.retain(|t| *t != tick);
    }
}

fn quick_config() -> ScannerConfig {
    ScannerConfig {
        settle_delay: Duration::ZERO,
        ..ScannerConfig::default()
    }
}

fn seeded_store() -> (MemoryStore, ParcelRef) {
    let parcel = ParcelRef::new(ParcelKind::Box, "B-1001");
    let mut store = MemoryStore::new();
    store.register(parcel.clone(), "packed");
    store.scans = vec![
        ScanEvent::new(parcel.clone(), at(10), "packed"),
        ScanEvent::new(parcel.clone(), at(40), "delivered").with_location("Front door"),
        ScanEvent::new(parcel.clone(), at(20), "in_transit"),
    ];
    store.push_message(
        Message::new(Role::Customer, Role::Staff, at(30), "Is it arriving today?")
            .about(parcel.clone()),
    );
    (store, parcel)
}

#[test]
fn test_full_workflow_camera_to_trail() {
    let (store, parcel) = seeded_store();

    // Step 1: Scan until a frame decodes
    let camera = ScriptedCamera(vec!["noise", "blur", "QR:https://track.example/box/B-1001"]);
    let mut scanner = CodeScanner::new(camera, PrefixDecoder, QueueScheduler::default(), quick_config());
    scanner.open().unwrap();

    let mut ticks = 0;
    let decoded = loop {
        let tick = scanner.pending_tick().expect("decode loop stalled");
        ticks += 1;
        match scanner.tick(tick) {
            TickOutcome::Decoded(decoded) => break decoded,
            TickOutcome::Continue => continue,
            TickOutcome::Stale => panic!("pending tick reported stale"),
        }
    };
    assert_eq!(ticks, 3);
    assert_eq!(scanner.pending_tick(), None);

    // Step 2: Resolve to a parcel
    let resolved = resolve(&decoded.payload).unwrap();
    assert_eq!(resolved, parcel);

    // Step 3: Fetch and derive progress
    let history = store.fetch_scan_history(&resolved).unwrap();
    let status = compute(&history);
    assert_eq!(status.current_stage_index(), 4);
    assert_eq!(
        status.completed_stages(),
        vec![
            DeliveryStage::Expecting,
            DeliveryStage::InTransit,
            DeliveryStage::Delivered
        ]
    );
    assert!(!status.is_completed(DeliveryStage::Received));
    assert_eq!(
        status
            .latest_event(DeliveryStage::Delivered)
            .and_then(|e| e.location.as_deref()),
        Some("Front door")
    );

    // Step 4: Merge the interaction trail
    let messages = store.fetch_messages(Some(&resolved)).unwrap();
    let trail = merge_for(&resolved, history, messages);
    let times: Vec<_> = trail.records.iter().map(|r| r.timestamp).collect();
    assert_eq!(times, vec![at(40), at(30), at(20), at(10)]);

    let milestones: Vec<_> = trail
        .milestones
        .iter()
        .map(|m| (m.kind, m.timestamp))
        .collect();
    assert_eq!(
        milestones,
        vec![
            (MilestoneKind::FirstInTransit, at(20)),
            (MilestoneKind::FirstDelivered, at(40)),
        ]
    );
}

#[test]
fn test_missing_camera_falls_back_to_manual_lookup() {
    let (store, parcel) = seeded_store();

    let mut scanner = CodeScanner::new(
        ScriptedCamera(Vec::new()),
        PrefixDecoder,
        QueueScheduler::default(),
        quick_config(),
    );
    assert_eq!(
        scanner.open(),
        Err(ScannerError::Camera(CameraFault::NoDevice))
    );

    let typed = scanner.submit_manual("B-1001").unwrap();
    assert_eq!(
        resolve(&typed.payload),
        Err(ResolveError::MalformedIdentifier("B-1001".into()))
    );

    match lookup(&store, &typed.payload).unwrap() {
        Lookup::Candidates(hits) => {
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].parcel, parcel);
        }
        other => panic!("expected candidates, got {:?}", other),
    }
}

#[test]
fn test_confirmed_scan_appears_in_next_fetch() {
    let (mut store, parcel) = seeded_store();

    let before = compute(&store.fetch_scan_history(&parcel).unwrap());
    confirm_scan(
        &mut store,
        &ScanEvent::new(parcel.clone(), at(50), "received").with_comment("returned to depot"),
    )
    .unwrap();
    let after = compute(&store.fetch_scan_history(&parcel).unwrap());

    // A late "received" scan completes the stage but never lowers progress
    assert!(after.is_completed(DeliveryStage::Received));
    assert_eq!(after.current_stage(), before.current_stage());
    assert_eq!(
        store.resolve_parcel(&parcel).unwrap().unwrap().status,
        "received"
    );
}

#[test]
fn test_milestones_for_full_journey() {
    let parcel = ParcelRef::new(ParcelKind::Sack, "S-7");
    let scans = vec![
        ScanEvent::new(parcel.clone(), at(4), "delivered"),
        ScanEvent::new(parcel.clone(), at(1), "received"),
        ScanEvent::new(parcel.clone(), at(3), "out_for_delivery"),
        ScanEvent::new(parcel.clone(), at(2), "in_transit"),
    ];

    let trail = merge_for(&parcel, scans, Vec::new());
    let kinds: Vec<_> = trail.milestones.iter().map(|m| m.kind).collect();
    assert_eq!(kinds, MilestoneKind::ALL.to_vec());
    let times: Vec<_> = trail.milestones.iter().map(|m| m.timestamp).collect();
    assert_eq!(times, vec![at(1), at(2), at(3), at(4)]);
}

#[test]
fn test_packed_scan_forms_no_milestone() {
    let parcel = ParcelRef::new(ParcelKind::Box, "B-2");
    let scans = vec![
        ScanEvent::new(parcel.clone(), at(1), "packed"),
        ScanEvent::new(parcel.clone(), at(2), "received"),
        ScanEvent::new(parcel.clone(), at(3), "in_transit"),
        ScanEvent::new(parcel.clone(), at(4), "delivered"),
    ];

    let trail = merge_for(&parcel, scans, Vec::new());
    let milestones: Vec<_> = trail
        .milestones
        .iter()
        .map(|m| (m.kind, m.timestamp))
        .collect();
    assert_eq!(
        milestones,
        vec![
            (MilestoneKind::FirstReceived, at(2)),
            (MilestoneKind::FirstInTransit, at(3)),
            (MilestoneKind::FirstDelivered, at(4)),
        ]
    );
}
