use crate::commands::{load_store, read_input, write_json};
use crate::replay::{has_rear_camera, RecordedSession, RefreshScheduler, ReplayCamera, TextDecoder};
use anyhow::{bail, Context, Result};
use parceltrail_core::{
    lookup::{lookup, Lookup},
    resolver::resolve,
    scanner::{CodeScanner, DecodeSource, Decoded, ScannerConfig, TickOutcome},
    store::ParcelSummary,
    ParcelRef, ScannerError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Serialize, Deserialize)]
pub struct ScanReport {
    pub payload: String,
    pub source: DecodeSource,
    pub frames_tried: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel: Option<ParcelRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<ParcelSummary>,
}

pub fn execute(
    session_path: &str,
    manual: Option<&str>,
    device: Option<&str>,
    handheld: bool,
    store: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    info!("Replaying capture session: {}", session_path);

    let content = read_input(session_path)?;
    let session: RecordedSession =
        serde_json::from_str(&content).with_context(|| "Invalid capture session JSON")?;
    let frame_count = session.frames.len();

    if handheld && !has_rear_camera(&session) {
        info!("No rear camera reported, using default camera");
    }

    let config = ScannerConfig {
        handheld,
        preferred_device: device.map(str::to_string),
        ..ScannerConfig::default()
    };
    let mut scanner = CodeScanner::new(
        ReplayCamera::new(session),
        TextDecoder,
        RefreshScheduler::default(),
        config,
    );

    let mut frames_tried = 0;
    let mut decoded: Option<Decoded> = None;

    match scanner.open() {
        Ok(()) => {
            while frames_tried < frame_count {
                let Some(tick) = scanner.pending_tick() else {
                    break;
                };
                frames_tried += 1;
                match scanner.tick(tick) {
                    TickOutcome::Decoded(found) => {
                        decoded = Some(found);
                        break;
                    }
                    TickOutcome::Continue => {}
                    TickOutcome::Stale => break,
                }
            }
            // No-op after a decode; otherwise stops the loop before any manual fallback
            scanner.close();
        }
        Err(ScannerError::Camera(fault)) => {
            warn!("Camera unavailable: {}", fault);
        }
        Err(e) => return Err(e.into()),
    }

    let decoded = match (decoded, manual) {
        (Some(decoded), _) => decoded,
        (None, Some(text)) => scanner
            .submit_manual(text)
            .with_context(|| "Manual entry rejected")?,
        (None, None) => bail!(
            "No code decoded after {} frames; rerun with --manual to type the identifier",
            frames_tried
        ),
    };

    info!("Decoded {:?} via {:?}", decoded.payload, decoded.source);

    let mut report = ScanReport {
        payload: decoded.payload.clone(),
        source: decoded.source,
        frames_tried,
        parcel: None,
        error: None,
        matches: Vec::new(),
    };

    match store {
        Some(store_path) => {
            let store = load_store(store_path)?;
            match lookup(&store, &decoded.payload) {
                Ok(Lookup::Found(summary)) => {
                    report.parcel = Some(summary.parcel.clone());
                    report.matches.push(summary);
                }
                Ok(Lookup::Candidates(hits)) => report.matches = hits,
                Err(e) => report.error = Some(e.to_string()),
            }
        }
        None => match resolve(&decoded.payload) {
            Ok(parcel) => report.parcel = Some(parcel),
            Err(e) => report.error = Some(e.to_string()),
        },
    }

    println!("\n=== Scan Result ===");
    println!("Payload:        {}", report.payload);
    println!("Source:         {:?}", report.source);
    println!("Frames tried:   {}", report.frames_tried);
    match (&report.parcel, &report.error) {
        (Some(parcel), _) => println!("Parcel:         {}", parcel),
        (None, Some(error)) => println!("Not resolved:   {}", error),
        (None, None) => {}
    }
    if report.parcel.is_none() && !report.matches.is_empty() {
        println!("Candidates:");
        for hit in &report.matches {
            println!("  {} ({})", hit.parcel, hit.status);
        }
    }

    if let Some(output_path) = output {
        write_json(output_path, &report)?;
        info!("Scan report written to: {}", output_path);
    }

    Ok(())
}
