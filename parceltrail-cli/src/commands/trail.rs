use crate::commands::{load_store, parse_parcel, write_json};
use anyhow::Result;
use parceltrail_core::{
    store::ParcelStore,
    trail::{merge, merge_for, Milestone, Trail, TrailPayload, TrailStats},
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Serialize, Deserialize)]
struct TrailRecordJson {
    key: String,
    synthetic_key: bool,
    origin: String,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parcel: Option<String>,
    summary: String,
}

#[derive(Serialize)]
struct TrailOutput {
    records: Vec<TrailRecordJson>,
    milestones: Vec<Milestone>,
    stats: TrailStats,
}

pub fn execute(store_path: &str, parcel: Option<&str>, output: &str) -> Result<()> {
    let store = load_store(store_path)?;

    let trail = match parcel {
        Some(arg) => {
            let parcel = parse_parcel(arg)?;
            info!("Merging interaction trail for {}", parcel);
            let scans = store.fetch_scan_history(&parcel)?;
            let messages = store.fetch_messages(Some(&parcel))?;
            merge_for(&parcel, scans, messages)
        }
        None => {
            info!("Merging global interaction feed");
            let scans = store.fetch_all_scans()?;
            let messages = store.fetch_messages(None)?;
            merge(scans, messages)
        }
    };

    let output_obj = to_output(&trail);
    write_json(output, &output_obj)?;

    println!("\n=== Interaction Trail ===");
    println!("Records:         {}", output_obj.records.len());
    println!("Scans:           {}", output_obj.stats.scans);
    println!("Messages:        {}", output_obj.stats.messages);
    println!("Milestones:      {}", output_obj.milestones.len());
    println!("Generated keys:  {}", output_obj.stats.synthetic_keys);
    if output != "-" {
        println!("\nTrail written to: {}", output);
    }

    Ok(())
}

fn to_output(trail: &Trail) -> TrailOutput {
    let records = trail
        .records
        .iter()
        .map(|record| TrailRecordJson {
            key: record.key.clone(),
            synthetic_key: record.synthetic_key,
            origin: record.origin().to_string(),
            timestamp: record.timestamp.to_rfc3339(),
            parcel: record.payload.parcel().map(|p| p.to_string()),
            summary: match &record.payload {
                TrailPayload::Scan(scan) => match &scan.location {
                    Some(location) => format!("{} at {}", scan.status, location),
                    None => scan.status.clone(),
                },
                TrailPayload::Message(message) => format!(
                    "{:?} -> {:?}: {}",
                    message.sender_role, message.recipient_role, message.content
                ),
            },
        })
        .collect();

    TrailOutput {
        records,
        milestones: trail.milestones.clone(),
        stats: trail.stats(),
    }
}
