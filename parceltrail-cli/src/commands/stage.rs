use crate::commands::{load_store, parse_parcel, write_json};
use anyhow::Result;
use colored::Colorize;
use parceltrail_core::{
    stage::{compute, DeliveryStage},
    store::ParcelStore,
    ScanEvent, Timestamp,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Serialize, Deserialize)]
pub struct StageRow {
    pub stage: DeliveryStage,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<ScanEvent>,
}

#[derive(Serialize, Deserialize)]
pub struct StageOutput {
    pub parcel: String,
    pub current_stage: Option<DeliveryStage>,
    pub current_stage_index: i32,
    pub progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<Timestamp>,
    pub stages: Vec<StageRow>,
}

pub fn execute(store_path: &str, parcel: &str, output: Option<&str>) -> Result<()> {
    let parcel = parse_parcel(parcel)?;
    info!("Computing delivery stage for {}", parcel);

    let store = load_store(store_path)?;
    let history = store.fetch_scan_history(&parcel)?;
    info!("Fetched {} scan events", history.len());

    let status = compute(&history);

    let stages: Vec<StageRow> = DeliveryStage::ALL
        .into_iter()
        .map(|stage| StageRow {
            stage,
            completed: status.is_completed(stage),
            latest: status.latest_event(stage).cloned(),
        })
        .collect();

    let result = StageOutput {
        parcel: parcel.to_string(),
        current_stage: status.current_stage(),
        current_stage_index: status.current_stage_index(),
        progress_percent: status.progress_percent(),
        estimated_delivery: status.estimated_delivery(),
        stages,
    };

    println!("\n=== Delivery Progress: {} ===", result.parcel);
    for row in &result.stages {
        let mark = if row.completed {
            "✔".green()
        } else {
            "·".dimmed()
        };
        let detail = row
            .latest
            .as_ref()
            .map(|e| {
                let place = e.location.as_deref().unwrap_or("-");
                format!("{} @ {}", e.timestamp.to_rfc3339(), place)
            })
            .unwrap_or_default();
        println!("  {} {:<18} {}", mark, row.stage.label(), detail);
    }
    match result.current_stage {
        Some(stage) => println!("Current stage:  {} ({}%)", stage, result.progress_percent),
        None => println!("Current stage:  {}", "none yet".yellow()),
    }
    if let Some(eta) = result.estimated_delivery {
        println!("Estimated:      {}", eta.to_rfc3339());
    }

    if let Some(output_path) = output {
        write_json(output_path, &result)?;
        info!("Stage report written to: {}", output_path);
    }

    Ok(())
}
