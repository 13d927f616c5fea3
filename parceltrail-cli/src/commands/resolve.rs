use crate::commands::{load_store, write_json};
use anyhow::Result;
use parceltrail_core::{
    lookup::{lookup, Lookup},
    resolver::resolve,
    store::ParcelSummary,
    ParcelRef,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ResolveOutput {
    Parcel { parcel: ParcelRef },
    Found { summary: ParcelSummary },
    Candidates { matches: Vec<ParcelSummary> },
    Rejected { reason: String },
}

pub fn execute(payload: &str, store: Option<&str>, output: Option<&str>) -> Result<()> {
    info!("Resolving payload: {:?}", payload);

    let result = match store {
        None => match resolve(payload) {
            Ok(parcel) => ResolveOutput::Parcel { parcel },
            Err(e) => ResolveOutput::Rejected {
                reason: e.to_string(),
            },
        },
        Some(store_path) => {
            let store = load_store(store_path)?;
            match lookup(&store, payload) {
                Ok(Lookup::Found(summary)) => ResolveOutput::Found { summary },
                Ok(Lookup::Candidates(matches)) => ResolveOutput::Candidates { matches },
                Err(e) => ResolveOutput::Rejected {
                    reason: e.to_string(),
                },
            }
        }
    };

    match &result {
        ResolveOutput::Parcel { parcel } => println!("{} {}", parcel.kind, parcel.id),
        ResolveOutput::Found { summary } => {
            println!("{} ({})", summary.parcel, summary.status)
        }
        ResolveOutput::Candidates { matches } => {
            println!("Not an identifier; {} matching parcels", matches.len());
            for hit in matches {
                println!("  {} ({})", hit.parcel, hit.status);
            }
        }
        ResolveOutput::Rejected { reason } => println!("Rejected: {}", reason),
    }

    if let Some(output_path) = output {
        write_json(output_path, &result)?;
    }

    Ok(())
}
