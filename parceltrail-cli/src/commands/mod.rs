//! Subcommand implementations and shared file helpers

pub mod confirm;
pub mod resolve;
pub mod scan;
pub mod stage;
pub mod trail;

use anyhow::{Context, Result};
use parceltrail_core::{resolver::resolve, store::MemoryStore, ParcelRef};
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};

/// Read a whole file, or stdin for `-`
pub fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read input file: {}", path))
    }
}

/// Load a JSON store file
pub fn load_store(path: &str) -> Result<MemoryStore> {
    let content = read_input(path)?;
    serde_json::from_str(&content).with_context(|| format!("Invalid store JSON in {}", path))
}

/// Write a store back to disk
pub fn save_store(path: &str, store: &MemoryStore) -> Result<()> {
    let json = serde_json::to_string_pretty(store).with_context(|| "Failed to serialize store")?;
    fs::write(path, json).with_context(|| format!("Failed to write store file: {}", path))
}

/// Write pretty JSON to a file, or stdout for `-`
pub fn write_json<T: Serialize>(output: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    if output == "-" {
        io::stdout().write_all(json.as_bytes())?;
        writeln!(io::stdout())?;
    } else {
        fs::write(output, json).with_context(|| format!("Failed to write output file: {}", output))?;
    }
    Ok(())
}

/// Parse a `kind/id` (or full tracking URL) argument
pub fn parse_parcel(arg: &str) -> Result<ParcelRef> {
    resolve(arg).with_context(|| format!("Not a parcel identifier: {}", arg))
}
