use anyhow::Result;
use clap::{Parser, Subcommand};
use parceltrail_cli::commands;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "parceltrail")]
#[command(about = "Parceltrail - parcel scanning, delivery stages and interaction trails", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a decoded payload (or free text) to a parcel
    Resolve {
        /// Payload as decoded from a label, e.g. https://t.example/box/B-1001
        payload: String,

        /// Store file to look the parcel up in
        #[arg(short, long, env = "PARCELTRAIL_STORE")]
        store: Option<String>,

        /// Output JSON file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Replay a recorded camera session through the scanner
    Scan {
        /// Recorded capture session (JSON)
        #[arg(short, long)]
        input: String,

        /// Identifier to use if no frame decodes or the camera fails
        #[arg(long)]
        manual: Option<String>,

        /// Open this camera device instead of the preferred one
        #[arg(long)]
        device: Option<String>,

        /// Not a handheld device (no rear-camera preference)
        #[arg(long)]
        desktop: bool,

        /// Store file to look the parcel up in
        #[arg(short, long, env = "PARCELTRAIL_STORE")]
        store: Option<String>,

        /// Output JSON file for the scan report
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show the delivery stage of a parcel
    Stage {
        /// Parcel as kind/id
        parcel: String,

        /// Store file
        #[arg(short, long, env = "PARCELTRAIL_STORE")]
        store: String,

        /// Output JSON file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Merge scans and messages into an interaction trail
    Trail {
        /// Parcel as kind/id; omit for the global feed
        parcel: Option<String>,

        /// Store file
        #[arg(short, long, env = "PARCELTRAIL_STORE")]
        store: String,

        /// Output JSON file ("-" for stdout)
        #[arg(short, long, default_value = "-")]
        output: String,
    },

    /// Record a confirmed scan and update the parcel status
    Confirm {
        /// Parcel as kind/id
        parcel: String,

        /// New status, e.g. received, in_transit, delivered
        #[arg(long)]
        status: String,

        /// Store file
        #[arg(short, long, env = "PARCELTRAIL_STORE")]
        store: String,

        /// Scan time (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,

        /// Scan location
        #[arg(long)]
        location: Option<String>,

        /// Operator comment
        #[arg(long)]
        comment: Option<String>,

        /// Proof photo reference
        #[arg(long)]
        photo: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Resolve {
            payload,
            store,
            output,
        } => commands::resolve::execute(&payload, store.as_deref(), output.as_deref()),

        Commands::Scan {
            input,
            manual,
            device,
            desktop,
            store,
            output,
        } => commands::scan::execute(
            &input,
            manual.as_deref(),
            device.as_deref(),
            !desktop,
            store.as_deref(),
            output.as_deref(),
        ),

        Commands::Stage {
            parcel,
            store,
            output,
        } => commands::stage::execute(&store, &parcel, output.as_deref()),

        Commands::Trail {
            parcel,
            store,
            output,
        } => commands::trail::execute(&store, parcel.as_deref(), &output),

        Commands::Confirm {
            parcel,
            status,
            store,
            at,
            location,
            comment,
            photo,
        } => commands::confirm::execute(
            &store,
            &commands::confirm::ConfirmArgs {
                parcel: &parcel,
                status: &status,
                at: at.as_deref(),
                location: location.as_deref(),
                comment: comment.as_deref(),
                photo: photo.as_deref(),
            },
        ),
    }
}
