//! Trackpack CLI - Command-line interface for the trip-recording codec
//!
//! Commands:
//! - inspect: Decode a recording and print a per-track summary
//! - export: Decode a recording and print the measurement as JSON

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use trackpack::{
    Decoder, LegacyDeserializer, Measurement, MeasurementIdentifier, MetaData, FORMAT_VERSION,
    LEGACY_FORMAT_VERSION, TRACKPACK_VERSION,
};

/// Trackpack - binary codec and track segmentation for trip recordings
#[derive(Parser)]
#[command(name = "trackpack")]
#[command(version = TRACKPACK_VERSION)]
#[command(about = "Decode binary trip recordings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a recording and print a per-track summary
    Inspect {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Decode a recording and print the measurement as JSON
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Recording file
    input: PathBuf,

    /// Input is not DEFLATE-compressed
    #[arg(long)]
    uncompressed: bool,

    /// Legacy version-1 event stream file; switches to the legacy decoder
    #[arg(long)]
    events: Option<PathBuf>,

    /// Device identifier recorded in the metadata
    #[arg(long, default_value = "unknown")]
    device_id: String,

    /// Measurement identifier recorded in the metadata
    #[arg(long, default_value = "0")]
    measurement_id: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Inspect { input } => decode(&input).map(|measurement| {
            print_summary(&measurement);
        }),
        Commands::Export { input, output } => decode(&input).and_then(|measurement| {
            let json = render_json(&measurement)?;
            match output {
                Some(path) => fs::write(path, json).map_err(|e| e.to_string()),
                None => {
                    println!("{json}");
                    Ok(())
                }
            }
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn decode(args: &InputArgs) -> Result<Measurement, String> {
    let data = fs::File::open(&args.input).map_err(|e| e.to_string())?;
    let metadata = make_metadata(args).map_err(|e| e.to_string())?;

    let measurement = match &args.events {
        Some(events_path) => {
            let events = fs::File::open(events_path).map_err(|e| e.to_string())?;
            LegacyDeserializer::new()
                .decode(metadata, data, events)
                .map_err(|e| e.to_string())?
        }
        None => {
            let decoder = if args.uncompressed {
                Decoder::uncompressed()
            } else {
                Decoder::compressed()
            };
            decoder.decode(metadata, data).map_err(|e| e.to_string())?
        }
    };
    Ok(measurement)
}

fn make_metadata(args: &InputArgs) -> Result<MetaData, trackpack::CodecError> {
    let format_version = if args.events.is_some() {
        LEGACY_FORMAT_VERSION
    } else {
        FORMAT_VERSION
    };
    MetaData::new(
        MeasurementIdentifier::new(args.device_id.clone(), args.measurement_id),
        "unknown",
        "unknown",
        TRACKPACK_VERSION,
        0.0,
        "cli",
        format_version,
        Utc::now(),
    )
}

fn render_json(measurement: &Measurement) -> Result<String, String> {
    // Pretty output for humans, compact for pipes
    if atty::is(atty::Stream::Stdout) {
        measurement.to_json().map_err(|e| e.to_string())
    } else {
        serde_json::to_string(measurement).map_err(|e| e.to_string())
    }
}

fn print_summary(measurement: &Measurement) {
    println!("measurement {}", measurement.metadata.identifier);
    println!("tracks: {}", measurement.tracks.len());
    for (index, track) in measurement.tracks.iter().enumerate() {
        let span = match (track.locations.first(), track.locations.last()) {
            (Some(first), Some(last)) => {
                format!("{}..{} ms", first.timestamp_ms, last.timestamp_ms)
            }
            _ => "no locations".to_string(),
        };
        println!(
            "  track {index}: {} locations ({span}), {} accelerations, {} rotations, {} directions",
            track.locations.len(),
            track.accelerations.len(),
            track.rotations.len(),
            track.directions.len(),
        );
    }
}
