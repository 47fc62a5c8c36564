use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use log_forwarder_engine::config::StorageConfig;
use log_forwarder_engine::pipeline::DecodeCapabilities;
use log_forwarder_engine::storage::{FileObject, StorageReader};

#[derive(Parser)]
#[command(name = "log-forwarder-engine", version, about = "Log forwarder decoding/shipping engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a (possibly gzipped) file through the full stream-decoding
    /// stack and print each emitted record's offsets (dev/validation tool)
    Decode {
        /// Path to the file to decode
        path: PathBuf,

        /// Byte offset into the decompressed stream to resume from
        #[arg(long, default_value = "0")]
        offset: u64,

        /// Treat the input as gzip-compressed
        #[arg(long)]
        gzip: bool,

        /// Print each record's decoded payload, not just its offsets
        #[arg(long)]
        dump_records: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("log_forwarder_engine=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Decode { path, offset, gzip, dump_records } => cmd_decode(&path, offset, gzip, dump_records),
    }
}

fn cmd_decode(path: &PathBuf, offset: u64, gzip: bool, dump_records: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let file_size = std::fs::metadata(path)?.len();

    let storage_config = StorageConfig::from_env();
    let mut capabilities = DecodeCapabilities::plain();
    capabilities.is_gzipped = gzip;
    capabilities.json_content_type = storage_config.json_content_type;

    let object = FileObject { path: path.clone(), is_gzipped: gzip };
    let records = object.get_by_lines(offset)?;

    let mut count = 0usize;
    for record in records {
        let record = record?;
        count += 1;
        if dump_records {
            println!("{}", record.payload_as_str().unwrap_or("<invalid utf-8>"));
        } else {
            tracing::debug!(
                starting_offset = record.starting_offset,
                ending_offset = record.ending_offset,
                "decoded record"
            );
        }
    }

    let elapsed = start.elapsed();
    eprintln!(
        "Decoded {} records from {} ({:.2} MB) in {:.3}s",
        count,
        path.display(),
        file_size as f64 / 1_048_576.0,
        elapsed.as_secs_f64()
    );

    Ok(())
}

