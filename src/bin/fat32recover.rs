//! Command-line front end over the library's scan/recover/probe API.

use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, Subcommand};

use fat32recover::device::BlockDevicePath;
use fat32recover::recovery::{recover, RecoveryReport};
use fat32recover::scanner::{scan_deleted, ScanOptions};
use fat32recover::{probe, Error};

#[derive(Parser)]
#[command(name = "fat32recover", about = "FAT32 deleted-file recovery engine")]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a device or image for deleted files.
    Scan {
        /// `L:`, a bare physical-drive index, or a `.vhd`/`.img`/`.bin` path
        path: String,
        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Recover one record's bytes to a file.
    Recover {
        path: String,
        /// Recover the i-th record from a fresh scan
        #[arg(long)]
        index: Option<usize>,
        /// Recover a single record described directly, without scanning
        #[arg(long)]
        cluster: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Identify the filesystem and locate its root directory / $MFT.
    Probe { path: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), Error> {
    match command {
        Command::Scan { path, json } => run_scan(&path, json),
        Command::Recover {
            path,
            index,
            cluster,
            size,
            out,
        } => run_recover(&path, index, cluster, size, &out),
        Command::Probe { path } => run_probe(&path),
    }
}

fn run_scan(path: &str, json: bool) -> Result<(), Error> {
    let device_path = BlockDevicePath::from_str(path)?;
    let records = scan_deleted(&device_path, ScanOptions::default());

    if json {
        let body = serde_json::to_string_pretty(&records)
            .expect("CatalogRecord serialization is infallible");
        println!("{body}");
        return Ok(());
    }

    println!("{:<6} {:<10} {:>10} {:<10} {}", "IDX", "CLUSTER", "SIZE", "TYPE", "PATH");
    for (i, record) in records.iter().enumerate() {
        println!(
            "{:<6} {:<10} {:>10} {:<10} {}",
            i,
            record.first_cluster,
            record.size,
            record.detected_type.as_deref().unwrap_or("-"),
            record.absolute_path,
        );
    }
    println!("{} deleted record(s) found", records.len());
    Ok(())
}

fn run_recover(
    path: &str,
    index: Option<usize>,
    cluster: Option<u32>,
    size: Option<u32>,
    out: &std::path::Path,
) -> Result<(), Error> {
    let device_path = BlockDevicePath::from_str(path)?;

    let record = if let (Some(cluster), Some(size)) = (cluster, size) {
        fat32recover::scanner::CatalogRecord {
            long_name: String::new(),
            short_name: String::new(),
            parent_path: String::new(),
            absolute_path: String::new(),
            is_directory: false,
            is_system: false,
            is_hidden: false,
            deleted: true,
            first_cluster: cluster,
            size,
            create_timestamp: None,
            modify_time: None,
            access_date: None,
            detected_type: None,
        }
    } else {
        let index = index.unwrap_or(0);
        let records = scan_deleted(&device_path, ScanOptions::default());
        records
            .into_iter()
            .nth(index)
            .unwrap_or_else(|| {
                eprintln!("no record at index {index}");
                std::process::exit(1);
            })
    };

    let report: RecoveryReport = recover(&device_path, &record, out)?;
    println!(
        "wrote {} / {} bytes ({:.1}%) to {}",
        report.bytes_written,
        report.bytes_needed,
        report.ratio * 100.0,
        report.output_path.display()
    );
    if !bool::from(&report) {
        println!("partial recovery: file may be fragmented or truncated at volume end");
    }
    Ok(())
}

fn run_probe(path: &str) -> Result<(), Error> {
    let device_path = BlockDevicePath::from_str(path)?;
    match probe::find_root_directory(&device_path) {
        Ok(description) => {
            println!("{description}");
            Ok(())
        }
        Err(err) => Err(err),
    }
}
