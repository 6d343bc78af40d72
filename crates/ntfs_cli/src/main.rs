//! Thin demonstration CLI over `ntfs_core`: scan an image, list the
//! rebuilt tree, or extract recovered files.
//!
//! This crate is intentionally a thin shell (spec.md §1's "out of scope":
//! "the interactive command surface ... human-readable formatting"): the
//! reconstruction logic all lives in `ntfs_core`; this binary only wires a
//! `BlockSource` to it and prints what comes back.

mod device_discovery;
mod scan_engine;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ntfs_core::{restore, FileIndex, Partition, ScanConfig};

use device_discovery::discover_disks;

#[derive(Parser, Debug)]
#[command(name = "ntfs_cli")]
#[command(author, version, about = "NTFS forensic reconstruction over a raw image", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List block devices visible under /sys/block (informational only).
    Devices,
    /// Scan an image/device and print the partitions that were rebuilt.
    Scan {
        image: PathBuf,
        /// Let ntfs_core parallelize Step E geometry inference across cores.
        #[arg(long, default_value_t = true)]
        parallel: bool,
        /// Cap, in sectors, on any single content read.
        #[arg(long)]
        max_sectors: Option<u64>,
    },
    /// List the rebuilt directory tree of one partition, or search it.
    Ls {
        image: PathBuf,
        /// Byte offset (sector index) of the partition, as printed by `scan`.
        #[arg(long)]
        partition: u64,
        /// Case-insensitive substring filter over full paths.
        #[arg(long)]
        find: Option<String>,
    },
    /// Restore one file or an entire partition's tree to disk.
    Extract {
        image: PathBuf,
        #[arg(long)]
        partition: u64,
        /// Full path (case-insensitive substring) of a single file to
        /// extract. Omit to restore the whole tree.
        #[arg(long)]
        path: Option<String>,
        #[arg(short, long, default_value = "./recovered")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Devices => run_devices(),
        Command::Scan {
            image,
            parallel,
            max_sectors,
        } => run_scan_command(&image, parallel, max_sectors),
        Command::Ls {
            image,
            partition,
            find,
        } => run_ls(&image, partition, find.as_deref()),
        Command::Extract {
            image,
            partition,
            path,
            output,
        } => run_extract(&image, partition, path.as_deref(), &output),
    }
}

fn run_devices() -> Result<()> {
    let disks = discover_disks().context("failed to discover disk devices")?;
    if disks.is_empty() {
        println!("No block devices found under /sys/block.");
        return Ok(());
    }
    println!("{:<12} {:<15} {:>12} PATH", "NAME", "TYPE", "SIZE");
    println!("{}", "-".repeat(55));
    for disk in &disks {
        println!(
            "{:<12} {:<15} {:>12} {}",
            disk.name,
            disk.device_type,
            disk.human_size(),
            disk.path
        );
    }
    Ok(())
}

fn scan_config(parallel: bool, max_sectors: Option<u64>) -> ScanConfig {
    let mut config = ScanConfig {
        parallel,
        ..ScanConfig::default()
    };
    if let Some(max_sectors) = max_sectors {
        config.max_sectors = max_sectors;
    }
    config
}

fn run_scan_command(image: &PathBuf, parallel: bool, max_sectors: Option<u64>) -> Result<()> {
    let config = scan_config(parallel, max_sectors);
    scan_engine::run_scan(image, &config)?;
    Ok(())
}

fn find_partition(image: &PathBuf, partition: u64, config: &ScanConfig) -> Result<(Box<dyn ntfs_core::BlockSource>, Partition)> {
    let (reader, outcome) = scan_engine::run_scan(image, config)?;
    let mut partitions = outcome.partitions;
    let part = partitions
        .remove(&partition)
        .with_context(|| format!("no partition rebuilt at offset {partition} (see `scan` output)"))?;
    Ok((reader, part))
}

fn run_ls(image: &PathBuf, partition: u64, find: Option<&str>) -> Result<()> {
    let config = ScanConfig::default();
    let (_reader, part) = find_partition(image, partition, &config)?;

    if let Some(needle) = find {
        let hits = restore::locate(&part, needle);
        if hits.is_empty() {
            println!("No matches for {needle:?}.");
        }
        for (index, path) in hits {
            print_entry(&part, &index, &path);
        }
        return Ok(());
    }

    let Some(root) = &part.root else {
        bail!("partition has no rebuilt root (rebuild() was never run?)");
    };
    print_tree(&part, root, &part.full_path(root));
    print_tree(
        &part,
        &FileIndex::Record(ntfs_core::LOST_FILES_RECORD),
        "LostFiles",
    );
    Ok(())
}

fn print_entry(part: &Partition, index: &FileIndex, path: &str) {
    let Some(file) = part.get(index) else { return };
    println!(
        "{:>10} {}{}{} {}",
        file.size.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
        if file.is_directory { "d" } else { "-" },
        if file.is_deleted { "D" } else { "-" },
        if file.is_ghost { "G" } else { "-" },
        path
    );
}

fn print_tree(part: &Partition, start: &FileIndex, start_path: &str) {
    let Some(file) = part.get(start) else { return };
    print_entry(part, start, start_path);
    let mut children: Vec<&FileIndex> = file.children.iter().collect();
    children.sort_by_key(|c| part.get(c).map(|f| f.name.clone()).unwrap_or_default());
    for child in children {
        print_tree(part, child, &part.full_path(child));
    }
}

fn run_extract(image: &PathBuf, partition: u64, path: Option<&str>, output: &PathBuf) -> Result<()> {
    let config = ScanConfig::default();
    let (mut reader, part) = find_partition(image, partition, &config)?;

    std::fs::create_dir_all(output)
        .with_context(|| format!("creating output directory {}", output.display()))?;

    let Some(needle) = path else {
        let Some(root) = &part.root else {
            bail!("partition has no rebuilt root (rebuild() was never run?)");
        };
        restore::restore_tree(root, &part, reader.as_mut(), &config, output)
            .context("restoring partition tree")?;
        println!("Restored partition tree to {}", output.display());
        return Ok(());
    };

    let hits = restore::locate(&part, needle);
    let Some((index, full_path)) = hits.into_iter().next() else {
        bail!("no file matching {needle:?} found in partition");
    };
    let Some(file) = part.get(&index) else {
        bail!("matched entry {index} vanished from partition map");
    };

    let dest = output.join(file.name.clone());
    let mut out = std::fs::File::create(&dest)
        .with_context(|| format!("creating output file {}", dest.display()))?;
    let wrote = restore::restore_content(file, &part, reader.as_mut(), &config, &mut out)
        .with_context(|| format!("restoring content for {full_path}"))?;
    if wrote {
        println!("Extracted {full_path} -> {}", dest.display());
    } else {
        println!("{full_path} has no recoverable content (ghost, directory, or unknown geometry).");
    }
    Ok(())
}
