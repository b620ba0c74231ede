//! A simple CLI tool to print a SimpleFS volume's superblock and inode table.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use simplefs::{Disk, FileSystem};

/// Command-line arguments for the debug tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backing file to inspect
    disk: PathBuf,

    /// Number of blocks the disk contains
    blocks: u32,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    simplefs::config::init_logging(args.verbose);

    let mut disk =
        Disk::open(&args.disk, args.blocks).with_context(|| format!("opening {:?}", args.disk))?;

    if let Err(e) = FileSystem::debug(&mut disk) {
        eprintln!("fsdebug: {e}");
        std::process::exit(1);
    }

    Ok(())
}
