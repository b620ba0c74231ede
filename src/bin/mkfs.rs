//! A simple CLI tool to format a disk image for SimpleFS.

use anyhow::{anyhow, Context};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use simplefs::{Disk, FileSystem};

/// Command-line arguments for the format tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backing file to format (created if it doesn't exist)
    disk: PathBuf,

    /// Number of blocks the disk should contain
    blocks: u32,

    /// Format even if the file already looks like a SimpleFS volume
    #[arg(short, long)]
    force: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    simplefs::config::init_logging(args.verbose);

    info!("SimpleFS format tool v{}", env!("CARGO_PKG_VERSION"));

    if args.blocks == 0 {
        return Err(anyhow!("block count must be at least 1"));
    }

    if args.disk.exists() && !args.force {
        let mut disk = Disk::open(&args.disk, args.blocks)
            .with_context(|| format!("opening {:?}", args.disk))?;
        let already_formatted = {
            let mut raw = [0u8; simplefs::BLOCK_SIZE];
            disk.read(0, &mut raw).is_ok()
                && simplefs::Superblock::read_from(&raw)
                    .map(|sb| sb.magic_number == simplefs::layout::MAGIC_NUMBER)
                    .unwrap_or(false)
        };
        if already_formatted {
            return Err(anyhow!(
                "{:?} already looks like a SimpleFS volume; pass --force to overwrite",
                args.disk
            ));
        }
    }

    let mut disk =
        Disk::open(&args.disk, args.blocks).with_context(|| format!("opening {:?}", args.disk))?;
    let mut fs = FileSystem::new();
    fs.format(&mut disk)
        .with_context(|| format!("formatting {:?}", args.disk))?;
    disk.close();

    info!("formatted {:?} ({} blocks)", args.disk, args.blocks);
    Ok(())
}
