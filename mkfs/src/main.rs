use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use rufs_core::layout::{BLOCK_SIZE, MAX_DNUM, MAX_INUM};

/// Format a fresh rufs disk image.
#[derive(Parser, Debug)]
struct Args {
    /// Path to the disk image to create. Defaults to ./DISKFILE, matching
    /// the mount binary's own default.
    #[arg(short, long, default_value = "DISKFILE")]
    output: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.output.exists() {
        error!("{:?} already exists, refusing to overwrite", args.output);
        return ExitCode::FAILURE;
    }

    match rufs_core::mkfs::format(&args.output) {
        Ok((_device, sb)) => {
            info!(
                "formatted {:?}: {} inodes, {} data blocks, block size {}, data area starts at block {}",
                args.output, MAX_INUM, MAX_DNUM, BLOCK_SIZE, sb.d_start_blk
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("mkfs failed: {err}");
            ExitCode::FAILURE
        }
    }
}
