//! Read command implementation

use indicatif::{ProgressBar, ProgressStyle};
use norflash_core::{ParallelBus, ParallelFlash};
use std::fs::File;
use std::io::Write;
use std::ops::Range;
use std::path::Path;

/// Default chunk size for reading (4 KiB)
const READ_CHUNK_SIZE: usize = 4096;

/// Run the read command
pub fn run_read<B: ParallelBus>(
    flash: &mut ParallelFlash<B>,
    range: Range<u32>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "Reading {} 0x{:08X}..0x{:08X} ({} bytes)",
        flash.profile().name,
        range.start,
        range.end,
        range.len()
    );

    let data = read_flash_with_progress(flash, range)?;

    let mut file = File::create(output)?;
    file.write_all(&data)?;

    println!("Wrote {} bytes to {:?}", data.len(), output);

    Ok(())
}

/// Read a range of the device with a progress bar
pub fn read_flash_with_progress<B: ParallelBus>(
    flash: &mut ParallelFlash<B>,
    range: Range<u32>,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let total_size = range.len();
    let mut data = vec![0u8; total_size];

    let pb = ProgressBar::new(total_size as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut offset = 0usize;
    for chunk in data.chunks_mut(READ_CHUNK_SIZE) {
        flash.read(range.start + offset as u32, chunk)?;

        offset += chunk.len();
        pb.set_position(offset as u64);
    }

    pb.finish_with_message("Read complete");
    Ok(data)
}
