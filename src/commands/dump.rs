//! Hex dump command implementation

use std::io::{self, Write};
use std::ops::Range;

use norflash_core::{ParallelBus, ParallelFlash};

/// Bytes per dump line
const BYTES_PER_LINE: usize = 8;

/// Print `range` as uppercase hex, eight bytes per line
///
/// Every byte goes through the single-byte read path. The output is framed
/// by `Start of flash rom` and `End of flash rom` lines.
pub fn run_dump<B: ParallelBus, W: Write>(
    flash: &mut ParallelFlash<B>,
    range: Range<u32>,
    out: &mut W,
) -> io::Result<()> {
    log::info!(
        "Dumping 0x{:08X}..0x{:08X} ({} bytes)",
        range.start,
        range.end,
        range.len()
    );

    writeln!(out, "Start of flash rom")?;

    let mut column = 0;
    for addr in range {
        if column > 0 {
            write!(out, " ")?;
        }
        write!(out, "{:02X}", flash.read_byte(addr))?;
        column += 1;
        if column == BYTES_PER_LINE {
            writeln!(out)?;
            column = 0;
        }
    }
    if column != 0 {
        writeln!(out)?;
    }

    writeln!(out, "End of flash rom")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use norflash_core::DeviceProfile;
    use norflash_dummy::{SimConfig, SimulatedNor};

    fn flash(data: &[u8]) -> ParallelFlash<SimulatedNor> {
        let profile = DeviceProfile::a24_page().with_size(0x100);
        let sim = SimulatedNor::with_data(SimConfig::new(profile.clone()), data);
        ParallelFlash::initialize(sim, profile).unwrap()
    }

    #[test]
    fn test_dump_format() {
        let data: Vec<u8> = (0..16).map(|i| i * 0x11).collect();
        let mut flash = flash(&data);
        let mut out = Vec::new();

        run_dump(&mut flash, 0..16, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Start of flash rom\n\
             00 11 22 33 44 55 66 77\n\
             88 99 AA BB CC DD EE FF\n\
             End of flash rom\n"
        );
    }

    #[test]
    fn test_dump_partial_line() {
        let mut flash = flash(&[0x0A, 0xB0, 0x5C]);
        let mut out = Vec::new();

        run_dump(&mut flash, 1..3, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Start of flash rom\nB0 5C\nEnd of flash rom\n"
        );
    }

    #[test]
    fn test_dump_uses_byte_reads() {
        let mut flash = flash(&[]);
        let before = flash.bus().read_cycles();
        let mut out = Vec::new();

        run_dump(&mut flash, 0..8, &mut out).unwrap();
        assert_eq!(flash.bus().read_cycles() - before, 8);
    }
}
