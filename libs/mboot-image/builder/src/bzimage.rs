// SPDX-License-Identifier: MPL-2.0

//! The legacy bzImage encoder.
//!
//! A bzImage-capable bootloader loads the result like this:
//!
//! ```text
//! ==============   0x0
//! (BIOS memory, bootloader)
//! --------------   LOWMEM_LOAD_BASE
//! boot sector, setup code
//! --------------
//! MBI, command lines
//! --------------   LOWMEM_BAND_END
//! ...
//! ==============   0xA0000
//! (memory hole)
//! ==============   0x100000
//! kernel and modules
//! ==============
//! ```
//!
//! The setup code gets to 32-bit protected mode, moves the high-memory
//! payload from wherever the bootloader put it to the high-memory base,
//! and jumps to the kernel entry with the MBI address in `EBX`.

use std::io::{Seek, Write};

use crate::{
    Result, Verbosity,
    asset::{BzImageHeader, SETUP_ENTRY, SETUP_HIGH_BASE, SETUP_HIGH_SIZE, SETUP_MBI},
    layout::{BzImageLayout, HighmemSpan},
    mapping::BZ_BOOTSECT_LEN,
    region::RegionList,
    writer::ImageWriter,
};

/// What [`build_bzimage`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BzImageSummary {
    pub high_span: Option<HighmemSpan>,
    pub low_regions: usize,
    pub high_regions: usize,
    pub image_len: u64,
}

/// Reworks `regions` into a bzImage and writes it to `out`.
///
/// The layout is checked before anything is written, so a layout error
/// leaves `out` untouched. `header` is not modified.
pub fn build_bzimage<W: Write + Seek>(
    regions: &RegionList,
    entry: u32,
    mbi: u32,
    header: &BzImageHeader,
    out: &mut W,
    verbosity: Verbosity,
) -> Result<BzImageSummary> {
    let layout = BzImageLayout::plan(regions)?;

    // Without high regions the setup code keeps its built-in relocation
    // values, which mean "nothing to move".
    let mut patches = vec![(SETUP_ENTRY, entry), (SETUP_MBI, mbi)];
    if let Some(span) = layout.high_span() {
        patches.push((SETUP_HIGH_BASE, span.base));
        patches.push((SETUP_HIGH_SIZE, span.size));
    }
    let header = header.patched(&patches);
    progress!(verbosity, "Kernel entry is {:#x}, MBI is {:#x}.", entry, mbi);

    let mut writer = ImageWriter::new(out);
    writer.write_at(0usize, header.bootsect())?;
    writer.write_at(BZ_BOOTSECT_LEN, header.setup())?;
    progress!(
        verbosity,
        "Wrote bzImage header: {} + {} bytes.",
        header.bootsect().len(),
        header.setup().len()
    );

    for region in regions.low() {
        writer.write_at(layout.offset_of(region), region.bytes())?;
    }
    if !regions.low().is_empty() {
        progress!(verbosity, "Wrote {} low-memory sections.", regions.low().len());
    }

    for region in regions.high() {
        writer.write_at(layout.offset_of(region), region.bytes())?;
    }
    progress!(verbosity, "Wrote {} high-memory sections.", regions.high().len());

    let image_len = writer.finish()?;

    Ok(BzImageSummary {
        high_span: layout.high_span(),
        low_regions: regions.low().len(),
        high_regions: regions.high().len(),
        image_len,
    })
}
