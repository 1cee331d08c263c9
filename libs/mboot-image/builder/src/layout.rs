// SPDX-License-Identifier: MPL-2.0

//! Memory layout planning for both image formats.
//!
//! A real-mode bootloader hands control to code running below 1 MiB, so
//! everything the setup code reads before switching to protected mode,
//! i.e., the MBI and the command lines, must itself live below 1 MiB. The
//! only free room is the narrow band between the setup code and
//! [`LOWMEM_BAND_END`]. Everything else goes to high memory.

use mboot_abi::HIGHMEM_START;

use crate::{
    Errno, Result,
    mapping::{FileOffset, LOWMEM_BAND_END, LOWMEM_BAND_START},
    region::{Region, RegionList},
    return_errno_with_message,
};

const ADDR_SPACE_END: u64 = 1 << 32;

/// The contiguous high-memory range covered by a bzImage payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighmemSpan {
    pub base: u32,
    pub size: u32,
}

/// The boundaries of a bzImage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BzImageLayout {
    high_span: Option<HighmemSpan>,
}

impl BzImageLayout {
    /// Plans the bzImage layout of `regions`.
    ///
    /// Regions below 1 MiB are only accepted inside the reserved low band.
    pub fn plan(regions: &RegionList) -> Result<Self> {
        for region in regions.low() {
            if region.start() < LOWMEM_BAND_START || region.end() > LOWMEM_BAND_END as u64 {
                warn!(
                    "Region {:#x}..{:#x} is below 1MB but outside the reserved band {:#x}..{:#x}",
                    region.start(),
                    region.end(),
                    LOWMEM_BAND_START,
                    LOWMEM_BAND_END
                );
                return_errno_with_message!(
                    Errno::LayoutViolation,
                    "kernel uses low memory outside the reserved band"
                );
            }
        }
        check_addr_space(regions)?;

        let high = regions.high();
        let high_span = match (high.first(), high.iter().map(Region::end).max()) {
            (Some(first), Some(end)) => Some(HighmemSpan {
                base: first.start(),
                size: (end - first.start() as u64) as u32,
            }),
            _ => None,
        };

        Ok(Self { high_span })
    }

    /// The high-memory range to be relocated, or `None` if there is no
    /// region above 1 MiB.
    pub fn high_span(&self) -> Option<HighmemSpan> {
        self.high_span
    }

    pub fn high_base(&self) -> u32 {
        self.high_span.map_or(HIGHMEM_START, |span| span.base)
    }

    /// Where `region` goes in the file.
    pub fn offset_of(&self, region: &Region) -> FileOffset {
        if region.is_highmem() {
            FileOffset::of_bz_high(region.start(), self.high_base())
        } else {
            FileOffset::of_bz_low(region.start())
        }
    }
}

/// The boundaries of a Multiboot ELF image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultibootLayout {
    /// The first address after the highest region, where the trampoline goes.
    pub end_of_image: u32,
    /// The size of the single loadable segment starting at [`HIGHMEM_START`].
    pub load_size: u32,
}

impl MultibootLayout {
    /// Plans the Multiboot layout of `regions` followed by a trampoline of
    /// `trampoline_len` bytes.
    ///
    /// Only kernels entirely above 1 MiB are supported. An empty region
    /// list yields an image holding nothing but the trampoline.
    pub fn plan(regions: &RegionList, trampoline_len: usize) -> Result<Self> {
        if let Some(region) = regions.first().filter(|region| !region.is_highmem()) {
            warn!(
                "Region {:#x}..{:#x} is below 1MB",
                region.start(),
                region.end()
            );
            return_errno_with_message!(Errno::LayoutViolation, "kernel uses low memory");
        }
        check_addr_space(regions)?;

        let end_of_image = regions.max_end().unwrap_or(HIGHMEM_START as u64);
        if end_of_image + trampoline_len as u64 > ADDR_SPACE_END
            || end_of_image >= ADDR_SPACE_END
        {
            return_errno_with_message!(
                Errno::LayoutViolation,
                "no room for the trampoline below 4GB"
            );
        }

        Ok(Self {
            end_of_image: end_of_image as u32,
            load_size: (end_of_image - HIGHMEM_START as u64) as u32 + trampoline_len as u32,
        })
    }

    pub fn offset_of(&self, region: &Region) -> FileOffset {
        FileOffset::of_mb(region.start() as u64)
    }

    pub fn trampoline_offset(&self) -> FileOffset {
        FileOffset::of_mb(self.end_of_image as u64)
    }
}

/// Returns the address of a `size`-byte slot for the MBI and the command
/// lines, right below [`LOWMEM_BAND_END`].
///
/// Fails if the slot would run into the boot sector and the setup code.
pub fn place_mbi(size: usize) -> Result<u32> {
    let band_len = (LOWMEM_BAND_END - LOWMEM_BAND_START) as usize;
    if size > band_len {
        warn!(
            "The MBI and command lines need {} bytes, but only {} are available",
            size, band_len
        );
        return_errno_with_message!(Errno::LayoutViolation, "command lines too long");
    }
    Ok(LOWMEM_BAND_END - size as u32)
}

fn check_addr_space(regions: &RegionList) -> Result<()> {
    if regions.max_end().is_some_and(|end| end > ADDR_SPACE_END) {
        return_errno_with_message!(Errno::LayoutViolation, "region exceeds 4GB");
    }
    Ok(())
}
