// SPDX-License-Identifier: MPL-2.0

//! The image builder turns the memory image of a loaded kernel and its
//! modules into a file a bootloader can load.
//!
//! The loader hands over a [`RegionList`]: discontiguous runs of bytes with
//! the physical addresses they must end up at. Two encodings are supported:
//!  - a legacy bzImage, see [`build_bzimage`];
//!  - a Multiboot ELF32 executable with a trampoline, see [`build_mb_image`].
//!
//! Both encoders write through a caller-owned `Write + Seek` handle and
//! stop at the first error. The caller should discard the output then.

#[macro_use]
extern crate log;

/// Reports progress at `info` level, or at `debug` level when quiet.
macro_rules! progress {
    ($verbosity: expr, $($arg: tt)+) => {
        match $verbosity {
            $crate::Verbosity::Normal => info!($($arg)+),
            $crate::Verbosity::Quiet => debug!($($arg)+),
        }
    };
}

mod asset;
mod bzimage;
mod error;
mod layout;
mod mapping;
mod multiboot;
mod patch;
mod region;
mod writer;

pub use crate::{
    asset::{
        BzImageHeader, SETUP_ENTRY, SETUP_HIGH_BASE, SETUP_HIGH_SIZE, SETUP_MBI, Trampoline,
        TrampolinePatchSites,
    },
    bzimage::{BzImageSummary, build_bzimage},
    error::{Errno, Error, Result},
    layout::{BzImageLayout, HighmemSpan, MultibootLayout, place_mbi},
    mapping::{
        BOOTSECT_SETUP_SECTS_OFFSET, BZ_BOOTSECT_LEN, BZ_HEADER_LEN, BZ_SETUP_CODE_LEN,
        BZ_SETUP_OFFSET, BZ_SETUP_SECTS, FileOffset, LOWMEM_BAND_END, LOWMEM_BAND_START,
        LOWMEM_LOAD_BASE, MB_HEADER_BLOCK_LEN, MB_HEADER_OFFSET,
    },
    multiboot::{MbImageSummary, build_mb_image},
    patch::{PatchSite, apply_patches, patch_u32, read_u32},
    region::{Region, RegionList},
    writer::ImageWriter,
};

/// How chatty the encoders are.
///
/// Only decides the log level of progress messages, never what gets built.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
}
