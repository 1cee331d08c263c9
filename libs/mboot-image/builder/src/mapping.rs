// SPDX-License-Identifier: MPL-2.0

//! Format constants and the mapping from physical addresses to file offsets.
//!
//! In a bzImage, `PA - LOWMEM_LOAD_BASE == FileOffset` for the low band and
//! `PA - high_base == FileOffset - BZ_SETUP_OFFSET` for high memory.
//! In a Multiboot image, `PA - HIGHMEM_START == FileOffset - MB_HEADER_BLOCK_LEN`.

use core::mem::size_of;

use mboot_abi::{
    HIGHMEM_START, MEM_HOLE_START,
    elf::{Elf32Ehdr, Elf32Phdr},
    multiboot::MultibootHeader,
};

pub const SECTOR_SIZE: usize = 0x200;

pub const BZ_BOOTSECT_LEN: usize = SECTOR_SIZE;

/// The setup code occupies 6 sectors.
pub const BZ_SETUP_CODE_LEN: usize = SECTOR_SIZE * 6;

/// The boot sector and the setup code, as loaded at [`LOWMEM_LOAD_BASE`].
pub const BZ_HEADER_LEN: usize = BZ_BOOTSECT_LEN + BZ_SETUP_CODE_LEN;

// The boot sector declares one sector more than the setup code uses, so
// that the bootloader also loads the reserved low band behind the code.
// The encoder stamps it over whatever the boot sector asset declares.
pub const BZ_SETUP_SECTS: usize = 7;

/// The `setup_sects` byte of the Linux setup header in the boot sector.
pub const BOOTSECT_SETUP_SECTS_OFFSET: usize = 0x1F1;

/// Where the high-memory image starts in a bzImage file.
pub const BZ_SETUP_OFFSET: usize = SECTOR_SIZE * (1 + BZ_SETUP_SECTS);

/// The address the boot sector is loaded at.
pub const LOWMEM_LOAD_BASE: u32 = 0x9000;

/// The end of the low band holding the MBI and the command lines.
pub const LOWMEM_BAND_END: u32 = 0xA000;

/// The first address of the reserved low band, right after the setup code.
pub const LOWMEM_BAND_START: u32 = LOWMEM_LOAD_BASE + BZ_HEADER_LEN as u32;

/// The ELF header, the program header and the Multiboot header, back to back.
pub const MB_HEADER_BLOCK_LEN: usize =
    size_of::<Elf32Ehdr>() + size_of::<Elf32Phdr>() + size_of::<MultibootHeader>();

/// Where the Multiboot header starts in a Multiboot image.
pub const MB_HEADER_OFFSET: usize = size_of::<Elf32Ehdr>() + size_of::<Elf32Phdr>();

const _: () = assert!(LOWMEM_LOAD_BASE as usize + BZ_SETUP_OFFSET == LOWMEM_BAND_END as usize);
const _: () = assert!(LOWMEM_BAND_END <= MEM_HOLE_START);
const _: () = assert!(BZ_SETUP_SECTS <= u8::MAX as usize);
const _: () = assert!(BOOTSECT_SETUP_SECTS_OFFSET < BZ_BOOTSECT_LEN);
const _: () = assert!(MB_HEADER_OFFSET % mboot_abi::multiboot::MULTIBOOT_HEADER_ALIGN == 0);
const _: () =
    assert!(MB_HEADER_BLOCK_LEN <= mboot_abi::multiboot::MULTIBOOT_SEARCH);

/// A byte offset in the output image.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy)]
pub struct FileOffset {
    offset: u64,
}

impl FileOffset {
    /// The file offset of a bzImage low-band address.
    pub fn of_bz_low(addr: u32) -> Self {
        debug_assert!(addr >= LOWMEM_LOAD_BASE);
        Self {
            offset: (addr - LOWMEM_LOAD_BASE) as u64,
        }
    }

    /// The file offset of a bzImage high-memory address, given the lowest
    /// high-memory address in the image.
    pub fn of_bz_high(addr: u32, high_base: u32) -> Self {
        debug_assert!(addr >= high_base);
        Self {
            offset: (addr - high_base) as u64 + BZ_SETUP_OFFSET as u64,
        }
    }

    /// The file offset of a Multiboot image address.
    ///
    /// Takes a 64-bit address since the trampoline sits at the end of the image.
    pub fn of_mb(addr: u64) -> Self {
        debug_assert!(addr >= HIGHMEM_START as u64);
        Self {
            offset: addr - HIGHMEM_START as u64 + MB_HEADER_BLOCK_LEN as u64,
        }
    }
}

impl From<u64> for FileOffset {
    fn from(offset: u64) -> Self {
        Self { offset }
    }
}

impl From<usize> for FileOffset {
    fn from(offset: usize) -> Self {
        Self {
            offset: offset as u64,
        }
    }
}

impl From<FileOffset> for u64 {
    fn from(offset: FileOffset) -> Self {
        offset.offset
    }
}
