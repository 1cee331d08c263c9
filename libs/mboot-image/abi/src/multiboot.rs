// SPDX-License-Identifier: MPL-2.0

//! The Multiboot (version 1) header and the parts of the boot information
//! structure that the trampoline touches.
//!
//! Reference: <https://www.gnu.org/software/grub/manual/multiboot/multiboot.html>

use bytemuck::{Pod, Zeroable};

/// Magic stored in the Multiboot header.
pub const MULTIBOOT_HEADER_MAGIC: u32 = 0x1BAD_B002;

/// Magic a compliant bootloader leaves in `EAX` when jumping to the kernel.
pub const MULTIBOOT_BOOTLOADER_MAGIC: u32 = 0x2BAD_B002;

/// The header must be 4-byte aligned and lie within this many bytes of the file start.
pub const MULTIBOOT_SEARCH: usize = 8192;
pub const MULTIBOOT_HEADER_ALIGN: usize = 4;

bitflags::bitflags! {
    /// The `flags` field of the Multiboot header: what the kernel requires from the loader.
    pub struct MultibootHeaderFlags: u32 {
        const PAGE_ALIGN  = 1;
        const MEMORY_INFO = 1 << 1;
        const VIDEO_MODE  = 1 << 2;
        const AOUT_KLUDGE = 1 << 16;
    }
}

bitflags::bitflags! {
    /// The `flags` field of the boot information structure: which fields are valid.
    pub struct MultibootInfoFlags: u32 {
        const MEMORY      = 1;
        const BOOTDEV     = 1 << 1;
        const CMDLINE     = 1 << 2;
        const MODS        = 1 << 3;
        const MEM_MAP     = 1 << 6;
    }
}

// Byte offsets of the fields in the boot information structure.
pub const MBI_FLAGS_OFFSET: usize = 0x0;
pub const MBI_MEM_LOWER_OFFSET: usize = 0x4;
pub const MBI_MEM_UPPER_OFFSET: usize = 0x8;

/// The mandatory part of the Multiboot header.
///
/// Since we never set `AOUT_KLUDGE`, the loader takes the load addresses
/// from the ELF program headers and the address fields are omitted.
#[derive(Zeroable, Pod, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct MultibootHeader {
    pub magic: u32,
    pub flags: u32,
    pub checksum: u32,
}

impl MultibootHeader {
    pub fn new(flags: MultibootHeaderFlags) -> Self {
        Self {
            magic: MULTIBOOT_HEADER_MAGIC,
            flags: flags.bits(),
            checksum: 0u32
                .wrapping_sub(MULTIBOOT_HEADER_MAGIC)
                .wrapping_sub(flags.bits()),
        }
    }

    /// `magic + flags + checksum` must be zero modulo 2^32.
    pub fn is_valid(&self) -> bool {
        self.magic == MULTIBOOT_HEADER_MAGIC
            && self
                .magic
                .wrapping_add(self.flags)
                .wrapping_add(self.checksum)
                == 0
    }
}
