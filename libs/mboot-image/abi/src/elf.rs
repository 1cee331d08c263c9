// SPDX-License-Identifier: MPL-2.0

//! ELF32 headers, restricted to what a statically loaded i386 executable needs.
//!
//! The definitions follow the System V ABI, see `<elf.h>` for the C names.

use core::mem::size_of;

use bytemuck::{Pod, Zeroable};

/// `\x7fELF`
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

// Indexes into `e_ident`.
pub const EI_CLASS: usize = 4;
pub const EI_DATA: usize = 5;
pub const EI_VERSION: usize = 6;
pub const EI_OSABI: usize = 7;
pub const EI_NIDENT: usize = 16;

pub const ELFCLASS32: u8 = 1;
pub const ELFDATA2LSB: u8 = 1;
pub const EV_CURRENT: u8 = 1;
/// Stand-alone (embedded) application.
pub const ELFOSABI_STANDALONE: u8 = 255;

/// The `e_type` field choices. Not exhaustive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum ElfType {
    Exec = 2,
}

/// The `e_machine` field choices. Not exhaustive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum ElfMachine {
    I386 = 3,
}

/// The `p_type` field choices. Not exhaustive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum SegmentType {
    Load = 1,
}

bitflags::bitflags! {
    /// The `p_flags` field of a program header.
    pub struct SegmentFlags: u32 {
        const EXECUTE = 1;
        const WRITE   = 1 << 1;
        const READ    = 1 << 2;
    }
}

/// The ELF32 file header.
#[derive(Zeroable, Pod, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct Elf32Ehdr {
    pub e_ident: [u8; EI_NIDENT], /* 0x00 */
    pub e_type: u16,              /* 0x10 */
    pub e_machine: u16,           /* 0x12 */
    pub e_version: u32,           /* 0x14 */
    pub e_entry: u32,             /* 0x18 */
    pub e_phoff: u32,             /* 0x1c */
    pub e_shoff: u32,             /* 0x20 */
    pub e_flags: u32,             /* 0x24 */
    pub e_ehsize: u16,            /* 0x28 */
    pub e_phentsize: u16,         /* 0x2a */
    pub e_phnum: u16,             /* 0x2c */
    pub e_shentsize: u16,         /* 0x2e */
    pub e_shnum: u16,             /* 0x30 */
    pub e_shstrndx: u16,          /* 0x32 */
}

/// The ELF32 program header.
#[derive(Zeroable, Pod, Clone, Copy, Debug)]
#[repr(C, packed)]
pub struct Elf32Phdr {
    pub p_type: u32,
    pub p_offset: u32,
    pub p_vaddr: u32,
    pub p_paddr: u32,
    pub p_filesz: u32,
    pub p_memsz: u32,
    pub p_flags: u32,
    pub p_align: u32,
}

impl Elf32Ehdr {
    /// A little-endian i386 executable with `phnum` program headers that
    /// follow the file header directly, and no section headers.
    pub fn new_i386_exec(entry: u32, phnum: u16) -> Self {
        let mut e_ident = [0u8; EI_NIDENT];
        e_ident[..ELF_MAGIC.len()].copy_from_slice(&ELF_MAGIC);
        e_ident[EI_CLASS] = ELFCLASS32;
        e_ident[EI_DATA] = ELFDATA2LSB;
        e_ident[EI_VERSION] = EV_CURRENT;
        e_ident[EI_OSABI] = ELFOSABI_STANDALONE;

        Self {
            e_ident,
            e_type: ElfType::Exec as u16,
            e_machine: ElfMachine::I386 as u16,
            e_version: EV_CURRENT as u32,
            e_entry: entry,
            e_phoff: size_of::<Self>() as u32,
            e_shoff: 0,
            e_flags: 0,
            e_ehsize: size_of::<Self>() as u16,
            e_phentsize: size_of::<Elf32Phdr>() as u16,
            e_phnum: phnum,
            e_shentsize: 0,
            e_shnum: 0,
            e_shstrndx: 0,
        }
    }
}

impl Elf32Phdr {
    /// A loadable segment whose file image and memory image have the same size.
    pub fn new_load(offset: u32, addr: u32, size: u32, flags: SegmentFlags) -> Self {
        Self {
            p_type: SegmentType::Load as u32,
            p_offset: offset,
            p_vaddr: addr,
            p_paddr: addr,
            p_filesz: size,
            p_memsz: size,
            p_flags: flags.bits(),
            p_align: 0,
        }
    }
}
