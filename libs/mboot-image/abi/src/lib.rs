// SPDX-License-Identifier: MPL-2.0

//! The on-disk and in-memory ABI shared by the image builder and the boot stubs.
//!
//! A bootloader consuming one of our images only looks at a handful of
//! structures: the ELF32 file and program headers, the Multiboot header
//! and, at run time, the Multiboot information structure handed over in
//! `EBX`. They are defined here as plain-old-data so that they can be
//! written to disk with a single byte copy.
//!

#![cfg_attr(not(test), no_std)]

pub mod elf;
pub mod multiboot;

/// The first byte of the legacy VGA/BIOS memory hole.
///
/// Conventional memory below this address is usable by real-mode code.
pub const MEM_HOLE_START: u32 = 0xA0000;

/// The first byte after the legacy memory hole.
pub const MEM_HOLE_END: u32 = 0x100000;

/// The start of "high memory", where protected-mode kernels are loaded.
pub const HIGHMEM_START: u32 = MEM_HOLE_END;
