// SPDX-License-Identifier: MPL-2.0

//! The boot blobs glued to the memory image, with their patch-site tables.
//!
//! The blobs are opaque machine code. All we know about them is their size
//! and where the addresses they need at boot time are stored.

use std::fmt;

use mboot_abi::multiboot::{
    MBI_FLAGS_OFFSET, MBI_MEM_LOWER_OFFSET, MBI_MEM_UPPER_OFFSET, MULTIBOOT_BOOTLOADER_MAGIC,
    MultibootInfoFlags,
};

use crate::{
    Errno, Result,
    mapping::{BOOTSECT_SETUP_SECTS_OFFSET, BZ_BOOTSECT_LEN, BZ_SETUP_CODE_LEN, BZ_SETUP_SECTS},
    patch::{PatchSite, apply_patches},
    return_errno_with_message,
};

// These *MUST* fit the offsets of the address slots in the setup code.
pub const SETUP_ENTRY: PatchSite = PatchSite::new("entry address", 0x30);
pub const SETUP_MBI: PatchSite = PatchSite::new("MBI address", 0x34);
pub const SETUP_HIGH_BASE: PatchSite = PatchSite::new("high-memory base", 0x38);
pub const SETUP_HIGH_SIZE: PatchSite = PatchSite::new("high-memory size", 0x3C);

/// The legacy boot sector and the setup code of a bzImage.
#[derive(Clone)]
pub struct BzImageHeader {
    bootsect: [u8; BZ_BOOTSECT_LEN],
    setup: Box<[u8; BZ_SETUP_CODE_LEN]>,
}

impl BzImageHeader {
    pub fn new(bootsect: [u8; BZ_BOOTSECT_LEN], setup: [u8; BZ_SETUP_CODE_LEN]) -> Self {
        Self {
            bootsect,
            setup: Box::new(setup),
        }
    }

    /// Builds the header from blobs read at run time, checking their sizes.
    pub fn from_slices(bootsect: &[u8], setup: &[u8]) -> Result<Self> {
        let Ok(bootsect) = <[u8; BZ_BOOTSECT_LEN]>::try_from(bootsect) else {
            return_errno_with_message!(Errno::InvalidAsset, "boot sector must be 512 bytes");
        };
        let Ok(setup) = <[u8; BZ_SETUP_CODE_LEN]>::try_from(setup) else {
            return_errno_with_message!(Errno::InvalidAsset, "setup code must be 3072 bytes");
        };
        Ok(Self::new(bootsect, setup))
    }

    pub fn bootsect(&self) -> &[u8] {
        &self.bootsect
    }

    pub fn setup(&self) -> &[u8] {
        &self.setup[..]
    }

    /// The setup sector count the boot sector declares to the bootloader.
    pub fn setup_sects(&self) -> u8 {
        self.bootsect[BOOTSECT_SETUP_SECTS_OFFSET]
    }

    /// Returns a copy of the header with the setup code patched and the
    /// setup sector count set to [`BZ_SETUP_SECTS`].
    pub(crate) fn patched(&self, patches: &[(PatchSite, u32)]) -> Self {
        let mut header = self.clone();
        if header.setup_sects() != BZ_SETUP_SECTS as u8 {
            debug!(
                "Boot sector declares {} setup sectors, stamping {}",
                header.setup_sects(),
                BZ_SETUP_SECTS
            );
            header.bootsect[BOOTSECT_SETUP_SECTS_OFFSET] = BZ_SETUP_SECTS as u8;
        }
        apply_patches(&mut header.setup[..], patches);
        header
    }
}

impl fmt::Debug for BzImageHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BzImageHeader")
            .field("bootsect_len", &self.bootsect.len())
            .field("setup_len", &self.setup.len())
            .finish()
    }
}

/// Where the entry and MBI addresses live in a trampoline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrampolinePatchSites {
    pub entry: usize,
    pub mbi: usize,
}

impl TrampolinePatchSites {
    fn entry_site(&self) -> PatchSite {
        PatchSite::new("entry address", self.entry)
    }

    fn mbi_site(&self) -> PatchSite {
        PatchSite::new("MBI address", self.mbi)
    }
}

/// The i386 stub run by a Multiboot loader before the kernel.
///
/// ```text
///  0: ba <mbi>          mov    edx, mbi
///  5: f6 03 01          test   byte [ebx], 1
///  8: 74 0f             jz     25
/// 10: 8b 43 04          mov    eax, [ebx + 4]
/// 13: 89 42 04          mov    [edx + 4], eax
/// 16: 8b 43 08          mov    eax, [ebx + 8]
/// 19: 89 42 08          mov    [edx + 8], eax
/// 22: 83 0a 01          or     dword [edx], 1
/// 25: 89 d3             mov    ebx, edx
/// 27: b8 02 b0 ad 2b    mov    eax, 0x2badb002
/// 32: b9 <entry>        mov    ecx, entry
/// 37: ff e1             jmp    ecx
/// ```
///
/// It copies `mem_lower` and `mem_upper` from the loader's MBI into ours if
/// the loader provided them, then enters the kernel as a Multiboot loader would.
const BUILTIN_TRAMPOLINE: [u8; 39] = [
    0xba, 0x00, 0x00, 0x00, 0x00, //
    0xf6, 0x03, 0x01, //
    0x74, 0x0f, //
    0x8b, 0x43, 0x04, //
    0x89, 0x42, 0x04, //
    0x8b, 0x43, 0x08, //
    0x89, 0x42, 0x08, //
    0x83, 0x0a, 0x01, //
    0x89, 0xd3, //
    0xb8, 0x02, 0xb0, 0xad, 0x2b, //
    0xb9, 0x00, 0x00, 0x00, 0x00, //
    0xff, 0xe1,
];

const BUILTIN_TRAMPOLINE_SITES: TrampolinePatchSites = TrampolinePatchSites { entry: 33, mbi: 1 };

const _: () = assert!(
    u32::from_le_bytes([
        BUILTIN_TRAMPOLINE[28],
        BUILTIN_TRAMPOLINE[29],
        BUILTIN_TRAMPOLINE[30],
        BUILTIN_TRAMPOLINE[31]
    ]) == MULTIBOOT_BOOTLOADER_MAGIC
);
// The MBI fields the trampoline copies.
const _: () = assert!(BUILTIN_TRAMPOLINE[7] as u32 == MultibootInfoFlags::MEMORY.bits());
const _: () = assert!(BUILTIN_TRAMPOLINE[12] as usize == MBI_MEM_LOWER_OFFSET);
const _: () = assert!(BUILTIN_TRAMPOLINE[18] as usize == MBI_MEM_UPPER_OFFSET);
const _: () = assert!(MBI_FLAGS_OFFSET == 0);

/// A trampoline blob and its patch sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trampoline {
    code: Vec<u8>,
    sites: TrampolinePatchSites,
}

impl Trampoline {
    pub fn builtin() -> Self {
        Self {
            code: BUILTIN_TRAMPOLINE.to_vec(),
            sites: BUILTIN_TRAMPOLINE_SITES,
        }
    }

    /// Wraps a custom trampoline, checking that both patch sites lie
    /// inside the code and do not overlap.
    pub fn new(code: Vec<u8>, sites: TrampolinePatchSites) -> Result<Self> {
        let (entry, mbi) = (sites.entry_site(), sites.mbi_site());
        if entry.end() > code.len() || mbi.end() > code.len() {
            return_errno_with_message!(
                Errno::InvalidAsset,
                "trampoline patch site is outside the code"
            );
        }
        if entry.offset < mbi.end() && mbi.offset < entry.end() {
            return_errno_with_message!(Errno::InvalidAsset, "trampoline patch sites overlap");
        }
        Ok(Self { code, sites })
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn sites(&self) -> TrampolinePatchSites {
        self.sites
    }

    /// Returns the code with `entry` and `mbi` patched in.
    pub(crate) fn patched(&self, entry: u32, mbi: u32) -> Vec<u8> {
        let mut code = self.code.clone();
        apply_patches(
            &mut code,
            &[
                (self.sites.entry_site(), entry),
                (self.sites.mbi_site(), mbi),
            ],
        );
        code
    }
}

impl Default for Trampoline {
    fn default() -> Self {
        Self::builtin()
    }
}
