// SPDX-License-Identifier: MPL-2.0

//! Stamping addresses into opaque boot blobs.
//!
//! Each blob comes with a small table of patch sites. A site is a fixed
//! byte offset of a 32-bit little-endian field that the blob's code reads
//! at boot time.

use core::mem::size_of;

/// A named 32-bit field inside a boot blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSite {
    pub name: &'static str,
    pub offset: usize,
}

impl PatchSite {
    pub const fn new(name: &'static str, offset: usize) -> Self {
        Self { name, offset }
    }

    pub const fn end(&self) -> usize {
        self.offset + size_of::<u32>()
    }
}

/// Writes `value` in little-endian order at `offset`.
///
/// Panics if the field does not fit in `blob`. Patch offsets are format
/// constants, so this is a packaging bug rather than a runtime condition.
pub fn patch_u32(blob: &mut [u8], offset: usize, value: u32) {
    assert!(
        offset + size_of::<u32>() <= blob.len(),
        "patch site {:#x} is outside a {}-byte blob",
        offset,
        blob.len()
    );
    blob[offset..offset + size_of::<u32>()].copy_from_slice(&value.to_le_bytes());
}

/// Reads back the little-endian 32-bit field at `offset`.
pub fn read_u32(blob: &[u8], offset: usize) -> u32 {
    let mut field = [0u8; size_of::<u32>()];
    field.copy_from_slice(&blob[offset..offset + size_of::<u32>()]);
    u32::from_le_bytes(field)
}

/// Applies every `(site, value)` pair to `blob`, in order.
pub fn apply_patches(blob: &mut [u8], patches: &[(PatchSite, u32)]) {
    for (site, value) in patches {
        trace!("Patching {} at {:#x} with {:#x}", site.name, site.offset, value);
        patch_u32(blob, site.offset, *value);
    }
}
