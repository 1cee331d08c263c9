// SPDX-License-Identifier: MPL-2.0

//! The memory image handed over by the loader.

use std::fmt;

use mboot_abi::HIGHMEM_START;

/// A run of bytes that must end up at a fixed physical address.
#[derive(Clone, PartialEq, Eq)]
pub struct Region {
    start: u32,
    bytes: Vec<u8>,
}

impl Region {
    pub fn new(start: u32, bytes: Vec<u8>) -> Self {
        Self { start, bytes }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// The first address after the region.
    ///
    /// Computed in 64 bits since a region may end exactly at 4 GiB.
    pub fn end(&self) -> u64 {
        self.start as u64 + self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_highmem(&self) -> bool {
        self.start >= HIGHMEM_START
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("start", &format_args!("{:#x}", self.start))
            .field("size", &format_args!("{:#x}", self.bytes.len()))
            .finish()
    }
}

/// The regions of a loaded image, ordered by their start address.
///
/// The list is frozen once built. The encoders only iterate over it, in
/// either direction. Overlapping regions are not detected here; keeping
/// them apart is the loader's job.
#[derive(Debug, Clone, Default)]
pub struct RegionList {
    regions: Vec<Region>,
}

impl RegionList {
    pub fn new(mut regions: Vec<Region>) -> Self {
        regions.sort_by_key(Region::start);
        Self { regions }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn first(&self) -> Option<&Region> {
        self.regions.first()
    }

    /// Regions starting below [`HIGHMEM_START`].
    pub fn low(&self) -> &[Region] {
        &self.regions[..self.highmem_split()]
    }

    /// Regions starting at or above [`HIGHMEM_START`].
    pub fn high(&self) -> &[Region] {
        &self.regions[self.highmem_split()..]
    }

    /// The largest end address of all regions.
    pub fn max_end(&self) -> Option<u64> {
        self.regions.iter().map(Region::end).max()
    }

    fn highmem_split(&self) -> usize {
        self.regions.partition_point(|region| !region.is_highmem())
    }
}

impl FromIterator<Region> for RegionList {
    fn from_iter<I: IntoIterator<Item = Region>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RegionList {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
