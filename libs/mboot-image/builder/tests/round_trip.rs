// SPDX-License-Identifier: MPL-2.0

use std::io::{self, Cursor, Seek, SeekFrom, Write};

use mboot_image_builder::{
    BOOTSECT_SETUP_SECTS_OFFSET, BZ_BOOTSECT_LEN, BZ_SETUP_CODE_LEN, BZ_SETUP_OFFSET,
    BZ_SETUP_SECTS, BzImageHeader, Errno, LOWMEM_LOAD_BASE, MB_HEADER_BLOCK_LEN, Region,
    RegionList, Trampoline, Verbosity, build_bzimage, build_mb_image, place_mbi, read_u32,
};
use xmas_elf::{ElfFile, program::Type};

fn pattern(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add(i as u8)).collect()
}

fn kernel_and_modules() -> RegionList {
    RegionList::new(vec![
        Region::new(0x100000, pattern(0x10, 0x3000)),
        Region::new(0x104000, pattern(0x40, 0x123)),
        Region::new(0x200000, pattern(0x80, 0x800)),
    ])
}

fn bz_header() -> BzImageHeader {
    BzImageHeader::new([0xB0; BZ_BOOTSECT_LEN], [0x5E; BZ_SETUP_CODE_LEN])
}

#[test]
fn bzimage_regions_read_back() {
    let mbi_blob = pattern(0xF0, 0xC0);
    let mbi = place_mbi(mbi_blob.len()).unwrap();
    let mut regions: Vec<Region> = kernel_and_modules().iter().cloned().collect();
    regions.push(Region::new(mbi, mbi_blob.clone()));
    let regions = RegionList::new(regions);

    let mut out = Cursor::new(Vec::new());
    let summary = build_bzimage(
        &regions,
        0x100000,
        mbi,
        &bz_header(),
        &mut out,
        Verbosity::Normal,
    )
    .unwrap();
    let image = out.into_inner();

    let span = summary.high_span.unwrap();
    assert_eq!(span.base, 0x100000);
    assert_eq!(span.size, 0x100800);
    assert_eq!(summary.low_regions, 1);
    assert_eq!(summary.high_regions, 3);

    for region in regions.high() {
        let offset = (region.start() - span.base) as usize + BZ_SETUP_OFFSET;
        assert_eq!(&image[offset..offset + region.size()], region.bytes());
    }
    let mbi_offset = (mbi - LOWMEM_LOAD_BASE) as usize;
    assert_eq!(&image[mbi_offset..mbi_offset + mbi_blob.len()], &mbi_blob[..]);

    let setup = &image[BZ_BOOTSECT_LEN..BZ_BOOTSECT_LEN + BZ_SETUP_CODE_LEN];
    assert_eq!(read_u32(setup, 0x30), 0x100000);
    assert_eq!(read_u32(setup, 0x34), mbi);
    assert_eq!(read_u32(setup, 0x38), span.base);
    assert_eq!(read_u32(setup, 0x3C), span.size);
}

#[test]
fn bzimage_unaligned_high_base() {
    let regions = RegionList::new(vec![
        Region::new(0x180000, pattern(3, 0x40)),
        Region::new(0x100200, pattern(1, 0x40)),
    ]);
    let mut out = Cursor::new(Vec::new());
    let summary = build_bzimage(
        &regions,
        0x100200,
        0x9F00,
        &bz_header(),
        &mut out,
        Verbosity::Quiet,
    )
    .unwrap();
    let image = out.into_inner();
    assert_eq!(summary.high_span.unwrap().base, 0x100200);
    assert_eq!(&image[BZ_SETUP_OFFSET..BZ_SETUP_OFFSET + 0x40], &pattern(1, 0x40)[..]);
    let second = BZ_SETUP_OFFSET + 0x7FE00;
    assert_eq!(&image[second..second + 0x40], &pattern(3, 0x40)[..]);
}

#[test]
fn bzimage_declares_payload_offset() {
    // A boot sector built for six setup sectors would have the bootloader
    // take the payload from the end of the setup code.
    let mut bootsect = [0xB0; BZ_BOOTSECT_LEN];
    bootsect[BOOTSECT_SETUP_SECTS_OFFSET] = 6;
    let header = BzImageHeader::new(bootsect, [0x5E; BZ_SETUP_CODE_LEN]);
    let kernel = pattern(0x42, 0x200);
    let regions = RegionList::new(vec![Region::new(0x100000, kernel.clone())]);

    let mut out = Cursor::new(Vec::new());
    build_bzimage(&regions, 0x100000, 0x9F00, &header, &mut out, Verbosity::Quiet).unwrap();
    let image = out.into_inner();

    let setup_sects = image[BOOTSECT_SETUP_SECTS_OFFSET] as usize;
    assert_eq!(setup_sects, BZ_SETUP_SECTS);
    let payload = BZ_BOOTSECT_LEN * (1 + setup_sects);
    assert_eq!(payload, BZ_SETUP_OFFSET);
    assert_eq!(&image[payload..payload + kernel.len()], &kernel[..]);
}

#[test]
fn bzimage_rejects_low_kernel() {
    let regions = RegionList::new(vec![Region::new(0x10000, pattern(0, 0x100))]);
    let mut out = Cursor::new(Vec::new());
    let error = build_bzimage(
        &regions,
        0x10000,
        0x9F00,
        &bz_header(),
        &mut out,
        Verbosity::Quiet,
    )
    .unwrap_err();
    assert_eq!(error.error(), Errno::LayoutViolation);
    assert!(out.into_inner().is_empty());
}

#[test]
fn multiboot_image_parses_as_elf() {
    let regions = kernel_and_modules();
    let trampoline = Trampoline::builtin();
    let mut out = Cursor::new(Vec::new());
    let summary = build_mb_image(
        &regions,
        0x100000,
        0x9000,
        &trampoline,
        &mut out,
        Verbosity::Normal,
    )
    .unwrap();
    let image = out.into_inner();

    let elf = ElfFile::new(&image).unwrap();
    assert_eq!(elf.header.pt2.entry_point(), 0x200800);
    assert_eq!(elf.header.pt2.ph_count(), 1);

    let phdr = elf.program_iter().next().unwrap();
    assert!(matches!(phdr.get_type(), Ok(Type::Load)));
    assert_eq!(phdr.offset(), MB_HEADER_BLOCK_LEN as u64);
    assert_eq!(phdr.virtual_addr(), 0x100000);
    assert_eq!(phdr.physical_addr(), 0x100000);
    assert_eq!(phdr.file_size(), summary.load_size as u64);
    assert_eq!(phdr.mem_size(), summary.load_size as u64);

    for region in &regions {
        let offset = (region.start() - 0x100000) as usize + MB_HEADER_BLOCK_LEN;
        assert_eq!(&image[offset..offset + region.size()], region.bytes());
    }

    let tramp_offset = (summary.end_of_image - 0x100000) as usize + MB_HEADER_BLOCK_LEN;
    let tramp = &image[tramp_offset..];
    assert_eq!(tramp.len(), trampoline.len());
    assert_eq!(read_u32(tramp, trampoline.sites().entry), 0x100000);
    assert_eq!(read_u32(tramp, trampoline.sites().mbi), 0x9000);
}

#[test]
fn multiboot_single_page_kernel() {
    let payload = pattern(0x21, 0x1000);
    let regions = RegionList::new(vec![Region::new(0x100000, payload.clone())]);
    let trampoline = Trampoline::builtin();
    let mut out = Cursor::new(Vec::new());
    build_mb_image(
        &regions,
        0x100000,
        0x9000,
        &trampoline,
        &mut out,
        Verbosity::Quiet,
    )
    .unwrap();
    let image = out.into_inner();

    assert_eq!(
        &image[MB_HEADER_BLOCK_LEN..MB_HEADER_BLOCK_LEN + 0x1000],
        &payload[..]
    );
    let tramp_offset = 0x1000 + MB_HEADER_BLOCK_LEN;
    assert_eq!(&image[tramp_offset..tramp_offset + 5], &[0xba, 0x00, 0x90, 0x00, 0x00]);
}

/// Accepts a fixed number of bytes, then fails as a full disk would.
struct ShortDisk {
    inner: Cursor<Vec<u8>>,
    budget: usize,
}

impl Write for ShortDisk {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Err(io::ErrorKind::StorageFull.into());
        }
        let len = buf.len().min(self.budget);
        self.budget -= len;
        self.inner.write(&buf[..len])
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for ShortDisk {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

#[test]
fn io_failure_aborts_encoding() {
    let regions = kernel_and_modules();

    let mut disk = ShortDisk {
        inner: Cursor::new(Vec::new()),
        budget: 0x2000,
    };
    let error = build_bzimage(
        &regions,
        0x100000,
        0x9F00,
        &bz_header(),
        &mut disk,
        Verbosity::Quiet,
    )
    .unwrap_err();
    assert_eq!(error.error(), Errno::IoFailed);
    assert_eq!(error.io_kind(), Some(io::ErrorKind::StorageFull));

    let mut disk = ShortDisk {
        inner: Cursor::new(Vec::new()),
        budget: 0x10,
    };
    let error = build_mb_image(
        &regions,
        0x100000,
        0x9000,
        &Trampoline::builtin(),
        &mut disk,
        Verbosity::Quiet,
    )
    .unwrap_err();
    assert_eq!(error.error(), Errno::IoFailed);
}
