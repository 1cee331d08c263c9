// SPDX-License-Identifier: MPL-2.0

//! The Multiboot ELF encoder.
//!
//! Useful when the Multiboot loader at hand cannot load several modules.
//! We take the memory image, stick the trampoline on its end, and prepend
//! ELF32 and Multiboot headers naming the trampoline as the entry. The
//! trampoline copies the memory sizes from the loader's MBI into ours and
//! jumps to the kernel entry.

use std::io::{Seek, Write};

use mboot_abi::{
    HIGHMEM_START,
    elf::{Elf32Ehdr, Elf32Phdr, SegmentFlags},
    multiboot::{MultibootHeader, MultibootHeaderFlags},
};

use crate::{
    Result, Verbosity,
    asset::Trampoline,
    layout::MultibootLayout,
    mapping::{MB_HEADER_BLOCK_LEN, MB_HEADER_OFFSET},
    region::RegionList,
    writer::ImageWriter,
};

// The headers are copied out in host byte order.
const _: () = assert!(cfg!(target_endian = "little"));

/// What [`build_mb_image`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbImageSummary {
    pub end_of_image: u32,
    pub load_size: u32,
    pub regions: usize,
    pub image_len: u64,
}

/// Reworks `regions` into a Multiboot ELF image and writes it to `out`.
///
/// Every region must lie above 1 MiB. The layout is checked before
/// anything is written, so a layout error leaves `out` untouched.
pub fn build_mb_image<W: Write + Seek>(
    regions: &RegionList,
    entry: u32,
    mbi: u32,
    trampoline: &Trampoline,
    out: &mut W,
    verbosity: Verbosity,
) -> Result<MbImageSummary> {
    let layout = MultibootLayout::plan(regions, trampoline.len())?;

    let trampoline_code = trampoline.patched(entry, mbi);
    progress!(verbosity, "Kernel entry is {:#x}, MBI is {:#x}.", entry, mbi);

    // One big program header. We ought to emit one per region, but the
    // loader packs them almost contiguously anyway.
    let ehdr = Elf32Ehdr::new_i386_exec(layout.end_of_image, 1);
    let phdr = Elf32Phdr::new_load(
        MB_HEADER_BLOCK_LEN as u32,
        HIGHMEM_START,
        layout.load_size,
        SegmentFlags::READ | SegmentFlags::WRITE | SegmentFlags::EXECUTE,
    );
    let mbh = MultibootHeader::new(MultibootHeaderFlags::MEMORY_INFO);

    let mut writer = ImageWriter::new(out);
    writer.write_at(0usize, bytemuck::bytes_of(&ehdr))?;
    writer.write_at({ ehdr.e_phoff } as usize, bytemuck::bytes_of(&phdr))?;
    writer.write_at(MB_HEADER_OFFSET, bytemuck::bytes_of(&mbh))?;
    progress!(verbosity, "Wrote ELF/multiboot headers.");

    for region in regions {
        writer.write_at(layout.offset_of(region), region.bytes())?;
    }
    progress!(verbosity, "Wrote {} high-memory sections.", regions.len());

    writer.write_at(layout.trampoline_offset(), &trampoline_code)?;
    progress!(verbosity, "Wrote multiboot trampoline.");

    let image_len = writer.finish()?;

    Ok(MbImageSummary {
        end_of_image: layout.end_of_image,
        load_size: layout.load_size,
        regions: regions.len(),
        image_len,
    })
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use mboot_abi::elf::ELF_MAGIC;

    use super::*;
    use crate::{Errno, patch::read_u32, region::Region};

    #[test]
    fn headers_describe_payload() {
        let regions = RegionList::new(vec![Region::new(0x100000, vec![0xC3; 0x1000])]);
        let trampoline = Trampoline::builtin();
        let mut out = Cursor::new(Vec::new());
        let summary = build_mb_image(
            &regions,
            0x100000,
            0x9000,
            &trampoline,
            &mut out,
            Verbosity::Quiet,
        )
        .unwrap();
        let image = out.into_inner();

        assert_eq!(&image[..4], &ELF_MAGIC);
        assert_eq!(read_u32(&image, 0x18), 0x101000);
        assert_eq!(summary.end_of_image, 0x101000);
        assert_eq!(summary.load_size, 0x1000 + trampoline.len() as u32);

        // p_offset, p_vaddr and p_filesz of the only program header.
        assert_eq!(read_u32(&image, 52 + 4), MB_HEADER_BLOCK_LEN as u32);
        assert_eq!(read_u32(&image, 52 + 8), HIGHMEM_START);
        assert_eq!(read_u32(&image, 52 + 16), summary.load_size);

        let mbh: MultibootHeader =
            bytemuck::pod_read_unaligned(&image[MB_HEADER_OFFSET..MB_HEADER_BLOCK_LEN]);
        assert!(mbh.is_valid());

        assert_eq!(
            image.len(),
            MB_HEADER_BLOCK_LEN + 0x1000 + trampoline.len()
        );
        assert_eq!(summary.image_len, image.len() as u64);
    }

    #[test]
    fn low_memory_writes_nothing() {
        let regions = RegionList::new(vec![Region::new(0x9F00, vec![1; 0x10])]);
        let mut out = Cursor::new(Vec::new());
        let error = build_mb_image(
            &regions,
            0x100000,
            0x9F00,
            &Trampoline::builtin(),
            &mut out,
            Verbosity::Normal,
        )
        .unwrap_err();
        assert_eq!(error.error(), Errno::LayoutViolation);
        assert!(out.into_inner().is_empty());
    }
}
