// SPDX-License-Identifier: MPL-2.0

use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::Path,
};

use mboot_image_builder::{
    BzImageHeader, Region, RegionList, Trampoline, Verbosity, build_bzimage, build_mb_image,
    place_mbi,
};

use crate::{
    config::{Encoding, PackConfig},
    error::{Errno, Error, Result},
};

/// Reads every input named by `config` and writes the image out.
///
/// The output file is removed again if encoding fails half way, unless
/// something other than a regular file was there before.
pub fn execute_pack_command(config: &PackConfig, verbosity: Verbosity) -> Result<()> {
    let mut regions = config
        .regions
        .iter()
        .map(|region| Ok(Region::new(region.start, read_input(&region.file)?)))
        .collect::<Result<Vec<_>>>()?;
    let mbi = resolve_mbi(config, &mut regions)?;
    let regions = RegionList::new(regions);
    debug!("Packing {:#?}", regions);

    // Assets are read before the output exists.
    let encoder = Encoder::load(&config.encoding)?;

    let discard_on_failure = is_discardable(&config.output);
    let file = File::create(&config.output)
        .map_err(|e| Error::with_path(Errno::CreateOutput, "cannot create", &config.output, &e))?;
    let mut out = BufWriter::new(file);
    let result = encoder.encode(&regions, config.entry, mbi, &mut out, verbosity);
    drop(out);

    match result {
        Ok(image_len) => {
            info!(
                "Wrote {} ({} bytes)",
                config.output.display(),
                image_len
            );
            Ok(())
        }
        Err(error) if discard_on_failure => {
            if let Err(e) = fs::remove_file(&config.output) {
                warn!("Cannot remove {}: {}", config.output.display(), e);
            }
            Err(error)
        }
        Err(error) => {
            warn!(
                "{} is not a regular file, leaving it in place",
                config.output.display()
            );
            Err(error)
        }
    }
}

/// Places the MBI and adds its blob, if any, to the memory image.
fn resolve_mbi(config: &PackConfig, regions: &mut Vec<Region>) -> Result<u32> {
    let blob = config.mbi.file.as_deref().map(read_input).transpose()?;
    let address = match (config.mbi.address, &blob) {
        (Some(address), _) => address,
        (None, Some(blob)) => place_mbi(blob.len())?,
        (None, None) => {
            return Err(Error::new(
                Errno::ParseManifest,
                "neither an MBI address nor an MBI file is given",
            ));
        }
    };
    if let Some(blob) = blob {
        regions.push(Region::new(address, blob));
    }
    Ok(address)
}

enum Encoder {
    BzImage(BzImageHeader),
    Multiboot(Trampoline),
}

impl Encoder {
    fn load(encoding: &Encoding) -> Result<Self> {
        let encoder = match encoding {
            Encoding::BzImage { bootsect, setup } => {
                let header =
                    BzImageHeader::from_slices(&read_input(bootsect)?, &read_input(setup)?)?;
                Self::BzImage(header)
            }
            Encoding::Multiboot { trampoline: None } => Self::Multiboot(Trampoline::builtin()),
            Encoding::Multiboot {
                trampoline: Some(asset),
            } => Self::Multiboot(Trampoline::new(read_input(&asset.file)?, asset.sites)?),
        };
        Ok(encoder)
    }

    /// Returns the length of the image written.
    fn encode(
        &self,
        regions: &RegionList,
        entry: u32,
        mbi: u32,
        out: &mut BufWriter<File>,
        verbosity: Verbosity,
    ) -> Result<u64> {
        match self {
            Self::BzImage(header) => {
                let summary = build_bzimage(regions, entry, mbi, header, out, verbosity)?;
                if let Some(span) = summary.high_span {
                    debug!(
                        "High memory spans {:#x}..{:#x}",
                        span.base,
                        span.base as u64 + span.size as u64
                    );
                }
                Ok(summary.image_len)
            }
            Self::Multiboot(trampoline) => {
                let summary = build_mb_image(regions, entry, mbi, trampoline, out, verbosity)?;
                debug!(
                    "Image ends at {:#x}, loading {:#x} bytes",
                    summary.end_of_image, summary.load_size
                );
                Ok(summary.image_len)
            }
        }
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::with_path(Errno::ReadInput, "cannot read", path, &e))
}

/// Whether a half-written output at `path` may be removed. Only regular
/// files, and paths where nothing existed yet, qualify.
fn is_discardable(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(metadata) => metadata.is_file(),
        Err(e) => e.kind() == io::ErrorKind::NotFound,
    }
}
