// SPDX-License-Identifier: MPL-2.0

//! The pack configuration.
//!
//! A manifest (`Mbootpack.toml` by default) is read into a [`PackScheme`],
//! overridden by the command line, and finalized into a [`PackConfig`]
//! that names everything the pack command needs.

mod scheme;


use std::{
    fs,
    path::{Path, PathBuf},
};

use mboot_image_builder::TrampolinePatchSites;
pub use scheme::{AssetScheme, ImageFormat, MbiScheme, PackScheme, RegionScheme};

use crate::{
    cli::PackArgs,
    error::{Errno, Error, Result},
};

pub const DEFAULT_MANIFEST: &str = "Mbootpack.toml";

/// A checked pack configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackConfig {
    pub entry: u32,
    pub output: PathBuf,
    pub mbi: MbiScheme,
    pub regions: Vec<RegionScheme>,
    pub encoding: Encoding,
}

/// The output format together with the assets it is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding {
    BzImage { bootsect: PathBuf, setup: PathBuf },
    Multiboot { trampoline: Option<TrampolineAsset> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrampolineAsset {
    pub file: PathBuf,
    pub sites: TrampolinePatchSites,
}

impl PackScheme {
    /// Loads the manifest named by `args`, or the default one if it
    /// exists, then applies the rest of `args` on top of it.
    pub fn load_for(args: &PackArgs) -> Result<Self> {
        let mut scheme = match &args.manifest {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_MANIFEST).is_file() => Self::load(DEFAULT_MANIFEST)?,
            None => {
                debug!("No {} found, relying on the command line", DEFAULT_MANIFEST);
                Self::default()
            }
        };
        scheme.apply_args(args);
        Ok(scheme)
    }

    /// Reads the manifest at `path`. Relative paths inside it are taken
    /// relative to the directory holding the manifest.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::with_path(Errno::ParseManifest, "cannot read manifest", path, &e))?;
        let mut scheme = Self::parse(&contents).map_err(|e| {
            Error::new(
                Errno::ParseManifest,
                format!("cannot parse manifest `{}`: {}", path.display(), e),
            )
        })?;
        if let Some(base) = path.parent() {
            scheme.rebase_paths(base);
        }
        debug!("Loaded manifest {}: {:#?}", path.display(), scheme);
        Ok(scheme)
    }

    pub fn parse(contents: &str) -> core::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Command-line values win over the manifest. Regions are appended.
    pub fn apply_args(&mut self, args: &PackArgs) {
        apply_option(&mut self.format, &args.format);
        apply_option(&mut self.entry, &args.entry);
        apply_option(&mut self.output, &args.output);
        apply_option(&mut self.mbi.address, &args.mbi);
        apply_option(&mut self.mbi.file, &args.mbi_file);
        apply_option(&mut self.assets.bootsect, &args.bootsect);
        apply_option(&mut self.assets.setup, &args.setup);
        self.regions
            .extend(args.regions.iter().map(|(start, file)| RegionScheme {
                start: *start,
                file: file.clone(),
            }));
    }

    pub fn finalize(self) -> Result<PackConfig> {
        let format = self.format.unwrap_or_default();
        let Some(entry) = self.entry else {
            return Err(manifest_error("the kernel entry address is not given"));
        };
        let Some(output) = self.output else {
            return Err(manifest_error("the output file is not given"));
        };

        let encoding = match format {
            ImageFormat::BzImage => {
                if self.mbi.address.is_none() && self.mbi.file.is_none() {
                    return Err(manifest_error(
                        "a bzImage needs an MBI address or an MBI file to place",
                    ));
                }
                if self.assets.trampoline.is_some() {
                    warn!("A bzImage has no trampoline, ignoring `assets.trampoline`");
                }
                let (Some(bootsect), Some(setup)) = (self.assets.bootsect, self.assets.setup)
                else {
                    return Err(manifest_error(
                        "a bzImage needs both `assets.bootsect` and `assets.setup`",
                    ));
                };
                Encoding::BzImage { bootsect, setup }
            }
            ImageFormat::Multiboot => {
                if self.mbi.address.is_none() {
                    return Err(manifest_error(
                        "a Multiboot image needs an explicit MBI address",
                    ));
                }
                if self.assets.bootsect.is_some() || self.assets.setup.is_some() {
                    warn!("A Multiboot image has no real-mode header, ignoring the bzImage assets");
                }
                Encoding::Multiboot {
                    trampoline: finalize_trampoline(&self.assets)?,
                }
            }
        };

        Ok(PackConfig {
            entry,
            output,
            mbi: self.mbi,
            regions: self.regions,
            encoding,
        })
    }
}

fn finalize_trampoline(assets: &AssetScheme) -> Result<Option<TrampolineAsset>> {
    let Some(file) = &assets.trampoline else {
        if assets.trampoline_entry_offset.is_some() || assets.trampoline_mbi_offset.is_some() {
            warn!("No trampoline given, ignoring its patch offsets");
        }
        return Ok(None);
    };
    let (Some(entry), Some(mbi)) = (
        assets.trampoline_entry_offset,
        assets.trampoline_mbi_offset,
    ) else {
        return Err(manifest_error(
            "a custom trampoline needs `trampoline-entry-offset` and `trampoline-mbi-offset`",
        ));
    };
    Ok(Some(TrampolineAsset {
        file: file.clone(),
        sites: TrampolinePatchSites { entry, mbi },
    }))
}

fn manifest_error(msg: &str) -> Error {
    Error::new(Errno::ParseManifest, msg)
}

fn apply_option<T: Clone>(item: &mut Option<T>, arg: &Option<T>) {
    if arg.is_some() {
        item.clone_from(arg);
    }
}
