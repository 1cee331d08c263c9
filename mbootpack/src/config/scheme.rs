// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// The contents of a pack manifest, as written by the user.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackScheme {
    pub format: Option<ImageFormat>,
    /// The kernel entry address
    pub entry: Option<u32>,
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub mbi: MbiScheme,
    #[serde(default)]
    pub assets: AssetScheme,
    #[serde(default, rename = "region")]
    pub regions: Vec<RegionScheme>,
}

/// The on-disk encoding of the image.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// A legacy bzImage with real-mode boot sector and setup code.
    #[default]
    #[value(name = "bzimage")]
    BzImage,
    /// A Multiboot ELF32 executable entered through a trampoline.
    Multiboot,
}

/// Where the Multiboot information structure goes.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MbiScheme {
    /// The MBI together with its command lines, as it must appear in memory
    pub file: Option<PathBuf>,
    pub address: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct AssetScheme {
    pub bootsect: Option<PathBuf>,
    pub setup: Option<PathBuf>,
    /// Replaces the built-in Multiboot trampoline
    pub trampoline: Option<PathBuf>,
    pub trampoline_entry_offset: Option<usize>,
    pub trampoline_mbi_offset: Option<usize>,
}

/// A file to be loaded at `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionScheme {
    pub start: u32,
    pub file: PathBuf,
}

impl PackScheme {
    /// Makes every relative path of the manifest relative to `base` instead.
    pub fn rebase_paths(&mut self, base: &Path) {
        let rebase = |path: &mut Option<PathBuf>| {
            if let Some(path) = path {
                rebase_path(path, base);
            }
        };
        rebase(&mut self.output);
        rebase(&mut self.mbi.file);
        rebase(&mut self.assets.bootsect);
        rebase(&mut self.assets.setup);
        rebase(&mut self.assets.trampoline);
        for region in self.regions.iter_mut() {
            rebase_path(&mut region.file, base);
        }
    }
}

fn rebase_path(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}
