// SPDX-License-Identifier: MPL-2.0

use mboot_image_builder::place_mbi;

use crate::{cli::PlaceMbiArgs, error::Result};

/// Prints where a bzImage keeps an MBI of `args.size` bytes.
pub fn execute_place_mbi_command(args: &PlaceMbiArgs) -> Result<()> {
    let address = place_mbi(args.size)?;
    println!("{:#x}", address);
    Ok(())
}
