// SPDX-License-Identifier: MPL-2.0

//! This module contains subcommands of mbootpack.

mod pack;
mod place_mbi;

pub use self::{pack::execute_pack_command, place_mbi::execute_place_mbi_command};
