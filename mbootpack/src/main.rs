// SPDX-License-Identifier: MPL-2.0

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

mod cli;
mod commands;
mod config;
mod error;

use std::process;

fn main() {
    if let Err(err) = cli::main() {
        error_msg!("{}", err);
        process::exit(err.errno() as _);
    }
}
