// SPDX-License-Identifier: MPL-2.0

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, crate_version};
use mboot_image_builder::Verbosity;

use crate::{
    commands::{execute_pack_command, execute_place_mbi_command},
    config::{ImageFormat, PackScheme},
    error::Result,
};

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(&cli.common);

    match &cli.command {
        Command::Pack(pack_args) => {
            let config = PackScheme::load_for(pack_args)?.finalize()?;
            execute_pack_command(&config, cli.common.verbosity())
        }
        Command::PlaceMbi(args) => execute_place_mbi_command(args),
    }
}

fn init_logger(common: &CommonArgs) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(common.default_filter()),
    )
    .format_timestamp(None)
    .init();
}

#[derive(Debug, Parser)]
#[command(name = "mbootpack", version = crate_version!())]
/// Repackage a kernel and its modules as a bzImage or a Multiboot ELF
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Write the memory image out in a bootable format")]
    Pack(PackArgs),
    #[command(about = "Print the address reserved for an MBI of the given size")]
    PlaceMbi(PlaceMbiArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct CommonArgs {
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Only report warnings and errors"
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        global = true,
        help = "Also report debug messages, such as the planned layout"
    )]
    pub verbose: bool,
}

impl CommonArgs {
    /// The log filter used when `RUST_LOG` is not set.
    pub fn default_filter(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct PackArgs {
    #[arg(
        long,
        help = "The pack manifest [default: Mbootpack.toml if present]",
        value_name = "PATH"
    )]
    pub manifest: Option<PathBuf>,
    #[arg(long, help = "The image format", value_name = "FORMAT")]
    pub format: Option<ImageFormat>,
    #[arg(long, help = "The kernel entry address", value_name = "ADDR", value_parser = parse_addr)]
    pub entry: Option<u32>,
    #[arg(long, help = "The MBI address", value_name = "ADDR", value_parser = parse_addr)]
    pub mbi: Option<u32>,
    #[arg(long = "mbi-file", help = "The MBI and command lines blob", value_name = "PATH")]
    pub mbi_file: Option<PathBuf>,
    #[arg(short, long, help = "The output image", value_name = "PATH")]
    pub output: Option<PathBuf>,
    #[arg(
        long = "region",
        help = "A raw memory region, appended to those of the manifest",
        value_name = "ADDR=PATH",
        value_parser = parse_region
    )]
    pub regions: Vec<(u32, PathBuf)>,
    #[arg(long, help = "The bzImage boot sector", value_name = "PATH")]
    pub bootsect: Option<PathBuf>,
    #[arg(long, help = "The bzImage setup code", value_name = "PATH")]
    pub setup: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct PlaceMbiArgs {
    #[arg(help = "Bytes needed by the MBI and its strings", value_parser = parse_size)]
    pub size: usize,
}

/// Parses an address given in hexadecimal with a `0x` prefix, or in decimal.
pub fn parse_addr(s: &str) -> core::result::Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("`{}` is not a 32-bit address: {}", s, e))
}

fn parse_size(s: &str) -> core::result::Result<usize, String> {
    parse_addr(s).map(|size| size as usize)
}

/// Parses `ADDR=PATH`.
pub fn parse_region(s: &str) -> core::result::Result<(u32, PathBuf), String> {
    let Some((addr, path)) = s.split_once('=') else {
        return Err(format!("`{}` is not of the form ADDR=PATH", s));
    };
    if path.is_empty() {
        return Err(format!("`{}` names no file", s));
    }
    Ok((parse_addr(addr)?, PathBuf::from(path)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn addresses() {
        assert_eq!(parse_addr("0x100000"), Ok(0x100000));
        assert_eq!(parse_addr("0X9f00"), Ok(0x9F00));
        assert_eq!(parse_addr("0x10_0000"), Ok(0x100000));
        assert_eq!(parse_addr("4096"), Ok(4096));
        assert!(parse_addr("0x1_0000_0000").is_err());
        assert!(parse_addr("kernel").is_err());
    }

    #[test]
    fn regions() {
        assert_eq!(
            parse_region("0x100000=build/kernel.bin"),
            Ok((0x100000, PathBuf::from("build/kernel.bin")))
        );
        assert!(parse_region("0x100000").is_err());
        assert!(parse_region("0x100000=").is_err());
    }

    #[test]
    fn pack_command_line() {
        let cli = Cli::try_parse_from([
            "mbootpack",
            "pack",
            "-q",
            "--format",
            "multiboot",
            "--entry",
            "0x100000",
            "--region",
            "0x100000=kernel.bin",
            "--region",
            "0x200000=initrd.img",
        ])
        .unwrap();
        assert!(cli.common.quiet);
        assert_eq!(cli.common.verbosity(), Verbosity::Quiet);
        let Command::Pack(args) = cli.command else {
            panic!("expected the pack command");
        };
        assert_eq!(args.format, Some(ImageFormat::Multiboot));
        assert_eq!(args.entry, Some(0x100000));
        assert_eq!(args.regions.len(), 2);
    }

    #[test]
    fn log_filters() {
        let common = |args: &[&str]| {
            Cli::try_parse_from(["mbootpack"].iter().chain(args).chain(&["place-mbi", "256"]))
                .unwrap()
                .common
        };
        assert_eq!(common(&[]).default_filter(), "info");
        assert_eq!(common(&["-q"]).default_filter(), "warn");
        assert_eq!(common(&["--verbose"]).default_filter(), "debug");
        assert_eq!(common(&["-v"]).verbosity(), Verbosity::Normal);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["mbootpack", "-q", "-v", "place-mbi", "256"]).is_err());
    }
}
