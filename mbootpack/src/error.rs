// SPDX-License-Identifier: MPL-2.0

use std::{fmt, io, path::Path};

/// The exit codes of `mbootpack`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    ParseManifest = 1,
    ReadInput = 2,
    CreateOutput = 3,
    Layout = 4,
    Io = 5,
    Asset = 6,
}

/// A fatal condition, with the exit code to report it with.
#[derive(Debug)]
pub struct Error {
    errno: Errno,
    msg: String,
}

impl Error {
    pub fn new(errno: Errno, msg: impl Into<String>) -> Self {
        Self {
            errno,
            msg: msg.into(),
        }
    }

    /// An error of `errno` caused by an I/O failure on `path`.
    pub fn with_path(errno: Errno, what: &str, path: &Path, error: &io::Error) -> Self {
        Self::new(errno, format!("{} `{}`: {}", what, path.display(), error))
    }

    pub fn errno(&self) -> Errno {
        self.errno
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl From<mboot_image_builder::Error> for Error {
    fn from(error: mboot_image_builder::Error) -> Self {
        let errno = match error.error() {
            mboot_image_builder::Errno::LayoutViolation => Errno::Layout,
            mboot_image_builder::Errno::IoFailed => Errno::Io,
            mboot_image_builder::Errno::InvalidAsset => Errno::Asset,
        };
        Self::new(errno, error.to_string())
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Print error message to console
#[macro_export]
macro_rules! error_msg {
    () => {
        std::eprint!("")
    };
    ($($arg:tt)*) => {{
        std::eprint!("[Error]: ");
        std::eprint!($($arg)*);
        std::eprint!("\n")
    }};
}
