// SPDX-License-Identifier: MPL-2.0

use std::{fmt, io};

/// The error types of the image builder.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Errno {
    /// A region violates a placement constraint of the chosen image format.
    LayoutViolation,
    /// Seeking in or writing to the output failed.
    IoFailed,
    /// A boot asset does not have the shape its format requires.
    InvalidAsset,
}

/// The error with an error type and an error message.
///
/// I/O failures also keep the kind of the underlying [`io::Error`].
#[derive(Clone, Copy, Debug)]
pub struct Error {
    errno: Errno,
    msg: Option<&'static str>,
    io_kind: Option<io::ErrorKind>,
}

impl Error {
    /// Creates a new error with the given error type and no error message.
    pub const fn new(errno: Errno) -> Self {
        Error {
            errno,
            msg: None,
            io_kind: None,
        }
    }

    /// Creates a new error with the given error type and the error message.
    pub const fn with_message(errno: Errno, msg: &'static str) -> Self {
        Error {
            errno,
            msg: Some(msg),
            io_kind: None,
        }
    }

    /// Creates an [`Errno::IoFailed`] error from a failed I/O operation.
    pub fn from_io(msg: &'static str, io_error: &io::Error) -> Self {
        Error {
            errno: Errno::IoFailed,
            msg: Some(msg),
            io_kind: Some(io_error.kind()),
        }
    }

    /// Returns the error type.
    pub const fn error(&self) -> Errno {
        self.errno
    }

    pub const fn message(&self) -> Option<&'static str> {
        self.msg
    }

    pub const fn io_kind(&self) -> Option<io::ErrorKind> {
        self.io_kind
    }
}

impl From<Errno> for Error {
    fn from(errno: Errno) -> Self {
        Error::new(errno)
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Errno::LayoutViolation => "layout violation",
            Errno::IoFailed => "I/O failure",
            Errno::InvalidAsset => "invalid boot asset",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.msg, self.io_kind) {
            (Some(msg), Some(kind)) => write!(f, "{}: {}", msg, kind),
            (Some(msg), None) => f.write_str(msg),
            (None, _) => write!(f, "{}", self.errno),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;

#[macro_export]
macro_rules! return_errno_with_message {
    ($errno: expr, $message: expr) => {
        return core::result::Result::Err($crate::Error::with_message($errno, $message))
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn io_error_keeps_kind() {
        let io_error = io::Error::from(io::ErrorKind::StorageFull);
        let error = Error::from_io("error writing to output file", &io_error);
        assert_eq!(error.error(), Errno::IoFailed);
        assert_eq!(error.io_kind(), Some(io::ErrorKind::StorageFull));
        assert!(error.to_string().starts_with("error writing to output file: "));
    }

    #[test]
    fn display_without_message() {
        let error = Error::from(Errno::LayoutViolation);
        assert_eq!(error.to_string(), "layout violation");
        assert_eq!(error.message(), None);
    }
}
