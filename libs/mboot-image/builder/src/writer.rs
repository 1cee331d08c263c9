// SPDX-License-Identifier: MPL-2.0

use std::io::{Seek, SeekFrom, Write};

use crate::{Error, Result, mapping::FileOffset};

/// Offset-addressed writes into an output owned by the caller.
///
/// The writer never closes the output. The first failed seek or write is
/// returned as is; an image that failed half way must be discarded.
pub struct ImageWriter<'a, W: Write + Seek> {
    out: &'a mut W,
    high_water: u64,
}

impl<'a, W: Write + Seek> ImageWriter<'a, W> {
    pub fn new(out: &'a mut W) -> Self {
        Self { out, high_water: 0 }
    }

    pub fn write_at(&mut self, offset: impl Into<FileOffset>, bytes: &[u8]) -> Result<()> {
        let offset = u64::from(offset.into());
        self.out
            .seek(SeekFrom::Start(offset))
            .map_err(|e| Error::from_io("error seeking in output file", &e))?;
        self.out
            .write_all(bytes)
            .map_err(|e| Error::from_io("error writing to output file", &e))?;
        self.high_water = self.high_water.max(offset + bytes.len() as u64);
        Ok(())
    }

    /// The end of the furthest write so far.
    pub fn high_water(&self) -> u64 {
        self.high_water
    }

    /// Flushes the output and returns the image length.
    pub fn finish(self) -> Result<u64> {
        self.out
            .flush()
            .map_err(|e| Error::from_io("error flushing output file", &e))?;
        Ok(self.high_water)
    }
}
