//! Length-prefixed record streams used for spill files and sort partitions.
//!
//! Each record is a big-endian `u16` length followed by that many bytes.

use std::io::{self, Read, Write};

use super::SortError;

/// Longest entry a record can carry.
pub const MAX_ENTRY_LEN: usize = u16::MAX as usize;

pub struct ByteSequencesWriter<W: Write> {
    out: W,
}

impl<W: Write> ByteSequencesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write(&mut self, entry: &[u8]) -> Result<(), SortError> {
        let len: u16 = entry
            .len()
            .try_into()
            .map_err(|_| SortError::EntryTooLong(entry.len()))?;
        self.out.write_all(&len.to_be_bytes())?;
        self.out.write_all(entry)?;
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W, SortError> {
        self.out.flush()?;
        Ok(self.out)
    }
}

pub struct ByteSequencesReader<R: Read> {
    input: R,
}

impl<R: Read> ByteSequencesReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Read the next record into `buf`. Returns `false` at a clean end of
    /// stream; a record cut short is an `UnexpectedEof` error.
    pub fn read_into(&mut self, buf: &mut Vec<u8>) -> Result<bool, SortError> {
        let mut len = [0u8; 2];
        let mut filled = 0;
        while filled < len.len() {
            match self.input.read(&mut len[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "truncated record length",
                    )
                    .into())
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        buf.clear();
        buf.resize(u16::from_be_bytes(len) as usize, 0);
        self.input.read_exact(buf)?;
        Ok(true)
    }

    pub fn read(&mut self) -> Result<Option<Vec<u8>>, SortError> {
        let mut buf = Vec::new();
        Ok(self.read_into(&mut buf)?.then_some(buf))
    }
}
