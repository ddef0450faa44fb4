//! Persistence primitives shared by the suggesters.
//!
//! `DataOutput`/`DataInput` add variable-length integers and big-endian
//! words to any `Write`/`Read`. File helpers cover the header every stored
//! suggester starts with (4-byte magic + version byte), atomic saves and
//! read-only mappings.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::lookup::SuggestError;

/// Magic + version.
pub const HEADER_SIZE: usize = 5;

pub trait DataOutput: Write {
    fn write_byte(&mut self, b: u8) -> io::Result<()> {
        self.write_all(&[b])
    }

    fn write_u32_be(&mut self, v: u32) -> io::Result<()> {
        self.write_all(&v.to_be_bytes())
    }

    /// LEB128: seven bits per byte, low group first, high bit set on all
    /// but the last byte.
    fn write_vlong(&mut self, mut v: u64) -> io::Result<()> {
        while v >= 0x80 {
            self.write_byte((v as u8 & 0x7F) | 0x80)?;
            v >>= 7;
        }
        self.write_byte(v as u8)
    }
}

impl<W: Write + ?Sized> DataOutput for W {}

pub trait DataInput: Read {
    fn read_byte(&mut self) -> io::Result<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    fn read_u32_be(&mut self) -> io::Result<u32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    fn read_vlong(&mut self) -> io::Result<u64> {
        let mut v = 0u64;
        let mut shift = 0;
        loop {
            let b = self.read_byte()?;
            if shift == 63 && b > 1 {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "vlong overflows u64"));
            }
            v |= u64::from(b & 0x7F) << shift;
            if b & 0x80 == 0 {
                return Ok(v);
            }
            shift += 7;
        }
    }
}

impl<R: Read + ?Sized> DataInput for R {}

pub fn write_header<W: Write + ?Sized>(
    out: &mut W,
    magic: &[u8; 4],
    version: u8,
) -> Result<(), SuggestError> {
    out.write_all(magic)?;
    out.write_byte(version)?;
    Ok(())
}

pub fn check_header<R: Read + ?Sized>(
    input: &mut R,
    magic: &'static [u8; 4],
    version: u8,
) -> Result<(), SuggestError> {
    let mut header = [0u8; HEADER_SIZE];
    input.read_exact(&mut header).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => SuggestError::InvalidHeader,
        _ => SuggestError::Io(e),
    })?;
    if &header[..4] != magic {
        return Err(SuggestError::InvalidMagic(
            std::str::from_utf8(magic).unwrap_or("?"),
        ));
    }
    if header[4] != version {
        return Err(SuggestError::UnsupportedVersion(header[4]));
    }
    Ok(())
}

/// Atomic write: write to .tmp then rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SuggestError> {
    let tmp = path.with_extension("tmp");
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Map a stored suggester read-only.
pub fn map_file(path: &Path) -> Result<Mmap, SuggestError> {
    let file = File::open(path)?;
    // SAFETY: The file is opened read-only and the mapping is immutable.
    // The Mmap is owned by the automaton that reads from it, so the data
    // stays valid for its lifetime. The file must not be modified while open.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(mmap)
}
