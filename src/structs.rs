//! On-disk records and their little-endian encodings.
//!
//! Both records are fixed size: a header fills exactly one sector and a
//! directory entry takes `DIR_ENTRY_SIZE` bytes of its directory file.

use alloc::vec::Vec;

use crate::config::*;
use crate::Error;
use crate::Result;

/// Per-file metadata, stored in the file's header sector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHeader {
    pub num_bytes: u32,         // Length of the file in bytes
    pub data_sectors: Vec<u32>, // Sector of each data block, in file order
}

impl FileHeader {
    pub fn encode(&self) -> [u8; SECTOR_SIZE] {
        let mut buf = [0u8; SECTOR_SIZE];
        buf[0..4].copy_from_slice(&self.num_bytes.to_le_bytes());
        buf[4..8].copy_from_slice(&(self.data_sectors.len() as u32).to_le_bytes());
        for (i, sector) in self.data_sectors.iter().enumerate() {
            let off = HEADER_FIXED_SIZE + i * 4;
            buf[off..off + 4].copy_from_slice(&sector.to_le_bytes());
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < SECTOR_SIZE {
            return Err(Error::Corrupted);
        }
        let num_bytes = read_u32(buf, 0);
        let num_sectors = read_u32(buf, 4) as usize;
        if num_sectors > NUM_DIRECT || num_bytes as usize > num_sectors * SECTOR_SIZE {
            return Err(Error::Corrupted);
        }
        let data_sectors = (0..num_sectors)
            .map(|i| read_u32(buf, HEADER_FIXED_SIZE + i * 4))
            .collect();
        Ok(Self { num_bytes, data_sectors })
    }
}

/// One binding of a name to a header sector inside a directory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub in_use: bool,
    pub is_dir: bool,
    pub sector: u32,
    pub name: [u8; MAX_FILE_NAME_LEN],
}

impl DirEntry {
    pub const NULL: Self = Self {
        in_use: false,
        is_dir: false,
        sector: 0,
        name: [0; MAX_FILE_NAME_LEN],
    };

    pub fn new(sector: u32, name: &[u8], is_dir: bool) -> Result<Self> {
        if !valid_name(name) {
            return Err(Error::InvalidFileName);
        }
        let mut arr = [0; MAX_FILE_NAME_LEN];
        arr[..name.len()].copy_from_slice(name);
        Ok(Self {
            in_use: true,
            is_dir,
            sector,
            name: arr,
        })
    }

    pub fn encode(&self, buf: &mut [u8]) {
        buf[0] = self.in_use as u8;
        buf[1] = self.is_dir as u8;
        buf[2..4].fill(0);
        buf[4..8].copy_from_slice(&self.sector.to_le_bytes());
        buf[8..DIR_ENTRY_SIZE].copy_from_slice(&self.name);
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut name = [0; MAX_FILE_NAME_LEN];
        name.copy_from_slice(&buf[8..DIR_ENTRY_SIZE]);
        Self {
            in_use: buf[0] != 0,
            is_dir: buf[1] != 0,
            sector: read_u32(buf, 4),
            name,
        }
    }
}

/// A component name is 1..=MAX_FILE_NAME_LEN bytes, with no separator and no NUL.
pub fn valid_name(name: &[u8]) -> bool {
    !name.is_empty()
        && name.len() <= MAX_FILE_NAME_LEN
        && !name.iter().any(|&c| c == b'/' || c == 0)
}

fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}
