//! File header operations: reserving and releasing data sectors, and moving
//! the header between memory and its sector.

use core::fmt;

use log::trace;

use crate::config::*;
use crate::error::FsError;
use crate::{FileHeader, Result, SectorAllocator, SectorDevice};

impl FileHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves enough data sectors for `file_size` bytes.
    /// Fails before touching `free_map` if the size is over the limit or
    /// the allocator cannot supply every sector.
    /// Expects a fresh header.
    pub fn allocate(&mut self, free_map: &mut SectorAllocator, file_size: usize) -> Result<()> {
        if file_size > MAX_FILE_SIZE {
            return Err(FsError::FileTooLarge);
        }
        let num_sectors = file_size.div_ceil(SECTOR_SIZE);
        if free_map.num_clear() < num_sectors {
            return Err(FsError::AllocationFailed);
        }

        self.num_bytes = file_size as u32;
        self.data_sectors.clear();
        for _ in 0..num_sectors {
            let sector = free_map
                .find_and_set()
                .map_err(|_| FsError::AllocationFailed)?;
            self.data_sectors.push(sector);
        }
        trace!("[header] allocated {} data sectors for {} bytes", num_sectors, file_size);
        Ok(())
    }

    /// Returns every data sector to the allocator. The header's own sector
    /// is the caller's to clear.
    pub fn deallocate(&self, free_map: &mut SectorAllocator) -> Result<()> {
        for &sector in &self.data_sectors {
            free_map.clear(sector)?;
        }
        Ok(())
    }

    pub fn fetch_from(device: &impl SectorDevice, sector: u32) -> Result<Self> {
        let mut buf = [0u8; SECTOR_SIZE];
        device.read_sector(sector, &mut buf)?;
        FileHeader::decode(&buf)
    }

    pub fn write_back(&self, device: &impl SectorDevice, sector: u32) -> Result<()> {
        device.write_sector(sector, &self.encode())
    }

    /// Maps a byte offset within the file to the sector holding it.
    pub fn byte_to_sector(&self, offset: usize) -> Result<u32> {
        self.data_sectors
            .get(offset / SECTOR_SIZE)
            .copied()
            .ok_or(FsError::OutOfBounds)
    }

    pub fn file_length(&self) -> usize {
        self.num_bytes as usize
    }

    pub fn num_sectors(&self) -> usize {
        self.data_sectors.len()
    }
}

impl fmt::Display for FileHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "size {} bytes, blocks [", self.num_bytes)?;
        for (i, sector) in self.data_sectors.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", sector)?;
        }
        f.write_str("]")
    }
}
