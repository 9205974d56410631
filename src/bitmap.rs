//! The sector allocator: one in-use bit per sector, persisted as the free map file.
//! Every operation works on an in-memory copy; nothing reaches the device until
//! `write_back` is called, so a failed operation simply drops its copy.

use alloc::vec;
use alloc::vec::Vec;
use log::trace;

use crate::config::*;
use crate::error::FsError;
use crate::{OpenFile, Result, SectorDevice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorAllocator {
    num_sectors: usize,
    map: Vec<u8>,
}

fn locate(sector: u32) -> (usize, u8) {
    let sector = sector as usize;
    (sector / BITS_IN_BYTE, 1 << (sector % BITS_IN_BYTE))
}

impl SectorAllocator {
    /// An allocator with every sector free.
    pub fn new(num_sectors: usize) -> Self {
        Self {
            num_sectors,
            map: vec![0; free_map_file_size(num_sectors)],
        }
    }

    /// Loads the bitmap from its backing file.
    pub fn fetch_from<D: SectorDevice>(file: &OpenFile<D>, num_sectors: usize) -> Result<Self> {
        let mut free_map = Self::new(num_sectors);
        let read = file.read_at(&mut free_map.map, 0)?;
        if read != free_map.map.len() {
            return Err(FsError::Corrupted);
        }
        Ok(free_map)
    }

    /// Persists the bitmap to its backing file.
    /// Call only once every allocation of the current operation is final.
    pub fn write_back<D: SectorDevice>(&self, file: &OpenFile<D>) -> Result<()> {
        let written = file.write_at(&self.map, 0)?;
        if written != self.map.len() {
            return Err(FsError::WriteError);
        }
        Ok(())
    }

    pub fn num_sectors(&self) -> usize {
        self.num_sectors
    }

    fn check_bounds(&self, sector: u32) -> Result<()> {
        if sector as usize >= self.num_sectors {
            return Err(FsError::OutOfBounds);
        }
        Ok(())
    }

    /// Returns whether the sector is in use. Out-of-range sectors read as free.
    pub fn test(&self, sector: u32) -> bool {
        if sector as usize >= self.num_sectors {
            return false;
        }
        let (byte, mask) = locate(sector);
        self.map[byte] & mask != 0
    }

    /// Marks a sector in use, whatever its previous state.
    pub fn mark(&mut self, sector: u32) -> Result<()> {
        self.check_bounds(sector)?;
        let (byte, mask) = locate(sector);
        self.map[byte] |= mask;
        trace!("[free map] mark sector {}", sector);
        Ok(())
    }

    /// Frees a sector. Clearing a sector that is already free means two
    /// structures claimed it, which is reported as corruption.
    pub fn clear(&mut self, sector: u32) -> Result<()> {
        self.check_bounds(sector)?;
        if !self.test(sector) {
            return Err(FsError::Corrupted);
        }
        let (byte, mask) = locate(sector);
        self.map[byte] &= !mask;
        trace!("[free map] clear sector {}", sector);
        Ok(())
    }

    /// Reserves the lowest-numbered free sector.
    pub fn find_and_set(&mut self) -> Result<u32> {
        for (i, byte) in self.map.iter_mut().enumerate() {
            if *byte == u8::MAX {
                continue;
            }
            for k in 0..BITS_IN_BYTE {
                let sector = i * BITS_IN_BYTE + k;
                if sector >= self.num_sectors {
                    return Err(FsError::NoFreeSector);
                }
                if *byte & (1 << k) == 0 {
                    *byte |= 1 << k;
                    trace!("[free map] allocated sector {}", sector);
                    return Ok(sector as u32);
                }
            }
        }
        Err(FsError::NoFreeSector)
    }

    /// Number of free sectors.
    pub fn num_clear(&self) -> usize {
        (0..self.num_sectors as u32).filter(|&s| !self.test(s)).count()
    }

    /// Sectors currently marked in use, ascending.
    pub fn in_use(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.num_sectors as u32).filter(move |&s| self.test(s))
    }
}
