//! Byte-stream access to a file through its header.
//! Files never grow: reads and writes are clipped at the length fixed at creation.

use alloc::sync::Arc;

use crate::config::SECTOR_SIZE;
use crate::{FileHeader, Result, SectorDevice};

#[derive(Debug)]
pub struct OpenFile<D: SectorDevice> {
    device: Arc<D>,
    sector: u32,
    header: FileHeader,
    seek_position: usize,
}

impl<D: SectorDevice> OpenFile<D> {
    /// Opens the file whose header lives in `sector`.
    pub fn open(device: Arc<D>, sector: u32) -> Result<Self> {
        let header = FileHeader::fetch_from(&*device, sector)?;
        Ok(Self {
            device,
            sector,
            header,
            seek_position: 0,
        })
    }

    pub fn sector(&self) -> u32 {
        self.sector
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn length(&self) -> usize {
        self.header.file_length()
    }

    pub fn seek(&mut self, position: usize) {
        self.seek_position = position;
    }

    /// Reads from the current position and advances it.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.read_at(buf, self.seek_position)?;
        self.seek_position += n;
        Ok(n)
    }

    /// Writes at the current position and advances it.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.write_at(buf, self.seek_position)?;
        self.seek_position += n;
        Ok(n)
    }

    /// Reads up to `buf.len()` bytes starting at `position`.
    /// Returns the number of bytes read, 0 at or past the end of file.
    pub fn read_at(&self, buf: &mut [u8], position: usize) -> Result<usize> {
        let file_length = self.length();
        if buf.is_empty() || position >= file_length {
            return Ok(0);
        }
        let num_bytes = buf.len().min(file_length - position);

        let mut sector_buf = [0u8; SECTOR_SIZE];
        let mut done = 0;
        while done < num_bytes {
            let offset = position + done;
            let inner = offset % SECTOR_SIZE;
            let chunk = (SECTOR_SIZE - inner).min(num_bytes - done);
            let sector = self.header.byte_to_sector(offset)?;
            self.device.read_sector(sector, &mut sector_buf)?;
            buf[done..done + chunk].copy_from_slice(&sector_buf[inner..inner + chunk]);
            done += chunk;
        }
        Ok(done)
    }

    /// Writes up to `buf.len()` bytes starting at `position`.
    /// Partial sectors are read, patched and written back; whole sectors are overwritten.
    pub fn write_at(&self, buf: &[u8], position: usize) -> Result<usize> {
        let file_length = self.length();
        if buf.is_empty() || position >= file_length {
            return Ok(0);
        }
        let num_bytes = buf.len().min(file_length - position);

        let mut sector_buf = [0u8; SECTOR_SIZE];
        let mut done = 0;
        while done < num_bytes {
            let offset = position + done;
            let inner = offset % SECTOR_SIZE;
            let chunk = (SECTOR_SIZE - inner).min(num_bytes - done);
            let sector = self.header.byte_to_sector(offset)?;
            if chunk < SECTOR_SIZE {
                self.device.read_sector(sector, &mut sector_buf)?;
            }
            sector_buf[inner..inner + chunk].copy_from_slice(&buf[done..done + chunk]);
            self.device.write_sector(sector, &sector_buf)?;
            done += chunk;
        }
        Ok(done)
    }
}
