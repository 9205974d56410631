use crate::error::FsError;


pub trait SectorDevice: Send + Sync {
    /// Returns the number of sectors on the device.
    fn num_sectors(&self) -> usize;

    /// Reads one sector into `buf`.
    /// buf.len() must be equal to sector_size().
    fn read_sector(&self, sector: u32, buf: &mut [u8]) -> Result<(), FsError>;

    /// Writes one sector from `buf`.
    /// buf.len() must be equal to sector_size().
    fn write_sector(&self, sector: u32, buf: &[u8]) -> Result<(), FsError>;

    /// Flushes anything the device buffers internally.
    fn flush(&self) -> Result<(), FsError>;

    /// Returns the size of each sector in bytes.
    fn sector_size(&self) -> usize {
        crate::config::SECTOR_SIZE
    }
}
