//! Common utilities for tests

use std::str::FromStr;
use std::sync::{Arc, Mutex, Once};

use log::{LevelFilter, Log, Metadata, Record};
use sectorfs::{Error, SectorDevice, SECTOR_SIZE};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

struct TestLogger;

impl Log for TestLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: TestLogger = TestLogger;
static INIT: Once = Once::new();

/// Routes the crate's log output to stdout. The level comes from
/// `SECTORFS_LOG` (e.g. `trace`) and defaults to `debug`.
pub fn init_logger() {
    INIT.call_once(|| {
        let level = std::env::var("SECTORFS_LOG")
            .ok()
            .and_then(|s| LevelFilter::from_str(&s).ok())
            .unwrap_or(LevelFilter::Debug);
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level);
        }
    });
}

pub struct RamDisk {
    inner: Arc<Mutex<Vec<u8>>>,
    num_sectors: usize,
}

impl RamDisk {
    /// Creates a new RamDisk with the specified number of sectors.
    /// Each sector is SECTOR_SIZE bytes.
    pub fn new(num_sectors: usize) -> Self {
        let size = num_sectors * SECTOR_SIZE;
        let inner = Arc::new(Mutex::new(vec![0u8; size]));
        RamDisk { inner, num_sectors }
    }

    /// Copy of the whole device contents.
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().unwrap().clone()
    }
}

impl SectorDevice for RamDisk {
    fn num_sectors(&self) -> usize {
        self.num_sectors
    }

    fn read_sector(&self, sector: u32, buf: &mut [u8]) -> Result<(), Error> {
        if sector as usize >= self.num_sectors {
            return Err(Error::InvalidSectorId);
        }
        if buf.len() != SECTOR_SIZE {
            return Err(Error::ReadError);
        }
        let start = sector as usize * SECTOR_SIZE;
        let data = self.inner.lock().unwrap();
        buf.copy_from_slice(&data[start..start + SECTOR_SIZE]);
        Ok(())
    }

    fn write_sector(&self, sector: u32, buf: &[u8]) -> Result<(), Error> {
        if sector as usize >= self.num_sectors {
            return Err(Error::InvalidSectorId);
        }
        if buf.len() != SECTOR_SIZE {
            return Err(Error::WriteError);
        }
        let start = sector as usize * SECTOR_SIZE;
        let mut data = self.inner.lock().unwrap();
        data[start..start + SECTOR_SIZE].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        // In a RAM disk, flushing is a no-op since data is already in memory.
        Ok(())
    }
}

/// A RamDisk that starts rejecting writes once a write budget runs out,
/// standing in for a machine that stops in the middle of a write-back.
pub struct FaultyDisk {
    pub disk: RamDisk,
    writes_left: Mutex<Option<usize>>,
}

impl FaultyDisk {
    pub fn new(num_sectors: usize) -> Self {
        FaultyDisk {
            disk: RamDisk::new(num_sectors),
            writes_left: Mutex::new(None),
        }
    }

    /// Allows `n` more sector writes, then fails every write.
    pub fn fail_after(&self, n: usize) {
        *self.writes_left.lock().unwrap() = Some(n);
    }

    pub fn heal(&self) {
        *self.writes_left.lock().unwrap() = None;
    }
}

impl SectorDevice for FaultyDisk {
    fn num_sectors(&self) -> usize {
        self.disk.num_sectors()
    }

    fn read_sector(&self, sector: u32, buf: &mut [u8]) -> Result<(), Error> {
        self.disk.read_sector(sector, buf)
    }

    fn write_sector(&self, sector: u32, buf: &[u8]) -> Result<(), Error> {
        let mut left = self.writes_left.lock().unwrap();
        match *left {
            Some(0) => return Err(Error::IoError),
            Some(n) => *left = Some(n - 1),
            None => {}
        }
        self.disk.write_sector(sector, buf)
    }

    fn flush(&self) -> Result<(), Error> {
        self.disk.flush()
    }
}
