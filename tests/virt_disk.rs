#![allow(unused)]

mod common;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use common::init_logger;
use sectorfs::*;

const DISK_SECTORS: usize = 1024;

/// A sector device backed by a host image file.
pub struct VirtDisk {
    inner: Mutex<File>,
}

impl VirtDisk {
    pub fn create(path: &PathBuf) -> std::io::Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len((DISK_SECTORS * SECTOR_SIZE) as u64)?;
        Ok(VirtDisk { inner: Mutex::new(file) })
    }

    pub fn open(path: &PathBuf) -> std::io::Result<Self> {
        let file = File::options().read(true).write(true).open(path)?;
        Ok(VirtDisk { inner: Mutex::new(file) })
    }
}

impl SectorDevice for VirtDisk {
    fn num_sectors(&self) -> usize {
        DISK_SECTORS
    }

    fn read_sector(&self, sector: u32, buf: &mut [u8]) -> Result<()> {
        if sector as usize >= DISK_SECTORS {
            return Err(Error::InvalidSectorId);
        }
        let mut inner = self.inner.lock().unwrap();
        inner
            .seek(SeekFrom::Start(sector as u64 * SECTOR_SIZE as u64))
            .map_err(|_| Error::IoError)?;
        inner.read_exact(buf).map_err(|_| Error::ReadError)
    }

    fn write_sector(&self, sector: u32, buf: &[u8]) -> Result<()> {
        if sector as usize >= DISK_SECTORS {
            return Err(Error::InvalidSectorId);
        }
        let mut inner = self.inner.lock().unwrap();
        inner
            .seek(SeekFrom::Start(sector as u64 * SECTOR_SIZE as u64))
            .map_err(|_| Error::IoError)?;
        inner.write_all(buf).map_err(|_| Error::WriteError)
    }

    fn flush(&self) -> Result<()> {
        self.inner.lock().unwrap().flush().map_err(|_| Error::IoError)
    }
}

fn image_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sectorfs-{}-{}.img", name, std::process::id()))
}

#[test]
fn disk_format_and_remount() {
    init_logger();
    let path = image_path("remount");
    {
        let disk = VirtDisk::create(&path).unwrap();
        let mut fs = FileSystem::format(Arc::new(disk)).unwrap();
        fs.create_dir("/home").unwrap();
        fs.create_dir("/home/user").unwrap();
        fs.copy_in("/home/user/notes.txt", b"remember the milk").unwrap();
        fs.unmount().unwrap();
    }

    let disk = VirtDisk::open(&path).unwrap();
    let mut fs = FileSystem::mount(Arc::new(disk)).unwrap();
    log!("File System mounted: {}", fs.dump().unwrap());
    assert_eq!(fs.read_file("/home/user/notes.txt").unwrap(), b"remember the milk");
    assert!(fs.check().unwrap().is_consistent());

    fs.remove("/home", true).unwrap();
    assert!(fs.list("/", true).unwrap().is_empty());
    assert_eq!(fs.free_sectors().unwrap(), DISK_SECTORS - 6);
    fs.unmount().unwrap();

    std::fs::remove_file(&path).unwrap();
}
