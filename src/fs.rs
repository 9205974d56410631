use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Write;

use log::{debug, info, warn};

use crate::config::*;
use crate::directory::load_subdirectory;
use crate::path::{walk, Terminal, Walk};
use crate::{
    Directory, Error, FileHeader, FileId, ListEntry, OpenFile, OpenFileTable, Result,
    SectorAllocator, SectorDevice,
};

/// The file system service.
///
/// The free map file and the root directory file stay open for the whole
/// lifetime of this object. Every mutating operation reads fresh copies of the
/// structures it needs, changes them in memory, and only writes them back once
/// all of its checks have passed: new header first, then the directory table,
/// then the free map. A failure before that point leaves the device untouched.
///
/// There is no journal. If the device stops accepting writes partway through
/// the write-back, the structures already written and the ones not yet written
/// disagree; `check` reports such a state but nothing repairs it.
///
/// Operations take `&mut self` and run to completion; callers sharing one
/// instance must serialize access themselves.
#[derive(Debug)]
pub struct FileSystem<D: SectorDevice> {
    device: Arc<D>,
    num_sectors: usize,
    free_map_file: OpenFile<D>,
    directory_file: OpenFile<D>,
    open_files: OpenFileTable<D>,
}

fn check_geometry(device: &impl SectorDevice) -> Result<usize> {
    let num_sectors = device.num_sectors();
    if device.sector_size() != SECTOR_SIZE
        || num_sectors <= DIRECTORY_SECTOR as usize
        || free_map_file_size(num_sectors) > MAX_FILE_SIZE
    {
        return Err(Error::OutOfBounds);
    }
    Ok(num_sectors)
}

impl<D: SectorDevice> FileSystem<D> {
    /// Lays an empty file system onto `device`: the two bootstrap headers, the
    /// free map file and an empty root directory.
    pub fn format(device: Arc<D>) -> Result<Self> {
        let num_sectors = check_geometry(&*device)?;
        info!("[fs] formatting device of {} sectors", num_sectors);

        let mut free_map = SectorAllocator::new(num_sectors);
        let mut map_header = FileHeader::new();
        let mut dir_header = FileHeader::new();

        free_map.mark(FREE_MAP_SECTOR)?;
        free_map.mark(DIRECTORY_SECTOR)?;
        map_header.allocate(&mut free_map, free_map_file_size(num_sectors))?;
        dir_header.allocate(&mut free_map, DIRECTORY_FILE_SIZE)?;

        // Headers must be on the device before the files can be opened.
        map_header.write_back(&*device, FREE_MAP_SECTOR)?;
        dir_header.write_back(&*device, DIRECTORY_SECTOR)?;

        let free_map_file = OpenFile::open(Arc::clone(&device), FREE_MAP_SECTOR)?;
        let directory_file = OpenFile::open(Arc::clone(&device), DIRECTORY_SECTOR)?;
        free_map.write_back(&free_map_file)?;
        Directory::new(NUM_DIR_ENTRIES).write_back(&directory_file)?;
        device.flush()?;

        info!(
            "[fs] formatted, {} of {} sectors free",
            free_map.num_clear(),
            num_sectors
        );
        Ok(Self {
            device,
            num_sectors,
            free_map_file,
            directory_file,
            open_files: OpenFileTable::new(),
        })
    }

    /// Opens the free map and root directory of an already formatted device.
    pub fn mount(device: Arc<D>) -> Result<Self> {
        let num_sectors = check_geometry(&*device)?;
        let free_map_file = OpenFile::open(Arc::clone(&device), FREE_MAP_SECTOR)?;
        let directory_file = OpenFile::open(Arc::clone(&device), DIRECTORY_SECTOR)?;
        if free_map_file.length() != free_map_file_size(num_sectors)
            || directory_file.length() != DIRECTORY_FILE_SIZE
        {
            return Err(Error::Corrupted);
        }
        info!("[fs] mounted device of {} sectors", num_sectors);
        Ok(Self {
            device,
            num_sectors,
            free_map_file,
            directory_file,
            open_files: OpenFileTable::new(),
        })
    }

    /// Closes every open file and the two bootstrap files, then flushes the device.
    pub fn unmount(self) -> Result<()> {
        if !self.open_files.is_empty() {
            debug!("[fs] unmount closes {} open files", self.open_files.len());
        }
        self.device.flush()?;
        info!("[fs] unmounted");
        Ok(())
    }

    fn walk<'p>(&self, path: &'p str) -> Result<Walk<'p, D>> {
        walk(&self.device, &self.directory_file, path)
    }

    pub(crate) fn fetch_free_map(&self) -> Result<SectorAllocator> {
        SectorAllocator::fetch_from(&self.free_map_file, self.num_sectors)
    }

    /// Writes a modified table back to the file it was read from.
    fn commit_dir(&self, dir: &Directory, dir_file: &Option<OpenFile<D>>) -> Result<()> {
        dir.write_back(dir_file.as_ref().unwrap_or(&self.directory_file))
    }

    /// Creates a regular file of fixed `size` bytes.
    pub fn create(&mut self, path: &str, size: usize) -> Result<()> {
        debug!("[fs] create {} ({} bytes)", path, size);
        self.create_entry(path, size, false)
            .inspect_err(|e| warn!("[fs] create {} failed: {}", path, e))
    }

    /// Creates an empty directory.
    pub fn create_dir(&mut self, path: &str) -> Result<()> {
        debug!("[fs] create_dir {}", path);
        self.create_entry(path, DIRECTORY_FILE_SIZE, true)
            .inspect_err(|e| warn!("[fs] create_dir {} failed: {}", path, e))
    }

    fn create_entry(&mut self, path: &str, size: usize, is_dir: bool) -> Result<()> {
        let Walk {
            mut dir,
            dir_file,
            terminal,
        } = self.walk(path)?;
        let name = match terminal {
            Terminal::Absent { name } => name,
            Terminal::Root | Terminal::Found { .. } => return Err(Error::AlreadyExists),
        };
        if size > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge);
        }
        if dir.is_full() {
            return Err(Error::DirectoryFull);
        }

        let mut free_map = self.fetch_free_map()?;
        let sector = free_map.find_and_set()?;
        let mut header = FileHeader::new();
        header.allocate(&mut free_map, size)?;
        dir.add(name, sector, is_dir)?;

        header.write_back(&*self.device, sector)?;
        if is_dir {
            let new_dir_file = OpenFile::open(Arc::clone(&self.device), sector)?;
            Directory::new(NUM_DIR_ENTRIES).write_back(&new_dir_file)?;
        }
        self.commit_dir(&dir, &dir_file)?;
        free_map.write_back(&self.free_map_file)?;

        debug!(
            "[fs] {} created, header at sector {}, {} data sectors",
            path,
            sector,
            header.num_sectors()
        );
        Ok(())
    }

    /// Opens a regular file (or the root directory file for `/`).
    pub fn open(&mut self, path: &str) -> Result<FileId> {
        debug!("[fs] open {}", path);
        let sector = match self.walk(path)?.terminal {
            Terminal::Root => DIRECTORY_SECTOR,
            Terminal::Found { is_dir: true, .. } => return Err(Error::IsADirectory),
            Terminal::Found { sector, .. } => sector,
            Terminal::Absent { .. } => return Err(Error::NotFound),
        };
        let file = OpenFile::open(Arc::clone(&self.device), sector)?;
        let id = self.open_files.insert(file);
        debug!("[fs] {} opened as {:?}", path, id);
        Ok(id)
    }

    pub fn close(&mut self, id: FileId) -> Result<()> {
        self.open_files.remove(id).map(|_| ())
    }

    pub fn read(&mut self, id: FileId, buf: &mut [u8]) -> Result<usize> {
        self.open_files.get_mut(id)?.read(buf)
    }

    pub fn write(&mut self, id: FileId, buf: &[u8]) -> Result<usize> {
        self.open_files.get_mut(id)?.write(buf)
    }

    pub fn read_at(&self, id: FileId, buf: &mut [u8], position: usize) -> Result<usize> {
        self.open_files.get(id)?.read_at(buf, position)
    }

    pub fn write_at(&self, id: FileId, buf: &[u8], position: usize) -> Result<usize> {
        self.open_files.get(id)?.write_at(buf, position)
    }

    pub fn seek(&mut self, id: FileId, position: usize) -> Result<()> {
        self.open_files.get_mut(id)?.seek(position);
        Ok(())
    }

    pub fn file_length(&self, id: FileId) -> Result<usize> {
        Ok(self.open_files.get(id)?.length())
    }

    pub fn open_file_count(&self) -> usize {
        self.open_files.len()
    }

    /// Removes a file, or with `recursive` a directory and everything below it.
    /// Files still open through a handle are not tracked; their handles keep
    /// pointing at sectors that may be reused.
    pub fn remove(&mut self, path: &str, recursive: bool) -> Result<()> {
        debug!("[fs] remove {} (recursive: {})", path, recursive);
        self.remove_entry(path, recursive)
            .inspect_err(|e| warn!("[fs] remove {} failed: {}", path, e))
    }

    fn remove_entry(&mut self, path: &str, recursive: bool) -> Result<()> {
        let Walk {
            mut dir,
            dir_file,
            terminal,
        } = self.walk(path)?;
        let (name, sector, is_dir) = match terminal {
            Terminal::Found {
                name,
                sector,
                is_dir,
            } => (name, sector, is_dir),
            Terminal::Absent { .. } => return Err(Error::NotFound),
            Terminal::Root => return Err(Error::InvalidPath),
        };
        if is_dir && !recursive {
            return Err(Error::NotEmptyOrNotRecursive);
        }

        let mut free_map = self.fetch_free_map()?;
        if is_dir {
            let subtree = load_subdirectory(&self.device, sector)?;
            subtree.recursive_remove(&self.device, &mut free_map)?;
        }
        let header = FileHeader::fetch_from(&*self.device, sector)?;
        header.deallocate(&mut free_map)?;
        free_map.clear(sector)?;
        dir.remove(name)?;

        self.commit_dir(&dir, &dir_file)?;
        free_map.write_back(&self.free_map_file)?;
        debug!("[fs] {} removed", path);
        Ok(())
    }

    /// Lists the directory at `path` (the root for an empty path), one level or
    /// the whole subtree in pre-order.
    pub fn list(&self, path: &str, recursive: bool) -> Result<Vec<ListEntry>> {
        debug!("[fs] list {} (recursive: {})", path, recursive);
        let Walk { dir, terminal, .. } = self.walk(path)?;
        let dir = match terminal {
            Terminal::Root => dir,
            Terminal::Found {
                sector,
                is_dir: true,
                ..
            } => load_subdirectory(&self.device, sector)?,
            Terminal::Found { .. } => return Err(Error::NotADirectory),
            Terminal::Absent { .. } => return Err(Error::NotFound),
        };
        if !recursive {
            return Ok(dir.list());
        }
        let mut out = Vec::new();
        dir.recursive_list(&self.device, 0, &mut out)?;
        Ok(out)
    }

    /// Creates `path` with exactly `data.len()` bytes and fills it.
    pub fn copy_in(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.create(path, data.len())?;
        let id = self.open(path)?;
        let result = data
            .chunks(TRANSFER_SIZE)
            .try_for_each(|chunk| match self.write(id, chunk)? {
                n if n == chunk.len() => Ok(()),
                _ => Err(Error::WriteError),
            });
        self.close(id)?;
        result
    }

    /// Reads the whole contents of the file at `path`.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let id = self.open(path)?;
        let mut contents = Vec::with_capacity(self.file_length(id)?);
        let mut buf = [0u8; TRANSFER_SIZE];
        let result = loop {
            match self.read(id, &mut buf) {
                Ok(0) => break Ok(()),
                Ok(n) => contents.extend_from_slice(&buf[..n]),
                Err(e) => break Err(e),
            }
        };
        self.close(id)?;
        result.map(|_| contents)
    }

    /// Number of free sectors according to the persisted free map.
    pub fn free_sectors(&self) -> Result<usize> {
        Ok(self.fetch_free_map()?.num_clear())
    }

    pub fn num_sectors(&self) -> usize {
        self.num_sectors
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }

    /// Human-readable dump of the bootstrap headers, the free map and the
    /// directory tree with every file's header.
    pub fn dump(&self) -> Result<String> {
        let mut out = String::new();
        let free_map = self.fetch_free_map()?;

        let _ = writeln!(out, "Free map file header: {}", self.free_map_file.header());
        let _ = writeln!(out, "Directory file header: {}", self.directory_file.header());
        let _ = write!(out, "Sectors in use ({}):", self.num_sectors - free_map.num_clear());
        for sector in free_map.in_use() {
            let _ = write!(out, " {}", sector);
        }
        let _ = writeln!(out);

        let root = self.root_directory()?;
        let _ = writeln!(out, "/");
        self.dump_dir(&root, 1, &mut out)?;
        Ok(out)
    }

    fn dump_dir(&self, dir: &Directory, depth: usize, out: &mut String) -> Result<()> {
        if depth > self.num_sectors {
            return Err(Error::Corrupted);
        }
        for entry in dir.entries() {
            let header = FileHeader::fetch_from(&*self.device, entry.sector)?;
            let indent = "    ".repeat(depth);
            let marker = if entry.is_dir { 'D' } else { 'F' };
            let _ = writeln!(
                out,
                "{}[{}] {} @{}: {}",
                indent,
                marker,
                entry.name_str(),
                entry.sector,
                header
            );
            if entry.is_dir {
                let sub = load_subdirectory(&self.device, entry.sector)?;
                self.dump_dir(&sub, depth + 1, out)?;
            }
        }
        Ok(())
    }

    pub(crate) fn root_directory(&self) -> Result<Directory> {
        let mut root = Directory::new(NUM_DIR_ENTRIES);
        root.fetch_from(&self.directory_file)?;
        Ok(root)
    }

    pub(crate) fn bootstrap_headers(&self) -> [&FileHeader; 2] {
        [self.free_map_file.header(), self.directory_file.header()]
    }
}
