use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::*;
use crate::{OpenFile, SectorAllocator, SectorDevice};

pub fn trim_zero(name: &[u8]) -> &[u8] {
    let mut end = name.len();
    while end > 0 && name[end - 1] == 0 {
        end -= 1;
    }
    &name[..end]
}

fn name_cmp(n1: &[u8], n2: &[u8]) -> bool {
    trim_zero(n1) == trim_zero(n2)
}

impl DirEntry {
    pub fn name_eq(&self, name: &[u8]) -> bool {
        name_cmp(&self.name, name)
    }

    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(trim_zero(&self.name)).into_owned()
    }
}

/// One line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub is_dir: bool,
    pub depth: usize, // 0 for entries of the listed directory itself
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str("    ")?;
        }
        let marker = if self.is_dir { 'D' } else { 'F' };
        write!(f, "[{}] {}", marker, self.name)
    }
}

/// A fixed-capacity table of directory entries, stored as an ordinary file.
/// Free slots stay in place so the on-disk size never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    table: Vec<DirEntry>,
}

impl Directory {
    /// An empty table with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            table: vec![DirEntry::NULL; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.table.len()
    }

    /// Number of slots in use.
    pub fn len(&self) -> usize {
        self.table.iter().filter(|e| e.in_use).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.table.iter().all(|e| e.in_use)
    }

    /// Replaces the whole table with the contents of `file`.
    pub fn fetch_from<D: SectorDevice>(&mut self, file: &OpenFile<D>) -> Result<()> {
        let mut buf = vec![0u8; self.capacity() * DIR_ENTRY_SIZE];
        if file.read_at(&mut buf, 0)? != buf.len() {
            return Err(FsError::Corrupted);
        }
        for (slot, raw) in self.table.iter_mut().zip(buf.chunks_exact(DIR_ENTRY_SIZE)) {
            *slot = DirEntry::decode(raw);
        }
        Ok(())
    }

    /// Writes the whole table to `file`.
    pub fn write_back<D: SectorDevice>(&self, file: &OpenFile<D>) -> Result<()> {
        let mut buf = vec![0u8; self.capacity() * DIR_ENTRY_SIZE];
        for (entry, raw) in self.table.iter().zip(buf.chunks_exact_mut(DIR_ENTRY_SIZE)) {
            entry.encode(raw);
        }
        if file.write_at(&buf, 0)? != buf.len() {
            return Err(FsError::WriteError);
        }
        Ok(())
    }

    fn find_index(&self, name: &str) -> Option<usize> {
        self.table
            .iter()
            .position(|e| e.in_use && e.name_eq(name.as_bytes()))
    }

    /// Looks a name up at this level only.
    /// Returns the header sector and whether the entry is a directory.
    pub fn find(&self, name: &str) -> Result<(u32, bool)> {
        self.find_index(name)
            .map(|i| (self.table[i].sector, self.table[i].is_dir))
            .ok_or(FsError::NotFound)
    }

    /// Binds `name` to `sector` in the first free slot.
    pub fn add(&mut self, name: &str, sector: u32, is_dir: bool) -> Result<()> {
        if self.find_index(name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let entry = DirEntry::new(sector, name.as_bytes(), is_dir)?;
        let slot = self
            .table
            .iter_mut()
            .find(|e| !e.in_use)
            .ok_or(FsError::DirectoryFull)?;
        *slot = entry;
        Ok(())
    }

    /// Drops the entry for `name`. The entry's header and data sectors are
    /// left for the caller to reclaim.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let i = self.find_index(name).ok_or(FsError::NotFound)?;
        self.table[i] = DirEntry::NULL;
        Ok(())
    }

    /// Entries in use, in table order.
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.table.iter().filter(|e| e.in_use)
    }

    /// This level's entries, in table order.
    pub fn list(&self) -> Vec<ListEntry> {
        self.entries()
            .map(|e| ListEntry {
                name: e.name_str(),
                is_dir: e.is_dir,
                depth: 0,
            })
            .collect()
    }

    /// Pre-order listing of the whole subtree, starting at `depth`.
    pub fn recursive_list<D: SectorDevice>(
        &self,
        device: &Arc<D>,
        depth: usize,
        out: &mut Vec<ListEntry>,
    ) -> Result<()> {
        if depth > device.num_sectors() {
            return Err(FsError::Corrupted);
        }
        for entry in self.entries() {
            out.push(ListEntry {
                name: entry.name_str(),
                is_dir: entry.is_dir,
                depth,
            });
            if entry.is_dir {
                let sub = load_subdirectory(device, entry.sector)?;
                sub.recursive_list(device, depth + 1, out)?;
            }
        }
        Ok(())
    }

    /// Releases every sector owned by the entries of this table, depth first:
    /// each child directory is emptied before its own header and blocks go.
    /// The table itself is not modified and this directory's own header is
    /// left for the caller.
    pub fn recursive_remove<D: SectorDevice>(
        &self,
        device: &Arc<D>,
        free_map: &mut SectorAllocator,
    ) -> Result<()> {
        self.recursive_remove_at(device, free_map, 0)
    }

    fn recursive_remove_at<D: SectorDevice>(
        &self,
        device: &Arc<D>,
        free_map: &mut SectorAllocator,
        depth: usize,
    ) -> Result<()> {
        // Every level owns a distinct header sector, so anything deeper is a cycle.
        if depth > device.num_sectors() {
            return Err(FsError::Corrupted);
        }
        for entry in self.entries() {
            if entry.is_dir {
                let sub = load_subdirectory(device, entry.sector)?;
                sub.recursive_remove_at(device, free_map, depth + 1)?;
            }
            let header = FileHeader::fetch_from(&**device, entry.sector)?;
            header.deallocate(free_map)?;
            free_map.clear(entry.sector)?;
        }
        Ok(())
    }
}

/// Opens the directory file whose header is at `sector` and reads its table.
pub fn load_subdirectory<D: SectorDevice>(device: &Arc<D>, sector: u32) -> Result<Directory> {
    let file = OpenFile::open(Arc::clone(device), sector)?;
    let mut dir = Directory::new(NUM_DIR_ENTRIES);
    dir.fetch_from(&file)?;
    Ok(dir)
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.table.iter().enumerate() {
            if entry.in_use {
                writeln!(
                    f,
                    "slot {}: {} -> sector {}{}",
                    i,
                    entry.name_str(),
                    entry.sector,
                    if entry.is_dir { " (dir)" } else { "" }
                )?;
            }
        }
        Ok(())
    }
}
