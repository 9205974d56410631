//! Table of open files, keyed by an opaque id handed to callers.

use alloc::collections::BTreeMap;

use crate::{Error, OpenFile, Result, SectorDevice};

/// Identifies an open file. Ids are never reused while the file system is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(u32);

impl FileId {
    pub fn raw(&self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
pub struct OpenFileTable<D: SectorDevice> {
    files: BTreeMap<FileId, OpenFile<D>>,
    next_id: u32,
}

impl<D: SectorDevice> OpenFileTable<D> {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn insert(&mut self, file: OpenFile<D>) -> FileId {
        let id = FileId(self.next_id);
        self.next_id += 1;
        self.files.insert(id, file);
        id
    }

    pub fn get(&self, id: FileId) -> Result<&OpenFile<D>> {
        self.files.get(&id).ok_or(Error::BadHandle)
    }

    pub fn get_mut(&mut self, id: FileId) -> Result<&mut OpenFile<D>> {
        self.files.get_mut(&id).ok_or(Error::BadHandle)
    }

    pub fn remove(&mut self, id: FileId) -> Result<OpenFile<D>> {
        self.files.remove(&id).ok_or(Error::BadHandle)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<D: SectorDevice> Default for OpenFileTable<D> {
    fn default() -> Self {
        Self::new()
    }
}
