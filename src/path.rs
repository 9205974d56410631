//! Path splitting and directory-tree traversal.

use alloc::sync::Arc;
use alloc::vec::Vec;
use log::debug;

use crate::config::*;
use crate::structs::valid_name;
use crate::{Directory, Error, OpenFile, Result, SectorDevice};

/// Splits a path into its non-empty `/`-separated components.
/// Leading, trailing and repeated separators are all ignored.
pub fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Where a traversal stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal<'p> {
    /// The path has no components and names the root directory.
    Root,
    /// The last component exists in the containing table.
    Found { name: &'p str, sector: u32, is_dir: bool },
    /// The last component is absent from the containing table.
    Absent { name: &'p str },
}

/// Result of walking a path down to its last component.
#[derive(Debug)]
pub struct Walk<'p, D: SectorDevice> {
    /// The table holding the last component (the root table for `Terminal::Root`).
    pub dir: Directory,
    /// Backing file of `dir`, or `None` when `dir` is the root table.
    pub dir_file: Option<OpenFile<D>>,
    pub terminal: Terminal<'p>,
}

/// Walks `path` from the root table, opening one directory file per level.
/// Every component but the last must name an existing directory.
pub fn walk<'p, D: SectorDevice>(
    device: &Arc<D>,
    root: &OpenFile<D>,
    path: &'p str,
) -> Result<Walk<'p, D>> {
    let components = split(path);
    if components.iter().any(|c| !valid_name(c.as_bytes())) {
        return Err(Error::InvalidFileName);
    }

    let mut dir = Directory::new(NUM_DIR_ENTRIES);
    dir.fetch_from(root)?;
    let mut dir_file = None;

    let Some((&last, parents)) = components.split_last() else {
        return Ok(Walk {
            dir,
            dir_file,
            terminal: Terminal::Root,
        });
    };

    for &component in parents {
        match dir.find(component)? {
            (sector, true) => {
                debug!("[walk] {} is a directory at sector {}, descending", component, sector);
                let file = OpenFile::open(Arc::clone(device), sector)?;
                dir.fetch_from(&file)?;
                dir_file = Some(file);
            }
            (_, false) => return Err(Error::NotADirectory),
        }
    }

    let terminal = match dir.find(last) {
        Ok((sector, is_dir)) => Terminal::Found {
            name: last,
            sector,
            is_dir,
        },
        Err(Error::NotFound) => Terminal::Absent { name: last },
        Err(e) => return Err(e),
    };
    debug!("[walk] {} -> {:?}", path, terminal);
    Ok(Walk {
        dir,
        dir_file,
        terminal,
    })
}
