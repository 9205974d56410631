//! A small hierarchical file system on a fixed-size sector device.
//! Files have a fixed size chosen at creation; no permissions, timestamps or links.
//!
//! Sector layout:
//! - Sector 0: header of the free map file (one bit per sector)
//! - Sector 1: header of the root directory file
//! - Everything else: headers and data blocks, handed out by the free map
//!
//! Layers (from bottom to top):
//! 1. SectorDevice: raw sector reads and writes.                 | User implemented (hardware-specific)
//! 2. FileHeader / OpenFile: size, block list, byte access.      | Fs implemented
//! 3. SectorAllocator / Directory: free map and name tables,     | Fs implemented
//!    both stored as ordinary files.
//! 4. Path: splitting and level-by-level traversal.              | Fs implemented
//! 5. FileSystem: create, mkdir, open, remove, list, check.      | Fs implemented
//!
//! Mutations are composed in memory and written back only when every check
//! has passed, in the order header, directory, free map. There is no journal:
//! an interrupted write-back can leave the device inconsistent, which
//! `FileSystem::check` detects but does not repair.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod config;
mod error;
mod sector_dev;
mod structs;
mod bitmap;
mod header;
mod file;
mod directory;
mod path;
mod handle;
mod fs;
mod check;

pub use sector_dev::SectorDevice;
pub use config::*;
pub use structs::*;
pub use bitmap::*;
pub use file::*;
pub use directory::*;
pub use path::*;
pub use handle::*;
pub use fs::*;
pub use check::*;
pub use error::FsError as Error;
pub use error::Result;
