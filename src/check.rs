//! Offline consistency check: compares the persisted free map against every
//! sector reachable from the two bootstrap headers.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use log::debug;

use crate::config::*;
use crate::directory::load_subdirectory;
use crate::{Directory, Error, FileHeader, FileSystem, Result, SectorDevice};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub leaked: Vec<u32>,     // Marked in use, reachable from nothing
    pub dangling: Vec<u32>,   // Reachable, but marked free
    pub duplicated: Vec<u32>, // Claimed by more than one structure
}

impl CheckReport {
    pub fn is_consistent(&self) -> bool {
        self.leaked.is_empty() && self.dangling.is_empty() && self.duplicated.is_empty()
    }
}

struct Claims {
    count: Vec<u32>,
}

impl Claims {
    /// Records one claim on `sector`; returns whether it was the first.
    fn claim(&mut self, sector: u32) -> Result<bool> {
        let slot = self.count.get_mut(sector as usize).ok_or(Error::Corrupted)?;
        *slot += 1;
        Ok(*slot == 1)
    }

    fn claim_header(&mut self, header: &FileHeader) -> Result<()> {
        for &sector in &header.data_sectors {
            self.claim(sector)?;
        }
        Ok(())
    }

    fn claim_tree<D: SectorDevice>(&mut self, device: &Arc<D>, dir: &Directory) -> Result<()> {
        for entry in dir.entries() {
            // A header claimed twice is not descended into again, which also stops cycles.
            if !self.claim(entry.sector)? {
                continue;
            }
            let header = FileHeader::fetch_from(&**device, entry.sector)?;
            self.claim_header(&header)?;
            if entry.is_dir {
                let sub = load_subdirectory(device, entry.sector)?;
                self.claim_tree(device, &sub)?;
            }
        }
        Ok(())
    }
}

impl<D: SectorDevice> FileSystem<D> {
    /// Scans the whole tree and reports every sector whose free map bit
    /// disagrees with the structures that reference it.
    pub fn check(&self) -> Result<CheckReport> {
        let mut claims = Claims {
            count: vec![0; self.num_sectors()],
        };
        claims.claim(FREE_MAP_SECTOR)?;
        claims.claim(DIRECTORY_SECTOR)?;
        for header in self.bootstrap_headers() {
            claims.claim_header(header)?;
        }
        claims.claim_tree(&self.device(), &self.root_directory()?)?;

        let free_map = self.fetch_free_map()?;
        let mut report = CheckReport::default();
        for (sector, &count) in claims.count.iter().enumerate() {
            let sector = sector as u32;
            let used = free_map.test(sector);
            if count > 1 {
                report.duplicated.push(sector);
            }
            if count == 0 && used {
                report.leaked.push(sector);
            } else if count > 0 && !used {
                report.dangling.push(sector);
            }
        }
        debug!("[check] {:?}", report);
        Ok(report)
    }
}
