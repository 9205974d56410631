pub const SECTOR_SIZE: usize = 128;
pub const DEFAULT_NUM_SECTORS: usize = 1024; // 32 tracks of 32 sectors
pub const BITS_IN_BYTE: usize = 8;

pub const FREE_MAP_SECTOR: u32 = 0; // Header sector of the free map file
pub const DIRECTORY_SECTOR: u32 = 1; // Header sector of the root directory file

pub const HEADER_FIXED_SIZE: usize = 8; // num_bytes + num_sectors
pub const NUM_DIRECT: usize = (SECTOR_SIZE - HEADER_FIXED_SIZE) / 4; // Data sector pointers per header
pub const MAX_FILE_SIZE: usize = NUM_DIRECT * SECTOR_SIZE;

pub const NUM_DIR_ENTRIES: usize = 10; // Capacity of every directory table
pub const DIR_ENTRY_SIZE: usize = 32; // in_use + is_dir + padding + sector + name
pub const MAX_FILE_NAME_LEN: usize = DIR_ENTRY_SIZE - 8;
pub const DIRECTORY_FILE_SIZE: usize = NUM_DIR_ENTRIES * DIR_ENTRY_SIZE;

pub const TRANSFER_SIZE: usize = 128; // Chunk size for bulk copy in and out

/// Size in bytes of the free map file for a device of `num_sectors` sectors.
pub const fn free_map_file_size(num_sectors: usize) -> usize {
    num_sectors.div_ceil(BITS_IN_BYTE)
}
