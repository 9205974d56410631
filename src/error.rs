use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    IoError,
    InvalidSectorId,
    ReadError,
    WriteError,
    NotFound,
    AlreadyExists,
    DirectoryFull,
    NoFreeSector,
    AllocationFailed,
    NotADirectory,
    IsADirectory,
    NotEmptyOrNotRecursive,
    InvalidFileName,
    InvalidPath,
    FileTooLarge,
    OutOfBounds,
    BadHandle,
    Corrupted,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FsError::IoError => "device i/o error",
            FsError::InvalidSectorId => "sector number out of range",
            FsError::ReadError => "sector read failed",
            FsError::WriteError => "sector write failed",
            FsError::NotFound => "no such file or directory",
            FsError::AlreadyExists => "file or directory already exists",
            FsError::DirectoryFull => "directory is full",
            FsError::NoFreeSector => "no free sector left on device",
            FsError::AllocationFailed => "not enough free sectors for file data",
            FsError::NotADirectory => "not a directory",
            FsError::IsADirectory => "is a directory",
            FsError::NotEmptyOrNotRecursive => "directory removal requires the recursive flag",
            FsError::InvalidFileName => "invalid file name",
            FsError::InvalidPath => "invalid path",
            FsError::FileTooLarge => "file exceeds the maximum file size",
            FsError::OutOfBounds => "value out of bounds",
            FsError::BadHandle => "unknown open file handle",
            FsError::Corrupted => "on-disk structure is corrupted",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for FsError {}

pub type Result<T> = core::result::Result<T, FsError>;
