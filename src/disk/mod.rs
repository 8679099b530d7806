//! Block devices. The FAT layer only sees the [`BlockDevice`] trait, never
//! the ATA ports.

use core::fmt;

pub mod ata;

pub const SECTOR_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    /// The drive raised its error bit; carries the error register.
    Ata(u8),
    /// The drive never became ready for a transfer.
    Timeout,
    /// The caller's buffer is not a whole number of sectors.
    BadBufferSize,
    /// LBA beyond the 28-bit addressing limit.
    LbaOutOfRange,
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DiskError::Ata(code) => write!(f, "ATA error: {:#x}", code),
            DiskError::Timeout => write!(f, "disk timeout"),
            DiskError::BadBufferSize => write!(f, "buffer is not sector sized"),
            DiskError::LbaOutOfRange => write!(f, "LBA beyond 28-bit range"),
        }
    }
}

/// A sector-addressed read-only device.
pub trait BlockDevice {
    /// Fills `buffer` (a whole number of sectors) starting at `lba`.
    fn read_sectors(&mut self, lba: u32, buffer: &mut [u8]) -> Result<(), DiskError>;
}
