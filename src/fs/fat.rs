//! Read-only FAT16/FAT32 volume support: boot-sector parse, root-directory
//! enumeration and cluster-chain file reads over any [`BlockDevice`].
//!
//! [`BlockDevice`]: crate::disk::BlockDevice

use core::fmt;

use alloc::vec;
use alloc::vec::Vec;

use crate::disk::{BlockDevice, DiskError, SECTOR_SIZE};

const BOOT_SIGNATURE: u16 = 0xAA55;
const DIR_ENTRY_SIZE: usize = 32;

/// Attribute combination marking a long-file-name entry.
const ATTR_LFN: u8 = 0x0F;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_VOLUME_ID: u8 = 0x08;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    Fat12,
    Fat16,
    Fat32,
    ExFat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    Disk(DiskError),
    /// The boot sector did not end in 0xAA55.
    BadSignature(u16),
    /// A variant this reader has no entry packing for (FAT12, ExFAT).
    Unsupported(FatType),
    /// A chain referenced a cluster outside the data region.
    BadCluster(u32),
}

impl From<DiskError> for FsError {
    fn from(err: DiskError) -> Self {
        FsError::Disk(err)
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FsError::Disk(err) => write!(f, "disk error: {}", err),
            FsError::BadSignature(sig) => {
                write!(f, "invalid boot sector signature: {:#06x}", sig)
            }
            FsError::Unsupported(kind) => write!(f, "unsupported FAT variant: {:?}", kind),
            FsError::BadCluster(cluster) => write!(f, "cluster out of range: {:#x}", cluster),
        }
    }
}

fn le16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn le32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// One 8.3 directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: [u8; 11],
    pub attr: u8,
    pub first_cluster: u32,
    pub size: u32,
}

impl DirEntry {
    fn parse(bytes: &[u8]) -> Self {
        let mut name = [0u8; 11];
        name.copy_from_slice(&bytes[0..11]);

        let high = le16(bytes, 20) as u32; // always 0 on FAT16
        let low = le16(bytes, 26) as u32;

        Self {
            name,
            attr: bytes[11],
            first_cluster: (high << 16) | low,
            size: le32(bytes, 28),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }
}

impl fmt::Display for DirEntry {
    // "NAME    EXT" stored form printed as NAME.EXT
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let base = &self.name[0..8];
        let ext = &self.name[8..11];

        for &byte in base.iter().take_while(|&&b| b != b' ') {
            write!(f, "{}", byte as char)?;
        }
        if ext.iter().any(|&b| b != b' ') {
            write!(f, ".")?;
            for &byte in ext.iter().take_while(|&&b| b != b' ') {
                write!(f, "{}", byte as char)?;
            }
        }
        Ok(())
    }
}

/// A mounted volume. Geometry is fixed at mount time from the BPB.
pub struct FatVolume<D: BlockDevice> {
    disk: D,
    partition_start: u32,
    bytes_per_sector: u32,
    sectors_per_cluster: u32,
    reserved_sectors: u32,
    fat_size: u32,
    root_dir_start: u32,
    root_dir_sectors: u32,
    first_data_sector: u32,
    total_clusters: u32,
    root_cluster: u32,
    fat_type: FatType,
}

impl<D: BlockDevice> FatVolume<D> {
    /// Reads and validates the boot sector at `partition_start` and derives
    /// the volume geometry.
    pub fn mount(mut disk: D, partition_start: u32) -> Result<Self, FsError> {
        let mut sector = [0u8; SECTOR_SIZE];
        disk.read_sectors(partition_start, &mut sector)?;

        let signature = le16(&sector, 510);
        if signature != BOOT_SIGNATURE {
            return Err(FsError::BadSignature(signature));
        }

        let bytes_per_sector = le16(&sector, 11) as u32;
        let sectors_per_cluster = sector[13] as u32;
        let reserved_sectors = le16(&sector, 14) as u32;
        let fat_count = sector[16] as u32;
        let root_entry_count = le16(&sector, 17) as u32;
        let total_sectors_16 = le16(&sector, 19) as u32;
        let fat_size_16 = le16(&sector, 22) as u32;
        let total_sectors_32 = le32(&sector, 32);

        // FAT32 keeps its FAT size and root cluster in the extended BPB
        let fat_size = if fat_size_16 != 0 {
            fat_size_16
        } else {
            le32(&sector, 36)
        };
        let root_cluster = le32(&sector, 44);

        let total_sectors = if total_sectors_16 != 0 {
            total_sectors_16
        } else {
            total_sectors_32
        };

        let root_dir_sectors = if bytes_per_sector == 0 {
            0
        } else {
            (root_entry_count * DIR_ENTRY_SIZE as u32 + bytes_per_sector - 1) / bytes_per_sector
        };
        let root_dir_start = reserved_sectors + fat_count * fat_size;
        let first_data_sector = root_dir_start + root_dir_sectors;
        let data_sectors = total_sectors.saturating_sub(first_data_sector);
        let total_clusters = if sectors_per_cluster == 0 {
            0
        } else {
            data_sectors / sectors_per_cluster
        };

        let fat_type = if bytes_per_sector == 0 {
            FatType::ExFat
        } else if total_clusters < 4085 {
            FatType::Fat12
        } else if total_clusters < 65525 {
            FatType::Fat16
        } else {
            FatType::Fat32
        };

        // FAT12 packs one and a half bytes per entry; reading it with the
        // 16-bit accessor would walk garbage chains, so refuse it up front.
        if matches!(fat_type, FatType::Fat12 | FatType::ExFat) {
            return Err(FsError::Unsupported(fat_type));
        }

        Ok(Self {
            disk,
            partition_start,
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            fat_size,
            root_dir_start,
            root_dir_sectors,
            first_data_sector,
            total_clusters,
            root_cluster,
            fat_type,
        })
    }

    pub fn fat_type(&self) -> FatType {
        self.fat_type
    }

    pub fn total_clusters(&self) -> u32 {
        self.total_clusters
    }

    fn bytes_per_cluster(&self) -> u32 {
        self.bytes_per_sector * self.sectors_per_cluster
    }

    /// Enumerates the root directory, skipping empty slots, deleted entries
    /// and long-file-name continuation entries.
    pub fn root_entries(&mut self) -> Result<Vec<DirEntry>, FsError> {
        let raw = match self.fat_type {
            FatType::Fat32 => self.read_cluster_chain(self.root_cluster, u32::MAX)?,
            _ => {
                let mut buffer =
                    vec![0u8; (self.root_dir_sectors * self.bytes_per_sector) as usize];
                self.disk
                    .read_sectors(self.partition_start + self.root_dir_start, &mut buffer)?;
                buffer
            }
        };

        let mut entries = Vec::new();
        for chunk in raw.chunks_exact(DIR_ENTRY_SIZE) {
            if chunk[0] == 0x00 {
                // a null slot
                continue;
            }
            if chunk[0] == 0xE5 {
                // deleted
                continue;
            }

            let entry = DirEntry::parse(chunk);
            if entry.attr == ATTR_LFN {
                continue;
            }
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Reads a whole file by walking its cluster chain, truncated to the
    /// directory entry's size.
    pub fn read_file(&mut self, entry: &DirEntry) -> Result<Vec<u8>, FsError> {
        let mut data = self.read_cluster_chain(entry.first_cluster, entry.size)?;
        data.truncate(entry.size as usize);
        Ok(data)
    }

    // Walks a chain starting at `cluster`, reading at most enough clusters
    // to cover `limit` bytes. The iteration cap defends against a FAT whose
    // chain loops.
    fn read_cluster_chain(&mut self, mut cluster: u32, limit: u32) -> Result<Vec<u8>, FsError> {
        let bytes_per_cluster = self.bytes_per_cluster() as usize;
        let mut data = Vec::new();
        let mut walked: u32 = 0;

        while self.is_chain_cluster(cluster) {
            if walked > self.total_clusters {
                return Err(FsError::BadCluster(cluster));
            }
            walked += 1;

            let sector = self.first_data_sector + (cluster - 2) * self.sectors_per_cluster;
            let start = data.len();
            data.resize(start + bytes_per_cluster, 0);
            self.disk
                .read_sectors(self.partition_start + sector, &mut data[start..])?;

            if data.len() as u64 >= limit as u64 {
                break;
            }

            cluster = self.fat_entry(cluster)?;
        }

        Ok(data)
    }

    // True while `cluster` is a data cluster rather than an end/bad marker.
    fn is_chain_cluster(&self, cluster: u32) -> bool {
        match self.fat_type {
            FatType::Fat32 => {
                let cluster = cluster & 0x0FFF_FFFF;
                (2..0x0FFF_FFF0).contains(&cluster)
            }
            _ => (2..0xFFF0).contains(&cluster),
        }
    }

    // Next-cluster lookup in the first FAT.
    fn fat_entry(&mut self, cluster: u32) -> Result<u32, FsError> {
        let entry_width = match self.fat_type {
            FatType::Fat32 => 4,
            _ => 2,
        };

        let fat_offset = cluster * entry_width;
        let fat_sector = self.reserved_sectors + fat_offset / self.bytes_per_sector;
        let entry_offset = (fat_offset % self.bytes_per_sector) as usize;

        if fat_sector >= self.reserved_sectors + self.fat_size {
            return Err(FsError::BadCluster(cluster));
        }

        let mut buffer = vec![0u8; self.bytes_per_sector as usize];
        self.disk
            .read_sectors(self.partition_start + fat_sector, &mut buffer)?;

        let next = match self.fat_type {
            FatType::Fat32 => le32(&buffer, entry_offset) & 0x0FFF_FFFF,
            _ => le16(&buffer, entry_offset) as u32,
        };
        Ok(next)
    }
}
