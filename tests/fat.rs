//! FAT16 mount, root-directory enumeration and cluster-chain reads over an
//! in-memory disk image.

use simple_os::disk::{BlockDevice, DiskError, SECTOR_SIZE};
use simple_os::fs::fat::{DirEntry, FatType, FatVolume, FsError};

/// Block device over a byte image.
struct MemDisk {
    image: Vec<u8>,
}

impl BlockDevice for MemDisk {
    fn read_sectors(&mut self, lba: u32, buffer: &mut [u8]) -> Result<(), DiskError> {
        let start = lba as usize * SECTOR_SIZE;
        let end = start + buffer.len();
        if end > self.image.len() {
            return Err(DiskError::LbaOutOfRange);
        }
        buffer.copy_from_slice(&self.image[start..end]);
        Ok(())
    }
}

const TOTAL_SECTORS: u16 = 4200;
const RESERVED: u16 = 1;
const FAT_SECTORS: u16 = 17;
const ROOT_ENTRIES: u16 = 16;
// 1 boot + 17 FAT + 1 root dir
const FIRST_DATA_SECTOR: usize = 19;

/// One-FAT, one-sector-per-cluster FAT16 image holding HELLO.TXT across
/// clusters 2 and 3 (1000 bytes).
fn fat16_image() -> MemDisk {
    let mut image = vec![0u8; TOTAL_SECTORS as usize * SECTOR_SIZE];

    // BPB
    image[11..13].copy_from_slice(&(SECTOR_SIZE as u16).to_le_bytes());
    image[13] = 1; // sectors per cluster
    image[14..16].copy_from_slice(&RESERVED.to_le_bytes());
    image[16] = 1; // FAT count
    image[17..19].copy_from_slice(&ROOT_ENTRIES.to_le_bytes());
    image[19..21].copy_from_slice(&TOTAL_SECTORS.to_le_bytes());
    image[22..24].copy_from_slice(&FAT_SECTORS.to_le_bytes());
    image[510..512].copy_from_slice(&0xAA55u16.to_le_bytes());

    // FAT: cluster 2 -> 3, cluster 3 ends the chain
    let fat = RESERVED as usize * SECTOR_SIZE;
    image[fat + 4..fat + 6].copy_from_slice(&3u16.to_le_bytes());
    image[fat + 6..fat + 8].copy_from_slice(&0xFFFFu16.to_le_bytes());

    // Root directory: a deleted slot, a long-name slot, then the file
    let root = (RESERVED + FAT_SECTORS) as usize * SECTOR_SIZE;
    image[root] = 0xE5;
    image[root + 32 + 11] = 0x0F; // LFN attribute
    image[root + 32] = b'~';

    let entry = root + 64;
    image[entry..entry + 11].copy_from_slice(b"HELLO   TXT");
    image[entry + 11] = 0x20; // archive
    image[entry + 26..entry + 28].copy_from_slice(&2u16.to_le_bytes());
    image[entry + 28..entry + 32].copy_from_slice(&1000u32.to_le_bytes());

    // File data: cluster 2 full of 0xAB, cluster 3 full of 0xCD
    let data = FIRST_DATA_SECTOR * SECTOR_SIZE;
    image[data..data + SECTOR_SIZE].iter_mut().for_each(|b| *b = 0xAB);
    image[data + SECTOR_SIZE..data + 2 * SECTOR_SIZE]
        .iter_mut()
        .for_each(|b| *b = 0xCD);

    MemDisk { image }
}

#[test]
fn mount_classifies_the_volume_as_fat16() {
    let volume = FatVolume::mount(fat16_image(), 0).unwrap();
    assert_eq!(volume.fat_type(), FatType::Fat16);
    assert!(volume.total_clusters() >= 4085);
}

#[test]
fn mount_rejects_a_missing_boot_signature() {
    let mut disk = fat16_image();
    disk.image[510] = 0;
    let err = FatVolume::mount(disk, 0).err().unwrap();
    assert_eq!(err, FsError::BadSignature(0xAA00));
}

#[test]
fn fat12_sized_volumes_are_rejected() {
    let mut disk = fat16_image();
    // Shrink the volume until the cluster count classifies as FAT12.
    disk.image[19..21].copy_from_slice(&100u16.to_le_bytes());

    let err = FatVolume::mount(disk, 0).err().unwrap();
    assert_eq!(err, FsError::Unsupported(FatType::Fat12));
}

#[test]
fn root_enumeration_skips_deleted_and_long_name_slots() {
    let mut volume = FatVolume::mount(fat16_image(), 0).unwrap();
    let entries = volume.root_entries().unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(&entries[0].name, b"HELLO   TXT");
    assert_eq!(entries[0].first_cluster, 2);
    assert_eq!(entries[0].size, 1000);
    assert!(!entries[0].is_directory());
    assert_eq!(entries[0].to_string(), "HELLO.TXT");
}

#[test]
fn file_read_follows_the_chain_and_truncates_to_size() {
    let mut volume = FatVolume::mount(fat16_image(), 0).unwrap();
    let entries = volume.root_entries().unwrap();
    let data = volume.read_file(&entries[0]).unwrap();

    assert_eq!(data.len(), 1000);
    assert!(data[..512].iter().all(|&b| b == 0xAB));
    assert!(data[512..].iter().all(|&b| b == 0xCD));
}

#[test]
fn looping_chain_is_detected() {
    let mut disk = fat16_image();
    // cluster 3 points back to cluster 2
    let fat = RESERVED as usize * SECTOR_SIZE;
    disk.image[fat + 6..fat + 8].copy_from_slice(&2u16.to_le_bytes());

    let mut volume = FatVolume::mount(disk, 0).unwrap();
    let entry = DirEntry {
        name: *b"LOOP    BIN",
        attr: 0x20,
        first_cluster: 2,
        // Claimed size far larger than the real chain keeps the walk going
        // until the loop guard trips.
        size: u32::MAX,
    };

    assert!(matches!(
        volume.read_file(&entry),
        Err(FsError::BadCluster(_))
    ));
}
