//! ATA PIO command traffic over the recorded bus.

mod common;

use common::TestBus;
use simple_os::disk::ata::Ata;
use simple_os::disk::{BlockDevice, DiskError, SECTOR_SIZE};

const STATUS: u16 = 0x1F7;
const DATA: u16 = 0x1F0;
const ERROR: u16 = 0x1F1;

// Not busy, data ready.
const READY: u8 = 0x08;

#[test]
fn single_sector_read_programs_the_lba_registers() {
    let bus = TestBus::new();
    bus.set_byte(STATUS, READY);
    for word in 0..SECTOR_SIZE as u16 / 2 {
        bus.queue_word(DATA, 0x0100 | (word & 0xFF));
    }

    let mut disk = Ata::primary(bus.clone());
    let mut buffer = [0u8; SECTOR_SIZE];
    disk.read_sectors(0x00A5_1234, &mut buffer).unwrap();

    assert_eq!(
        bus.writes(),
        vec![
            (0x1F6, 0xE0), // master, LBA bits 27:24 = 0
            (0x1F2, 1),
            (0x1F3, 0x34),
            (0x1F4, 0x12),
            (0x1F5, 0xA5),
            (STATUS, 0x20), // READ SECTORS
        ]
    );

    // Words unpack little-endian into the buffer.
    assert_eq!(buffer[0], 0x00);
    assert_eq!(buffer[1], 0x01);
    assert_eq!(buffer[2], 0x01);
    assert_eq!(buffer[3], 0x01);
}

#[test]
fn reads_beyond_255_sectors_are_split_into_chunks() {
    let bus = TestBus::new();
    bus.set_byte(STATUS, READY);

    let mut disk = Ata::primary(bus.clone());
    let mut buffer = vec![0u8; 256 * SECTOR_SIZE];
    disk.read_sectors(0, &mut buffer).unwrap();

    let counts: Vec<u8> = bus
        .writes()
        .into_iter()
        .filter(|&(port, _)| port == 0x1F2)
        .map(|(_, value)| value)
        .collect();
    assert_eq!(counts, vec![255, 1]);

    let commands: Vec<(u16, u8)> = bus
        .writes()
        .into_iter()
        .filter(|&(port, value)| port == STATUS && value == 0x20)
        .collect();
    assert_eq!(commands.len(), 2);
}

#[test]
fn error_status_reports_the_error_register() {
    let bus = TestBus::new();
    bus.set_byte(STATUS, 0x01); // ERR
    bus.set_byte(ERROR, 0x04); // ABRT

    let mut disk = Ata::primary(bus);
    let mut buffer = [0u8; SECTOR_SIZE];
    assert_eq!(
        disk.read_sectors(0, &mut buffer),
        Err(DiskError::Ata(0x04))
    );
}

#[test]
fn partial_sector_buffers_are_rejected() {
    let mut disk = Ata::primary(TestBus::new());
    let mut buffer = [0u8; 100];
    assert_eq!(
        disk.read_sectors(0, &mut buffer),
        Err(DiskError::BadBufferSize)
    );
}

#[test]
fn lba_above_28_bits_is_rejected() {
    let mut disk = Ata::primary(TestBus::new());
    let mut buffer = [0u8; SECTOR_SIZE];
    assert_eq!(
        disk.read_sectors(0x1000_0000, &mut buffer),
        Err(DiskError::LbaOutOfRange)
    );
}
