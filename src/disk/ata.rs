//! Polled ATA PIO driver (28-bit LBA reads on one channel).

use super::{BlockDevice, DiskError, SECTOR_SIZE};
use crate::port::PortIo;

/// Status polls before declaring the drive dead.
const POLL_LIMIT: u32 = 1_000_000;

const STATUS_ERR: u8 = 0x01;
const STATUS_DRQ: u8 = 0x08;
const STATUS_BSY: u8 = 0x80;

const CMD_READ_SECTORS: u8 = 0x20;

pub struct Ata<B: PortIo> {
    bus: B,
    data: u16,
    error: u16,
    sector_count: u16,
    lba_low: u16,
    lba_mid: u16,
    lba_hi: u16,
    device: u16,
    command: u16,
    master: bool,
}

impl<B: PortIo> Ata<B> {
    pub const fn new(bus: B, port_base: u16, master: bool) -> Self {
        Self {
            bus,
            data: port_base,
            error: port_base + 1,
            sector_count: port_base + 2,
            lba_low: port_base + 3,
            lba_mid: port_base + 4,
            lba_hi: port_base + 5,
            device: port_base + 6,
            command: port_base + 7,
            master,
        }
    }

    /// Primary channel, master drive (0x1F0).
    pub const fn primary(bus: B) -> Self {
        Self::new(bus, 0x1F0, true)
    }

    // Busy-waits until the drive is ready to transfer a sector. The error
    // bit is checked first so a failed command does not spin out the full
    // poll budget.
    fn wait_for_data(&mut self) -> Result<(), DiskError> {
        let mut polls = 0;
        loop {
            let status = self.bus.inb(self.command);

            if status & STATUS_ERR != 0 {
                return Err(DiskError::Ata(self.bus.inb(self.error)));
            }
            if status & STATUS_BSY == 0 && status & STATUS_DRQ != 0 {
                return Ok(());
            }

            polls += 1;
            if polls > POLL_LIMIT {
                return Err(DiskError::Timeout);
            }
        }
    }

    // One command for up to 255 sectors.
    fn read_chunk(&mut self, lba: u32, buffer: &mut [u8]) -> Result<(), DiskError> {
        let sectors = buffer.len() / SECTOR_SIZE;

        let device_num: u8 = if self.master { 0xE0 } else { 0xF0 };
        self.bus
            .outb(self.device, device_num | ((lba >> 24) & 0x0F) as u8);
        self.bus.outb(self.sector_count, sectors as u8);
        self.bus.outb(self.lba_low, (lba & 0xFF) as u8);
        self.bus.outb(self.lba_mid, ((lba >> 8) & 0xFF) as u8);
        self.bus.outb(self.lba_hi, ((lba >> 16) & 0xFF) as u8);
        self.bus.outb(self.command, CMD_READ_SECTORS);

        for sector in buffer.chunks_exact_mut(SECTOR_SIZE) {
            self.wait_for_data()?;
            for word in sector.chunks_exact_mut(2) {
                let data = self.bus.inw(self.data);
                word[0] = (data & 0xFF) as u8;
                word[1] = (data >> 8) as u8;
            }
        }

        Ok(())
    }
}

impl<B: PortIo> BlockDevice for Ata<B> {
    fn read_sectors(&mut self, lba: u32, buffer: &mut [u8]) -> Result<(), DiskError> {
        if buffer.len() % SECTOR_SIZE != 0 {
            return Err(DiskError::BadBufferSize);
        }
        if lba & 0xF000_0000 != 0 {
            return Err(DiskError::LbaOutOfRange);
        }

        let mut lba = lba;
        let mut rest = buffer;
        while !rest.is_empty() {
            let sectors = (rest.len() / SECTOR_SIZE).min(255);
            let (chunk, tail) = rest.split_at_mut(sectors * SECTOR_SIZE);
            self.read_chunk(lba, chunk)?;
            lba += sectors as u32;
            rest = tail;
        }

        Ok(())
    }
}
