//! Driver for the dual cascaded 8259 interrupt controllers.
//!
//! Generic over [`PortIo`] so the initialization handshake and EOI traffic
//! can be verified against a recorded bus.

use crate::port::PortIo;

pub const PIC1: u16 = 0x20; // IO base address for master PIC
pub const PIC2: u16 = 0xA0; // IO base address for slave PIC
pub const PIC1_COMMAND: u16 = PIC1;
pub const PIC1_DATA: u16 = PIC1 + 1;
pub const PIC2_COMMAND: u16 = PIC2;
pub const PIC2_DATA: u16 = PIC2 + 1;

const ICW1_ICW4: u8 = 0x01; // ICW4 will be present
const ICW1_INIT: u8 = 0x10; // Initialization - required!
const ICW4_8086: u8 = 0x01; // 8086/88 mode

const PIC_EOI: u8 = 0x20; // End-of-interrupt command code
const PIC_READ_IRR: u8 = 0x0A; // OCW3: read request register next
const PIC_READ_ISR: u8 = 0x0B; // OCW3: read service register next

pub const PIC1_OFFSET: u8 = 0x20;
pub const PIC2_OFFSET: u8 = PIC1_OFFSET + 8;

pub struct Pic<B: PortIo> {
    bus: B,
}

impl<B: PortIo> Pic<B> {
    pub const fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Reprograms both controllers' vector offsets with the ICW1..ICW4
    /// handshake. Every command byte is followed by an I/O settling delay;
    /// older controllers lose bytes without it. Finishes by unmasking all
    /// 16 lines; unregistered IRQs are acknowledged and dropped by the
    /// dispatch loop instead of being masked off.
    ///
    /// Vectors on the master become `offset1..offset1+8`, on the slave
    /// `offset2..offset2+8`.
    pub fn remap(&mut self, offset1: u8, offset2: u8) {
        // ICW1: start initialization in cascade mode
        self.bus.outb(PIC1_COMMAND, ICW1_INIT | ICW1_ICW4);
        self.bus.io_wait();
        self.bus.outb(PIC2_COMMAND, ICW1_INIT | ICW1_ICW4);
        self.bus.io_wait();
        // ICW2: vector offsets
        self.bus.outb(PIC1_DATA, offset1);
        self.bus.io_wait();
        self.bus.outb(PIC2_DATA, offset2);
        self.bus.io_wait();
        // ICW3: master has a slave on IRQ2 (0000 0100); slave's cascade
        // identity is 2 (0000 0010)
        self.bus.outb(PIC1_DATA, 4);
        self.bus.io_wait();
        self.bus.outb(PIC2_DATA, 2);
        self.bus.io_wait();
        // ICW4: 8086 mode rather than 8080 mode
        self.bus.outb(PIC1_DATA, ICW4_8086);
        self.bus.io_wait();
        self.bus.outb(PIC2_DATA, ICW4_8086);
        self.bus.io_wait();

        // Unmask both PICs
        self.bus.outb(PIC1_DATA, 0);
        self.bus.outb(PIC2_DATA, 0);
    }

    /// Masks every line on both controllers.
    pub fn disable(&mut self) {
        self.bus.outb(PIC1_DATA, 0xFF);
        self.bus.outb(PIC2_DATA, 0xFF);
    }

    /// Acknowledges `irq`: the slave needs the EOI too when the line came
    /// through it, the master always gets one.
    pub fn send_eoi(&mut self, irq: u8) {
        if irq >= 8 {
            self.bus.outb(PIC2_COMMAND, PIC_EOI);
        }
        self.bus.outb(PIC1_COMMAND, PIC_EOI);
    }

    pub fn set_mask(&mut self, irq: u8) {
        let (port, line) = Self::mask_port(irq);
        let value = self.bus.inb(port) | (1 << line);
        self.bus.outb(port, value);
    }

    pub fn clear_mask(&mut self, irq: u8) {
        let (port, line) = Self::mask_port(irq);
        let value = self.bus.inb(port) & !(1 << line);
        self.bus.outb(port, value);
    }

    fn mask_port(irq: u8) -> (u16, u8) {
        if irq < 8 {
            (PIC1_DATA, irq)
        } else {
            (PIC2_DATA, irq - 8)
        }
    }

    /// Pending lines that have not been acknowledged yet (IRR). Low byte is
    /// the master (IRQs 0-7), high byte the slave (IRQs 8-15).
    pub fn get_pending(&mut self) -> u16 {
        self.read_irq_register(PIC_READ_IRR)
    }

    /// Lines currently being serviced (ISR), same layout as [`get_pending`].
    ///
    /// [`get_pending`]: Pic::get_pending
    pub fn get_in_service(&mut self) -> u16 {
        self.read_irq_register(PIC_READ_ISR)
    }

    // OCW3 to both command ports, then read both back. The slave is
    // chained behind master line 2.
    fn read_irq_register(&mut self, ocw3: u8) -> u16 {
        self.bus.outb(PIC1_COMMAND, ocw3);
        self.bus.outb(PIC2_COMMAND, ocw3);
        let master = self.bus.inb(PIC1_COMMAND) as u16;
        let slave = self.bus.inb(PIC2_COMMAND) as u16;
        (slave << 8) | master
    }
}
