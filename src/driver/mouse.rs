//! PS/2 mouse: controller bring-up, the IRQ 12 byte queue and the 3-byte
//! packet decoder.

use core::fmt;

use conquer_once::spin::OnceCell;
use crossbeam_queue::ArrayQueue;
use spin::Mutex;

use crate::port::{HardwareIo, PortIo};

const DATA_PORT: u16 = 0x60;
const COMMAND_PORT: u16 = 0x64;

/// Spins on controller status bits roughly this many times before giving up.
const TIMEOUT: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseError {
    /// The device answered something other than 0xFA to a command.
    NoAck(u8),
}

impl fmt::Display for MouseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MouseError::NoAck(got) => write!(f, "mouse did not ACK (got {:#x})", got),
        }
    }
}

static PACKET_QUEUE: OnceCell<ArrayQueue<u8>> = OnceCell::uninit();

lazy_static! {
    static ref DECODER: Mutex<PacketDecoder> = Mutex::new(PacketDecoder::new());
}

fn wait_writable<B: PortIo>(bus: &mut B) {
    let mut timeout = TIMEOUT;
    while bus.inb(COMMAND_PORT) & 0x02 != 0 && timeout > 0 {
        timeout -= 1;
    }
}

fn wait_readable<B: PortIo>(bus: &mut B) {
    let mut timeout = TIMEOUT;
    while bus.inb(COMMAND_PORT) & 0x01 == 0 && timeout > 0 {
        timeout -= 1;
    }
}

fn read_data<B: PortIo>(bus: &mut B) -> u8 {
    wait_readable(bus);
    bus.inb(DATA_PORT)
}

/// Sends one command byte to the mouse itself: 0xD4 tells the controller
/// to forward the next data byte to the second PS/2 device.
fn write_mouse<B: PortIo>(bus: &mut B, data: u8) {
    wait_writable(bus);
    bus.outb(COMMAND_PORT, 0xD4);
    wait_writable(bus);
    bus.outb(DATA_PORT, data);
}

fn command_expect_ack<B: PortIo>(bus: &mut B, command: u8) -> Result<(), MouseError> {
    write_mouse(bus, command);
    match read_data(bus) {
        0xFA => Ok(()),
        other => Err(MouseError::NoAck(other)),
    }
}

/// Brings up the second PS/2 port and enables packet reporting. Call once
/// at boot, before IRQ 12 is serviced.
pub fn init() -> Result<(), MouseError> {
    PACKET_QUEUE
        .try_init_once(|| ArrayQueue::new(120))
        .expect("mouse::init should only be called once!");

    let mut bus = HardwareIo;

    // Enable the second PS/2 port
    wait_writable(&mut bus);
    bus.outb(COMMAND_PORT, 0xA8);

    // Read the configuration byte, set bit 1 (port-2 interrupts) and
    // write it back
    wait_writable(&mut bus);
    bus.outb(COMMAND_PORT, 0x20);
    let status = read_data(&mut bus) | 0x02;
    wait_writable(&mut bus);
    bus.outb(COMMAND_PORT, 0x60);
    wait_writable(&mut bus);
    bus.outb(DATA_PORT, status);

    // Default settings, then start reporting
    command_expect_ack(&mut bus, 0xF6)?;
    command_expect_ack(&mut bus, 0xF4)?;

    Ok(())
}

pub(crate) fn add_packet_byte(byte: u8) {
    if let Ok(queue) = PACKET_QUEUE.try_get() {
        if queue.push(byte).is_err() {
            println!("WARNING: packet queue full; dropping mouse input!");
        }
    } else {
        println!("WARNING: mouse packet queue uninitialized!");
    }
}

/// IRQ 12 handler: pull the packet byte out of the controller FIFO.
pub fn irq_handler() {
    let mut bus = HardwareIo;
    add_packet_byte(bus.inb(DATA_PORT));
}

/// A decoded movement/button report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub dx: i16,
    pub dy: i16,
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

/// Accumulates the 3-byte packet stream. Byte 0 carries the button bits,
/// the sign bits for both deltas and an always-set alignment bit; bytes 1
/// and 2 are the 9-bit signed X and Y movements.
pub struct PacketDecoder {
    buffer: [u8; 3],
    filled: usize,
}

impl PacketDecoder {
    pub const fn new() -> Self {
        Self {
            buffer: [0; 3],
            filled: 0,
        }
    }

    pub fn process_byte(&mut self, byte: u8) -> Option<MouseEvent> {
        if self.filled == 0 && byte & 0x08 == 0 {
            // Out of sync; drop bytes until a plausible first byte shows up
            return None;
        }

        self.buffer[self.filled] = byte;
        self.filled += 1;

        if self.filled < 3 {
            return None;
        }
        self.filled = 0;

        let flags = self.buffer[0];
        // X/Y overflow: discard the packet, the deltas are garbage
        if flags & 0xC0 != 0 {
            return None;
        }

        let mut dx = self.buffer[1] as i16;
        if flags & 0x10 != 0 {
            dx -= 0x100;
        }
        let mut dy = self.buffer[2] as i16;
        if flags & 0x20 != 0 {
            dy -= 0x100;
        }

        Some(MouseEvent {
            dx,
            dy,
            left: flags & 0x01 != 0,
            right: flags & 0x02 != 0,
            middle: flags & 0x04 != 0,
        })
    }
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Drains the byte queue from the polling loop and logs movements.
pub fn poll() {
    let queue = match PACKET_QUEUE.try_get() {
        Ok(queue) => queue,
        Err(_) => return,
    };

    let mut decoder = DECODER.lock();
    while let Ok(byte) = queue.pop() {
        if let Some(event) = decoder.process_byte(byte) {
            println!(
                "Mouse: dx={} dy={} buttons=[{}{}{}]",
                event.dx,
                event.dy,
                if event.left { "L" } else { "-" },
                if event.middle { "M" } else { "-" },
                if event.right { "R" } else { "-" },
            );
        }
    }
}
