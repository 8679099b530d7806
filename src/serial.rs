//! COM1 serial console. Every diagnostic the kernel prints goes through
//! this sink; there is no VGA text path.

use core::fmt;

use spin::Mutex;

use crate::port::{HardwareIo, PortIo};

/// IO base for COM1.
pub const COM1: u16 = 0x3F8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// The loopback self-test byte did not come back.
    LoopbackFailed,
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SerialError::LoopbackFailed => write!(f, "serial loopback self-test failed"),
        }
    }
}

pub struct SerialPort<B: PortIo> {
    bus: B,
    base: u16,
}

impl<B: PortIo> SerialPort<B> {
    pub const fn new(bus: B, base: u16) -> Self {
        Self { bus, base }
    }

    /// 16550 bring-up: 38400 baud, 8N1, FIFOs on, finishing with a loopback
    /// self-test before switching to normal operation.
    pub fn init(&mut self) -> Result<(), SerialError> {
        self.bus.outb(self.base + 1, 0x00); // Disable all interrupts
        self.bus.outb(self.base + 3, 0x80); // Enable DLAB (set baud rate divisor)
        self.bus.outb(self.base + 0, 0x03); // Set divisor to 3 (lo byte) 38400 baud
        self.bus.outb(self.base + 1, 0x00); //                  (hi byte)
        self.bus.outb(self.base + 3, 0x03); // 8 bits, no parity, one stop bit
        self.bus.outb(self.base + 2, 0xC7); // Enable FIFO, clear them, 14-byte threshold
        self.bus.outb(self.base + 4, 0x0B); // IRQs enabled, RTS/DSR set
        self.bus.outb(self.base + 4, 0x1E); // Loopback mode for the self-test
        self.bus.outb(self.base + 0, 0xAE);

        if self.bus.inb(self.base + 0) != 0xAE {
            return Err(SerialError::LoopbackFailed);
        }

        // Normal operation: not-loopback, IRQs enabled, OUT#1 and OUT#2 set
        self.bus.outb(self.base + 4, 0x0F);
        Ok(())
    }

    fn transmit_empty(&mut self) -> bool {
        self.bus.inb(self.base + 5) & 0x20 != 0
    }

    pub fn send(&mut self, byte: u8) {
        while !self.transmit_empty() {}
        self.bus.outb(self.base, byte);
    }

    pub fn received(&mut self) -> bool {
        self.bus.inb(self.base + 5) & 1 != 0
    }

    pub fn receive(&mut self) -> u8 {
        while !self.received() {}
        self.bus.inb(self.base)
    }
}

impl<B: PortIo> fmt::Write for SerialPort<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.send(byte);
        }
        Ok(())
    }
}

lazy_static! {
    pub static ref SERIAL1: Mutex<SerialPort<HardwareIo>> = {
        let mut port = SerialPort::new(HardwareIo, COM1);
        // A faulty UART has nowhere to report itself this early; carry on
        // and let the writes fall into the void.
        let _ = port.init();
        Mutex::new(port)
    };
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    // Only a freestanding build owns the port space; anywhere else the
    // diagnostics have no transport and are dropped.
    #[cfg(target_os = "none")]
    {
        use core::fmt::Write;
        SERIAL1
            .lock()
            .write_fmt(args)
            .expect("Printing to serial failed");
    }
    #[cfg(not(target_os = "none"))]
    let _ = args;
}

//* Print macros, they all print to COM1
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::serial::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}
