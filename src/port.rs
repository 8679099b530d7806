//! Raw port I/O behind a trait so every device driver (PIC, serial, PS/2,
//! ATA) can be driven against a recorded bus in tests.

/// Byte/word access to the x86 I/O port space.
///
/// Implementations are assumed to be atomic single accesses with no failure
/// mode; `io_wait` is the conventional dummy write used to let slow devices
/// (the PIC during initialization) settle between command bytes.
pub trait PortIo {
    fn outb(&mut self, port: u16, value: u8);
    fn inb(&mut self, port: u16) -> u8;
    fn outw(&mut self, port: u16, value: u16);
    fn inw(&mut self, port: u16) -> u16;

    fn io_wait(&mut self) {
        // Port 0x80 is the POST diagnostic port; writing to it is harmless
        // and takes roughly one microsecond on the ISA bus.
        self.outb(0x80, 0);
    }
}

/// The real port space. Zero-sized, copyable, and safe to construct anywhere
/// since port access is only ever performed by the kernel (ring 0).
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareIo;

// Port instructions only exist on x86; on any other build target the
// hardware bus degenerates to a sink so the hosted test build still links.
#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
impl PortIo for HardwareIo {
    fn outb(&mut self, _port: u16, _value: u8) {}
    fn inb(&mut self, _port: u16) -> u8 {
        0
    }
    fn outw(&mut self, _port: u16, _value: u16) {}
    fn inw(&mut self, _port: u16) -> u16 {
        0
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl PortIo for HardwareIo {
    fn outb(&mut self, port: u16, value: u8) {
        unsafe {
            core::arch::asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
        }
    }

    fn inb(&mut self, port: u16) -> u8 {
        let value: u8;
        unsafe {
            core::arch::asm!("in al, dx", in("dx") port, out("al") value, options(nomem, nostack, preserves_flags));
        }
        value
    }

    fn outw(&mut self, port: u16, value: u16) {
        unsafe {
            core::arch::asm!("out dx, ax", in("dx") port, in("ax") value, options(nomem, nostack, preserves_flags));
        }
    }

    fn inw(&mut self, port: u16) -> u16 {
        let value: u16;
        unsafe {
            core::arch::asm!("in ax, dx", in("dx") port, out("ax") value, options(nomem, nostack, preserves_flags));
        }
        value
    }
}
