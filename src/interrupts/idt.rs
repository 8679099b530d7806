//! Builds and loads the interrupt descriptor table.

use core::mem::size_of;

use crate::arch;

pub const IDT_ENTRIES: usize = 256;

/// Kernel code segment selector, fixed by the GDT the bootstrap installed.
const KERNEL_CS: u16 = 0x08;
/// Present, ring 0, 32-bit interrupt gate.
const GATE_FLAGS: u8 = 0x8E;

/// One interrupt gate. The handler address is split across the low and
/// high halves with the selector and flag byte in between; layout is fixed
/// by the CPU.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct IdtEntry {
    base_lo: u16,
    sel: u16,
    always0: u8,
    flags: u8,
    base_hi: u16,
}

impl IdtEntry {
    const fn missing() -> Self {
        Self {
            base_lo: 0,
            sel: 0,
            always0: 0,
            flags: 0,
            base_hi: 0,
        }
    }

    pub fn handler(&self) -> u32 {
        (self.base_lo as u32) | ((self.base_hi as u32) << 16)
    }

    pub fn selector(&self) -> u16 {
        self.sel
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }
}

pub struct Idt {
    entries: [IdtEntry; IDT_ENTRIES],
}

impl Idt {
    pub const fn new() -> Self {
        Self {
            entries: [IdtEntry::missing(); IDT_ENTRIES],
        }
    }

    /// Writes one gate. The `u8` vector keeps the index inside the 256
    /// entries by construction.
    pub fn set_gate(&mut self, vector: u8, handler: u32) {
        self.entries[vector as usize] = IdtEntry {
            base_lo: (handler & 0xFFFF) as u16,
            sel: KERNEL_CS,
            always0: 0,
            flags: GATE_FLAGS,
            base_hi: ((handler >> 16) & 0xFFFF) as u16,
        };
    }

    /// Installs the 32 hardware-exception vectors from the given stub entry
    /// points and loads the table.
    ///
    /// # Safety
    /// Each stub must save the full register state in the `Registers`
    /// layout and call the fault handler; see [`load`](Idt::load).
    pub unsafe fn install(&mut self, stubs: &[u32; 32]) {
        for (vector, &stub) in stubs.iter().enumerate() {
            self.set_gate(vector as u8, stub);
        }
        self.load();
    }

    /// Points the CPU at this table. From here on any installed vector that
    /// fires goes through its gate.
    ///
    /// # Safety
    /// The table must outlive every interrupt that may fire, and every
    /// present gate must point at a valid entry stub.
    pub unsafe fn load(&self) {
        let limit = (size_of::<IdtEntry>() * IDT_ENTRIES - 1) as u16;
        let base = self.entries.as_ptr() as usize as u32;
        println!("Loading IDT at {:#010x} (limit={:#x})", base, limit);
        arch::lidt(limit, base);
    }

    pub fn entry(&self, vector: u8) -> IdtEntry {
        self.entries[vector as usize]
    }
}
