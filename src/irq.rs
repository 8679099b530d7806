//! The IRQ routing table and the cooperative dispatch loop that drains it.

use crate::pic::Pic;
use crate::port::PortIo;

pub const NUM_IRQS: usize = 16;

/// Handlers take no arguments; each driver drains its own hardware FIFO.
pub type IrqHandler = fn();

/// Fixed routing table from IRQ line to handler. Single-threaded by
/// construction (one CPU, no preemption), so plain mutation is enough.
pub struct IrqTable {
    routines: [Option<IrqHandler>; NUM_IRQS],
}

impl IrqTable {
    pub const fn new() -> Self {
        Self {
            routines: [None; NUM_IRQS],
        }
    }

    pub fn install(&mut self, irq: u8, handler: IrqHandler) {
        assert!((irq as usize) < NUM_IRQS, "IRQ line out of range");
        self.routines[irq as usize] = Some(handler);
    }

    pub fn uninstall(&mut self, irq: u8) {
        assert!((irq as usize) < NUM_IRQS, "IRQ line out of range");
        self.routines[irq as usize] = None;
    }

    pub fn handler(&self, irq: u8) -> Option<IrqHandler> {
        self.routines.get(irq as usize).copied().flatten()
    }

    /// Reads the pending bitmap once and services the set lines in
    /// ascending order. A line without a handler is still acknowledged and
    /// then dropped. A line that fires again while its handler runs is
    /// picked up on the next poll, not within this pass.
    pub fn dispatch_pending<B: PortIo>(&self, pic: &mut Pic<B>) {
        let pending = pic.get_pending();

        for irq in 0..NUM_IRQS as u8 {
            if pending & (1 << irq) == 0 {
                continue;
            }

            if let Some(handler) = self.routines[irq as usize] {
                handler();
            }

            // Acknowledge the interrupt
            pic.send_eoi(irq);
        }
    }
}

impl Default for IrqTable {
    fn default() -> Self {
        Self::new()
    }
}
