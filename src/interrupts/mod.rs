//! Interrupt core: descriptor table, exception stubs, fault handling.

#[cfg(target_arch = "x86")]
use spin::Mutex;

pub mod fault;
pub mod idt;
pub mod stack_trace;
#[cfg(target_arch = "x86")]
pub mod stubs;

#[cfg(target_arch = "x86")]
use idt::Idt;

#[cfg(target_arch = "x86")]
lazy_static! {
    // The one table the hardware itself points at, so it has to be static.
    static ref IDT: Mutex<Idt> = Mutex::new(Idt::new());
}

/// Installs the 32 exception vectors and loads the IDT. From this point
/// every hardware trap goes through the stubs into the fault handler.
#[cfg(target_arch = "x86")]
pub fn init_idt() {
    let mut idt = IDT.lock();
    unsafe { idt.install(&stubs::exception_stubs()) };
}
