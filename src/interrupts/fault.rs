//! Common handler for the 32 hardware exception vectors: names the fault,
//! decodes page faults, walks the stack, dumps registers and halts.

use core::fmt::{self, Write};

use crate::interrupts::stack_trace::{self, WalkEnd};

/// CPU state as the exception stubs capture it: segment registers at the
/// lowest addresses, then the `pusha` block, then the vector number, error
/// code and the frame the CPU itself pushed. Field order is the stub's push
/// order reversed; do not reorder.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Registers {
    pub gs: u32,
    pub fs: u32,
    pub es: u32,
    pub ds: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub int_no: u32,
    pub err_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

/// Vector 14.
pub const PAGE_FAULT_VECTOR: u32 = 14;

const EXCEPTION_NAMES: [&str; 32] = [
    "Division By Zero",
    "Debug",
    "Non Maskable Interrupt",
    "Breakpoint",
    "Into Detected Overflow",
    "Out of Bounds",
    "Invalid Opcode",
    "No Coprocessor",
    "Double Fault",
    "Coprocessor Segment Overrun",
    "Bad TSS",
    "Segment Not Present",
    "Stack Fault",
    "General Protection Fault",
    "Page Fault",
    "Unknown Interrupt",
    "Coprocessor Fault",
    "Alignment Check",
    "Machine Check",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
];

/// Human-readable name for a vector. Numbers past the 32 hardware
/// exceptions can only appear if extra vectors get installed later.
pub fn exception_name(int_no: u32) -> &'static str {
    EXCEPTION_NAMES
        .get(int_no as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// The three error-code bits a page fault reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFaultCause {
    /// Set: the access was a write. Clear: a read.
    pub write: bool,
    /// Set: the fault came from user mode.
    pub user: bool,
    /// Set: a protection violation on a present page. Clear: not present.
    pub protection: bool,
}

impl PageFaultCause {
    pub fn decode(err_code: u32) -> Self {
        Self {
            write: err_code & 0x2 != 0,
            user: err_code & 0x4 != 0,
            protection: err_code & 0x1 != 0,
        }
    }
}

impl fmt::Display for PageFaultCause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} access ({} mode, {})",
            if self.write { "Write" } else { "Read" },
            if self.user { "User" } else { "Kernel" },
            if self.protection {
                "Protection"
            } else {
                "Not Present"
            },
        )
    }
}

/// Writes the full fault report: vector, page-fault decode when it applies,
/// stack trace and register dump. `read_frame` resolves stack frames so the
/// unsafe memory walk stays outside this function.
pub fn report<R>(
    regs: &Registers,
    fault_addr: u32,
    read_frame: R,
    out: &mut dyn Write,
) -> fmt::Result
where
    R: Fn(u32) -> Option<(u32, u32)>,
{
    writeln!(out, "\n********** EXCEPTION OCCURRED **********")?;
    writeln!(
        out,
        "Interrupt Number: {} ({})",
        regs.int_no,
        exception_name(regs.int_no)
    )?;

    if regs.int_no == PAGE_FAULT_VECTOR {
        let cause = PageFaultCause::decode(regs.err_code);
        writeln!(out, "\nPAGE FAULT @ {:#010x}", fault_addr)?;
        writeln!(out, "Error Code: {:#x}", regs.err_code)?;
        writeln!(out, "{} at {:#010x}", cause, fault_addr)?;
    }

    writeln!(out, ">>> Starting stack trace from EBP: {:#010x}", regs.ebp)?;
    let mut trace_error = Ok(());
    let (frames, end) = stack_trace::walk(regs.ebp, read_frame, |index, ebp, ret| {
        if trace_error.is_ok() {
            trace_error = writeln!(
                out,
                "  Frame {}: EBP={:#010x}, RET={:#010x}",
                index, ebp, ret
            );
        }
    });
    trace_error?;
    match end {
        WalkEnd::NullFrame => writeln!(out, "Stack ended ({} frames)", frames)?,
        WalkEnd::NotMonotonic => writeln!(out, "Stack ended early: frame chain not increasing")?,
        WalkEnd::OutOfRange => writeln!(out, "Stack ended early: frame outside kernel range")?,
        WalkEnd::FrameLimit => writeln!(out, "Stack trace truncated at {} frames", frames)?,
    }

    writeln!(out, "\nRegister Dump:")?;
    writeln!(
        out,
        "EAX={:#010x} EBX={:#010x} ECX={:#010x} EDX={:#010x}",
        regs.eax, regs.ebx, regs.ecx, regs.edx
    )?;
    writeln!(
        out,
        "ESI={:#010x} EDI={:#010x} EBP={:#010x} ESP={:#010x}",
        regs.esi, regs.edi, regs.ebp, regs.esp
    )?;
    writeln!(
        out,
        "DS={:#06x} ES={:#06x} FS={:#06x} GS={:#06x}",
        regs.ds, regs.es, regs.fs, regs.gs
    )?;
    writeln!(
        out,
        "EIP={:#010x} CS={:#06x} EFLAGS={:#010x}",
        regs.eip, regs.cs, regs.eflags
    )?;
    writeln!(out, "********** SYSTEM HALTED **********")?;

    Ok(())
}

/// The C-level handler every exception stub calls. Reports everything it
/// can and never returns; no vector is resumable in this design.
#[cfg(target_arch = "x86")]
#[no_mangle]
pub extern "C" fn isr_handler(regs: &mut Registers) -> ! {
    let fault_addr = if regs.int_no == PAGE_FAULT_VECTOR {
        crate::arch::read_fault_address()
    } else {
        0
    };

    // The interrupted context may have been mid-print and still hold the
    // serial lock. It never resumes, so reclaim the lock rather than
    // spinning on it and losing the report.
    unsafe { crate::serial::SERIAL1.force_unlock() };
    let _ = report(
        regs,
        fault_addr,
        stack_trace::read_kernel_frame,
        &mut *crate::serial::SERIAL1.lock(),
    );

    crate::hlt_loop()
}
