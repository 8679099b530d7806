//! Privileged-instruction wrappers for 32-bit protected mode.
//!
//! Everything here is a single instruction or a short fixed sequence. The
//! real versions only compile for `target_arch = "x86"`; on any other target
//! they compile out so the paging and descriptor-table bookkeeping can be
//! exercised without touching control registers.

/// Loads the IDT register from a (limit, base) pair.
///
/// # Safety
/// `base` must point at a table of `limit + 1` bytes of valid gate
/// descriptors that outlives every interrupt that may fire.
#[cfg(target_arch = "x86")]
pub unsafe fn lidt(limit: u16, base: u32) {
    #[repr(C, packed)]
    struct DescriptorTablePointer {
        limit: u16,
        base: u32,
    }

    let pointer = DescriptorTablePointer { limit, base };
    core::arch::asm!("lidt [{}]", in(reg) &pointer, options(readonly, nostack, preserves_flags));
}

#[cfg(not(target_arch = "x86"))]
pub unsafe fn lidt(_limit: u16, _base: u32) {}

/// Reads CR2, the faulting linear address after a page fault.
#[cfg(target_arch = "x86")]
pub fn read_fault_address() -> u32 {
    let value: u32;
    unsafe {
        core::arch::asm!("mov {}, cr2", out(reg) value, options(nomem, nostack, preserves_flags));
    }
    value
}

#[cfg(not(target_arch = "x86"))]
pub fn read_fault_address() -> u32 {
    0
}

/// Points CR3 at the page directory.
///
/// # Safety
/// `directory` must be the physical address of a 4096-byte-aligned page
/// directory that stays alive for as long as paging is enabled.
#[cfg(target_arch = "x86")]
pub unsafe fn load_page_directory(directory: u32) {
    core::arch::asm!("mov cr3, {}", in(reg) directory, options(nostack, preserves_flags));
}

#[cfg(not(target_arch = "x86"))]
pub unsafe fn load_page_directory(_directory: u32) {}

/// Turns paging on: PSE in CR4, then the PG bit in CR0, followed by a jump
/// to serialize the pipeline. There is no corresponding disable.
///
/// # Safety
/// CR3 must already hold a directory that identity-maps the currently
/// executing code, or the next instruction fetch faults.
#[cfg(target_arch = "x86")]
pub unsafe fn enable_paging() {
    core::arch::asm!(
        "mov {tmp}, cr4",
        "or {tmp}, 0x00000010",
        "mov cr4, {tmp}",
        "mov {tmp}, cr0",
        "or {tmp}, 0x80000000",
        "mov cr0, {tmp}",
        "jmp 2f",
        "2:",
        tmp = out(reg) _,
        options(nostack),
    );
}

#[cfg(not(target_arch = "x86"))]
pub unsafe fn enable_paging() {}

/// Discards the cached translation for one virtual address.
#[cfg(target_arch = "x86")]
pub fn invalidate_page(virt: u32) {
    unsafe {
        core::arch::asm!("invlpg [{}]", in(reg) virt, options(nostack, preserves_flags));
    }
}

#[cfg(not(target_arch = "x86"))]
pub fn invalidate_page(_virt: u32) {}

/// The current stack pointer, logged at boot.
#[cfg(target_arch = "x86")]
pub fn stack_pointer() -> u32 {
    let esp: u32;
    unsafe {
        core::arch::asm!("mov {}, esp", out(reg) esp, options(nomem, nostack, preserves_flags));
    }
    esp
}

#[cfg(not(target_arch = "x86"))]
pub fn stack_pointer() -> u32 {
    0
}

/// Halts until the next interrupt.
pub fn halt() {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    unsafe {
        core::arch::asm!("hlt", options(nomem, nostack, preserves_flags));
    }
}
