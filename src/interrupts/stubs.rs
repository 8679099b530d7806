//! Low-level entry points for the 32 hardware exception vectors.
//!
//! Each stub normalizes the stack to the `Registers` layout: vectors where
//! the CPU pushes no error code push a dummy zero, then every stub pushes
//! its vector number and falls into the common path, which saves the
//! general-purpose and segment registers, switches to the kernel data
//! segment and calls `isr_handler` with a pointer to the snapshot.

#![cfg(target_arch = "x86")]

use core::arch::global_asm;

// Vectors 8, 10-14 and 17 come with a CPU-pushed error code; everything
// else gets the dummy so the frame layout is uniform.
global_asm!(
    r#"
.macro isr_no_err vec
.global isr\vec
isr\vec:
    push 0
    push \vec
    jmp isr_common
.endm

.macro isr_err vec
.global isr\vec
isr\vec:
    push \vec
    jmp isr_common
.endm

isr_no_err 0
isr_no_err 1
isr_no_err 2
isr_no_err 3
isr_no_err 4
isr_no_err 5
isr_no_err 6
isr_no_err 7
isr_err    8
isr_no_err 9
isr_err    10
isr_err    11
isr_err    12
isr_err    13
isr_err    14
isr_no_err 15
isr_no_err 16
isr_err    17
isr_no_err 18
isr_no_err 19
isr_no_err 20
isr_no_err 21
isr_no_err 22
isr_no_err 23
isr_no_err 24
isr_no_err 25
isr_no_err 26
isr_no_err 27
isr_no_err 28
isr_no_err 29
isr_no_err 30
isr_no_err 31

isr_common:
    pusha
    push ds
    push es
    push fs
    push gs
    mov ax, 0x10
    mov ds, ax
    mov es, ax
    mov fs, ax
    mov gs, ax
    push esp
    call isr_handler
    add esp, 4
    pop gs
    pop fs
    pop es
    pop ds
    popa
    add esp, 8
    iretd
"#
);

extern "C" {
    fn isr0();
    fn isr1();
    fn isr2();
    fn isr3();
    fn isr4();
    fn isr5();
    fn isr6();
    fn isr7();
    fn isr8();
    fn isr9();
    fn isr10();
    fn isr11();
    fn isr12();
    fn isr13();
    fn isr14();
    fn isr15();
    fn isr16();
    fn isr17();
    fn isr18();
    fn isr19();
    fn isr20();
    fn isr21();
    fn isr22();
    fn isr23();
    fn isr24();
    fn isr25();
    fn isr26();
    fn isr27();
    fn isr28();
    fn isr29();
    fn isr30();
    fn isr31();
}

/// Entry-point addresses for vectors 0..32, in vector order.
pub fn exception_stubs() -> [u32; 32] {
    [
        isr0 as usize as u32,
        isr1 as usize as u32,
        isr2 as usize as u32,
        isr3 as usize as u32,
        isr4 as usize as u32,
        isr5 as usize as u32,
        isr6 as usize as u32,
        isr7 as usize as u32,
        isr8 as usize as u32,
        isr9 as usize as u32,
        isr10 as usize as u32,
        isr11 as usize as u32,
        isr12 as usize as u32,
        isr13 as usize as u32,
        isr14 as usize as u32,
        isr15 as usize as u32,
        isr16 as usize as u32,
        isr17 as usize as u32,
        isr18 as usize as u32,
        isr19 as usize as u32,
        isr20 as usize as u32,
        isr21 as usize as u32,
        isr22 as usize as u32,
        isr23 as usize as u32,
        isr24 as usize as u32,
        isr25 as usize as u32,
        isr26 as usize as u32,
        isr27 as usize as u32,
        isr28 as usize as u32,
        isr29 as usize as u32,
        isr30 as usize as u32,
        isr31 as usize as u32,
    ]
}
