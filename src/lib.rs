#![cfg_attr(not(test), no_std)]

#[macro_use] // Import lazy_static! macro globally
extern crate lazy_static;

// For the heap-backed collections (queues, FAT buffers, page tables)
extern crate alloc;

//* Modules
#[macro_use]
pub mod serial;
pub mod allocator;
pub mod arch;
pub mod disk;
pub mod driver;
pub mod framebuffer;
pub mod fs;
pub mod interrupts;
pub mod irq;
pub mod paging;
pub mod pic;
pub mod port;

//* Creates a loop and halts everytime to not waste CPU cycles
pub fn hlt_loop() -> ! {
    loop {
        arch::halt()
    }
}
