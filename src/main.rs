// Freestanding only when built for the bare-metal target; a hosted build
// compiles down to an empty stub so `cargo test` can link the workspace.
#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
#[macro_use]
extern crate simple_os;

#[cfg(target_os = "none")]
use core::panic::PanicInfo;

#[cfg(target_os = "none")]
use simple_os::{
    allocator, arch,
    driver::{keyboard, mouse},
    framebuffer::{Framebuffer, VesaInfo},
    hlt_loop, interrupts,
    irq::IrqTable,
    paging::{Pager, PAGE_PRESENT, PAGE_WRITE},
    pic::{Pic, PIC1_OFFSET, PIC2_OFFSET},
    port::HardwareIo,
};

/// The low 64 MB are identity mapped; kernel image, heap and the VESA info
/// block all live inside this window.
#[cfg(target_os = "none")]
const IDENTITY_MAP_SIZE: u32 = 64 * 1024 * 1024;

//* Panic Handler
#[cfg(target_os = "none")]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    println!("{}", info);
    hlt_loop()
}

//* The entry point
// Don't mangle the name so that the bootstrap can jump to the function
// This code should never return
#[cfg(target_os = "none")]
#[no_mangle]
pub extern "C" fn _start() -> ! {
    println!("Kernel entry, ESP = {:#010x}", arch::stack_pointer());

    allocator::init_heap();
    interrupts::init_idt();

    let mut pic = Pic::new(HardwareIo);
    pic.remap(PIC1_OFFSET, PIC2_OFFSET);

    let mut irqs = IrqTable::new();
    keyboard::init();
    irqs.install(1, keyboard::irq_handler);
    match mouse::init() {
        Ok(()) => irqs.install(12, mouse::irq_handler),
        Err(err) => println!("Mouse init failed: {}", err),
    }

    let mut pager = match Pager::create() {
        Ok(pager) => pager,
        Err(err) => {
            println!("Paging setup failed: {}", err);
            hlt_loop()
        }
    };
    if let Err(err) = pager.identity_map(0, IDENTITY_MAP_SIZE, PAGE_PRESENT | PAGE_WRITE) {
        println!("Identity map failed: {}", err);
        hlt_loop()
    }
    unsafe { pager.enable() };

    // The linear framebuffer sits above the identity window, so it gets its
    // own mapping after paging is live.
    let vesa = unsafe { VesaInfo::read() };
    println!(
        "VESA mode {}x{} @ {}bpp, LFB at {:#010x}",
        vesa.width, vesa.height, vesa.bits_per_pixel, vesa.framebuffer
    );
    if let Err(err) = pager.identity_map(
        vesa.framebuffer,
        vesa.size_bytes(),
        PAGE_PRESENT | PAGE_WRITE,
    ) {
        println!("Framebuffer map failed: {}", err);
        hlt_loop()
    }

    if vesa.bits_per_pixel >= 24 {
        let lfb = unsafe {
            core::slice::from_raw_parts_mut(vesa.framebuffer as *mut u8, vesa.size_bytes() as usize)
        };
        let mut fb =
            Framebuffer::new(lfb, vesa.width as u32, vesa.height as u32, vesa.bits_per_pixel);
        fb.fill_rect(0, 0, fb.width(), fb.height(), 0x20, 0x20, 0x40);
    } else {
        println!("Unsupported framebuffer depth: {}bpp", vesa.bits_per_pixel);
    }

    println!("Entering polling loop");
    // Busy-poll. IF is never set (no gates exist past vector 31), and hlt
    // with IF clear would sleep through every device IRQ.
    loop {
        irqs.dispatch_pending(&mut pic);
        keyboard::poll();
        mouse::poll();
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
