//! Kernel heap: a fixed 1 MiB arena inside the kernel image handed to
//! `linked_list_allocator`. The whole image sits inside the identity map,
//! so no pages need mapping before the heap comes up.

pub const HEAP_SIZE: usize = 1024 * 1024; // 1 MiB

#[cfg(target_os = "none")]
mod arena {
    use core::ptr::addr_of_mut;

    use linked_list_allocator::LockedHeap;

    //* Use LockedHeap allocator crate
    #[global_allocator]
    static ALLOCATOR: LockedHeap = LockedHeap::empty();

    static mut HEAP: [u8; super::HEAP_SIZE] = [0; super::HEAP_SIZE];

    pub fn init_heap() {
        unsafe {
            ALLOCATOR
                .lock()
                .init(addr_of_mut!(HEAP) as usize, super::HEAP_SIZE);
        }
    }
}

#[cfg(target_os = "none")]
pub use arena::init_heap;

// Hosted builds (tests) use the system allocator instead.
#[cfg(not(target_os = "none"))]
pub fn init_heap() {}
