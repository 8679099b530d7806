//! Two-level 32-bit paging: one page directory, lazily allocated page
//! tables, flat identity/range mapping and the one-way enable transition.

use core::alloc::Layout;
use core::fmt;

use alloc::alloc::alloc_zeroed;
use alloc::boxed::Box;
use volatile::Volatile;

use crate::arch;

pub const PAGE_SIZE: u32 = 4096;
pub const PAGE_ENTRIES: usize = 1024;

pub const PAGE_PRESENT: u32 = 0x1;
pub const PAGE_WRITE: u32 = 0x2;
pub const PAGE_USER: u32 = 0x4;
pub const PAGE_GLOBAL: u32 = 1 << 8;

/// Only the low 12 bits of an entry hold flags; the rest is the frame.
const FLAGS_MASK: u32 = 0xFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingError {
    /// No memory for the directory or a page table. Fatal this early in
    /// boot, but the caller decides how to present that.
    OutOfMemory,
}

impl fmt::Display for PagingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PagingError::OutOfMemory => write!(f, "out of memory for paging structures"),
        }
    }
}

/// 1024 hardware-consulted entries. Used for both the directory and the
/// page tables; the alignment is required because the CPU only stores the
/// top 20 bits of the address.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [Volatile<u32>; PAGE_ENTRIES],
}

impl PageTable {
    fn entry(&self, index: usize) -> u32 {
        self.entries[index].read()
    }

    fn set_entry(&mut self, index: usize, value: u32) {
        self.entries[index].write(value);
    }
}

/// Allocates a zeroed, page-aligned table. `alloc_zeroed` rather than
/// `Box::new` so an exhausted heap surfaces as an error instead of an
/// allocator abort.
fn alloc_page_table() -> Result<Box<PageTable>, PagingError> {
    let layout = Layout::new::<PageTable>();
    let ptr = unsafe { alloc_zeroed(layout) } as *mut PageTable;
    if ptr.is_null() {
        return Err(PagingError::OutOfMemory);
    }
    // The pointer is non-null, correctly aligned and fully initialized
    // (all-zero entries are valid "absent" entries).
    Ok(unsafe { Box::from_raw(ptr) })
}

fn table_address(table: &PageTable) -> u32 {
    table as *const PageTable as usize as u32
}

/// Owns the page directory and its tables.
///
/// Lifecycle: created once at boot, mapped any number of times, then
/// enabled. Enabling is irreversible; mappings stay mutable afterwards but
/// every change additionally invalidates the stale translation. Tables are
/// never freed (`destroy` only clears the active flag).
pub struct Pager {
    directory: Box<PageTable>,
    tables: [Option<Box<PageTable>>; PAGE_ENTRIES],
    active: bool,
    tlb_flushes: u64,
}

impl Pager {
    /// Allocates the directory and the empty table slots. Never returns a
    /// partially initialized pager: the first failed allocation aborts the
    /// whole construction.
    pub fn create() -> Result<Self, PagingError> {
        const NO_TABLE: Option<Box<PageTable>> = None;

        Ok(Self {
            directory: alloc_page_table()?,
            tables: [NO_TABLE; PAGE_ENTRIES],
            active: false,
            tlb_flushes: 0,
        })
    }

    /// Maps one 4 KB page.
    ///
    /// The present bit is forced on regardless of what `flags` asks for, so
    /// a caller cannot create a not-present mapping through this interface.
    /// The table covering `virt` is allocated on first touch and installed
    /// in the directory with present+write flags.
    pub fn map_page(&mut self, virt: u32, phys: u32, flags: u32) -> Result<(), PagingError> {
        let pdi = (virt >> 22) as usize;
        let pti = ((virt >> 12) & 0x3FF) as usize;

        if self.tables[pdi].is_none() {
            let table = alloc_page_table()?;
            self.directory
                .set_entry(pdi, table_address(&table) | PAGE_PRESENT | PAGE_WRITE);
            self.tables[pdi] = Some(table);
        }

        if let Some(table) = self.tables[pdi].as_mut() {
            table.set_entry(pti, (phys & !FLAGS_MASK) | (flags & FLAGS_MASK) | PAGE_PRESENT);
        }

        // Flush the stale translation once the hardware may have cached one
        if self.active {
            self.invalidate(virt);
        }

        Ok(())
    }

    /// Maps `[virt_start, virt_start + size)`, aligned down at the start
    /// and up at the end, with physical addresses moving in lockstep
    /// (`phys_start + (virt - virt_start)`). Non-contiguous layouts are not
    /// supported.
    pub fn map_range(
        &mut self,
        virt_start: u32,
        phys_start: u32,
        size: u32,
        flags: u32,
    ) -> Result<(), PagingError> {
        let aligned_start = virt_start & !(PAGE_SIZE - 1);
        // Computed in u64 so a range touching the top of the address space
        // does not wrap the end below the start.
        let virt_end = virt_start as u64 + size as u64;
        let aligned_end = (virt_end + (PAGE_SIZE as u64 - 1)) & !(PAGE_SIZE as u64 - 1);

        let mut virt = aligned_start as u64;
        while virt < aligned_end {
            let v = virt as u32;
            let phys = phys_start.wrapping_add(v.wrapping_sub(virt_start));
            self.map_page(v, phys, flags)?;
            virt += PAGE_SIZE as u64;
        }

        Ok(())
    }

    /// Maps a region so that virtual == physical.
    pub fn identity_map(&mut self, phys_start: u32, size: u32, flags: u32) -> Result<(), PagingError> {
        self.map_range(phys_start, phys_start, size, flags)
    }

    /// Loads CR3 and turns paging on. Irreversible: nothing in this design
    /// ever clears CR0.PG again.
    ///
    /// # Safety
    /// The directory must identity-map the currently executing code and
    /// stack, or the next instruction fetch page-faults.
    pub unsafe fn enable(&mut self) {
        arch::load_page_directory(table_address(&self.directory));
        arch::enable_paging();
        self.active = true;
    }

    /// Teardown stub: drops out of the active state for bookkeeping
    /// purposes. The directory and tables are never freed.
    pub fn destroy(&mut self) {
        self.active = false;
    }

    fn invalidate(&mut self, virt: u32) {
        self.tlb_flushes += 1;
        arch::invalidate_page(virt);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// How many single-address translation flushes have been issued.
    pub fn tlb_flushes(&self) -> u64 {
        self.tlb_flushes
    }

    /// The raw page-table entry covering `virt`, or `None` if no table has
    /// been allocated for its 4 MB region.
    pub fn entry(&self, virt: u32) -> Option<u32> {
        let pdi = (virt >> 22) as usize;
        let pti = ((virt >> 12) & 0x3FF) as usize;
        self.tables[pdi].as_ref().map(|table| table.entry(pti))
    }

    /// The raw directory entry for a directory index.
    pub fn directory_entry(&self, pdi: usize) -> u32 {
        self.directory.entry(pdi)
    }

    /// Number of page tables allocated so far (one per touched 4 MB region).
    pub fn allocated_tables(&self) -> usize {
        self.tables.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_split_virtual_address() {
        // 0x0040_2000 -> directory 1, table 2
        let virt: u32 = (1 << 22) | (2 << 12);
        assert_eq!(virt >> 22, 1);
        assert_eq!((virt >> 12) & 0x3FF, 2);
    }

    #[test]
    fn directory_entry_carries_present_and_write() {
        let mut pager = Pager::create().unwrap();
        pager.map_page(0x0040_0000, 0x0080_0000, PAGE_WRITE).unwrap();
        let entry = pager.directory_entry(1);
        assert_eq!(entry & 0x3, PAGE_PRESENT | PAGE_WRITE);
        assert_ne!(entry & !FLAGS_MASK, 0);
    }
}
