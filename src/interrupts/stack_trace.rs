//! Best-effort EBP frame-chain walk for fault reports.
//!
//! The chain being walked belongs to a thread that just faulted, so it must
//! be assumed corrupt: the walk is bounded, stops on null or non-increasing
//! frame pointers and refuses addresses outside the mapped kernel window.
//! Its output is diagnostic text only, never a control input.

/// Upper bound on frames printed in one report.
pub const MAX_FRAMES: usize = 32;

/// Lowest address a plausible kernel frame can live at (below it is the
/// real-mode IVT/BDA area).
#[cfg(target_arch = "x86")]
const KERNEL_WINDOW_START: u32 = 0x1000;
/// One past the identity-mapped region (64 MB).
#[cfg(target_arch = "x86")]
const KERNEL_WINDOW_END: u32 = 64 * 1024 * 1024;

/// Why a walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEnd {
    /// Reached a frame whose saved base pointer is zero: clean end of chain.
    NullFrame,
    /// The next saved base pointer did not increase: corrupt or cyclic chain.
    NotMonotonic,
    /// A frame pointer left the plausible kernel range.
    OutOfRange,
    /// Gave up after `MAX_FRAMES` frames.
    FrameLimit,
}

/// Follows the `[saved EBP, return address]` chain starting at `ebp`.
///
/// `read_frame` resolves one frame or refuses it (unaligned, unmapped, out
/// of range); `visit` receives `(index, frame EBP, return address)` for
/// every accepted frame. Returns how many frames were visited and why the
/// walk ended.
pub fn walk<R, V>(mut ebp: u32, read_frame: R, mut visit: V) -> (usize, WalkEnd)
where
    R: Fn(u32) -> Option<(u32, u32)>,
    V: FnMut(usize, u32, u32),
{
    let mut frames = 0;

    while frames < MAX_FRAMES {
        if ebp == 0 {
            return (frames, WalkEnd::NullFrame);
        }

        let (next_ebp, ret_addr) = match read_frame(ebp) {
            Some(frame) => frame,
            None => return (frames, WalkEnd::OutOfRange),
        };

        visit(frames, ebp, ret_addr);
        frames += 1;

        if next_ebp == 0 {
            return (frames, WalkEnd::NullFrame);
        }
        // Stacks grow down, so an honest caller frame sits at a strictly
        // higher address. Anything else is corruption or a cycle.
        if next_ebp <= ebp {
            return (frames, WalkEnd::NotMonotonic);
        }

        ebp = next_ebp;
    }

    (frames, WalkEnd::FrameLimit)
}

/// Frame reader over live kernel memory. The bounds check keeps the raw
/// reads inside the identity-mapped window; alignment is checked because a
/// torn EBP is the common corruption.
#[cfg(target_arch = "x86")]
pub fn read_kernel_frame(ebp: u32) -> Option<(u32, u32)> {
    if ebp % 4 != 0 {
        return None;
    }
    if ebp < KERNEL_WINDOW_START || ebp >= KERNEL_WINDOW_END - 4 {
        return None;
    }

    let frame = ebp as *const u32;
    unsafe { Some((frame.read(), frame.add(1).read())) }
}
