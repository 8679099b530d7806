//! Software blitter over a linear framebuffer.
//!
//! The bootstrap leaves a VESA mode-info block in low memory; the kernel
//! maps the linear framebuffer it names and draws through [`Framebuffer`],
//! which also works over any plain byte slice under test.

/// Physical address of the mode-info block the bootstrap fills in.
pub const VESA_INFO_ADDR: u32 = 0x7E00;

/// Fields the bootstrap records about the active video mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VesaInfo {
    pub width: u16,
    pub height: u16,
    pub bits_per_pixel: u8,
    pub framebuffer: u32,
}

impl VesaInfo {
    /// Reads the block at [`VESA_INFO_ADDR`].
    ///
    /// # Safety
    /// Only valid once the bootstrap has written the block and the page
    /// covering it is mapped.
    #[cfg(target_arch = "x86")]
    pub unsafe fn read() -> Self {
        let base = VESA_INFO_ADDR as usize;
        Self {
            width: (base as *const u16).read_unaligned(),
            height: ((base + 0x02) as *const u16).read_unaligned(),
            bits_per_pixel: ((base + 0x04) as *const u8).read(),
            framebuffer: ((base + 0x06) as *const u32).read_unaligned(),
        }
    }

    pub fn size_bytes(&self) -> u32 {
        self.width as u32 * self.height as u32 * (self.bits_per_pixel as u32 / 8)
    }
}

/// Blends one channel of `src` over `dst` at the given opacity.
pub fn blend_channel(src: u8, dst: u8, alpha: u8) -> u8 {
    ((src as u32 * alpha as u32 + dst as u32 * (255 - alpha as u32)) / 255) as u8
}

pub struct Framebuffer<'a> {
    buffer: &'a mut [u8],
    width: u32,
    height: u32,
    bytes_per_pixel: u32,
}

impl<'a> Framebuffer<'a> {
    /// The pixel writers store three channel bytes, so modes below 24bpp
    /// are rejected here rather than corrupting neighboring pixels.
    pub fn new(buffer: &'a mut [u8], width: u32, height: u32, bits_per_pixel: u8) -> Self {
        let bytes_per_pixel = bits_per_pixel as u32 / 8;
        assert!(bytes_per_pixel >= 3, "framebuffer needs at least 24bpp");

        Self {
            buffer,
            width,
            height,
            bytes_per_pixel,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * self.bytes_per_pixel) as usize
    }

    /// Opaque pixel write, BGR byte order. Out-of-bounds coordinates are
    /// silently dropped so callers can draw shapes that cross the edges.
    pub fn put_pixel(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8) {
        if x >= self.width || y >= self.height {
            return;
        }

        let offset = self.offset(x, y);
        self.buffer[offset] = b;
        self.buffer[offset + 1] = g;
        self.buffer[offset + 2] = r;
    }

    /// Alpha-blended pixel write; `rgba` is 0xAARRGGBB.
    pub fn put_pixel_rgba(&mut self, x: u32, y: u32, rgba: u32) {
        if x >= self.width || y >= self.height {
            return;
        }

        let src_r = ((rgba >> 16) & 0xFF) as u8;
        let src_g = ((rgba >> 8) & 0xFF) as u8;
        let src_b = (rgba & 0xFF) as u8;
        let alpha = ((rgba >> 24) & 0xFF) as u8;

        let offset = self.offset(x, y);
        self.buffer[offset] = blend_channel(src_b, self.buffer[offset], alpha);
        self.buffer[offset + 1] = blend_channel(src_g, self.buffer[offset + 1], alpha);
        self.buffer[offset + 2] = blend_channel(src_r, self.buffer[offset + 2], alpha);
    }

    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, r: u8, g: u8, b: u8) {
        if x >= self.width || y >= self.height {
            return;
        }

        for dx in 0..width {
            for dy in 0..height {
                self.put_pixel(x + dx, y + dy, r, g, b);
            }
        }
    }
}
