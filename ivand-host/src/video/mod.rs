//! Presentation pipeline: guest framebuffer -> displayable RGBA.
//!
//! The guest renders 96x64 at 2 bytes per pixel; the display wants 4 bytes
//! per pixel. `render` converts the whole frame into one reusable host-owned
//! buffer and hands it to the display surface in a single blit.
//!
//! This conversion is the dominant per-frame cost in the system (the
//! framebuffer is tiny, but it runs at refresh rate), so the scan stays
//! linear with no per-pixel allocation and no branches inside the loop.

use crate::abi::{FB_HEIGHT, FB_LEN, FB_WIDTH};

/// Bytes in the converted RGBA frame.
pub const RGBA_LEN: usize = FB_WIDTH * FB_HEIGHT * 4;

/// The drawable surface: the out-of-scope platform collaborator.
///
/// `present` receives one full `96*64*4`-byte RGBA frame per call and blits
/// it in a single operation. How the surface scales the 96x64 frame up for
/// the screen is its own business.
pub trait DisplaySurface {
    fn present(&mut self, rgba: &[u8]);
}

#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("framebuffer must be exactly {FB_LEN} bytes, got {0}")]
    BadLength(usize),
}

/// Owns the reusable display buffer and the surface it blits to.
pub struct VideoOut<S> {
    surface: S,
    pixels: Vec<u8>,
}

impl<S: DisplaySurface> VideoOut<S> {
    /// Attach to a surface and allocate the RGBA buffer once.
    pub fn setup(surface: S) -> Self {
        Self {
            surface,
            pixels: vec![0; RGBA_LEN],
        }
    }

    /// Convert one guest frame and blit it.
    ///
    /// `src` must be exactly `96*64*2` bytes, straight out of guest memory.
    /// The guest's format packs luma in the top 5 bits of each pixel's low
    /// byte; the low bits are masked off and the value bit-replicated so it
    /// spans the full 0..=255 range. The game is grayscale, so the one
    /// channel feeds R, G and B alike (no RGB565 channel decode) with alpha
    /// forced opaque. The entire buffer is overwritten every call.
    pub fn render(&mut self, src: &[u8]) -> Result<(), VideoError> {
        if src.len() != FB_LEN {
            return Err(VideoError::BadLength(src.len()));
        }

        for (px, out) in src.chunks_exact(2).zip(self.pixels.chunks_exact_mut(4)) {
            let mut luma = px[0] & 0xf8;
            luma |= luma >> 5;
            out[0] = luma;
            out[1] = luma;
            out[2] = luma;
            out[3] = 0xff;
        }

        self.surface.present(&self.pixels);
        Ok(())
    }

    /// The current contents of the display buffer.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}
