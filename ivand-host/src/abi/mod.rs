//! ivand-host ABI module
//!
//! This module defines the ABI contract between:
//! - **Host**: `ivand-host` (this crate)
//! - **Guest**: the loaded WASM module (the game)
//!
//! ## High-level model
//! The guest is a sandboxed program with no direct access to devices, clock,
//! storage or display. It exports two entry points and its linear memory; the
//! host supplies everything else through imports under module `"env"`.
//!
//! ## Exports (host -> guest) required
//! - `setup()`: called exactly once, before the first `loop`.
//! - `loop()`: called once per logic tick.
//! - `memory`: the guest's growable linear memory. The host re-resolves the
//!   base on every access, since growth may relocate it.
//!
//! ## Imports (guest -> host)
//! Imported from module `"env"`.
//!
//! ### Clock / randomness
//! - `millis() -> i32`: wall-clock time in whole milliseconds (wrapping).
//! - `micros() -> i32`: wall-clock time in microseconds, coarse precision.
//! - `srand(seed: i32)`: no-op; the host rng is seeded at construction.
//! - `rand() -> i32`: uniform integer in `[0, 2^31 - 1]`.
//!
//! ### Platform
//! - `platform_init() -> i32`: fixed success code 1.
//! - `platform_update() -> i32`: the input mask recorded by the current
//!   `ModuleBridge::update` call (see [`buttons`]).
//! - `platform_send_framebuffer(ptr: i32)`: submit a `96*64*2`-byte window of
//!   guest memory as the next frame. Out-of-bounds pointers are ignored.
//! - `abort()`: fatal; traps the in-flight `loop` call.
//! - `usb_send(ptr: i32, len: i32)`: capability unimplemented; payload is
//!   logged when printable, otherwise dropped.
//!
//! ### Storage
//! One persisted 4-byte little-endian value. Path arguments are accepted and
//! ignored; the return value is the byte count actually transferred.
//! - `tinysd_read(dst: i32, size: i32, path: i32) -> i32`: only `size == 4`
//!   is honored; returns 4 on success, 0 otherwise.
//! - `tinysd_write(path: i32, src: i32, size: i32) -> i32`: symmetric.
//!
//! ## Sandboxing
//! Every guest pointer is validated against the current memory length before
//! use. Violations are handled locally (ignore / return 0) and never surface
//! as host-visible errors; a malfunctioning guest cannot corrupt the host.

use wasmtime::{AsContextMut, Instance, TypedFunc};

/// Import module name used by the guest.
pub const IMPORT_MODULE: &str = "env";

/// Framebuffer geometry. Fixed by the guest; not negotiable.
pub const FB_WIDTH: usize = 96;
pub const FB_HEIGHT: usize = 64;
/// Bytes per pixel in the guest framebuffer (packed 2-byte format, low
/// byte's top 5 bits carry luma).
pub const FB_BYTES_PER_PIXEL: usize = 2;
/// Total guest framebuffer length in bytes.
pub const FB_LEN: usize = FB_WIDTH * FB_HEIGHT * FB_BYTES_PER_PIXEL;

/// Size of the persisted storage slot in bytes.
pub const SAVE_LEN: usize = 4;

/// Canonical 6-bit input state.
pub type ButtonMask = u8;

/// Input bit layout. Must match the guest's expectation bit-for-bit.
pub mod buttons {
    use super::ButtonMask;

    pub const LEFT: ButtonMask = 1 << 0;
    pub const RIGHT: ButtonMask = 1 << 1;
    pub const UP: ButtonMask = 1 << 2;
    pub const DOWN: ButtonMask = 1 << 3;
    pub const ACTION_A: ButtonMask = 1 << 4;
    pub const ACTION_B: ButtonMask = 1 << 5;

    pub const ALL: ButtonMask = 0x3f;
}

/// Guest export names (entrypoints + memory).
pub mod guest_exports {
    /// Called once after load, before the first tick.
    pub const SETUP: &str = "setup";
    /// Called once per logic tick.
    pub const LOOP: &str = "loop";
    /// The guest's linear memory.
    pub const MEMORY: &str = "memory";
}

/// Host import names provided to the guest.
///
/// These are the string names under module [`IMPORT_MODULE`].
pub mod host_imports {
    pub const MILLIS: &str = "millis";
    pub const MICROS: &str = "micros";
    pub const SRAND: &str = "srand";
    pub const RAND: &str = "rand";
    pub const PLATFORM_INIT: &str = "platform_init";
    pub const PLATFORM_UPDATE: &str = "platform_update";
    pub const PLATFORM_SEND_FRAMEBUFFER: &str = "platform_send_framebuffer";
    pub const ABORT: &str = "abort";
    pub const USB_SEND: &str = "usb_send";
    pub const TINYSD_READ: &str = "tinysd_read";
    pub const TINYSD_WRITE: &str = "tinysd_write";
}

/// A required guest export that failed to resolve.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MissingExport {
    Setup,
    Loop,
    Memory,
}

impl MissingExport {
    pub fn name(self) -> &'static str {
        match self {
            MissingExport::Setup => guest_exports::SETUP,
            MissingExport::Loop => guest_exports::LOOP,
            MissingExport::Memory => guest_exports::MEMORY,
        }
    }
}

/// The guest's entrypoints as typed wasmtime functions.
///
/// Resolved once after instantiation and called each tick.
pub struct GuestEntrypoints {
    pub setup: TypedFunc<(), ()>,
    pub loop_: TypedFunc<(), ()>,
}

impl GuestEntrypoints {
    /// Resolve entrypoint exports from an instance.
    ///
    /// Fails if an export is missing or has the wrong signature; both exports
    /// take no arguments and return nothing.
    pub fn resolve(
        instance: &Instance,
        mut store: impl AsContextMut,
    ) -> Result<Self, MissingExport> {
        let setup = instance
            .get_typed_func::<(), ()>(&mut store, guest_exports::SETUP)
            .map_err(|_| MissingExport::Setup)?;
        let loop_ = instance
            .get_typed_func::<(), ()>(&mut store, guest_exports::LOOP)
            .map_err(|_| MissingExport::Loop)?;
        Ok(Self { setup, loop_ })
    }
}
