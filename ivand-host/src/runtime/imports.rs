//! Host import definitions for the module bridge.
//!
//! This module defines all the host functions imported by the guest under the
//! `"env"` module. Every guest pointer is checked against the current memory
//! length before use; the memory handle is re-resolved from the caller on
//! every call because memory growth may relocate the base.
//!
//! Bounds violations never trap: the framebuffer path ignores the submission
//! and the storage path returns 0 transferred bytes. The one deliberate
//! exception is `abort`, which unwinds the in-flight `loop` call.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::bail;
use rand::Rng;
use tracing::debug;
use wasmtime::{Caller, Extern, Linker, Memory};

use crate::abi::{self, FB_LEN, IMPORT_MODULE, SAVE_LEN, host_imports};

use super::state::HostState;

/// Define all host imports expected by the guest under module `"env"`.
///
/// Must be called before instantiating the module.
pub fn define_imports(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    // --- Clock / randomness ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::MILLIS,
        |_caller: Caller<'_, HostState>| -> u32 { wall_clock_millis() },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::MICROS,
        |_caller: Caller<'_, HostState>| -> u32 { wall_clock_micros() },
    )?;

    // The host rng is seeded from entropy at construction; the guest's seed
    // is accepted and ignored.
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::SRAND,
        |_caller: Caller<'_, HostState>, _seed: u32| {},
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::RAND,
        |mut caller: Caller<'_, HostState>| -> i32 {
            caller.data_mut().rng.gen_range(0..=i32::MAX)
        },
    )?;

    // --- Platform ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::PLATFORM_INIT,
        |_caller: Caller<'_, HostState>| -> u32 { 1 },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::PLATFORM_UPDATE,
        |caller: Caller<'_, HostState>| -> u32 { caller.data().input as u32 },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::PLATFORM_SEND_FRAMEBUFFER,
        |mut caller: Caller<'_, HostState>, ptr: u32| {
            let Some(memory) = guest_memory(&mut caller) else {
                return;
            };
            let offset = ptr as usize;
            let mem_len = memory.data_size(&caller);
            if offset.checked_add(FB_LEN).is_some_and(|end| end <= mem_len) {
                caller.data_mut().frame.submit(offset);
            } else {
                // Silently ignored: the previous descriptor and dirty flag
                // stay untouched.
                debug!(ptr, mem_len, "rejected out-of-bounds framebuffer");
            }
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::ABORT,
        |_caller: Caller<'_, HostState>| -> Result<(), anyhow::Error> {
            bail!("guest called abort")
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::USB_SEND,
        |mut caller: Caller<'_, HostState>, ptr: u32, len: u32| {
            log_usb_payload(&mut caller, ptr, len);
        },
    )?;

    // --- Storage ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::TINYSD_READ,
        |mut caller: Caller<'_, HostState>, dst: u32, size: u32, _path: u32| -> u32 {
            if size as usize != SAVE_LEN {
                debug!(size, "storage read with unsupported size");
                return 0;
            }
            let Some(memory) = guest_memory(&mut caller) else {
                return 0;
            };
            let bytes = caller.data().save.bytes();
            match memory.write(&mut caller, dst as usize, &bytes) {
                Ok(()) => SAVE_LEN as u32,
                Err(_) => {
                    debug!(dst, "rejected out-of-bounds storage read destination");
                    0
                }
            }
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::TINYSD_WRITE,
        |mut caller: Caller<'_, HostState>, _path: u32, src: u32, size: u32| -> u32 {
            if size as usize != SAVE_LEN {
                debug!(size, "storage write with unsupported size");
                return 0;
            }
            let Some(memory) = guest_memory(&mut caller) else {
                return 0;
            };
            let mut bytes = [0u8; SAVE_LEN];
            if memory.read(&caller, src as usize, &mut bytes).is_err() {
                debug!(src, "rejected out-of-bounds storage write source");
                return 0;
            }
            caller.data_mut().save.set_bytes(bytes);
            SAVE_LEN as u32
        },
    )?;

    Ok(())
}

/// Resolve the guest's exported memory from the calling instance.
fn guest_memory(caller: &mut Caller<'_, HostState>) -> Option<Memory> {
    caller
        .get_export(abi::guest_exports::MEMORY)
        .and_then(Extern::into_memory)
}

fn wall_clock_millis() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u32
}

fn wall_clock_micros() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u32
}

/// Longest `usb_send` payload worth copying out of guest memory. Anything
/// larger cannot be a score-report line and is dropped unread; the length is
/// guest-controlled, so it must be checked before it sizes an allocation.
const USB_PAYLOAD_MAX: u32 = 64;

/// The USB capability is unimplemented. The guest only ever sends short
/// score-report lines, so echo printable payloads to the log and drop
/// everything else.
fn log_usb_payload(caller: &mut Caller<'_, HostState>, ptr: u32, len: u32) {
    if len > USB_PAYLOAD_MAX {
        debug!(ptr, len, "dropped oversized usb_send payload");
        return;
    }
    let Some(memory) = guest_memory(caller) else {
        return;
    };

    let mut buf = vec![0u8; len as usize];
    if memory.read(&*caller, ptr as usize, &mut buf).is_err() {
        return;
    }

    let Ok(text) = core::str::from_utf8(&buf) else {
        return;
    };
    let text = text.trim();
    if !text.is_empty() && text.len() <= 50 && text.bytes().all(|b| (0x20..0x7f).contains(&b)) {
        debug!(payload = text, "guest usb_send");
    }
}
