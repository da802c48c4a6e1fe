//! ivand-host: the host runtime for the ivand WASM game.
//!
//! The guest is a sandboxed compute module with no access to devices, clock,
//! storage or display. This crate bridges it to the environment:
//!
//! - [`ModuleBridge`] owns the module's lifecycle, validates every guest
//!   memory access against the module's own growable memory bounds, and
//!   holds the single-slot framebuffer mailbox plus the one persisted value.
//! - [`InputAggregator`] merges keyboard events, polled gamepad state and
//!   touch gestures into the canonical 6-bit mask the guest polls.
//! - [`VideoOut`] converts the packed 2-byte/pixel guest framebuffer into a
//!   reusable RGBA buffer and blits it to a [`DisplaySurface`].
//!
//! The orchestrator (platform layer) ties these together: on a fixed tick it
//! calls `aggregator.update()` and feeds the mask to `bridge.update()`; on
//! every display refresh it drains `bridge.framebuffer_if_dirty()` into
//! `video.render()`. All three values are constructed explicitly by the
//! orchestrator and passed where needed; the crate keeps no global state.
//!
//! Execution is single-threaded and cooperative: each `update` runs the
//! guest's `loop` to completion, host-import calls inline. An embedding with
//! preemptive event callbacks must serialize access to the aggregator
//! itself.

pub mod abi;
pub mod input;
pub mod loader;
pub mod runtime;
pub mod save;
pub mod video;

pub use abi::{ButtonMask, buttons};
pub use input::{GamepadSource, InputAggregator, Key, PadId, TouchLayout};
pub use loader::LoadError;
pub use runtime::{ModuleBridge, Phase};
pub use save::SaveSlot;
pub use video::{DisplaySurface, VideoOut};
