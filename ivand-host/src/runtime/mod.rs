//! Module bridge: lifecycle, host imports matching the guest ABI, and the
//! store-held host state.
//!
//! The guest ABI itself (names, geometry, bit layout) lives in `crate::abi`.

pub mod bridge;
pub mod imports;
pub mod state;

pub use bridge::{ModuleBridge, Phase};
pub use state::{FrameMailbox, HostState};
