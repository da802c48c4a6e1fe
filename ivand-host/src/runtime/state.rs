//! Host-side state carried by the wasmtime `Store`.
//!
//! Everything a host import can touch lives here: the input mask recorded for
//! the current tick, the framebuffer mailbox, the persisted save slot and the
//! rng. The bridge owns the store and hands this state to import closures via
//! `Caller::data_mut`; there are no process-wide statics.

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::abi::ButtonMask;
use crate::save::SaveSlot;

/// Single-slot framebuffer hand-off.
///
/// Depth-1 mailbox, not a queue: a new submission overwrites the previous
/// descriptor whether or not it was consumed. If the guest produces two
/// frames before one is drained, the earlier frame is dropped. Keep it that
/// way; turning this into a queue changes latency/drop semantics.
#[derive(Debug, Default)]
pub struct FrameMailbox {
    /// Byte offset of the last-submitted frame in guest memory.
    offset: Option<usize>,
    /// True when a frame has been produced but not yet consumed.
    dirty: bool,
}

impl FrameMailbox {
    /// Record a validated frame offset and mark the mailbox dirty.
    pub fn submit(&mut self, offset: usize) {
        self.offset = Some(offset);
        self.dirty = true;
    }

    /// Drain: return the recorded offset and mark clean, or `None` if no new
    /// frame arrived since the last drain.
    pub fn take_if_dirty(&mut self) -> Option<usize> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        self.offset
    }
}

/// Store data for the module bridge.
pub struct HostState {
    /// Mask returned by `platform_update` for the duration of the current
    /// `loop` call.
    pub input: ButtonMask,
    pub frame: FrameMailbox,
    pub save: SaveSlot,
    pub rng: SmallRng,
}

impl HostState {
    pub fn new(save: SaveSlot) -> Self {
        Self {
            input: 0,
            frame: FrameMailbox::default(),
            save,
            rng: SmallRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailbox_drains_once() {
        let mut mb = FrameMailbox::default();
        assert_eq!(mb.take_if_dirty(), None);

        mb.submit(64);
        assert_eq!(mb.take_if_dirty(), Some(64));
        assert_eq!(mb.take_if_dirty(), None);
    }

    #[test]
    fn mailbox_overwrites_unread_frame() {
        let mut mb = FrameMailbox::default();
        mb.submit(0);
        mb.submit(4096);
        assert_eq!(mb.take_if_dirty(), Some(4096));
        assert_eq!(mb.take_if_dirty(), None);
    }
}
