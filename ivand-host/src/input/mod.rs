//! Input aggregation for ivand-host.
//!
//! Responsibilities:
//! - Merge three independently-clocked input sources into one canonical
//!   6-bit mask (see `crate::abi::buttons`):
//!   keyboard events (held until release), polled gamepad state (held until
//!   the sampled value changes or the device disconnects), and touch
//!   gestures (recomputed fully every poll).
//! - Own all input-source state. Device bindings live in an
//!   aggregator-owned table keyed by a stable device id, never stashed on
//!   platform objects.
//!
//! Keyboard and gamepad bits accumulate into one shared mask; touch bits
//! are OR'd in at read time. That shared mask is why a gamepad disconnect
//! resets *everything*: the reset is a whole-mask policy, not a per-source
//! clear.

pub mod touch;

use tracing::debug;

use crate::abi::{ButtonMask, buttons};

pub use touch::{DRAG_THRESHOLD, Rect, TouchId, TouchLayout, TouchState};

/// Stable platform-assigned gamepad identifier.
pub type PadId = u32;

/// Sampling seam for live gamepad state.
///
/// Gamepad state is not event-driven and must be polled; the orchestrator
/// passes the platform's current view into [`InputAggregator::update`].
/// Out-of-range or disconnected queries should return `0.0`.
pub trait GamepadSource {
    /// Current position of one axis, nominally in `[-1.0, 1.0]`.
    fn axis(&self, pad: PadId, axis: usize) -> f32;
    /// Current value of one digital button, `0.0` or `1.0`.
    fn button(&self, pad: PadId, button: usize) -> f32;
}

/// Physical keys the host listens for. The key->bit table is fixed; this is
/// not a remapping system.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    A,
    B,
    X,
    Z,
    // Present so the platform layer can forward keys it doesn't classify;
    // unmapped keys produce no effect.
    Enter,
    Space,
    Escape,
}

fn key_bit(key: Key) -> Option<ButtonMask> {
    match key {
        Key::ArrowLeft => Some(buttons::LEFT),
        Key::ArrowRight => Some(buttons::RIGHT),
        Key::ArrowUp => Some(buttons::UP),
        Key::ArrowDown => Some(buttons::DOWN),
        Key::Z | Key::A => Some(buttons::ACTION_A),
        Key::X | Key::B => Some(buttons::ACTION_B),
        Key::Enter | Key::Space | Key::Escape => None,
    }
}

/// One bound axis: symmetric +/-0.5 thresholds with a tri-state last-sign,
/// so bits only change on sign transitions (no mask churn while the stick
/// rests near an extreme or near zero).
#[derive(Debug)]
struct AxisBinding {
    axis: usize,
    negative: ButtonMask,
    positive: ButtonMask,
    last_sign: i8,
}

/// One bound digital button, edge-detected against the last sampled value.
#[derive(Debug)]
struct ButtonBinding {
    button: usize,
    bit: ButtonMask,
    last: f32,
}

/// Fixed per-device mapping, created on connect and discarded on disconnect.
#[derive(Debug)]
struct PadBinding {
    id: PadId,
    axes: [AxisBinding; 2],
    buttons: [ButtonBinding; 2],
}

impl PadBinding {
    /// The one mapping this host ships: d-pad on axes 6/7, actions on
    /// buttons 0/2 (a common Xbox-style layout).
    fn standard(id: PadId) -> Self {
        Self {
            id,
            axes: [
                AxisBinding {
                    axis: 6,
                    negative: buttons::LEFT,
                    positive: buttons::RIGHT,
                    last_sign: 0,
                },
                AxisBinding {
                    axis: 7,
                    negative: buttons::UP,
                    positive: buttons::DOWN,
                    last_sign: 0,
                },
            ],
            buttons: [
                ButtonBinding {
                    button: 0,
                    bit: buttons::ACTION_A,
                    last: 0.0,
                },
                ButtonBinding {
                    button: 2,
                    bit: buttons::ACTION_B,
                    last: 0.0,
                },
            ],
        }
    }
}

/// Stateful merger of keyboard, gamepad and touch input.
pub struct InputAggregator {
    /// Accumulated keyboard + gamepad bits.
    held: ButtonMask,
    pads: Vec<PadBinding>,
    touch: TouchState,
}

impl InputAggregator {
    pub fn new(layout: TouchLayout) -> Self {
        Self {
            held: 0,
            pads: Vec::new(),
            touch: TouchState::new(layout),
        }
    }

    /// Poll all sources and produce the canonical mask.
    ///
    /// Called once per fixed tick by the orchestrator; the result feeds
    /// `ModuleBridge::update`.
    pub fn update(&mut self, pads: &dyn GamepadSource) -> ButtonMask {
        self.poll_pads(pads);
        self.held | self.touch.mask()
    }

    // --- Keyboard ---

    /// Key-down/key-up. Auto-repeated downs re-set an already-set bit, which
    /// is a no-op; unmapped keys are ignored.
    pub fn key_event(&mut self, key: Key, pressed: bool) {
        let Some(bit) = key_bit(key) else {
            return;
        };
        if pressed {
            self.held |= bit;
        } else {
            self.held &= !bit;
        }
    }

    // --- Gamepad ---

    /// Attach the fixed binding table for a newly connected device.
    pub fn pad_connected(&mut self, id: PadId) {
        if self.pads.iter().any(|p| p.id == id) {
            return;
        }
        debug!(id, "gamepad connected");
        self.pads.push(PadBinding::standard(id));
    }

    /// Drop the device's binding and reset the whole accumulated mask.
    ///
    /// The full reset is deliberate: it also releases keyboard-held bits, so
    /// nothing stays stuck if sources disagree mid-session.
    pub fn pad_disconnected(&mut self, id: PadId) {
        let before = self.pads.len();
        self.pads.retain(|p| p.id != id);
        if self.pads.len() != before {
            debug!(id, "gamepad disconnected, resetting mask");
            self.held = 0;
        }
    }

    fn poll_pads(&mut self, pads: &dyn GamepadSource) {
        for pad in &mut self.pads {
            for axis in &mut pad.axes {
                let value = pads.axis(pad.id, axis.axis);
                if value <= -0.5 {
                    if axis.last_sign >= 0 {
                        axis.last_sign = -1;
                        self.held &= !axis.positive;
                        self.held |= axis.negative;
                    }
                } else if value >= 0.5 {
                    if axis.last_sign <= 0 {
                        axis.last_sign = 1;
                        self.held &= !axis.negative;
                        self.held |= axis.positive;
                    }
                } else if axis.last_sign != 0 {
                    axis.last_sign = 0;
                    self.held &= !(axis.negative | axis.positive);
                }
            }
            for button in &mut pad.buttons {
                let value = pads.button(pad.id, button.button);
                if value != button.last {
                    button.last = value;
                    if value != 0.0 {
                        self.held |= button.bit;
                    } else {
                        self.held &= !button.bit;
                    }
                }
            }
        }
    }

    // --- Touch ---

    pub fn touch_start(&mut self, id: TouchId, x: i32, y: i32) {
        self.touch.start(id, x, y);
    }

    pub fn touch_move(&mut self, id: TouchId, x: i32, y: i32) {
        self.touch.moved(id, x, y);
    }

    pub fn touch_end(&mut self, id: TouchId) {
        self.touch.end(id);
    }

    pub fn touch_cancel(&mut self, id: TouchId) {
        self.touch.cancel(id);
    }
}
