//! Headless orchestrator for ivand-host.
//!
//! Drives the module bridge, input aggregator and presentation pipeline the
//! same way a windowed platform layer would, minus the window: a fixed
//! number of logic ticks with an optional constant input mask, draining the
//! frame mailbox after each tick. Useful for boot/integration debugging and
//! for smoke-testing a module outside a browser.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ivand_host::abi::{FB_HEIGHT, FB_WIDTH};
use ivand_host::input::{GamepadSource, PadId, Rect};
use ivand_host::video::DisplaySurface;
use ivand_host::{InputAggregator, ModuleBridge, SaveSlot, TouchLayout, VideoOut};

#[derive(Debug, Parser)]
#[command(about = "Run an ivand module for N ticks without a display")]
struct Args {
    /// Path to the module (.wasm binary or .wat text).
    module: PathBuf,

    /// Number of logic ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u32,

    /// Constant input mask to feed every tick (6-bit).
    #[arg(long, default_value_t = 0)]
    mask: u8,

    /// Back the persisted value with this file.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Write the final frame as a binary PGM image.
    #[arg(long)]
    dump_frame: Option<PathBuf>,
}

/// No gamepads in a headless run.
struct NoPads;

impl GamepadSource for NoPads {
    fn axis(&self, _pad: PadId, _axis: usize) -> f32 {
        0.0
    }
    fn button(&self, _pad: PadId, _button: usize) -> f32 {
        0.0
    }
}

/// Swallows blits; the converted frame is read back via `VideoOut::pixels`.
struct NullSurface;

impl DisplaySurface for NullSurface {
    fn present(&mut self, _rgba: &[u8]) {}
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let save = match &args.save {
        Some(path) => SaveSlot::with_path(path),
        None => SaveSlot::in_memory(),
    };

    // Touch zones never fire headlessly; any layout will do.
    let zero = Rect {
        x: 0,
        y: 0,
        w: 0,
        h: 0,
    };
    let mut aggregator = InputAggregator::new(TouchLayout {
        dpad: zero,
        action_a: zero,
        action_b: zero,
    });
    let mut video = VideoOut::setup(NullSurface);

    let mut bridge = ModuleBridge::new(save)?;
    bridge
        .load(&args.module)
        .with_context(|| format!("loading {}", args.module.display()))?;
    bridge.init()?;

    let mut presented = 0u64;
    for _ in 0..args.ticks {
        let mask = aggregator.update(&NoPads) | args.mask;
        bridge.update(mask)?;
        if let Some(frame) = bridge.framebuffer_if_dirty() {
            video.render(frame)?;
            presented += 1;
        }
    }

    println!(
        "ran {} ticks, presented {presented} frames, persisted value {}",
        args.ticks,
        bridge.persisted_value()
    );

    if let Some(path) = &args.dump_frame {
        write_pgm(path, video.pixels())?;
        println!("wrote {}", path.display());
    }

    Ok(())
}

/// Binary PGM (P5) of the luma channel; the frame is grayscale so one RGBA
/// channel carries everything.
fn write_pgm(path: &std::path::Path, rgba: &[u8]) -> Result<()> {
    let mut out = format!("P5\n{FB_WIDTH} {FB_HEIGHT}\n255\n").into_bytes();
    out.extend(rgba.iter().step_by(4));
    std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}
