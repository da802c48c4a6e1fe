//! Wasmtime-backed module bridge.
//!
//! Responsibilities:
//! - Create a wasmtime `Engine`/`Store`/`Linker` and define the host imports.
//! - Load, compile and instantiate the guest module (exactly once).
//! - Drive the guest's `setup`/`loop` entrypoints.
//! - Own the framebuffer mailbox and the persisted save slot (via
//!   [`HostState`] in the store).
//!
//! Lifecycle: `Unloaded -> Ready -> Initialized -> Running`, with each
//! `update` keeping the instance in `Running`. No transition returns to an
//! earlier state; re-loading over a live instance fails loudly.

use std::path::Path;

use anyhow::{Context, bail};
use tracing::debug;
use wasmtime::{Engine, Linker, Memory, Store};

use crate::abi::{ButtonMask, FB_LEN, GuestEntrypoints, guest_exports};
use crate::loader::{self, LoadError};
use crate::save::SaveSlot;

use super::imports;
use super::state::HostState;

/// Bridge lifecycle phase.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    Unloaded,
    Ready,
    Initialized,
    Running,
}

/// Owns the guest instance and everything the guest is allowed to touch.
pub struct ModuleBridge {
    engine: Engine,
    store: Store<HostState>,
    linker: Linker<HostState>,
    entrypoints: Option<GuestEntrypoints>,
    memory: Option<Memory>,
    phase: Phase,
}

impl ModuleBridge {
    /// Create a bridge with its imports defined but no module loaded.
    pub fn new(save: SaveSlot) -> Result<Self, anyhow::Error> {
        let mut cfg = wasmtime::Config::new();

        // Broadly supported features so modules from modern toolchains load;
        // the guest itself is plain C compiled for wasm32.
        cfg.wasm_multi_value(true);
        cfg.wasm_bulk_memory(true);
        cfg.wasm_reference_types(true);
        cfg.wasm_simd(true);

        let engine = Engine::new(&cfg)?;
        let store = Store::new(&engine, HostState::new(save));
        let mut linker = Linker::new(&engine);
        imports::define_imports(&mut linker)?;

        Ok(Self {
            engine,
            store,
            linker,
            entrypoints: None,
            memory: None,
            phase: Phase::Unloaded,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Read, compile and instantiate the module at `path`.
    ///
    /// Does not run any guest code; call [`ModuleBridge::init`] next.
    pub fn load(&mut self, path: &Path) -> Result<(), LoadError> {
        let bytes = std::fs::read(path)?;
        self.load_bytes(&bytes)
    }

    /// Compile and instantiate a module from bytes (wasm binary or wat text).
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        // Single-assignment: silently replacing a live instance would leak
        // the old one and re-run nothing.
        if self.phase != Phase::Unloaded {
            return Err(LoadError::AlreadyLoaded);
        }

        let module = loader::compile_module(&self.engine, bytes)?;
        let instance = self
            .linker
            .instantiate(&mut self.store, &module)
            .map_err(LoadError::Link)?;

        let memory = instance
            .get_memory(&mut self.store, guest_exports::MEMORY)
            .ok_or(LoadError::MissingExport(guest_exports::MEMORY))?;
        let entrypoints = GuestEntrypoints::resolve(&instance, &mut self.store)
            .map_err(|e| LoadError::MissingExport(e.name()))?;

        self.entrypoints = Some(entrypoints);
        self.memory = Some(memory);
        self.phase = Phase::Ready;

        debug!(len = bytes.len(), "guest module instantiated");
        Ok(())
    }

    /// Invoke guest `setup` exactly once.
    pub fn init(&mut self) -> Result<(), anyhow::Error> {
        if self.phase != Phase::Ready {
            bail!("init in phase {:?} (want Ready)", self.phase);
        }
        let Some(entry) = &self.entrypoints else {
            bail!("no entrypoints resolved");
        };
        entry
            .setup
            .call(&mut self.store, ())
            .context("guest setup trapped")?;
        self.phase = Phase::Initialized;
        Ok(())
    }

    /// Run one guest tick.
    ///
    /// Records `input` as the value `platform_update` returns for the
    /// duration of this call, then invokes guest `loop` once, synchronously.
    /// The guest may call any host import any number of times before this
    /// returns. A guest trap (including `abort`) surfaces as the error.
    pub fn update(&mut self, input: ButtonMask) -> Result<(), anyhow::Error> {
        if !matches!(self.phase, Phase::Initialized | Phase::Running) {
            bail!("update in phase {:?} (want Initialized or Running)", self.phase);
        }
        self.store.data_mut().input = input;
        let Some(entry) = &self.entrypoints else {
            bail!("no entrypoints resolved");
        };
        entry
            .loop_
            .call(&mut self.store, ())
            .context("guest loop trapped")?;
        self.phase = Phase::Running;
        Ok(())
    }

    /// Drain the frame mailbox.
    ///
    /// Returns the last-submitted `96*64*2`-byte framebuffer view and clears
    /// the dirty flag, or `None` if no new frame arrived since the last
    /// drain. The view borrows guest memory and is valid only until the next
    /// [`ModuleBridge::update`].
    pub fn framebuffer_if_dirty(&mut self) -> Option<&[u8]> {
        let offset = self.store.data_mut().frame.take_if_dirty()?;
        let memory = self.memory.as_ref()?;
        // Offsets were validated at submit time and memory only grows, so
        // the range is still in bounds.
        memory.data(&self.store).get(offset..offset + FB_LEN)
    }

    /// Current contents of the persisted save slot.
    pub fn persisted_value(&self) -> u32 {
        self.store.data().save.get()
    }
}
