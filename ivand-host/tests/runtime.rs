//! Integration tests: drive a real guest module through the bridge.
//!
//! The guest below is a small WAT program that decodes the input mask as a
//! command selector, which lets each test script a guest behavior (submit a
//! frame, submit out of bounds, hit the storage imports, abort) through the
//! public `update` contract alone.

use ivand_host::abi::FB_LEN;
use ivand_host::{LoadError, ModuleBridge, Phase, SaveSlot};

const GUEST: &str = r#"
(module
  (import "env" "millis" (func $millis (result i32)))
  (import "env" "micros" (func $micros (result i32)))
  (import "env" "srand" (func $srand (param i32)))
  (import "env" "rand" (func $rand (result i32)))
  (import "env" "platform_init" (func $platform_init (result i32)))
  (import "env" "platform_update" (func $platform_update (result i32)))
  (import "env" "platform_send_framebuffer" (func $send_fb (param i32)))
  (import "env" "abort" (func $abort))
  (import "env" "usb_send" (func $usb_send (param i32 i32)))
  (import "env" "tinysd_read" (func $sd_read (param i32 i32 i32) (result i32)))
  (import "env" "tinysd_write" (func $sd_write (param i32 i32 i32) (result i32)))
  (memory (export "memory") 1)
  (data (i32.const 4096) "score:99:123:0")
  (func (export "setup")
    (drop (call $platform_init))
    (call $srand (call $millis))
    (drop (call $micros))
    (drop (call $rand))
    (call $usb_send (i32.const 4096) (i32.const 14)))
  (func (export "loop") (local $in i32)
    (local.set $in (call $platform_update))
    ;; 1: stamp a marker and submit the frame at offset 0
    (if (i32.eq (local.get $in) (i32.const 1))
      (then
        (i32.store8 (i32.const 0) (i32.const 0xAA))
        (call $send_fb (i32.const 0))))
    ;; 2: submit a frame that runs past the end of memory
    (if (i32.eq (local.get $in) (i32.const 2))
      (then (call $send_fb (i32.const 65000))))
    ;; 3: stamp a different marker and submit at offset 16
    (if (i32.eq (local.get $in) (i32.const 3))
      (then
        (i32.store8 (i32.const 16) (i32.const 0xBB))
        (call $send_fb (i32.const 16))))
    ;; 4: persist 0x12345678; surface the byte count in the frame
    (if (i32.eq (local.get $in) (i32.const 4))
      (then
        (i32.store (i32.const 1024) (i32.const 0x12345678))
        (i32.store8 (i32.const 0)
          (call $sd_write (i32.const 2048) (i32.const 1024) (i32.const 4)))
        (call $send_fb (i32.const 0))))
    ;; 5: read the persisted value into untouched memory and submit it
    (if (i32.eq (local.get $in) (i32.const 5))
      (then
        (drop (call $sd_read (i32.const 1040) (i32.const 4) (i32.const 2048)))
        (call $send_fb (i32.const 1040))))
    ;; 6: 8-byte storage write must be refused (0 transferred); surface 7+ret
    (if (i32.eq (local.get $in) (i32.const 6))
      (then
        (i32.store8 (i32.const 0)
          (i32.add (i32.const 7)
            (call $sd_write (i32.const 2048) (i32.const 1024) (i32.const 8))))
        (call $send_fb (i32.const 0))))
    ;; 7: abort
    (if (i32.eq (local.get $in) (i32.const 7))
      (then (call $abort)))
    ;; 8: usb_send with a huge length, then prove the tick still finishes
    (if (i32.eq (local.get $in) (i32.const 8))
      (then
        (call $usb_send (i32.const 0) (i32.const 0xFFFFFFFF))
        (i32.store8 (i32.const 0) (i32.const 0xCC))
        (call $send_fb (i32.const 0))))))
"#;

fn running_bridge() -> ModuleBridge {
    let mut bridge = ModuleBridge::new(SaveSlot::in_memory()).unwrap();
    bridge.load_bytes(GUEST.as_bytes()).unwrap();
    bridge.init().unwrap();
    bridge
}

#[test]
fn lifecycle_is_load_then_init_then_update() {
    let mut bridge = ModuleBridge::new(SaveSlot::in_memory()).unwrap();
    assert_eq!(bridge.phase(), Phase::Unloaded);
    assert!(bridge.init().is_err());
    assert!(bridge.update(0).is_err());

    bridge.load_bytes(GUEST.as_bytes()).unwrap();
    assert_eq!(bridge.phase(), Phase::Ready);
    assert!(bridge.update(0).is_err(), "update before init must fail");

    bridge.init().unwrap();
    assert_eq!(bridge.phase(), Phase::Initialized);
    assert!(bridge.init().is_err(), "setup runs exactly once");

    bridge.update(0).unwrap();
    assert_eq!(bridge.phase(), Phase::Running);
}

#[test]
fn second_load_fails_loudly() {
    let mut bridge = running_bridge();
    assert!(matches!(
        bridge.load_bytes(GUEST.as_bytes()),
        Err(LoadError::AlreadyLoaded)
    ));
}

#[test]
fn wasm_binary_input_loads_too() {
    let wasm = wat::parse_str(GUEST).unwrap();
    let mut bridge = ModuleBridge::new(SaveSlot::in_memory()).unwrap();
    bridge.load_bytes(&wasm).unwrap();
    bridge.init().unwrap();
}

#[test]
fn unknown_import_fails_at_link_time() {
    let mut bridge = ModuleBridge::new(SaveSlot::in_memory()).unwrap();
    let module = r#"(module (import "env" "warp_drive" (func)))"#;
    assert!(matches!(
        bridge.load_bytes(module.as_bytes()),
        Err(LoadError::Link(_))
    ));
}

#[test]
fn missing_exports_are_named() {
    let mut bridge = ModuleBridge::new(SaveSlot::in_memory()).unwrap();
    let no_memory = r#"(module (func (export "setup")) (func (export "loop")))"#;
    assert!(matches!(
        bridge.load_bytes(no_memory.as_bytes()),
        Err(LoadError::MissingExport("memory"))
    ));

    let mut bridge = ModuleBridge::new(SaveSlot::in_memory()).unwrap();
    let no_setup = r#"(module (memory (export "memory") 1))"#;
    assert!(matches!(
        bridge.load_bytes(no_setup.as_bytes()),
        Err(LoadError::MissingExport("setup"))
    ));
}

#[test]
fn frame_submission_sets_dirty_once() {
    let mut bridge = running_bridge();
    assert!(bridge.framebuffer_if_dirty().is_none());

    bridge.update(1).unwrap();
    {
        let frame = bridge.framebuffer_if_dirty().expect("frame was submitted");
        assert_eq!(frame.len(), FB_LEN);
        assert_eq!(frame[0], 0xAA);
    }
    assert!(
        bridge.framebuffer_if_dirty().is_none(),
        "drain clears the dirty flag"
    );
}

#[test]
fn out_of_bounds_submission_is_ignored() {
    let mut bridge = running_bridge();
    bridge.update(2).unwrap();
    assert!(bridge.framebuffer_if_dirty().is_none());
}

#[test]
fn out_of_bounds_submission_preserves_previous_frame() {
    let mut bridge = running_bridge();
    bridge.update(1).unwrap();
    bridge.update(2).unwrap();

    let frame = bridge.framebuffer_if_dirty().expect("prior frame survives");
    assert_eq!(frame[0], 0xAA);
}

#[test]
fn newer_frame_overwrites_unread_one() {
    let mut bridge = running_bridge();
    bridge.update(1).unwrap();
    bridge.update(3).unwrap();

    let first = bridge.framebuffer_if_dirty().expect("one frame pending")[0];
    assert_eq!(first, 0xBB, "mailbox keeps only the newest frame");
    assert!(bridge.framebuffer_if_dirty().is_none());
}

#[test]
fn storage_round_trip_preserves_byte_order() {
    let mut bridge = running_bridge();

    bridge.update(4).unwrap();
    let transferred = bridge.framebuffer_if_dirty().unwrap()[0];
    assert_eq!(transferred, 4);
    assert_eq!(bridge.persisted_value(), 0x1234_5678);

    bridge.update(5).unwrap();
    let head = bridge.framebuffer_if_dirty().unwrap()[..4].to_vec();
    assert_eq!(head, [0x78, 0x56, 0x34, 0x12]);
}

#[test]
fn wrong_size_storage_write_transfers_nothing() {
    let mut bridge = running_bridge();
    bridge.update(6).unwrap();
    let marker = bridge.framebuffer_if_dirty().unwrap()[0];
    assert_eq!(marker, 7, "sd_write must have returned 0");
    assert_eq!(bridge.persisted_value(), 0);
}

#[test]
fn oversized_usb_payload_is_dropped_without_harm() {
    let mut bridge = running_bridge();
    bridge.update(8).unwrap();
    let marker = bridge.framebuffer_if_dirty().unwrap()[0];
    assert_eq!(marker, 0xCC, "tick must run to completion after the drop");
}

#[test]
fn abort_unwinds_the_update_call() {
    let mut bridge = running_bridge();
    bridge.update(1).unwrap();
    let err = bridge.update(7).expect_err("abort must trap");
    assert!(format!("{err:#}").contains("abort"));
}
