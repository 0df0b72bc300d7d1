//! macOS backend: a listen-only CoreGraphics event tap on its own run loop.

use super::{HookError, KeyPressCallback};
use crate::keycodes::{mac_key_name, mac_modifier_mask};
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

// CGEvent constants
const K_CG_EVENT_KEY_DOWN: u32 = 10;
const K_CG_EVENT_FLAGS_CHANGED: u32 = 12;
const K_CG_EVENT_TAP_DISABLED_BY_TIMEOUT: u32 = 0xFFFF_FFFE;
const K_CG_KEYBOARD_EVENT_KEYCODE: u32 = 9;
const K_CG_HID_EVENT_TAP: u32 = 0;
const K_CG_HEAD_INSERT_EVENT_TAP: u32 = 0;
const K_CG_EVENT_TAP_OPTION_LISTEN_ONLY: u32 = 1;

// FFI types
type CGEventRef = *mut c_void;
type CGEventTapProxy = *mut c_void;
type CFMachPortRef = *mut c_void;
type CFRunLoopSourceRef = *mut c_void;
type CFRunLoopRef = *mut c_void;
type CFStringRef = *const c_void;
type CFAllocatorRef = *const c_void;

type CGEventTapCallBack = unsafe extern "C" fn(
    proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn CGEventTapCreate(
        tap: u32,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: CGEventTapCallBack,
        user_info: *mut c_void,
    ) -> CFMachPortRef;
    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
    fn CGEventGetFlags(event: CGEventRef) -> u64;
    fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortCreateRunLoopSource(
        allocator: CFAllocatorRef,
        port: CFMachPortRef,
        order: i64,
    ) -> CFRunLoopSourceRef;
    fn CFRunLoopGetCurrent() -> CFRunLoopRef;
    fn CFRunLoopAddSource(rl: CFRunLoopRef, source: CFRunLoopSourceRef, mode: CFStringRef);
    fn CFRunLoopRun();
    fn CFRunLoopStop(rl: CFRunLoopRef);
    fn CFRelease(cf: *const c_void);

    static kCFRunLoopDefaultMode: CFStringRef;
}

static TAP: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());
static RUN_LOOP: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());

unsafe extern "C" fn event_tap_callback(
    _proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef {
    if event_type == K_CG_EVENT_TAP_DISABLED_BY_TIMEOUT {
        let tap = TAP.load(Ordering::SeqCst);
        if !tap.is_null() {
            CGEventTapEnable(tap, true);
        }
        return event;
    }

    let keycode = CGEventGetIntegerValueField(event, K_CG_KEYBOARD_EVENT_KEYCODE) as u32;
    let pressed = match event_type {
        K_CG_EVENT_KEY_DOWN => true,
        // Modifier keys only raise flag changes; a set bit means pressed
        K_CG_EVENT_FLAGS_CHANGED => {
            mac_modifier_mask(keycode).is_some_and(|mask| CGEventGetFlags(event) & mask != 0)
        }
        _ => false,
    };

    if pressed {
        let callback = &*(user_info as *const KeyPressCallback);
        callback(&mac_key_name(keycode));
    }
    event
}

/// Running hook; stopping it joins the hook thread.
pub struct HookHandle {
    thread: JoinHandle<()>,
}

impl HookHandle {
    pub fn is_running(&self) -> bool {
        !self.thread.is_finished()
    }

    pub fn stop(self) {
        request_stop();
        let _ = self.thread.join();
    }
}

pub fn start(callback: KeyPressCallback) -> Result<HookHandle, HookError> {
    if !RUN_LOOP.load(Ordering::SeqCst).is_null() {
        return Err(HookError::AlreadyRunning);
    }

    let (ready_tx, ready_rx) = mpsc::channel();
    let thread = thread::spawn(move || unsafe { run_tap(callback, ready_tx) });

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(HookHandle { thread }),
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        Err(_) => Err(HookError::InstallFailed("hook thread exited".to_string())),
    }
}

fn request_stop() {
    let run_loop = RUN_LOOP.load(Ordering::SeqCst);
    if !run_loop.is_null() {
        unsafe { CFRunLoopStop(run_loop) };
    }
}

unsafe fn run_tap(callback: KeyPressCallback, ready: mpsc::Sender<Result<(), HookError>>) {
    let event_mask: u64 = (1 << K_CG_EVENT_KEY_DOWN) | (1 << K_CG_EVENT_FLAGS_CHANGED);
    let callback_ptr = Box::into_raw(Box::new(callback)) as *mut c_void;

    let tap = CGEventTapCreate(
        K_CG_HID_EVENT_TAP,
        K_CG_HEAD_INSERT_EVENT_TAP,
        K_CG_EVENT_TAP_OPTION_LISTEN_ONLY,
        event_mask,
        event_tap_callback,
        callback_ptr,
    );

    if tap.is_null() {
        drop(Box::from_raw(callback_ptr as *mut KeyPressCallback));
        let _ = ready.send(Err(HookError::InstallFailed(
            "grant Accessibility permission in System Settings > Privacy & Security > Accessibility"
                .to_string(),
        )));
        return;
    }

    let source = CFMachPortCreateRunLoopSource(ptr::null(), tap, 0);
    let run_loop = CFRunLoopGetCurrent();
    CFRunLoopAddSource(run_loop, source, kCFRunLoopDefaultMode);
    TAP.store(tap, Ordering::SeqCst);
    RUN_LOOP.store(run_loop, Ordering::SeqCst);
    let _ = ready.send(Ok(()));

    CFRunLoopRun();

    RUN_LOOP.store(ptr::null_mut(), Ordering::SeqCst);
    TAP.store(ptr::null_mut(), Ordering::SeqCst);
    CGEventTapEnable(tap, false);
    CFRelease(source);
    CFRelease(tap);
    drop(Box::from_raw(callback_ptr as *mut KeyPressCallback));
}
