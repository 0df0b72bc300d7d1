//! Windows backend: `WH_KEYBOARD_LL` with a message loop on its own thread.

use super::{HookError, KeyPressCallback};
use crate::keycodes::windows_key_name;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use windows::Win32::{
    Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM},
    System::Threading::GetCurrentThreadId,
    UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
        TranslateMessage, UnhookWindowsHookEx, HHOOK, KBDLLHOOKSTRUCT, MSG, WH_KEYBOARD_LL,
        WM_KEYDOWN, WM_QUIT, WM_SYSKEYDOWN,
    },
};

/// Wrapper for HHOOK to make it Send + Sync
#[derive(Debug, Clone, Copy)]
struct HhookWrapper(isize);

// SAFETY: HHOOK is just a handle, thread-safe when properly synchronized
unsafe impl Send for HhookWrapper {}
unsafe impl Sync for HhookWrapper {}

impl HhookWrapper {
    fn new(hook: HHOOK) -> Self {
        Self(hook.0 as isize)
    }

    fn as_hhook(&self) -> HHOOK {
        HHOOK(self.0 as *mut std::ffi::c_void)
    }
}

/// Global state for the hook callback.
struct HookState {
    callback: KeyPressCallback,
    keyboard_hook: Option<HhookWrapper>,
}

static HOOK_STATE: Mutex<Option<HookState>> = Mutex::new(None);
static RUNNING: AtomicBool = AtomicBool::new(false);
static HOOK_THREAD_ID: AtomicU32 = AtomicU32::new(0);

/// Low-level keyboard hook callback.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    let is_press = w_param.0 == WM_KEYDOWN as usize || w_param.0 == WM_SYSKEYDOWN as usize;
    if n_code >= 0 && is_press {
        let kb = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
        let key_name = windows_key_name(kb.vkCode);

        // Call callback outside of lock
        let callback = HOOK_STATE.lock().as_ref().map(|s| s.callback.clone());
        if let Some(cb) = callback {
            cb(&key_name);
        }
    }

    let hook = HOOK_STATE
        .lock()
        .as_ref()
        .and_then(|s| s.keyboard_hook)
        .map(|h| h.as_hhook())
        .unwrap_or_default();
    CallNextHookEx(hook, n_code, w_param, l_param)
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
    if RUNNING.swap(true, Ordering::SeqCst) {
        return Err(HookError::AlreadyRunning);
    }

    *HOOK_STATE.lock() = Some(HookState {
        callback,
        keyboard_hook: None,
    });

    let (ready_tx, ready_rx) = mpsc::channel();
    let thread = thread::spawn(move || message_loop(ready_tx));

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(HookHandle { thread }),
        Ok(Err(e)) => {
            let _ = thread.join();
            *HOOK_STATE.lock() = None;
            Err(e)
        }
        Err(_) => {
            *HOOK_STATE.lock() = None;
            RUNNING.store(false, Ordering::SeqCst);
            Err(HookError::InstallFailed("hook thread exited".to_string()))
        }
    }
}

fn request_stop() {
    if !RUNNING.swap(false, Ordering::SeqCst) {
        return;
    }

    // Post WM_QUIT to exit the message loop
    let thread_id = HOOK_THREAD_ID.load(Ordering::SeqCst);
    if thread_id != 0 {
        unsafe {
            let _ = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
    }
}

/// Message loop for the hook thread.
fn message_loop(ready: mpsc::Sender<Result<(), HookError>>) {
    unsafe {
        HOOK_THREAD_ID.store(GetCurrentThreadId(), Ordering::SeqCst);

        match SetWindowsHookExW(
            WH_KEYBOARD_LL,
            Some(keyboard_hook_proc),
            HINSTANCE::default(),
            0,
        ) {
            Ok(hook) => {
                if let Some(ref mut s) = *HOOK_STATE.lock() {
                    s.keyboard_hook = Some(HhookWrapper::new(hook));
                }
                let _ = ready.send(Ok(()));
            }
            Err(e) => {
                RUNNING.store(false, Ordering::SeqCst);
                let _ = ready.send(Err(HookError::InstallFailed(e.to_string())));
                return;
            }
        }

        // Message pump required for low-level hooks to receive callbacks
        let mut msg = MSG::default();
        while RUNNING.load(Ordering::SeqCst) {
            let result = GetMessageW(&mut msg, HWND::default(), 0, 0);
            if result.0 == 0 || result.0 == -1 {
                break;
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        // Cleanup hook
        let mut state = HOOK_STATE.lock();
        if let Some(hook) = state.as_mut().and_then(|s| s.keyboard_hook.take()) {
            let _ = UnhookWindowsHookEx(hook.as_hhook());
        }
        *state = None;
        HOOK_THREAD_ID.store(0, Ordering::SeqCst);
        RUNNING.store(false, Ordering::SeqCst);
    }
}
