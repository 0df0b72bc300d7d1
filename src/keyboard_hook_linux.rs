//! Linux backend: a global `rdev` listener on its own thread.
//!
//! `rdev::listen` never returns once it is listening, so the thread lives
//! for the rest of the process. Stopping only detaches the callback, and a
//! later start attaches a new one to the same listener.

use super::{HookError, KeyPressCallback};
use crate::keycodes::linux_key_name;
use parking_lot::Mutex;
use rdev::{listen, Event, EventType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// How long `listen` gets to fail before the listener counts as installed.
const STARTUP_GRACE: Duration = Duration::from_millis(250);

static CALLBACK: Mutex<Option<KeyPressCallback>> = Mutex::new(None);
static LISTENING: AtomicBool = AtomicBool::new(false);

/// Attached callback on the shared listener.
pub struct HookHandle;

impl HookHandle {
    pub fn is_running(&self) -> bool {
        LISTENING.load(Ordering::SeqCst) && CALLBACK.lock().is_some()
    }

    pub fn stop(self) {
        *CALLBACK.lock() = None;
    }
}

fn on_event(event: Event) {
    if let EventType::KeyPress(key) = event.event_type {
        // Call callback outside of lock
        let callback = CALLBACK.lock().clone();
        if let Some(cb) = callback {
            cb(&linux_key_name(key));
        }
    }
}

pub fn start(callback: KeyPressCallback) -> Result<HookHandle, HookError> {
    {
        let mut slot = CALLBACK.lock();
        if slot.is_some() {
            return Err(HookError::AlreadyRunning);
        }
        *slot = Some(callback);
    }

    if LISTENING.swap(true, Ordering::SeqCst) {
        return Ok(HookHandle);
    }

    let (failed_tx, failed_rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("keyboard-listener".to_string())
        .spawn(move || {
            let reason = match listen(on_event) {
                Ok(()) => "listener exited".to_string(),
                Err(e) => format!("{:?}", e),
            };
            LISTENING.store(false, Ordering::SeqCst);
            log::error!("Keyboard listener stopped: {}", reason);
            let _ = failed_tx.send(reason);
        });

    if let Err(e) = spawned {
        LISTENING.store(false, Ordering::SeqCst);
        *CALLBACK.lock() = None;
        return Err(HookError::InstallFailed(e.to_string()));
    }

    match failed_rx.recv_timeout(STARTUP_GRACE) {
        Err(RecvTimeoutError::Timeout) => Ok(HookHandle),
        Ok(reason) => {
            *CALLBACK.lock() = None;
            Err(HookError::InstallFailed(reason))
        }
        Err(RecvTimeoutError::Disconnected) => {
            LISTENING.store(false, Ordering::SeqCst);
            *CALLBACK.lock() = None;
            Err(HookError::InstallFailed("listener thread exited".to_string()))
        }
    }
}
