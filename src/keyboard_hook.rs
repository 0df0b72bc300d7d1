//! Keyboard hook module.
//!
//! Installs a global key-press hook on its own thread and reports each press
//! as a raw key name. The callback runs on the hook thread, so it must not
//! block.

use std::sync::Arc;

/// Callback type for key presses.
pub type KeyPressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Errors raised while installing the hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("global keyboard hooks are not supported on this platform")]
    Unsupported,
    #[error("failed to install keyboard hook: {0}")]
    InstallFailed(String),
    #[error("keyboard hook is already running")]
    AlreadyRunning,
}

#[cfg(windows)]
#[path = "keyboard_hook_windows.rs"]
mod platform;

#[cfg(target_os = "macos")]
#[path = "keyboard_hook_macos.rs"]
mod platform;

#[cfg(target_os = "linux")]
#[path = "keyboard_hook_linux.rs"]
mod platform;

#[cfg(not(any(windows, target_os = "macos", target_os = "linux")))]
mod platform {
    use super::{HookError, KeyPressCallback};

    pub struct HookHandle;

    impl HookHandle {
        pub fn is_running(&self) -> bool {
            false
        }

        pub fn stop(self) {}
    }

    pub fn start(_callback: KeyPressCallback) -> Result<HookHandle, HookError> {
        Err(HookError::Unsupported)
    }
}

/// Global keyboard hook manager.
#[derive(Default)]
pub struct KeyboardHook {
    handle: Option<platform::HookHandle>,
}

impl KeyboardHook {
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Installs the hook and starts its thread.
    pub fn start(&mut self, callback: KeyPressCallback) -> Result<(), HookError> {
        if self.is_running() {
            return Err(HookError::AlreadyRunning);
        }
        self.handle = Some(platform::start(callback)?);
        log::info!("Keyboard hook started");
        Ok(())
    }

    /// Removes the hook.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        handle.stop();
        log::info!("Keyboard hook stopped");
    }

    /// Whether key presses are still being reported.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_running())
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_hook_is_not_running() {
        let mut hook = KeyboardHook::new();
        assert!(!hook.is_running());
        hook.stop();
        assert!(!hook.is_running());
    }

    #[cfg(not(any(windows, target_os = "macos", target_os = "linux")))]
    #[test]
    fn unsupported_platform_reports_error() {
        let mut hook = KeyboardHook::new();
        let result = hook.start(Arc::new(|_key: &str| {}));
        assert!(matches!(result, Err(HookError::Unsupported)));
        assert!(!hook.is_running());
    }
}
