//! Autostart module.
//!
//! Applies the `auto_start` setting. On Windows this is the per-user `Run`
//! registry value; other platforms only log that it is unsupported.

/// Makes the login item match `enabled`. Returns whether the system now
/// agrees with the setting.
pub fn sync_autostart(enabled: bool) -> bool {
    sync(enabled)
}

#[cfg(windows)]
fn sync(enabled: bool) -> bool {
    if registry::is_autostart_enabled() == enabled {
        return true;
    }
    let applied = if enabled {
        registry::enable_autostart()
    } else {
        registry::disable_autostart()
    };
    if applied {
        log::info!("Autostart {}", if enabled { "enabled" } else { "disabled" });
    } else {
        log::warn!("Failed to update autostart registry value");
    }
    applied
}

#[cfg(not(windows))]
fn sync(enabled: bool) -> bool {
    if enabled {
        log::warn!("Autostart is not supported on this platform");
    }
    !enabled
}

#[cfg(windows)]
mod registry {
    use windows::{
        core::PCWSTR,
        Win32::System::Registry::{
            RegCloseKey, RegDeleteValueW, RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY,
            HKEY_CURRENT_USER, KEY_READ, KEY_WRITE, REG_SAM_FLAGS, REG_SZ,
        },
    };

    const APP_NAME: &str = "KeyClack";
    const REG_PATH: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

    fn wide(text: &str) -> Vec<u16> {
        text.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Opens the `Run` key; the caller closes it.
    unsafe fn open_run_key(access: REG_SAM_FLAGS) -> Option<HKEY> {
        let reg_path = wide(REG_PATH);
        let mut key = HKEY::default();
        RegOpenKeyExW(
            HKEY_CURRENT_USER,
            PCWSTR(reg_path.as_ptr()),
            0,
            access,
            &mut key,
        )
        .ok()
        .ok()?;
        Some(key)
    }

    pub fn is_autostart_enabled() -> bool {
        let app_name = wide(APP_NAME);
        unsafe {
            let Some(key) = open_run_key(KEY_READ) else {
                return false;
            };
            let query_result =
                RegQueryValueExW(key, PCWSTR(app_name.as_ptr()), None, None, None, None);
            let _ = RegCloseKey(key);
            query_result.is_ok()
        }
    }

    pub fn enable_autostart() -> bool {
        let Some(exe_path) = std::env::current_exe()
            .ok()
            .map(|p| p.to_string_lossy().to_string())
        else {
            return false;
        };
        let app_name = wide(APP_NAME);
        let exe_path_wide = wide(&exe_path);

        unsafe {
            let Some(key) = open_run_key(KEY_WRITE) else {
                return false;
            };
            let set_result = RegSetValueExW(
                key,
                PCWSTR(app_name.as_ptr()),
                0,
                REG_SZ,
                Some(std::slice::from_raw_parts(
                    exe_path_wide.as_ptr() as *const u8,
                    exe_path_wide.len() * 2,
                )),
            );
            let _ = RegCloseKey(key);
            set_result.is_ok()
        }
    }

    pub fn disable_autostart() -> bool {
        let app_name = wide(APP_NAME);
        unsafe {
            let Some(key) = open_run_key(KEY_WRITE) else {
                return false;
            };
            let delete_result = RegDeleteValueW(key, PCWSTR(app_name.as_ptr()));
            let _ = RegCloseKey(key);
            delete_result.is_ok()
        }
    }
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;

    #[test]
    fn unsupported_platform_only_agrees_when_disabled() {
        assert!(sync_autostart(false));
        assert!(!sync_autostart(true));
    }
}
