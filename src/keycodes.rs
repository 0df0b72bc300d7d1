//! Platform key code tables.
//!
//! Translate the codes reported by the OS keyboard hooks into raw key names
//! understood by [`crate::bindings::normalize`]. Codes without an entry are
//! reported as `key_<code>`.

/// Windows virtual key codes.
const VK_NAMES: &[(u32, &str)] = &[
    (0x08, "backspace"),
    (0x09, "tab"),
    (0x0D, "enter"),
    (0x10, "shift"),
    (0x11, "ctrl"),
    (0x12, "alt"),
    (0x13, "pause"),
    (0x14, "caps_lock"),
    (0x1B, "esc"),
    (0x20, "space"),
    (0x21, "page_up"),
    (0x22, "page_down"),
    (0x23, "end"),
    (0x24, "home"),
    (0x25, "left"),
    (0x26, "up"),
    (0x27, "right"),
    (0x28, "down"),
    (0x2C, "print_screen"),
    (0x2D, "insert"),
    (0x2E, "delete"),
    (0x5B, "cmd"),
    (0x5C, "cmd_r"),
    (0x6A, "numpad_multiply"),
    (0x6B, "numpad_add"),
    (0x6D, "numpad_subtract"),
    (0x6E, "numpad_decimal"),
    (0x6F, "numpad_divide"),
    (0x90, "num_lock"),
    (0x91, "scroll_lock"),
    (0xA0, "shift"),
    (0xA1, "shift_r"),
    (0xA2, "ctrl"),
    (0xA3, "ctrl_r"),
    (0xA4, "alt"),
    (0xA5, "alt_r"),
    (0xBA, ";"),
    (0xBB, "="),
    (0xBC, ","),
    (0xBD, "-"),
    (0xBE, "."),
    (0xBF, "/"),
    (0xC0, "`"),
    (0xDB, "["),
    (0xDC, "\\"),
    (0xDD, "]"),
    (0xDE, "'"),
];

/// macOS `kVK_*` key codes (ANSI layout).
const MAC_NAMES: &[(u32, &str)] = &[
    (0x00, "a"),
    (0x01, "s"),
    (0x02, "d"),
    (0x03, "f"),
    (0x04, "h"),
    (0x05, "g"),
    (0x06, "z"),
    (0x07, "x"),
    (0x08, "c"),
    (0x09, "v"),
    (0x0B, "b"),
    (0x0C, "q"),
    (0x0D, "w"),
    (0x0E, "e"),
    (0x0F, "r"),
    (0x10, "y"),
    (0x11, "t"),
    (0x12, "1"),
    (0x13, "2"),
    (0x14, "3"),
    (0x15, "4"),
    (0x16, "6"),
    (0x17, "5"),
    (0x18, "="),
    (0x19, "9"),
    (0x1A, "7"),
    (0x1B, "-"),
    (0x1C, "8"),
    (0x1D, "0"),
    (0x1E, "]"),
    (0x1F, "o"),
    (0x20, "u"),
    (0x21, "["),
    (0x22, "i"),
    (0x23, "p"),
    (0x24, "enter"),
    (0x25, "l"),
    (0x26, "j"),
    (0x27, "'"),
    (0x28, "k"),
    (0x29, ";"),
    (0x2A, "\\"),
    (0x2B, ","),
    (0x2C, "/"),
    (0x2D, "n"),
    (0x2E, "m"),
    (0x2F, "."),
    (0x30, "tab"),
    (0x31, "space"),
    (0x32, "`"),
    (0x33, "backspace"),
    (0x35, "esc"),
    (0x36, "cmd_r"),
    (0x37, "cmd"),
    (0x38, "shift"),
    (0x39, "caps_lock"),
    (0x3A, "alt"),
    (0x3B, "ctrl"),
    (0x3C, "shift_r"),
    (0x3D, "alt_r"),
    (0x3E, "ctrl_r"),
    (0x41, "numpad_decimal"),
    (0x43, "numpad_multiply"),
    (0x45, "numpad_add"),
    (0x47, "num_lock"),
    (0x4B, "numpad_divide"),
    (0x4C, "enter"),
    (0x4E, "numpad_subtract"),
    (0x52, "numpad_0"),
    (0x53, "numpad_1"),
    (0x54, "numpad_2"),
    (0x55, "numpad_3"),
    (0x56, "numpad_4"),
    (0x57, "numpad_5"),
    (0x58, "numpad_6"),
    (0x59, "numpad_7"),
    (0x5B, "numpad_8"),
    (0x5C, "numpad_9"),
    (0x60, "f5"),
    (0x61, "f6"),
    (0x62, "f7"),
    (0x63, "f3"),
    (0x64, "f8"),
    (0x65, "f9"),
    (0x67, "f11"),
    (0x6D, "f10"),
    (0x6F, "f12"),
    (0x72, "insert"),
    (0x73, "home"),
    (0x74, "page_up"),
    (0x75, "delete"),
    (0x76, "f4"),
    (0x77, "end"),
    (0x78, "f2"),
    (0x79, "page_down"),
    (0x7A, "f1"),
    (0x7B, "left"),
    (0x7C, "right"),
    (0x7D, "down"),
    (0x7E, "up"),
];

/// Raw key name for a Windows virtual key code.
pub fn windows_key_name(vk: u32) -> String {
    match vk {
        // Letters and digits share their ASCII codes
        0x30..=0x39 | 0x41..=0x5A => char::from_u32(vk)
            .map(|c| c.to_ascii_lowercase().to_string())
            .unwrap_or_else(|| unknown(vk)),
        0x60..=0x69 => format!("numpad_{}", vk - 0x60),
        0x70..=0x7B => format!("f{}", vk - 0x6F),
        _ => lookup(VK_NAMES, vk),
    }
}

/// Raw key name for a macOS virtual key code.
pub fn mac_key_name(keycode: u32) -> String {
    lookup(MAC_NAMES, keycode)
}

/// Modifier flag bit (`kCGEventFlagMask*`) raised while a macOS modifier
/// key is held, or `None` for ordinary keys.
pub fn mac_modifier_mask(keycode: u32) -> Option<u64> {
    match keycode {
        0x39 => Some(0x0001_0000),        // caps lock
        0x38 | 0x3C => Some(0x0002_0000), // shift
        0x3B | 0x3E => Some(0x0004_0000), // control
        0x3A | 0x3D => Some(0x0008_0000), // option
        0x37 | 0x36 => Some(0x0010_0000), // command
        _ => None,
    }
}

/// Raw key name for a key reported by the X11/evdev listener.
#[cfg(target_os = "linux")]
pub fn linux_key_name(key: rdev::Key) -> String {
    use rdev::Key;

    let name = match key {
        Key::KeyA => "a",
        Key::KeyB => "b",
        Key::KeyC => "c",
        Key::KeyD => "d",
        Key::KeyE => "e",
        Key::KeyF => "f",
        Key::KeyG => "g",
        Key::KeyH => "h",
        Key::KeyI => "i",
        Key::KeyJ => "j",
        Key::KeyK => "k",
        Key::KeyL => "l",
        Key::KeyM => "m",
        Key::KeyN => "n",
        Key::KeyO => "o",
        Key::KeyP => "p",
        Key::KeyQ => "q",
        Key::KeyR => "r",
        Key::KeyS => "s",
        Key::KeyT => "t",
        Key::KeyU => "u",
        Key::KeyV => "v",
        Key::KeyW => "w",
        Key::KeyX => "x",
        Key::KeyY => "y",
        Key::KeyZ => "z",
        Key::Num0 => "0",
        Key::Num1 => "1",
        Key::Num2 => "2",
        Key::Num3 => "3",
        Key::Num4 => "4",
        Key::Num5 => "5",
        Key::Num6 => "6",
        Key::Num7 => "7",
        Key::Num8 => "8",
        Key::Num9 => "9",
        Key::F1 => "f1",
        Key::F2 => "f2",
        Key::F3 => "f3",
        Key::F4 => "f4",
        Key::F5 => "f5",
        Key::F6 => "f6",
        Key::F7 => "f7",
        Key::F8 => "f8",
        Key::F9 => "f9",
        Key::F10 => "f10",
        Key::F11 => "f11",
        Key::F12 => "f12",
        Key::Space => "space",
        Key::Return | Key::KpReturn => "enter",
        Key::Backspace => "backspace",
        Key::Tab => "tab",
        Key::Escape => "esc",
        Key::ShiftLeft => "shift",
        Key::ShiftRight => "shift_r",
        Key::ControlLeft => "ctrl",
        Key::ControlRight => "ctrl_r",
        Key::Alt => "alt",
        Key::AltGr => "alt_gr",
        Key::MetaLeft => "cmd",
        Key::MetaRight => "cmd_r",
        Key::CapsLock => "caps_lock",
        Key::LeftArrow => "left",
        Key::RightArrow => "right",
        Key::UpArrow => "up",
        Key::DownArrow => "down",
        Key::Home => "home",
        Key::End => "end",
        Key::PageUp => "page_up",
        Key::PageDown => "page_down",
        Key::Insert => "insert",
        Key::Delete => "delete",
        Key::PrintScreen => "print_screen",
        Key::ScrollLock => "scroll_lock",
        Key::Pause => "pause",
        Key::NumLock => "num_lock",
        Key::Kp0 => "numpad_0",
        Key::Kp1 => "numpad_1",
        Key::Kp2 => "numpad_2",
        Key::Kp3 => "numpad_3",
        Key::Kp4 => "numpad_4",
        Key::Kp5 => "numpad_5",
        Key::Kp6 => "numpad_6",
        Key::Kp7 => "numpad_7",
        Key::Kp8 => "numpad_8",
        Key::Kp9 => "numpad_9",
        Key::KpPlus => "numpad_add",
        Key::KpMinus => "numpad_subtract",
        Key::KpMultiply => "numpad_multiply",
        Key::KpDivide => "numpad_divide",
        Key::KpDelete => "numpad_decimal",
        Key::BackQuote => "`",
        Key::Minus => "-",
        Key::Equal => "=",
        Key::LeftBracket => "[",
        Key::RightBracket => "]",
        Key::BackSlash | Key::IntlBackslash => "\\",
        Key::SemiColon => ";",
        Key::Quote => "'",
        Key::Comma => ",",
        Key::Dot => ".",
        Key::Slash => "/",
        Key::Unknown(code) => return unknown(code),
        Key::Function => "fn",
    };
    name.to_string()
}

fn lookup(table: &[(u32, &str)], code: u32) -> String {
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| unknown(code))
}

fn unknown(code: u32) -> String {
    format!("key_{code}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{normalize, STANDARD_KEYS, UNKNOWN_KEY};

    #[test]
    fn windows_codes() {
        assert_eq!(windows_key_name(0x41), "a");
        assert_eq!(windows_key_name(0x5A), "z");
        assert_eq!(windows_key_name(0x37), "7");
        assert_eq!(windows_key_name(0x60), "numpad_0");
        assert_eq!(windows_key_name(0x69), "numpad_9");
        assert_eq!(windows_key_name(0x70), "f1");
        assert_eq!(windows_key_name(0x7B), "f12");
        assert_eq!(windows_key_name(0x1B), "esc");
        assert_eq!(windows_key_name(0xFF), "key_255");
    }

    #[test]
    fn mac_codes() {
        assert_eq!(mac_key_name(0x00), "a");
        assert_eq!(mac_key_name(0x31), "space");
        assert_eq!(mac_key_name(0x7A), "f1");
        assert_eq!(mac_key_name(0x5C), "numpad_9");
        assert_eq!(mac_key_name(0x3F), "key_63");
        assert_eq!(mac_modifier_mask(0x3C), Some(0x0002_0000));
        assert_eq!(mac_modifier_mask(0x00), None);
    }

    #[test]
    fn every_standard_key_is_reachable_on_windows() {
        let reachable: Vec<String> = (0..=0xFF).map(|vk| normalize(&windows_key_name(vk))).collect();
        for key in STANDARD_KEYS.iter() {
            assert!(reachable.contains(key), "no virtual key for {key}");
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_keys() {
        use rdev::Key;

        assert_eq!(linux_key_name(Key::KeyQ), "q");
        assert_eq!(linux_key_name(Key::Num7), "7");
        assert_eq!(linux_key_name(Key::Kp3), "numpad_3");
        assert_eq!(linux_key_name(Key::KpReturn), "enter");
        assert_eq!(linux_key_name(Key::F10), "f10");
        assert_eq!(linux_key_name(Key::BackSlash), "\\");
        assert_eq!(linux_key_name(Key::Unknown(248)), "key_248");

        assert_eq!(normalize(&linux_key_name(Key::AltGr)), "alt");
        assert_eq!(normalize(&linux_key_name(Key::MetaRight)), "cmd");
        assert_eq!(normalize(&linux_key_name(Key::ControlRight)), "ctrl");
        assert_eq!(normalize(&linux_key_name(Key::Escape)), "escape");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn every_standard_key_is_reachable_on_linux() {
        use rdev::Key::*;

        let keys = [
            KeyA, KeyB, KeyC, KeyD, KeyE, KeyF, KeyG, KeyH, KeyI, KeyJ, KeyK, KeyL, KeyM, KeyN,
            KeyO, KeyP, KeyQ, KeyR, KeyS, KeyT, KeyU, KeyV, KeyW, KeyX, KeyY, KeyZ, Num0, Num1,
            Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9, F1, F2, F3, F4, F5, F6, F7, F8, F9,
            F10, F11, F12, Space, Return, Backspace, Tab, Escape, ShiftLeft, ControlLeft, Alt,
            MetaLeft, CapsLock, LeftArrow, RightArrow, UpArrow, DownArrow, Home, End, PageUp,
            PageDown, Insert, Delete, PrintScreen, ScrollLock, Pause, NumLock, Kp0, Kp1, Kp2,
            Kp3, Kp4, Kp5, Kp6, Kp7, Kp8, Kp9, KpPlus, KpMinus, KpMultiply, KpDivide,
            KpDelete, BackQuote, Minus, Equal, LeftBracket, RightBracket, BackSlash, SemiColon,
            Quote, Comma, Dot, Slash,
        ];
        let reachable: Vec<String> = keys
            .into_iter()
            .map(|key| normalize(&linux_key_name(key)))
            .collect();
        for key in STANDARD_KEYS.iter() {
            assert!(reachable.contains(key), "no listener key for {key}");
        }
    }

    #[test]
    fn named_codes_normalize_to_known_keys() {
        for (_, name) in VK_NAMES.iter().chain(MAC_NAMES.iter()) {
            assert_ne!(normalize(name), UNKNOWN_KEY, "{name} is not a known key");
        }
    }
}
