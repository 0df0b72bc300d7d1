//! Key binding module.
//!
//! Maps normalized key names to sound paths. Keys without an explicit
//! binding play the default sound.

use crate::library::DEFAULT_SOUND_ID;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

/// Returned by [`normalize`] for empty or unrecognised input.
pub const UNKNOWN_KEY: &str = "unknown";

const SPECIAL_KEYS: &[&str] = &[
    "space",
    "enter",
    "backspace",
    "tab",
    "escape",
    "shift",
    "ctrl",
    "alt",
    "cmd",
    "caps_lock",
    "left",
    "right",
    "up",
    "down",
    "home",
    "end",
    "page_up",
    "page_down",
    "insert",
    "delete",
    "print_screen",
    "scroll_lock",
    "pause",
    "num_lock",
];

const NUMPAD_OPERATORS: &[&str] = &["add", "subtract", "multiply", "divide", "decimal"];

const PUNCTUATION_KEYS: &[&str] = &["`", "-", "=", "[", "]", "\\", ";", "'", ",", ".", "/"];

/// Every key the application binds by default, in a fixed order.
pub static STANDARD_KEYS: Lazy<Vec<String>> = Lazy::new(|| {
    let mut keys: Vec<String> = ('a'..='z').map(String::from).collect();
    keys.extend((0..10).map(|d| d.to_string()));
    keys.extend((1..=12).map(|n| format!("f{n}")));
    keys.extend(SPECIAL_KEYS.iter().map(|k| k.to_string()));
    keys.extend((0..10).map(|d| format!("num_{d}")));
    keys.extend(NUMPAD_OPERATORS.iter().map(|op| format!("num_{op}")));
    keys.extend(PUNCTUATION_KEYS.iter().map(|k| k.to_string()));
    keys
});

/// Alternative spellings reported by hooks, UIs and humans.
static KEY_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("space_bar", "space"),
        ("spacebar", "space"),
        ("return", "enter"),
        ("back_space", "backspace"),
        ("del", "delete"),
        ("esc", "escape"),
        ("command", "cmd"),
        ("cmd_l", "cmd"),
        ("cmd_r", "cmd"),
        ("windows", "cmd"),
        ("win", "cmd"),
        ("super", "cmd"),
        ("meta", "cmd"),
        ("option", "alt"),
        ("alt_l", "alt"),
        ("alt_r", "alt"),
        ("alt_gr", "alt"),
        ("control", "ctrl"),
        ("ctrl_l", "ctrl"),
        ("ctrl_r", "ctrl"),
        ("shift_l", "shift"),
        ("shift_r", "shift"),
        ("capslock", "caps_lock"),
        ("caps", "caps_lock"),
        ("pgup", "page_up"),
        ("pgdn", "page_down"),
        ("pageup", "page_up"),
        ("pagedown", "page_down"),
        ("ins", "insert"),
        ("scrolllock", "scroll_lock"),
        ("scroll", "scroll_lock"),
        ("numlock", "num_lock"),
        ("prtsc", "print_screen"),
        ("prtscr", "print_screen"),
        ("snapshot", "print_screen"),
        ("arrow_left", "left"),
        ("arrow_right", "right"),
        ("arrow_up", "up"),
        ("arrow_down", "down"),
    ])
});

static DISPLAY_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("space", "Space"),
        ("enter", "Enter"),
        ("backspace", "Backspace"),
        ("tab", "Tab"),
        ("escape", "Esc"),
        ("shift", "Shift"),
        ("ctrl", "Ctrl"),
        ("alt", "Alt"),
        ("cmd", "Cmd"),
        ("caps_lock", "Caps Lock"),
        ("left", "←"),
        ("right", "→"),
        ("up", "↑"),
        ("down", "↓"),
        ("home", "Home"),
        ("end", "End"),
        ("page_up", "Page Up"),
        ("page_down", "Page Down"),
        ("insert", "Insert"),
        ("delete", "Delete"),
        ("print_screen", "PrtSc"),
        ("scroll_lock", "Scroll Lock"),
        ("pause", "Pause"),
        ("num_lock", "Num Lock"),
    ])
});

/// Maps a raw key spelling onto the canonical key vocabulary.
pub fn normalize(raw_key: &str) -> String {
    if raw_key == " " {
        return "space".to_string();
    }
    let key = raw_key.trim().to_lowercase();
    if key.is_empty() {
        return UNKNOWN_KEY.to_string();
    }
    if let Some(alias) = KEY_ALIASES.get(key.as_str()) {
        return alias.to_string();
    }
    if let Some(numpad) = normalize_numpad(&key) {
        return numpad;
    }
    if let Some(function) = normalize_function_key(&key) {
        return function;
    }
    if is_standard_key(&key) {
        key
    } else {
        UNKNOWN_KEY.to_string()
    }
}

fn normalize_numpad(key: &str) -> Option<String> {
    let rest = key
        .strip_prefix("numpad_")
        .or_else(|| key.strip_prefix("numpad"))
        .or_else(|| key.strip_prefix("num_"))?;
    let is_digit = rest.len() == 1 && rest.chars().all(|c| c.is_ascii_digit());
    if is_digit || NUMPAD_OPERATORS.contains(&rest) {
        Some(format!("num_{rest}"))
    } else {
        None
    }
}

fn normalize_function_key(key: &str) -> Option<String> {
    let digits = key.strip_prefix('f')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let number: u32 = digits.parse().ok()?;
    (1..=12).contains(&number).then(|| format!("f{number}"))
}

fn is_standard_key(key: &str) -> bool {
    STANDARD_KEYS.iter().any(|k| k == key)
}

/// Whether a raw spelling normalizes to a standard key.
pub fn is_valid_key(raw_key: &str) -> bool {
    is_standard_key(&normalize(raw_key))
}

/// Human-readable label for a key.
pub fn display_name(raw_key: &str) -> String {
    let key = normalize(raw_key);
    if normalize_function_key(&key).is_some() {
        return key.to_uppercase();
    }
    if let Some(rest) = key.strip_prefix("num_") {
        let symbol = match rest {
            "add" => Some("+"),
            "subtract" => Some("-"),
            "multiply" => Some("*"),
            "divide" => Some("/"),
            "decimal" => Some("."),
            digit if digit.len() == 1 => Some(digit),
            _ => None,
        };
        if let Some(symbol) = symbol {
            return format!("Num {symbol}");
        }
    }
    match DISPLAY_NAMES.get(key.as_str()) {
        Some(name) => name.to_string(),
        None => key.to_uppercase(),
    }
}

/// Binding state of one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Plays the sound at this path.
    Bound(String),
    /// Plays the default sound.
    UsesDefault,
}

impl Binding {
    fn from_stored(value: &str) -> Self {
        if value.is_empty() || value == DEFAULT_SOUND_ID {
            Binding::UsesDefault
        } else {
            Binding::Bound(value.to_string())
        }
    }

    /// Sound identifier to resolve through the library.
    pub fn sound(&self) -> &str {
        match self {
            Binding::Bound(path) => path,
            Binding::UsesDefault => DEFAULT_SOUND_ID,
        }
    }
}

/// Summary of one key for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
    pub key: String,
    pub display_name: String,
    pub sound_id: String,
    pub sound_name: String,
}

/// Key to sound table.
///
/// Keys never bound, or cleared, are absent and behave as
/// [`Binding::UsesDefault`]. Keys explicitly reset keep a stored
/// `UsesDefault` entry so the table is not mistaken for a fresh install.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    entries: BTreeMap<String, Binding>,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from the persisted key to path document.
    pub fn from_file_map(map: BTreeMap<String, String>) -> Self {
        let entries = map
            .into_iter()
            .map(|(key, value)| (normalize(&key), Binding::from_stored(&value)))
            .collect();
        Self { entries }
    }

    /// The persisted form: explicit defaults are stored as the default id.
    pub fn to_file_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(key, binding)| (key.clone(), binding.sound().to_string()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Explicit binding state of a key.
    pub fn binding(&self, raw_key: &str) -> Binding {
        self.entries
            .get(&normalize(raw_key))
            .cloned()
            .unwrap_or(Binding::UsesDefault)
    }

    /// Sound path for a key, or the default sound identifier.
    pub fn get_sound(&self, raw_key: &str) -> String {
        self.binding(raw_key).sound().to_string()
    }

    /// Binds a key, or clears it when `sound` is `None` or empty.
    pub fn set_sound(&mut self, raw_key: &str, sound: Option<&str>) {
        let key = normalize(raw_key);
        match sound.filter(|s| !s.is_empty()) {
            Some(sound) => {
                log::info!("Key {} bound to {}", key, sound);
                self.entries.insert(key, Binding::from_stored(sound));
            }
            None => {
                log::info!("Key {} cleared", key);
                self.entries.remove(&key);
            }
        }
    }

    /// Binds every standard key to one sound.
    pub fn set_all(&mut self, sound: &str) {
        let binding = Binding::from_stored(sound);
        for key in STANDARD_KEYS.iter() {
            self.entries.insert(key.clone(), binding.clone());
        }
        log::info!("All keys bound to {}", sound);
    }

    /// Rebinds one key to the default sound.
    pub fn reset_key(&mut self, raw_key: &str) {
        self.entries.insert(normalize(raw_key), Binding::UsesDefault);
    }

    /// Rebinds every standard key to the default sound.
    pub fn reset_all(&mut self) {
        for key in STANDARD_KEYS.iter() {
            self.entries.insert(key.clone(), Binding::UsesDefault);
        }
        log::info!("All keys reset to the default sound");
    }

    /// Rebinds every key bound to `sound` to the default. Returns how many.
    pub fn remove_bindings_for(&mut self, sound: &str) -> usize {
        let mut count = 0;
        for binding in self.entries.values_mut() {
            if matches!(binding, Binding::Bound(path) if path == sound) {
                *binding = Binding::UsesDefault;
                count += 1;
            }
        }
        if count > 0 {
            log::info!("Removed {} key bindings for {}", count, sound);
        }
        count
    }

    /// First-run setup: binds every standard key to `sound` when the table
    /// is empty. Returns whether anything changed.
    pub fn initialize_defaults(&mut self, sound: Option<&str>) -> bool {
        if !self.entries.is_empty() {
            return false;
        }
        let Some(sound) = sound else {
            return false;
        };
        self.set_all(sound);
        log::info!("Initialized default bindings for {} keys", STANDARD_KEYS.len());
        true
    }

    /// Explicit key to sound entries.
    pub fn all_bindings(&self) -> BTreeMap<String, String> {
        self.to_file_map()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_vocabulary() {
        assert_eq!(STANDARD_KEYS.len(), 98);
        for key in ["a", "z", "0", "f12", "escape", "num_9", "num_decimal", "\\", "/"] {
            assert!(STANDARD_KEYS.iter().any(|k| k == key), "missing {key}");
        }
    }

    #[test]
    fn aliases_and_patterns() {
        assert_eq!(normalize("Esc"), "escape");
        assert_eq!(normalize(" DEL "), "delete");
        assert_eq!(normalize("win"), "cmd");
        assert_eq!(normalize("Windows"), "cmd");
        assert_eq!(normalize("pgup"), "page_up");
        assert_eq!(normalize("shift_r"), "shift");
        assert_eq!(normalize(" "), "space");
        assert_eq!(normalize("numpad_7"), "num_7");
        assert_eq!(normalize("numpad5"), "num_5");
        assert_eq!(normalize("numpad_add"), "num_add");
        assert_eq!(normalize("num_lock"), "num_lock");
        assert_eq!(normalize("F5"), "f5");
        assert_eq!(normalize("f05"), "f5");
        assert_eq!(normalize("Q"), "q");
    }

    #[test]
    fn unrecognised_input_is_unknown() {
        assert_eq!(normalize(""), UNKNOWN_KEY);
        assert_eq!(normalize("   "), UNKNOWN_KEY);
        assert_eq!(normalize("f13"), UNKNOWN_KEY);
        assert_eq!(normalize("f0"), UNKNOWN_KEY);
        assert_eq!(normalize("key_255"), UNKNOWN_KEY);
        assert_eq!(normalize("numpad_12"), UNKNOWN_KEY);
    }

    #[test]
    fn normalize_is_idempotent() {
        let spellings = KEY_ALIASES
            .keys()
            .map(|k| k.to_string())
            .chain(STANDARD_KEYS.iter().cloned())
            .chain(["F7", "numpad_3", "unknown", "", "Tab"].map(String::from));
        for spelling in spellings {
            let once = normalize(&spelling);
            assert_eq!(normalize(&once), once, "not idempotent for {spelling:?}");
        }
    }

    #[test]
    fn set_then_get_returns_exact_path() {
        let mut table = KeyBindings::new();
        for key in STANDARD_KEYS.iter() {
            let path = format!("/sounds/{}.mp3", key.len());
            table.set_sound(key, Some(&path));
            assert_eq!(table.get_sound(key), path);
        }
    }

    #[test]
    fn clearing_reverts_to_default() {
        let mut table = KeyBindings::new();
        table.set_sound("Enter", Some("/s/enter.mp3"));
        assert_eq!(table.binding("return"), Binding::Bound("/s/enter.mp3".into()));

        table.set_sound("enter", None);
        assert_eq!(table.get_sound("enter"), DEFAULT_SOUND_ID);
        assert_eq!(table.binding("enter"), Binding::UsesDefault);
        assert!(table.is_empty());
    }

    #[test]
    fn reset_all_keeps_explicit_entries() {
        let mut table = KeyBindings::new();
        table.set_sound("a", Some("/s/a.mp3"));
        table.reset_all();

        assert_eq!(table.len(), STANDARD_KEYS.len());
        assert_eq!(table.get_sound("a"), DEFAULT_SOUND_ID);
        assert!(table
            .to_file_map()
            .values()
            .all(|v| v == DEFAULT_SOUND_ID));
    }

    #[test]
    fn remove_bindings_for_sound() {
        let mut table = KeyBindings::new();
        table.set_sound("a", Some("/s/x.mp3"));
        table.set_sound("b", Some("/s/x.mp3"));
        table.set_sound("c", Some("/s/y.mp3"));

        assert_eq!(table.remove_bindings_for("/s/x.mp3"), 2);
        assert_eq!(table.get_sound("a"), DEFAULT_SOUND_ID);
        assert_eq!(table.get_sound("b"), DEFAULT_SOUND_ID);
        assert_eq!(table.get_sound("c"), "/s/y.mp3");
    }

    #[test]
    fn first_run_binds_every_standard_key() {
        let mut table = KeyBindings::new();
        assert!(!table.initialize_defaults(None));
        assert!(table.initialize_defaults(Some("/s/first.mp3")));
        for key in STANDARD_KEYS.iter() {
            assert_eq!(table.get_sound(key), "/s/first.mp3");
        }
        assert!(!table.initialize_defaults(Some("/s/other.mp3")));
    }

    #[test]
    fn file_map_round_trip_preserves_explicit_defaults() {
        let mut table = KeyBindings::new();
        table.set_sound("a", Some("/s/a.mp3"));
        table.reset_key("b");

        let restored = KeyBindings::from_file_map(table.to_file_map());
        assert_eq!(restored, table);
        assert_eq!(restored.binding("b"), Binding::UsesDefault);
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name("esc"), "Esc");
        assert_eq!(display_name("f11"), "F11");
        assert_eq!(display_name("numpad_add"), "Num +");
        assert_eq!(display_name("num_4"), "Num 4");
        assert_eq!(display_name("pgdn"), "Page Down");
        assert_eq!(display_name("left"), "←");
        assert_eq!(display_name("k"), "K");
        assert!(is_valid_key("Caps"));
        assert!(!is_valid_key("hyper"));
    }
}
