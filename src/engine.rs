//! Application engine.
//!
//! Owns the settings, sound library, key bindings and player, and writes the
//! affected document after every mutation. The keyboard hook thread only
//! calls [`Engine::handle_key_press`], which reads state and enqueues
//! playback.

use crate::autostart;
use crate::bindings::{self, Binding, BindingInfo, KeyBindings, STANDARD_KEYS};
use crate::config::ConfigManager;
use crate::library::{self, SoundDescriptor, SoundLibrary};
use crate::playback::SoundPlayer;
use crate::store::{self, DataDir};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

pub struct Engine {
    config: Mutex<ConfigManager>,
    // Mirror of the `enabled` setting, read by the hook without locking
    enabled: AtomicBool,
    library: RwLock<SoundLibrary>,
    bindings: RwLock<KeyBindings>,
    player: SoundPlayer,
    resource_dir: PathBuf,
    last_modified: Mutex<[Option<SystemTime>; 3]>,
}

impl Engine {
    /// Loads every document, installing the bundled default sound and the
    /// first-run bindings when needed.
    pub fn open(data_dir: DataDir, resource_dir: PathBuf, player: SoundPlayer) -> Self {
        if let Err(e) = data_dir.ensure() {
            log::error!("Failed to create data directory: {}", e);
        }

        let config = ConfigManager::load(data_dir.clone());
        player.set_volume(config.volume());

        let engine = Self {
            enabled: AtomicBool::new(config.is_enabled()),
            config: Mutex::new(config),
            library: RwLock::new(SoundLibrary::new()),
            bindings: RwLock::new(KeyBindings::new()),
            player,
            resource_dir,
            last_modified: Mutex::new([None; 3]),
        };
        engine.load_documents();
        log::info!(
            "Engine ready: {} sounds, {} bindings",
            engine.library.read().len(),
            engine.bindings.read().len()
        );
        engine
    }

    fn data_dir(&self) -> DataDir {
        self.config.lock().data_dir().clone()
    }

    fn load_documents(&self) {
        let data_dir = self.data_dir();

        let mut library =
            SoundLibrary::from_descriptors(store::load(&data_dir.sound_library_file(), Vec::new()));
        if library.is_empty()
            && library.ensure_bundled_default(&self.resource_dir, &data_dir.sounds_dir())
        {
            store::save(&data_dir.sound_library_file(), library.descriptors());
        }

        let mut bindings =
            KeyBindings::from_file_map(store::load(&data_dir.key_bindings_file(), BTreeMap::new()));
        let first_sound = library
            .first_available()
            .map(|path| path.to_string_lossy().into_owned());
        if bindings.initialize_defaults(first_sound.as_deref()) {
            store::save(&data_dir.key_bindings_file(), &bindings.to_file_map());
        }

        *self.library.write() = library;
        *self.bindings.write() = bindings;
        *self.last_modified.lock() = data_dir.modified_times();
    }

    fn save_library(&self) -> bool {
        let path = self.data_dir().sound_library_file();
        let ok = store::save(&path, self.library.read().descriptors());
        self.remember_modified_times();
        ok
    }

    fn save_bindings(&self) -> bool {
        let path = self.data_dir().key_bindings_file();
        let ok = store::save(&path, &self.bindings.read().to_file_map());
        self.remember_modified_times();
        ok
    }

    fn remember_modified_times(&self) {
        *self.last_modified.lock() = self.data_dir().modified_times();
    }

    /// Writes all three documents.
    pub fn save_all(&self) -> bool {
        let settings = self.config.lock().save();
        let library = self.save_library();
        let bindings = self.save_bindings();
        settings && library && bindings
    }

    /// Reloads the documents if another process rewrote any of them.
    /// Returns whether a reload happened.
    pub fn reload_if_changed(&self) -> bool {
        if *self.last_modified.lock() == self.data_dir().modified_times() {
            return false;
        }
        log::info!("Configuration changed on disk, reloading");
        let auto_start = self.auto_start();
        self.reload();
        if self.auto_start() != auto_start {
            autostart::sync_autostart(self.auto_start());
        }
        true
    }

    /// Re-reads all three documents, falling back to defaults.
    pub fn reload(&self) {
        let (enabled, volume) = {
            let mut config = self.config.lock();
            config.reload();
            (config.is_enabled(), config.volume())
        };
        self.enabled.store(enabled, Ordering::SeqCst);
        self.player.set_volume(volume);
        self.load_documents();
    }

    // Key press path

    /// Entry point for the keyboard hook. Never blocks on audio.
    pub fn handle_key_press(&self, raw_key: &str) -> bool {
        if !self.enabled.load(Ordering::SeqCst) {
            return false;
        }
        let key = bindings::normalize(raw_key);
        log::debug!("Key pressed: {} ({})", key, raw_key);

        let sound = self.bindings.read().get_sound(&key);
        let Some(descriptor) = self.library.read().resolve(&sound) else {
            log::debug!("No playable sound for key {} ({})", key, sound);
            return false;
        };
        self.player.play(&descriptor.path)
    }

    /// Plays a library sound or file outside of key handling.
    pub fn preview(&self, id_or_path: &str) -> bool {
        match self.library.read().resolve(id_or_path) {
            Some(descriptor) => self.player.play(&descriptor.path),
            None => {
                log::warn!("Sound not found: {}", id_or_path);
                false
            }
        }
    }

    pub fn stop_playback(&self) {
        self.player.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    /// Validates that a sound resolves and records it in the player cache.
    pub fn preload(&self, id_or_path: &str) -> bool {
        match self.library.read().resolve(id_or_path) {
            Some(descriptor) => self.player.preload(&descriptor.path),
            None => false,
        }
    }

    // Key bindings

    /// Sound path bound to a key, or the default sound identifier.
    pub fn sound_for_key(&self, raw_key: &str) -> String {
        self.bindings.read().get_sound(raw_key)
    }

    pub fn binding(&self, raw_key: &str) -> Binding {
        self.bindings.read().binding(raw_key)
    }

    /// Binds a key, or clears it when `sound` is `None`.
    pub fn set_key_sound(&self, raw_key: &str, sound: Option<&str>) -> bool {
        if !bindings::is_valid_key(raw_key) {
            log::warn!("Not a bindable key: {}", raw_key);
            return false;
        }
        self.bindings.write().set_sound(raw_key, sound);
        self.save_bindings()
    }

    /// Applies several bindings at once. Nothing is applied if any key is
    /// not bindable.
    pub fn set_key_bindings(&self, bindings: &BTreeMap<String, String>) -> bool {
        if let Some(key) = bindings.keys().find(|key| !bindings::is_valid_key(key)) {
            log::warn!("Not a bindable key: {}", key);
            return false;
        }
        {
            let mut table = self.bindings.write();
            for (key, sound) in bindings {
                table.set_sound(key, Some(sound));
            }
        }
        self.save_bindings()
    }

    /// Binds every standard key to one sound, which must resolve.
    pub fn set_all_keys_sound(&self, sound: &str) -> bool {
        if self.library.read().resolve(sound).is_none() {
            log::warn!("Sound {} does not exist", sound);
            return false;
        }
        self.bindings.write().set_all(sound);
        self.save_bindings()
    }

    pub fn reset_key(&self, raw_key: &str) -> bool {
        if !bindings::is_valid_key(raw_key) {
            log::warn!("Not a bindable key: {}", raw_key);
            return false;
        }
        self.bindings.write().reset_key(raw_key);
        self.save_bindings()
    }

    pub fn reset_all_keys(&self) -> bool {
        self.bindings.write().reset_all();
        self.save_bindings()
    }

    /// Rebinds every key using `sound` to the default.
    pub fn remove_bindings_for(&self, sound: &str) -> usize {
        let count = self.bindings.write().remove_bindings_for(sound);
        if count > 0 {
            self.save_bindings();
        }
        count
    }

    /// Explicit key to sound entries.
    pub fn key_bindings(&self) -> BTreeMap<String, String> {
        self.bindings.read().all_bindings()
    }

    /// Key, sound id and sound name for one key.
    pub fn binding_info(&self, raw_key: &str) -> BindingInfo {
        let key = bindings::normalize(raw_key);
        let sound_id = self.sound_for_key(&key);
        let sound_name = self
            .library
            .read()
            .resolve(&sound_id)
            .map(|d| d.filename)
            .or_else(|| library::sound_name_by_path(&sound_id))
            .unwrap_or_else(|| "Unknown".to_string());
        BindingInfo {
            display_name: bindings::display_name(&key),
            key,
            sound_id,
            sound_name,
        }
    }

    /// [`Engine::binding_info`] for every standard key.
    pub fn all_binding_info(&self) -> Vec<BindingInfo> {
        STANDARD_KEYS
            .iter()
            .map(|key| self.binding_info(key))
            .collect()
    }

    // Sound library

    /// Appends a descriptor. Returns `false` if its path is already present.
    pub fn add_sound(&self, descriptor: SoundDescriptor) -> bool {
        if !self.library.write().add(descriptor) {
            return false;
        }
        self.save_library()
    }

    /// Removes a sound and rebinds the keys that used it to the default.
    pub fn remove_sound(&self, id_or_path: &str) -> bool {
        let Some(removed) = self.library.write().remove(id_or_path) else {
            return false;
        };
        let path = removed.path.to_string_lossy().into_owned();
        {
            let mut table = self.bindings.write();
            table.remove_bindings_for(&path);
            table.remove_bindings_for(removed.id.as_str());
        }
        self.player.clear_cache();
        let library_saved = self.save_library();
        let bindings_saved = self.save_bindings();
        library_saved && bindings_saved
    }

    /// Registers a file outside the managed directory, if settings allow it.
    pub fn add_custom_sound_path(&self, path: &Path) -> bool {
        let allowed = self.config.lock().allows_custom_sound_paths();
        if !self.library.write().add_custom_path(path, allowed) {
            return false;
        }
        self.save_library()
    }

    /// Copies a file into `sounds/` and registers it.
    pub fn import_sound(&self, source: &Path) -> Option<SoundDescriptor> {
        let sounds_dir = self.data_dir().sounds_dir();
        let descriptor = self.library.write().import(source, &sounds_dir)?;
        self.save_library();
        Some(descriptor)
    }

    pub fn resolve_sound(&self, id_or_path: &str) -> Option<SoundDescriptor> {
        self.library.read().resolve(id_or_path)
    }

    /// Display name to path for every playable library entry.
    pub fn sound_library(&self) -> Vec<(String, PathBuf)> {
        self.library.read().name_to_path_map()
    }

    pub fn sounds(&self) -> Vec<SoundDescriptor> {
        self.library.read().descriptors().to_vec()
    }

    // Settings

    pub fn get_setting(&self, name: &str) -> Option<Value> {
        self.config.lock().get_setting(name)
    }

    pub fn set_setting(&self, name: &str, value: Value) -> bool {
        let saved = {
            let mut config = self.config.lock();
            let saved = config.set_setting(name, value);
            self.enabled.store(config.is_enabled(), Ordering::SeqCst);
            self.player.set_volume(config.volume());
            saved
        };
        if name == "auto_start" {
            autostart::sync_autostart(self.auto_start());
        }
        self.remember_modified_times();
        saved
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) -> bool {
        log::info!("Key sounds {}", if enabled { "enabled" } else { "disabled" });
        self.enabled.store(enabled, Ordering::SeqCst);
        let saved = self.config.lock().set_enabled(enabled);
        self.remember_modified_times();
        saved
    }

    pub fn volume(&self) -> f64 {
        self.config.lock().volume()
    }

    /// Stores the volume fraction. Playback does not apply it.
    pub fn set_volume(&self, volume: f64) -> bool {
        let saved = {
            let mut config = self.config.lock();
            let saved = config.set_volume(volume);
            self.player.set_volume(config.volume());
            saved
        };
        self.remember_modified_times();
        saved
    }

    pub fn auto_start(&self) -> bool {
        self.config.lock().settings().auto_start
    }
}
