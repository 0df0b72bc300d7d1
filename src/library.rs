//! Sound library module.
//!
//! Keeps the list of known sound files in insertion order, with a path index
//! that keeps every path unique.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Identifier of the bundled default sound, also used as the fallback for
/// keys without an explicit binding.
pub const DEFAULT_SOUND_ID: &str = "default_sound_001";
/// File name of the bundled default inside `sounds/`.
pub const DEFAULT_SOUND_FILE: &str = "default_sound_001.mp3";
/// File name of the bundled default inside the resource directory.
pub const BUNDLED_SOUND_FILE: &str = "default_sound.mp3";
/// Largest accepted sound file (50 MiB).
pub const MAX_SOUND_FILE_SIZE: u64 = 50 * 1024 * 1024;
/// Display prefix for entries living outside `sounds/`.
pub const CUSTOM_PATH_MARKER: &str = "📁";

const BUNDLED_UPLOAD_TIME: &str = "2024-01-01 12:00:00";
const UPLOAD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Opaque identifier of a library entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundId(String);

impl SoundId {
    /// Creates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Identifier of the bundled default sound.
    pub fn default_sound() -> Self {
        Self(DEFAULT_SOUND_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SoundId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata record for one sound file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundDescriptor {
    pub id: SoundId,
    pub filename: String,
    pub path: PathBuf,
    /// File size in bytes.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub upload_time: String,
    /// Backing file lives outside `sounds/` and is never deleted by us.
    #[serde(default)]
    pub is_custom_path: bool,
}

impl SoundDescriptor {
    /// Builds a descriptor for an existing file, stamped with the current time.
    pub fn from_file(path: &Path, id: SoundId, is_custom_path: bool) -> io::Result<Self> {
        let size = fs::metadata(path)?.len();
        Ok(Self {
            id,
            filename: file_name(path),
            path: path.to_path_buf(),
            size,
            upload_time: now_timestamp(),
            is_custom_path,
        })
    }

    /// Whether `id_or_path` names this entry by id or by path.
    pub fn matches(&self, id_or_path: &str) -> bool {
        self.id.as_str() == id_or_path || self.path == Path::new(id_or_path)
    }
}

/// Reasons a sound file is not accepted into the library.
#[derive(Debug, thiserror::Error)]
pub enum SoundFileError {
    #[error("sound file not found: {0}")]
    NotFound(PathBuf),
    #[error("only .mp3 files are supported: {0}")]
    UnsupportedExtension(PathBuf),
    #[error("sound file is {size} bytes, above the 50 MiB limit: {path}")]
    TooLarge { path: PathBuf, size: u64 },
    #[error("sound is already in the library: {0}")]
    Duplicate(PathBuf),
    #[error("custom sound paths are disabled in settings")]
    CustomPathsDisabled,
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Checks existence, extension and size. Returns the file size.
pub fn validate_sound_file(path: &Path) -> Result<u64, SoundFileError> {
    if !path.is_file() {
        return Err(SoundFileError::NotFound(path.to_path_buf()));
    }
    let is_mp3 = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"));
    if !is_mp3 {
        return Err(SoundFileError::UnsupportedExtension(path.to_path_buf()));
    }
    let size = fs::metadata(path)
        .map_err(|source| SoundFileError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if size > MAX_SOUND_FILE_SIZE {
        return Err(SoundFileError::TooLarge {
            path: path.to_path_buf(),
            size,
        });
    }
    Ok(size)
}

/// Display name of a sound path (its file name).
pub fn sound_name_by_path(path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// In-memory sound library.
#[derive(Debug, Default)]
pub struct SoundLibrary {
    sounds: Vec<SoundDescriptor>,
    by_path: HashMap<PathBuf, SoundId>,
}

impl SoundLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a library from persisted descriptors, skipping repeated paths.
    pub fn from_descriptors(descriptors: Vec<SoundDescriptor>) -> Self {
        let mut library = Self::new();
        for descriptor in descriptors {
            let path = descriptor.path.clone();
            if !library.add(descriptor) {
                log::warn!("Dropping duplicate library entry for {}", path.display());
            }
        }
        library
    }

    pub fn descriptors(&self) -> &[SoundDescriptor] {
        &self.sounds
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn id_for_path(&self, path: &Path) -> Option<&SoundId> {
        self.by_path.get(path)
    }

    /// Appends a descriptor. Returns `false` if its path is already present.
    pub fn add(&mut self, descriptor: SoundDescriptor) -> bool {
        if self.by_path.contains_key(&descriptor.path) {
            return false;
        }
        self.by_path
            .insert(descriptor.path.clone(), descriptor.id.clone());
        self.sounds.push(descriptor);
        true
    }

    /// Removes the first entry whose id or path matches.
    ///
    /// The backing file is deleted too, unless the entry is a custom path or
    /// the bundled default.
    pub fn remove(&mut self, id_or_path: &str) -> Option<SoundDescriptor> {
        let index = self.sounds.iter().position(|s| s.matches(id_or_path))?;
        let removed = self.sounds.remove(index);
        self.by_path.remove(&removed.path);

        if !removed.is_custom_path && !is_protected_file(&removed) && removed.path.exists() {
            match fs::remove_file(&removed.path) {
                Ok(()) => log::info!("Deleted sound file {}", removed.path.display()),
                Err(e) => log::warn!(
                    "Failed to delete sound file {}: {}",
                    removed.path.display(),
                    e
                ),
            }
        }
        Some(removed)
    }

    /// Finds an entry by id or path.
    ///
    /// When nothing matches but the string names an existing file, a
    /// transient custom-path descriptor is synthesized; it is not added.
    pub fn resolve(&self, id_or_path: &str) -> Option<SoundDescriptor> {
        if let Some(found) = self.sounds.iter().find(|s| s.matches(id_or_path)) {
            return Some(found.clone());
        }
        if id_or_path.is_empty() {
            return None;
        }
        let path = Path::new(id_or_path);
        if !path.is_file() {
            return None;
        }
        SoundDescriptor::from_file(path, SoundId::from(id_or_path), true).ok()
    }

    /// Registers a file outside `sounds/` by reference.
    pub fn add_custom_path(&mut self, path: &Path, allowed: bool) -> bool {
        match self.try_add_custom_path(path, allowed) {
            Ok(descriptor) => {
                log::info!("Added custom sound {}", descriptor.path.display());
                true
            }
            Err(e) => {
                log::warn!("Cannot add custom sound: {}", e);
                false
            }
        }
    }

    fn try_add_custom_path(
        &mut self,
        path: &Path,
        allowed: bool,
    ) -> Result<SoundDescriptor, SoundFileError> {
        if !allowed {
            return Err(SoundFileError::CustomPathsDisabled);
        }
        validate_sound_file(path)?;
        if self.contains_path(path) {
            return Err(SoundFileError::Duplicate(path.to_path_buf()));
        }
        let id = SoundId::from(path.to_string_lossy().as_ref());
        let descriptor =
            SoundDescriptor::from_file(path, id, true).map_err(|source| SoundFileError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        self.add(descriptor.clone());
        Ok(descriptor)
    }

    /// Copies a file into `sounds_dir` and registers the copy.
    pub fn import(&mut self, source: &Path, sounds_dir: &Path) -> Option<SoundDescriptor> {
        match self.try_import(source, sounds_dir) {
            Ok(descriptor) => {
                log::info!(
                    "Imported {} as {}",
                    source.display(),
                    descriptor.path.display()
                );
                Some(descriptor)
            }
            Err(e) => {
                log::warn!("Cannot import sound: {}", e);
                None
            }
        }
    }

    fn try_import(
        &mut self,
        source: &Path,
        sounds_dir: &Path,
    ) -> Result<SoundDescriptor, SoundFileError> {
        validate_sound_file(source)?;
        if self.contains_path(source) {
            return Err(SoundFileError::Duplicate(source.to_path_buf()));
        }
        let target = unique_target(sounds_dir, source);
        fs::copy(source, &target).map_err(|source| SoundFileError::Io {
            path: target.clone(),
            source,
        })?;
        let descriptor = SoundDescriptor::from_file(&target, SoundId::generate(), false)
            .map_err(|source| SoundFileError::Io {
                path: target.clone(),
                source,
            })?;
        self.add(descriptor.clone());
        Ok(descriptor)
    }

    /// Copies the bundled default sound into `sounds_dir` and registers it.
    pub fn ensure_bundled_default(&mut self, resource_dir: &Path, sounds_dir: &Path) -> bool {
        let bundled = resource_dir.join(BUNDLED_SOUND_FILE);
        let target = sounds_dir.join(DEFAULT_SOUND_FILE);
        if self.contains_path(&target) {
            return true;
        }
        if !target.exists() {
            if !bundled.exists() {
                log::warn!("Bundled default sound not found at {}", bundled.display());
                return false;
            }
            if let Err(e) = fs::copy(&bundled, &target) {
                log::error!("Failed to copy default sound: {}", e);
                return false;
            }
        }
        let size = fs::metadata(&target).map(|m| m.len()).unwrap_or(0);
        let added = self.add(SoundDescriptor {
            id: SoundId::default_sound(),
            filename: DEFAULT_SOUND_FILE.to_string(),
            path: target,
            size,
            upload_time: BUNDLED_UPLOAD_TIME.to_string(),
            is_custom_path: false,
        });
        if added {
            log::info!("Default sound registered");
        }
        added
    }

    /// Display name to path, in insertion order, for entries whose file
    /// still exists. Custom-path entries carry a marker prefix.
    pub fn name_to_path_map(&self) -> Vec<(String, PathBuf)> {
        self.sounds
            .iter()
            .filter(|s| !s.filename.is_empty() && s.path.exists())
            .map(|s| {
                let name = if s.is_custom_path {
                    format!("{} {}", CUSTOM_PATH_MARKER, s.filename)
                } else {
                    s.filename.clone()
                };
                (name, s.path.clone())
            })
            .collect()
    }

    /// Path of the first entry whose file still exists.
    pub fn first_available(&self) -> Option<PathBuf> {
        self.name_to_path_map()
            .into_iter()
            .next()
            .map(|(_, path)| path)
    }
}

fn is_protected_file(descriptor: &SoundDescriptor) -> bool {
    let name = descriptor
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    [DEFAULT_SOUND_FILE, BUNDLED_SOUND_FILE]
        .iter()
        .any(|protected| name == *protected || descriptor.filename == *protected)
}

fn unique_target(dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sound".to_string());
    let mut candidate = dir.join(format!("{stem}.mp3"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}_{counter}.mp3"));
        counter += 1;
    }
    candidate
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn now_timestamp() -> String {
    chrono::Local::now().format(UPLOAD_TIME_FORMAT).to_string()
}
