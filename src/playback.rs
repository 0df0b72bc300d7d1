//! Sound playback module.
//!
//! Key presses only enqueue a path; a fixed pool of worker threads hands
//! each path to the OS audio primitive. When the queue is full the press is
//! dropped so the keyboard hook never waits on audio.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Worker threads used by [`SoundPlayer::system`].
pub const DEFAULT_WORKERS: usize = 4;
/// Pending sounds accepted before presses are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Errors raised while scheduling or playing a sound.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("sound file not found: {0}")]
    NotFound(PathBuf),
    #[error("playback queue is full")]
    QueueFull,
    #[error("playback workers have shut down")]
    Closed,
    #[error("audio player failed: {0}")]
    Failed(String),
}

/// The OS "play this file" primitive. Blocks until playback ends.
pub trait Player: Send + Sync + 'static {
    fn play(&self, path: &Path) -> Result<(), PlaybackError>;
}

/// Plays files through the platform's stock audio facility.
///
/// None of the backends take a gain parameter, so the stored volume is
/// not applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPlayer;

impl Player for SystemPlayer {
    #[cfg(windows)]
    fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        mci::play_file(path)
    }

    #[cfg(not(windows))]
    fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        command::play_file(path)
    }
}

#[cfg(windows)]
mod mci {
    use super::PlaybackError;
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};

    // Link to winmm for the MCI string interface
    #[link(name = "winmm")]
    extern "system" {
        fn mciSendStringW(
            command: *const u16,
            return_string: *mut u16,
            return_length: u32,
            callback: isize,
        ) -> u32;
    }

    static NEXT_ALIAS: AtomicU64 = AtomicU64::new(0);

    /// Opens, plays to the end and closes one file under a unique alias.
    pub fn play_file(path: &Path) -> Result<(), PlaybackError> {
        let alias = format!("keyclack{}", NEXT_ALIAS.fetch_add(1, Ordering::SeqCst));
        send(&format!(
            "open \"{}\" type mpegvideo alias {}",
            path.display(),
            alias
        ))?;
        let result = send(&format!("play {} wait", alias));
        let _ = send(&format!("close {}", alias));
        result
    }

    fn send(command: &str) -> Result<(), PlaybackError> {
        let wide: Vec<u16> = command.encode_utf16().chain(std::iter::once(0)).collect();
        let code = unsafe { mciSendStringW(wide.as_ptr(), std::ptr::null_mut(), 0, 0) };
        if code == 0 {
            Ok(())
        } else {
            Err(PlaybackError::Failed(format!(
                "MCI error {} for `{}`",
                code, command
            )))
        }
    }
}

#[cfg(not(windows))]
mod command {
    use super::PlaybackError;
    use std::path::Path;
    use std::process::{Command, Stdio};

    #[cfg(target_os = "macos")]
    const PLAYER: &str = "afplay";
    #[cfg(not(target_os = "macos"))]
    const PLAYER: &str = "paplay";

    pub fn play_file(path: &Path) -> Result<(), PlaybackError> {
        let status = Command::new(PLAYER)
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| PlaybackError::Failed(format!("{}: {}", PLAYER, e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(PlaybackError::Failed(format!("{} exited with {}", PLAYER, status)))
        }
    }
}

/// Schedules sounds on a bounded worker pool.
pub struct SoundPlayer {
    sender: Option<Sender<PathBuf>>,
    workers: Vec<JoinHandle<()>>,
    // Sounds currently inside the OS primitive
    playing: Arc<AtomicUsize>,
    volume: Mutex<f64>,
    // Files checked by `preload`, with their sizes
    cache: Mutex<HashMap<PathBuf, u64>>,
}

impl SoundPlayer {
    /// Creates a pool of `workers` threads sharing one bounded queue.
    pub fn new(player: Arc<dyn Player>, workers: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded::<PathBuf>(queue_capacity);
        let playing = Arc::new(AtomicUsize::new(0));

        let workers = (0..workers.max(1))
            .filter_map(|index| {
                let receiver = receiver.clone();
                let player = Arc::clone(&player);
                let playing = Arc::clone(&playing);
                thread::Builder::new()
                    .name(format!("playback-{}", index))
                    .spawn(move || worker_loop(receiver, player, playing))
                    .map_err(|e| log::error!("Failed to spawn playback worker: {}", e))
                    .ok()
            })
            .collect();

        log::info!("Sound player initialized");
        Self {
            sender: Some(sender),
            workers,
            playing,
            volume: Mutex::new(0.8),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a pool backed by [`SystemPlayer`] with default sizing.
    pub fn system() -> Self {
        Self::new(
            Arc::new(SystemPlayer),
            DEFAULT_WORKERS,
            DEFAULT_QUEUE_CAPACITY,
        )
    }

    /// Schedules a sound. `true` only means playback was queued.
    pub fn play(&self, path: &Path) -> bool {
        match self.try_play(path) {
            Ok(()) => true,
            Err(PlaybackError::QueueFull) => {
                log::debug!("Playback queue full, dropping {}", path.display());
                false
            }
            Err(e) => {
                log::warn!("Cannot play sound: {}", e);
                false
            }
        }
    }

    fn try_play(&self, path: &Path) -> Result<(), PlaybackError> {
        if !path.is_file() {
            return Err(PlaybackError::NotFound(path.to_path_buf()));
        }
        let sender = self.sender.as_ref().ok_or(PlaybackError::Closed)?;
        sender
            .try_send(path.to_path_buf())
            .map_err(|e| match e {
                TrySendError::Full(_) => PlaybackError::QueueFull,
                TrySendError::Disconnected(_) => PlaybackError::Closed,
            })
    }

    /// Clears the playing status. Sounds already started run to the end.
    pub fn stop(&self) {
        self.playing.store(0, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst) > 0
    }

    /// Sets the volume fraction, clamped to 0.0-1.0.
    pub fn set_volume(&self, volume: f64) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        *self.volume.lock() = volume;
        log::info!("Volume set to {}%", (volume * 100.0).round());
    }

    /// Sets the volume from a 0-100 percentage.
    pub fn set_volume_percent(&self, percent: i64) {
        self.set_volume(percent.clamp(0, 100) as f64 / 100.0);
    }

    pub fn volume(&self) -> f64 {
        *self.volume.lock()
    }

    /// Records a file as ready to play. Returns `false` if it is missing.
    pub fn preload(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {
                self.cache.lock().insert(path.to_path_buf(), meta.len());
                true
            }
            _ => {
                log::warn!("Cannot preload missing sound {}", path.display());
                false
            }
        }
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.lock().len()
    }
}

impl Drop for SoundPlayer {
    fn drop(&mut self) {
        // Closing the queue ends every worker loop
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(receiver: Receiver<PathBuf>, player: Arc<dyn Player>, playing: Arc<AtomicUsize>) {
    for path in receiver.iter() {
        playing.fetch_add(1, Ordering::SeqCst);
        log::trace!("Playing {}", path.display());
        if let Err(e) = player.play(&path) {
            log::error!("Failed to play {}: {}", path.display(), e);
        }
        // `stop` may have reset the count while this sound was playing
        let _ = playing.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Receiver, Sender};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(5);

    struct RecordingPlayer {
        played: Sender<PathBuf>,
    }

    impl Player for RecordingPlayer {
        fn play(&self, path: &Path) -> Result<(), PlaybackError> {
            let _ = self.played.send(path.to_path_buf());
            Ok(())
        }
    }

    struct GatedPlayer {
        started: Sender<PathBuf>,
        release: Receiver<()>,
    }

    impl Player for GatedPlayer {
        fn play(&self, path: &Path) -> Result<(), PlaybackError> {
            let _ = self.started.send(path.to_path_buf());
            let _ = self.release.recv_timeout(WAIT);
            Ok(())
        }
    }

    fn sound_file(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"mp3").unwrap();
        path
    }

    #[test]
    fn missing_file_is_not_scheduled() {
        let (tx, rx) = unbounded();
        let player = SoundPlayer::new(Arc::new(RecordingPlayer { played: tx }), 1, 4);

        assert!(!player.play(Path::new("/definitely/not/here.mp3")));
        drop(player);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn existing_file_reaches_the_primitive() {
        let tmp = TempDir::new().unwrap();
        let path = sound_file(&tmp, "click.mp3");
        let (tx, rx) = unbounded();
        let player = SoundPlayer::new(Arc::new(RecordingPlayer { played: tx }), 2, 4);

        assert!(player.play(&path));
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), path);
    }

    #[test]
    fn full_queue_drops_presses_without_blocking() {
        let tmp = TempDir::new().unwrap();
        let path = sound_file(&tmp, "click.mp3");
        let (started_tx, started_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        let player = SoundPlayer::new(
            Arc::new(GatedPlayer {
                started: started_tx,
                release: release_rx,
            }),
            1,
            1,
        );

        assert!(player.play(&path));
        started_rx.recv_timeout(WAIT).unwrap();
        assert!(player.is_playing());

        assert!(player.play(&path));
        assert!(!player.play(&path));

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        drop(player);
        assert_eq!(started_rx.try_iter().count(), 1);
    }

    #[test]
    fn stop_only_clears_the_flag() {
        let tmp = TempDir::new().unwrap();
        let path = sound_file(&tmp, "click.mp3");
        let (started_tx, started_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        let player = SoundPlayer::new(
            Arc::new(GatedPlayer {
                started: started_tx,
                release: release_rx,
            }),
            1,
            2,
        );

        assert!(player.play(&path));
        started_rx.recv_timeout(WAIT).unwrap();
        player.stop();
        assert!(!player.is_playing());

        release_tx.send(()).unwrap();
    }

    #[test]
    fn overlapping_sounds_keep_the_status_until_all_finish() {
        let tmp = TempDir::new().unwrap();
        let path = sound_file(&tmp, "click.mp3");
        let (started_tx, started_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        let player = SoundPlayer::new(
            Arc::new(GatedPlayer {
                started: started_tx,
                release: release_rx,
            }),
            2,
            2,
        );

        assert!(player.play(&path));
        assert!(player.play(&path));
        started_rx.recv_timeout(WAIT).unwrap();
        started_rx.recv_timeout(WAIT).unwrap();

        release_tx.send(()).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert!(player.is_playing());

        release_tx.send(()).unwrap();
        drop(player);
    }

    #[test]
    fn volume_is_clamped() {
        let (tx, _rx) = unbounded();
        let player = SoundPlayer::new(Arc::new(RecordingPlayer { played: tx }), 1, 1);

        player.set_volume_percent(150);
        assert_eq!(player.volume(), 1.0);
        player.set_volume_percent(40);
        assert!((player.volume() - 0.4).abs() < f64::EPSILON);
        player.set_volume(-1.0);
        assert_eq!(player.volume(), 0.0);
    }

    #[test]
    fn preload_cache() {
        let tmp = TempDir::new().unwrap();
        let path = sound_file(&tmp, "click.mp3");
        let (tx, _rx) = unbounded();
        let player = SoundPlayer::new(Arc::new(RecordingPlayer { played: tx }), 1, 1);

        assert!(player.preload(&path));
        assert!(player.preload(&path));
        assert!(!player.preload(&tmp.path().join("missing.mp3")));
        assert_eq!(player.cache_size(), 1);

        player.clear_cache();
        assert_eq!(player.cache_size(), 0);
    }
}
