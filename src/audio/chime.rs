//! Wake acknowledgment sounds
//!
//! On wake detection a random sound from the configured directory is played
//! on a detached blocking task so capture and segmentation are not delayed.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;

use super::playback::{AudioPlayback, DecodedAudio, decode_mp3, decode_wav};
use crate::{Error, Result};

/// Plays a random acknowledgment sound from a directory of .wav/.mp3 files
#[derive(Debug, Clone)]
pub struct WakeSounds {
    dir: PathBuf,
}

impl WakeSounds {
    /// Create a player over `dir`
    ///
    /// The directory is scanned lazily at each wake; a missing or empty
    /// directory is a logged warning at play time, never an error.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Play a random sound without blocking the caller
    ///
    /// Spawns a blocking task owning its own output stream; failures are
    /// logged and swallowed.
    pub fn play_random_detached(&self) {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = play_random(&dir) {
                tracing::warn!(dir = %dir.display(), error = %e, "wake sound failed");
            }
        });
    }
}

/// Pick and play one sound from `dir`, blocking until done
fn play_random(dir: &Path) -> Result<()> {
    let candidates = list_sounds(dir)?;

    let Some(path) = candidates.choose(&mut rand::thread_rng()) else {
        tracing::warn!(dir = %dir.display(), "no .wav or .mp3 files in wake sound directory");
        return Ok(());
    };

    let audio = load_sound(path)?;
    let playback = AudioPlayback::new()?;
    playback.play_samples(&audio)
}

/// List .wav/.mp3 files in `dir`
fn list_sounds(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::Audio(format!("wake sound directory {}: {e}", dir.display())))?;

    let mut sounds: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav") || ext.eq_ignore_ascii_case("mp3"))
        })
        .collect();
    sounds.sort();

    Ok(sounds)
}

/// Load and decode a WAV or MP3 file
fn load_sound(path: &Path) -> Result<DecodedAudio> {
    let data = std::fs::read(path)?;

    let is_mp3 = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"));

    if is_mp3 {
        decode_mp3(&data)
    } else {
        decode_wav(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_wav(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..160i16 {
                writer.write_sample(i * 100).unwrap();
            }
            writer.finalize().unwrap();
        }
        std::fs::write(path, cursor.into_inner()).unwrap();
    }

    #[test]
    fn lists_only_audio_files() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("chime.wav"));
        std::fs::write(dir.path().join("notes.txt"), "not audio").unwrap();

        let sounds = list_sounds(dir.path()).unwrap();
        assert_eq!(sounds.len(), 1);
        assert!(sounds[0].ends_with("chime.wav"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(list_sounds(Path::new("/nonexistent/wake_sounds")).is_err());
    }

    #[test]
    fn loads_wav_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chime.wav");
        write_wav(&path);

        let audio = load_sound(&path).unwrap();
        assert_eq!(audio.sample_rate, 16000);
        assert_eq!(audio.samples.len(), 160);
    }
}
