use std::{convert::Infallible, fmt, fs, io, path::Path, str::FromStr, sync::Arc};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShuffleMode {
    #[default]
    None,
    /// Party shuffle: the service keeps appending random tracks.
    Auto,
    On,
}

impl ShuffleMode {
    /// Mode selected by one tap on the shuffle button.
    pub fn cycled(self) -> Self {
        match self {
            ShuffleMode::None => ShuffleMode::On,
            ShuffleMode::On | ShuffleMode::Auto => ShuffleMode::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    #[default]
    Off,
    Current,
    All,
}

impl RepeatMode {
    /// Mode selected by one tap on the repeat button.
    pub fn cycled(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::Current,
            RepeatMode::Current => RepeatMode::Off,
        }
    }
}

/// Availability of the storage the media library lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageState {
    #[default]
    Mounted,
    /// Exported to another device and unavailable locally.
    Shared,
    Unmounted,
    Removed,
    Other,
}

impl StorageState {
    /// Probes a media root directory.
    ///
    /// Without a root the library is assumed to be always available. A
    /// missing root reads as removed, one that exists but cannot be listed
    /// reads as unmounted.
    pub fn probe(media_root: Option<&Path>) -> Self {
        let Some(root) = media_root else {
            return StorageState::Mounted;
        };

        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => match fs::read_dir(root) {
                Ok(_) => StorageState::Mounted,
                Err(err) => {
                    tracing::debug!("Media root {} is not readable: {err}", root.display());
                    StorageState::Unmounted
                }
            },
            Ok(_) => StorageState::Other,
            Err(err) if err.kind() == io::ErrorKind::NotFound => StorageState::Removed,
            Err(err) => {
                tracing::debug!("Failed to probe media root {}: {err}", root.display());
                StorageState::Unmounted
            }
        }
    }
}

/// Read-only view of the background media service.
///
/// Positions and durations are in milliseconds. Track and album ids are
/// `None` when nothing is loaded.
pub trait MediaService {
    fn track_name(&self) -> Option<String>;
    fn artist_name(&self) -> Option<String>;
    fn album_name(&self) -> Option<String>;
    fn audio_id(&self) -> Option<u64>;
    fn album_id(&self) -> Option<u64>;
    fn position(&self) -> u64;
    fn duration(&self) -> u64;
    fn is_playing(&self) -> bool;
    fn shuffle_mode(&self) -> ShuffleMode;
    fn repeat_mode(&self) -> RepeatMode;
    fn artwork(&self, track_id: Option<u64>, album_id: Option<u64>) -> Option<Arc<RgbaImage>>;
}

/// Copy of the service's playback attributes taken for a single update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_id: Option<u64>,
    pub album_id: Option<u64>,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub playing: bool,
    pub shuffle: ShuffleMode,
    pub repeat: RepeatMode,
}

impl PlaybackSnapshot {
    pub fn read<S: MediaService + ?Sized>(service: &S) -> Self {
        Self {
            title: service.track_name(),
            artist: service.artist_name(),
            album: service.album_name(),
            track_id: service.audio_id(),
            album_id: service.album_id(),
            position_ms: service.position(),
            duration_ms: service.duration(),
            playing: service.is_playing(),
            shuffle: service.shuffle_mode(),
            repeat: service.repeat_mode(),
        }
    }

    /// Progress in thousandths of the track, `None` when the duration is
    /// unknown.
    pub fn progress_permille(&self) -> Option<u16> {
        progress_permille(self.position_ms, self.duration_ms)
    }
}

pub fn progress_permille(position_ms: u64, duration_ms: u64) -> Option<u16> {
    if duration_ms == 0 {
        return None;
    }
    let scaled = u128::from(position_ms) * 1000 / u128::from(duration_ms);
    Some(scaled.min(1000) as u16)
}

/// Category tag carried by a change notification from the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeCategory {
    PlaybackComplete,
    MetaChanged,
    RepeatChanged,
    ShuffleChanged,
    PlaystateChanged,
    ProgressChanged,
    Other(String),
}

/// What a notification asks the provider to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    Full,
    ProgressOnly,
    Ignore,
}

impl ChangeCategory {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeCategory::PlaybackComplete => "playbackcomplete",
            ChangeCategory::MetaChanged => "metachanged",
            ChangeCategory::RepeatChanged => "repeatchanged",
            ChangeCategory::ShuffleChanged => "shufflechanged",
            ChangeCategory::PlaystateChanged => "playstatechanged",
            ChangeCategory::ProgressChanged => "progressbarchanged",
            ChangeCategory::Other(tag) => tag,
        }
    }

    pub fn render_path(&self) -> RenderPath {
        match self {
            ChangeCategory::PlaybackComplete
            | ChangeCategory::MetaChanged
            | ChangeCategory::RepeatChanged
            | ChangeCategory::ShuffleChanged
            | ChangeCategory::PlaystateChanged => RenderPath::Full,
            ChangeCategory::ProgressChanged => RenderPath::ProgressOnly,
            ChangeCategory::Other(_) => RenderPath::Ignore,
        }
    }
}

impl FromStr for ChangeCategory {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Services namespace their tags ("org.example.music.metachanged").
        let tag = s.trim().rsplit('.').next().unwrap_or_default();
        let category = match tag.to_ascii_lowercase().as_str() {
            "playbackcomplete" => ChangeCategory::PlaybackComplete,
            "metachanged" => ChangeCategory::MetaChanged,
            "repeatchanged" => ChangeCategory::RepeatChanged,
            "shufflechanged" => ChangeCategory::ShuffleChanged,
            "playstatechanged" => ChangeCategory::PlaystateChanged,
            "progressbarchanged" | "progresschanged" => ChangeCategory::ProgressChanged,
            _ => ChangeCategory::Other(s.to_string()),
        };
        Ok(category)
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_scales_to_permille() {
        assert_eq!(progress_permille(0, 200_000), Some(0));
        assert_eq!(progress_permille(100_000, 200_000), Some(500));
        assert_eq!(progress_permille(1, 3), Some(333));
        assert_eq!(progress_permille(200_000, 200_000), Some(1000));
    }

    #[test]
    fn progress_is_clamped_and_guarded() {
        assert_eq!(progress_permille(500, 400), Some(1000));
        assert_eq!(progress_permille(500, 0), None);
        assert_eq!(progress_permille(u64::MAX, u64::MAX), Some(1000));
    }

    #[test]
    fn categories_parse_with_or_without_namespace() {
        let meta: ChangeCategory = "metachanged".parse().unwrap();
        assert_eq!(meta, ChangeCategory::MetaChanged);
        let namespaced: ChangeCategory = "org.example.music.playstatechanged".parse().unwrap();
        assert_eq!(namespaced, ChangeCategory::PlaystateChanged);
        let progress: ChangeCategory = "progressbarchanged".parse().unwrap();
        assert_eq!(progress.render_path(), RenderPath::ProgressOnly);
        let queue: ChangeCategory = "queuechanged".parse().unwrap();
        assert_eq!(queue, ChangeCategory::Other("queuechanged".into()));
        assert_eq!(queue.render_path(), RenderPath::Ignore);
    }

    #[test]
    fn full_render_categories() {
        for tag in [
            "playbackcomplete",
            "metachanged",
            "repeatchanged",
            "shufflechanged",
            "playstatechanged",
        ] {
            let category: ChangeCategory = tag.parse().unwrap();
            assert_eq!(category.render_path(), RenderPath::Full, "{tag}");
            assert_eq!(category.as_str(), tag);
        }
    }

    #[test]
    fn modes_cycle() {
        assert_eq!(ShuffleMode::None.cycled(), ShuffleMode::On);
        assert_eq!(ShuffleMode::On.cycled(), ShuffleMode::None);
        assert_eq!(ShuffleMode::Auto.cycled(), ShuffleMode::None);
        assert_eq!(RepeatMode::Off.cycled(), RepeatMode::All);
        assert_eq!(RepeatMode::All.cycled(), RepeatMode::Current);
        assert_eq!(RepeatMode::Current.cycled(), RepeatMode::Off);
    }

    #[test]
    fn probe_without_root_is_mounted() {
        assert_eq!(StorageState::probe(None), StorageState::Mounted);
    }

    #[test]
    fn probe_reports_missing_root_as_removed() {
        let root = std::env::temp_dir().join("nowplaying-widget-missing-media-root-7c1f");
        assert_eq!(StorageState::probe(Some(&root)), StorageState::Removed);
    }

    #[test]
    fn probe_reports_existing_root_as_mounted() {
        let root = std::env::temp_dir();
        assert_eq!(StorageState::probe(Some(&root)), StorageState::Mounted);
    }
}
