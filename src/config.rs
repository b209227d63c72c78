use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    error::{Result, WidgetError},
    reflection::DEFAULT_START_ALPHA,
};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub messages: MessagesConfig,
    pub artwork: ArtworkConfig,
    pub storage: StorageConfig,
    pub preview: PreviewConfig,
    pub demo: DemoConfig,
}

impl Config {
    /// Finds the first config file next to the working directory or the
    /// executable.
    pub fn locate() -> Option<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = env::current_dir() {
            candidates.push(current_dir.join("config.toml"));
            candidates.push(current_dir.join("config").join("config.toml"));
            candidates.push(current_dir.join("config").join("nowplaying-widget.toml"));
        }

        if let Ok(exe) = env::current_exe() {
            if let Some(dir) = exe.parent() {
                candidates.push(dir.join("config.toml"));
                candidates.push(dir.join("config").join("config.toml"));
                candidates.push(dir.join("config").join("nowplaying-widget.toml"));
            }
        }

        candidates.into_iter().find(|path| path.exists())
    }

    pub fn load() -> Result<Self> {
        match Self::locate() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| WidgetError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: ConfigDocument =
            toml::from_str(&data).map_err(|source| WidgetError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(doc.into_config(base))
    }
}

/// Text shown in the artist field when there is nothing to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagesConfig {
    pub storage_busy: String,
    pub storage_missing: String,
    pub empty_playlist: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            storage_busy: "Media storage is busy".to_string(),
            storage_missing: "No media storage".to_string(),
            empty_playlist: "No songs".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkConfig {
    /// Image shown when a track has no artwork. A generated placeholder is
    /// used when unset.
    pub no_art: Option<PathBuf>,
    pub reflection_start_alpha: u8,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            no_art: None,
            reflection_start_alpha: DEFAULT_START_ALPHA,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageConfig {
    pub media_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewConfig {
    pub poll_interval_ms: u64,
    pub watch_config: bool,
    pub use_system_session: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            watch_config: true,
            use_system_session: false,
        }
    }
}

impl PreviewConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.clamp(100, 10_000))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemoConfig {
    pub tracks: Vec<DemoTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoTrack {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub art: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    messages: MessagesSection,
    #[serde(default)]
    artwork: ArtworkSection,
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    preview: PreviewSection,
    #[serde(default)]
    demo: DemoSection,
}

impl ConfigDocument {
    fn into_config(self, base: &Path) -> Config {
        let resolve = |path: PathBuf| {
            if path.is_relative() {
                base.join(path)
            } else {
                path
            }
        };

        let messages_default = MessagesConfig::default();
        let preview_default = PreviewConfig::default();

        Config {
            messages: MessagesConfig {
                storage_busy: self
                    .messages
                    .storage_busy
                    .unwrap_or(messages_default.storage_busy),
                storage_missing: self
                    .messages
                    .storage_missing
                    .unwrap_or(messages_default.storage_missing),
                empty_playlist: self
                    .messages
                    .empty_playlist
                    .unwrap_or(messages_default.empty_playlist),
            },
            artwork: ArtworkConfig {
                no_art: self.artwork.no_art.map(resolve),
                reflection_start_alpha: self
                    .artwork
                    .reflection_start_alpha
                    .unwrap_or(DEFAULT_START_ALPHA),
            },
            storage: StorageConfig {
                media_root: self.storage.media_root.map(resolve),
            },
            preview: PreviewConfig {
                poll_interval_ms: self
                    .preview
                    .poll_interval_ms
                    .unwrap_or(preview_default.poll_interval_ms),
                watch_config: self
                    .preview
                    .watch_config
                    .unwrap_or(preview_default.watch_config),
                use_system_session: self
                    .preview
                    .use_system_session
                    .unwrap_or(preview_default.use_system_session),
            },
            demo: DemoConfig {
                tracks: self
                    .demo
                    .tracks
                    .into_iter()
                    .map(|track| DemoTrack {
                        title: track.title,
                        artist: track.artist.unwrap_or_default(),
                        album: track.album.unwrap_or_default(),
                        duration_ms: track.duration_ms.unwrap_or(180_000),
                        art: track.art.map(resolve),
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct MessagesSection {
    storage_busy: Option<String>,
    storage_missing: Option<String>,
    empty_playlist: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ArtworkSection {
    no_art: Option<PathBuf>,
    reflection_start_alpha: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct StorageSection {
    media_root: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct PreviewSection {
    poll_interval_ms: Option<u64>,
    watch_config: Option<bool>,
    use_system_session: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct DemoSection {
    #[serde(default)]
    tracks: Vec<DemoTrackSection>,
}

#[derive(Debug, Deserialize)]
struct DemoTrackSection {
    title: String,
    artist: Option<String>,
    album: Option<String>,
    duration_ms: Option<u64>,
    art: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Config {
        let doc: ConfigDocument = toml::from_str(text).unwrap();
        doc.into_config(Path::new("/etc/widget"))
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = parse("");
        assert_eq!(config.messages, MessagesConfig::default());
        assert_eq!(config.artwork, ArtworkConfig::default());
        assert_eq!(config.preview, PreviewConfig::default());
        assert!(config.demo.tracks.is_empty());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = parse(
            r#"
            [messages]
            empty_playlist = "Nothing queued"

            [artwork]
            reflection_start_alpha = 128
            "#,
        );
        assert_eq!(config.messages.empty_playlist, "Nothing queued");
        assert_eq!(
            config.messages.storage_busy,
            MessagesConfig::default().storage_busy
        );
        assert_eq!(config.artwork.reflection_start_alpha, 128);
        assert_eq!(config.artwork.no_art, None);
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let config = parse(
            r#"
            [artwork]
            no_art = "art/unknown.png"

            [storage]
            media_root = "/srv/music"

            [[demo.tracks]]
            title = "Intro"
            art = "covers/intro.jpg"
            "#,
        );
        assert_eq!(
            config.artwork.no_art,
            Some(PathBuf::from("/etc/widget/art/unknown.png"))
        );
        assert_eq!(config.storage.media_root, Some(PathBuf::from("/srv/music")));
        let track = &config.demo.tracks[0];
        assert_eq!(track.title, "Intro");
        assert_eq!(track.duration_ms, 180_000);
        assert_eq!(
            track.art,
            Some(PathBuf::from("/etc/widget/covers/intro.jpg"))
        );
    }

    #[test]
    fn poll_interval_is_clamped() {
        let preview = PreviewConfig {
            poll_interval_ms: 5,
            ..PreviewConfig::default()
        };
        assert_eq!(preview.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn load_from_missing_file_fails() {
        let err = Config::load_from(Path::new("/nonexistent/nowplaying-widget.toml"));
        assert!(matches!(err, Err(WidgetError::ConfigRead { .. })));
    }
}
