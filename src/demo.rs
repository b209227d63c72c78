//! Simulated media service used by the preview when no system player is
//! attached.

use std::{sync::Arc, time::Duration};

use image::RgbaImage;

use crate::{
    actions::{CommandSink, ServiceCommand},
    config::DemoTrack,
    error::Result,
    playback::{ChangeCategory, MediaService, RepeatMode, ShuffleMode},
    resources::load_artwork,
};

/// Tapping "previous" this far into a track restarts it instead.
const RESTART_THRESHOLD_MS: u64 = 3_000;

#[derive(Debug, Clone)]
struct LoadedTrack {
    track: DemoTrack,
    album_id: u64,
    art: Option<Arc<RgbaImage>>,
}

#[derive(Debug, Clone, Default)]
pub struct DemoService {
    tracks: Vec<LoadedTrack>,
    current: Option<usize>,
    position_ms: u64,
    playing: bool,
    shuffle: ShuffleMode,
    repeat: RepeatMode,
}

impl DemoService {
    /// Builds the playlist, loading artwork up front. Artwork that fails to
    /// load is logged and treated as missing.
    pub fn new(tracks: Vec<DemoTrack>) -> Self {
        let mut albums: Vec<String> = Vec::new();
        let tracks: Vec<LoadedTrack> = tracks
            .into_iter()
            .map(|track| {
                let album_id = match albums.iter().position(|a| a == &track.album) {
                    Some(index) => index as u64 + 1,
                    None => {
                        albums.push(track.album.clone());
                        albums.len() as u64
                    }
                };
                let art = track.art.as_deref().and_then(|path| match load_artwork(path) {
                    Ok(image) => Some(Arc::new(image)),
                    Err(err) => {
                        tracing::warn!("{err}");
                        None
                    }
                });
                LoadedTrack {
                    track,
                    album_id,
                    art,
                }
            })
            .collect();

        let current = if tracks.is_empty() { None } else { Some(0) };
        Self {
            tracks,
            current,
            ..Self::default()
        }
    }

    pub fn current_track(&self) -> Option<&DemoTrack> {
        self.current_entry().map(|entry| &entry.track)
    }

    fn current_entry(&self) -> Option<&LoadedTrack> {
        self.current.and_then(|index| self.tracks.get(index))
    }

    /// Advances playback by `elapsed` and reports what changed.
    pub fn tick(&mut self, elapsed: Duration) -> Option<ChangeCategory> {
        if !self.playing {
            return None;
        }
        let duration = self.current_entry()?.track.duration_ms;

        self.position_ms = self
            .position_ms
            .saturating_add(elapsed.as_millis().min(u128::from(u64::MAX)) as u64);
        if self.position_ms < duration {
            return Some(ChangeCategory::ProgressChanged);
        }

        Some(self.complete_track())
    }

    fn complete_track(&mut self) -> ChangeCategory {
        self.position_ms = 0;
        let Some(index) = self.current else {
            self.playing = false;
            return ChangeCategory::PlaybackComplete;
        };

        match self.repeat {
            RepeatMode::Current => ChangeCategory::MetaChanged,
            RepeatMode::All => {
                self.current = Some((index + 1) % self.tracks.len());
                ChangeCategory::MetaChanged
            }
            RepeatMode::Off if index + 1 < self.tracks.len() => {
                self.current = Some(index + 1);
                ChangeCategory::MetaChanged
            }
            RepeatMode::Off => {
                self.playing = false;
                ChangeCategory::PlaybackComplete
            }
        }
    }

    fn skip(&mut self, forward: bool) {
        let Some(index) = self.current else {
            return;
        };
        let len = self.tracks.len();
        if !forward && self.position_ms > RESTART_THRESHOLD_MS {
            self.position_ms = 0;
            return;
        }
        self.current = Some(if forward {
            (index + 1) % len
        } else {
            (index + len - 1) % len
        });
        self.position_ms = 0;
    }
}

impl MediaService for DemoService {
    fn track_name(&self) -> Option<String> {
        self.current_track().map(|t| t.title.clone())
    }

    fn artist_name(&self) -> Option<String> {
        self.current_track().map(|t| t.artist.clone())
    }

    fn album_name(&self) -> Option<String> {
        self.current_track().map(|t| t.album.clone())
    }

    fn audio_id(&self) -> Option<u64> {
        self.current.map(|index| index as u64 + 1)
    }

    fn album_id(&self) -> Option<u64> {
        self.current_entry().map(|entry| entry.album_id)
    }

    fn position(&self) -> u64 {
        self.position_ms
    }

    fn duration(&self) -> u64 {
        self.current_track().map(|t| t.duration_ms).unwrap_or(0)
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn shuffle_mode(&self) -> ShuffleMode {
        self.shuffle
    }

    fn repeat_mode(&self) -> RepeatMode {
        self.repeat
    }

    fn artwork(&self, track_id: Option<u64>, album_id: Option<u64>) -> Option<Arc<RgbaImage>> {
        let by_track = track_id
            .and_then(|id| id.checked_sub(1))
            .and_then(|index| self.tracks.get(index as usize))
            .and_then(|entry| entry.art.clone());
        by_track.or_else(|| {
            let album_id = album_id?;
            self.tracks
                .iter()
                .filter(|entry| entry.album_id == album_id)
                .find_map(|entry| entry.art.clone())
        })
    }
}

impl CommandSink for DemoService {
    fn execute(&mut self, command: ServiceCommand) -> Result<()> {
        match command {
            ServiceCommand::TogglePause => {
                self.playing = !self.playing && self.current.is_some();
            }
            ServiceCommand::Next => self.skip(true),
            ServiceCommand::Previous => self.skip(false),
            ServiceCommand::CycleShuffle => self.shuffle = self.shuffle.cycled(),
            ServiceCommand::CycleRepeat => self.repeat = self.repeat.cycled(),
        }
        tracing::debug!("Demo service executed {}", command.action_name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, album: &str, duration_ms: u64) -> DemoTrack {
        DemoTrack {
            title: title.into(),
            artist: "Band".into(),
            album: album.into(),
            duration_ms,
            art: None,
        }
    }

    fn playlist() -> DemoService {
        DemoService::new(vec![
            track("One", "First", 10_000),
            track("Two", "First", 10_000),
            track("Three", "Second", 10_000),
        ])
    }

    #[test]
    fn empty_playlist_has_no_track() {
        let mut service = DemoService::new(Vec::new());
        assert_eq!(service.track_name(), None);
        assert_eq!(service.duration(), 0);
        service.execute(ServiceCommand::TogglePause).unwrap();
        assert!(!service.is_playing());
    }

    #[test]
    fn albums_get_shared_ids() {
        let mut service = playlist();
        assert_eq!(service.album_id(), Some(1));
        service.execute(ServiceCommand::Next).unwrap();
        assert_eq!(service.album_id(), Some(1));
        service.execute(ServiceCommand::Next).unwrap();
        assert_eq!(service.album_id(), Some(2));
        assert_eq!(service.audio_id(), Some(3));
    }

    #[test]
    fn tick_reports_progress_while_playing() {
        let mut service = playlist();
        assert_eq!(service.tick(Duration::from_secs(1)), None);
        service.execute(ServiceCommand::TogglePause).unwrap();
        assert_eq!(
            service.tick(Duration::from_secs(1)),
            Some(ChangeCategory::ProgressChanged)
        );
        assert_eq!(service.position(), 1_000);
    }

    #[test]
    fn finishing_a_track_moves_on() {
        let mut service = playlist();
        service.execute(ServiceCommand::TogglePause).unwrap();
        assert_eq!(
            service.tick(Duration::from_secs(10)),
            Some(ChangeCategory::MetaChanged)
        );
        assert_eq!(service.track_name().as_deref(), Some("Two"));
        assert_eq!(service.position(), 0);
    }

    #[test]
    fn finishing_the_last_track_stops() {
        let mut service = playlist();
        service.execute(ServiceCommand::Previous).unwrap();
        assert_eq!(service.track_name().as_deref(), Some("Three"));
        service.execute(ServiceCommand::TogglePause).unwrap();
        assert_eq!(
            service.tick(Duration::from_secs(11)),
            Some(ChangeCategory::PlaybackComplete)
        );
        assert!(!service.is_playing());
    }

    #[test]
    fn repeat_current_restarts_track() {
        let mut service = playlist();
        service.execute(ServiceCommand::CycleRepeat).unwrap();
        service.execute(ServiceCommand::CycleRepeat).unwrap();
        assert_eq!(service.repeat_mode(), RepeatMode::Current);
        service.execute(ServiceCommand::TogglePause).unwrap();
        service.tick(Duration::from_secs(10));
        assert_eq!(service.track_name().as_deref(), Some("One"));
        assert!(service.is_playing());
    }

    #[test]
    fn previous_restarts_after_threshold() {
        let mut service = playlist();
        service.execute(ServiceCommand::Next).unwrap();
        service.execute(ServiceCommand::TogglePause).unwrap();
        service.tick(Duration::from_secs(5));
        service.execute(ServiceCommand::Previous).unwrap();
        assert_eq!(service.track_name().as_deref(), Some("Two"));
        assert_eq!(service.position(), 0);
    }

    #[test]
    fn missing_art_files_are_skipped() {
        let mut with_art = track("Cover", "Album", 1_000);
        with_art.art = Some("/nonexistent/cover.png".into());
        let service = DemoService::new(vec![with_art]);
        assert!(service.artwork(Some(1), Some(1)).is_none());
    }
}
