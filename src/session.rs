//! Media service backed by the Windows global media session (SMTC).
//!
//! The session is queried once per [`SystemSession::refresh`]; the
//! [`MediaService`] getters serve that cached copy.

use std::{
    collections::hash_map::DefaultHasher,
    future::IntoFuture,
    hash::{Hash, Hasher},
    sync::Arc,
};

use futures::executor::block_on;
use image::RgbaImage;
use windows::{
    core::Result as WinResult,
    Foundation::TimeSpan,
    Media::{
        Control::{
            GlobalSystemMediaTransportControlsSession,
            GlobalSystemMediaTransportControlsSessionManager,
            GlobalSystemMediaTransportControlsSessionMediaProperties,
            GlobalSystemMediaTransportControlsSessionPlaybackStatus,
        },
        MediaPlaybackAutoRepeatMode,
    },
    Storage::Streams::{
        DataReader, IRandomAccessStreamReference, IRandomAccessStreamWithContentType,
        InputStreamOptions,
    },
};

use crate::{
    actions::{CommandSink, ServiceCommand},
    error::{Result, WidgetError},
    playback::{ChangeCategory, MediaService, PlaybackSnapshot, RepeatMode, ShuffleMode},
    resources::ArtworkCache,
};

const TICKS_PER_MILLISECOND: i64 = 10_000;

fn block_on_operation<O, T>(operation: O) -> WinResult<T>
where
    O: IntoFuture<Output = WinResult<T>>,
{
    block_on(operation.into_future())
}

fn time_span_to_millis(span: TimeSpan) -> u64 {
    (span.Duration / TICKS_PER_MILLISECOND).max(0) as u64
}

fn hash_id(parts: &[&str]) -> Option<u64> {
    if parts.iter().all(|part| part.is_empty()) {
        return None;
    }
    let mut hasher = DefaultHasher::new();
    parts.hash(&mut hasher);
    Some(hasher.finish())
}

fn session_error(err: windows::core::Error) -> WidgetError {
    WidgetError::MediaSession(format!("{err:?}"))
}

fn current_session() -> WinResult<GlobalSystemMediaTransportControlsSession> {
    let manager =
        block_on_operation(GlobalSystemMediaTransportControlsSessionManager::RequestAsync()?)?;
    manager.GetCurrentSession()
}

fn load_thumbnail_bytes(
    props: &GlobalSystemMediaTransportControlsSessionMediaProperties,
) -> WinResult<Option<Vec<u8>>> {
    let reference: IRandomAccessStreamReference = match props.Thumbnail() {
        Ok(reference) => reference,
        Err(_) => return Ok(None),
    };

    let stream: IRandomAccessStreamWithContentType =
        block_on_operation(reference.OpenReadAsync()?)?;
    let input_stream = stream.GetInputStreamAt(0)?;
    let reader = DataReader::CreateDataReader(&input_stream)?;
    reader.SetInputStreamOptions(InputStreamOptions::Partial)?;

    let mut buffer = Vec::new();
    const CHUNK: u32 = 64 * 1024;

    loop {
        let loaded = block_on_operation(reader.LoadAsync(CHUNK)?)?;
        if loaded == 0 {
            break;
        }
        let mut chunk = vec![0u8; loaded as usize];
        reader.ReadBytes(&mut chunk)?;
        buffer.extend_from_slice(&chunk);
        if loaded < CHUNK {
            break;
        }
    }

    Ok(Some(buffer))
}

#[derive(Debug, Default)]
pub struct SystemSession {
    snapshot: PlaybackSnapshot,
    art: ArtworkCache,
}

impl SystemSession {
    pub fn connect() -> Result<Self> {
        let mut session = Self::default();
        session.refresh()?;
        Ok(session)
    }

    /// Re-reads the current media session and reports the most significant
    /// change since the previous read.
    pub fn refresh(&mut self) -> Result<Option<ChangeCategory>> {
        let (snapshot, art) = match current_session() {
            Ok(session) => fetch_snapshot(&session).map_err(session_error)?,
            Err(err) => {
                tracing::debug!("No active media session: {err:?}");
                (PlaybackSnapshot::default(), None)
            }
        };

        let previous = std::mem::replace(&mut self.snapshot, snapshot);
        let current = &self.snapshot;
        let track_changed = previous.track_id != current.track_id;
        // Thumbnails may arrive a poll after the metadata or be replaced
        // while the same track plays.
        let art_changed = self.art.update(art.as_deref());
        let change = if track_changed || art_changed {
            Some(ChangeCategory::MetaChanged)
        } else if previous.playing != current.playing {
            Some(ChangeCategory::PlaystateChanged)
        } else if previous.shuffle != current.shuffle {
            Some(ChangeCategory::ShuffleChanged)
        } else if previous.repeat != current.repeat {
            Some(ChangeCategory::RepeatChanged)
        } else if previous.position_ms != current.position_ms {
            Some(ChangeCategory::ProgressChanged)
        } else {
            None
        };
        Ok(change)
    }
}

fn fetch_snapshot(
    session: &GlobalSystemMediaTransportControlsSession,
) -> WinResult<(PlaybackSnapshot, Option<Vec<u8>>)> {
    let props = block_on_operation(session.TryGetMediaPropertiesAsync()?)?;
    let playback_info = session.GetPlaybackInfo()?;
    let playing = playback_info.PlaybackStatus()?
        == GlobalSystemMediaTransportControlsSessionPlaybackStatus::Playing;

    let shuffle = match playback_info.IsShuffleActive().and_then(|r| r.Value()) {
        Ok(true) => ShuffleMode::On,
        _ => ShuffleMode::None,
    };
    let repeat = match playback_info.AutoRepeatMode().and_then(|r| r.Value()) {
        Ok(MediaPlaybackAutoRepeatMode::Track) => RepeatMode::Current,
        Ok(MediaPlaybackAutoRepeatMode::List) => RepeatMode::All,
        _ => RepeatMode::Off,
    };

    let title = props.Title()?.to_string_lossy();
    let artist = props.Artist()?.to_string_lossy();
    let album = props.AlbumTitle()?.to_string_lossy();

    let timeline = session.GetTimelineProperties()?;
    let start_ms = time_span_to_millis(timeline.StartTime()?);
    let end_ms = time_span_to_millis(timeline.EndTime()?);
    let position_ms = time_span_to_millis(timeline.Position()?);

    let art = load_thumbnail_bytes(&props)?;

    let snapshot = PlaybackSnapshot {
        track_id: hash_id(&[title.as_str(), artist.as_str(), album.as_str()]),
        album_id: hash_id(&[album.as_str(), artist.as_str()]),
        title: (!title.is_empty()).then_some(title),
        artist: (!artist.is_empty()).then_some(artist),
        album: (!album.is_empty()).then_some(album),
        position_ms: position_ms.saturating_sub(start_ms),
        duration_ms: end_ms.saturating_sub(start_ms),
        playing,
        shuffle,
        repeat,
    };
    Ok((snapshot, art))
}

impl MediaService for SystemSession {
    fn track_name(&self) -> Option<String> {
        self.snapshot.title.clone()
    }

    fn artist_name(&self) -> Option<String> {
        self.snapshot.artist.clone()
    }

    fn album_name(&self) -> Option<String> {
        self.snapshot.album.clone()
    }

    fn audio_id(&self) -> Option<u64> {
        self.snapshot.track_id
    }

    fn album_id(&self) -> Option<u64> {
        self.snapshot.album_id
    }

    fn position(&self) -> u64 {
        self.snapshot.position_ms
    }

    fn duration(&self) -> u64 {
        self.snapshot.duration_ms
    }

    fn is_playing(&self) -> bool {
        self.snapshot.playing
    }

    fn shuffle_mode(&self) -> ShuffleMode {
        self.snapshot.shuffle
    }

    fn repeat_mode(&self) -> RepeatMode {
        self.snapshot.repeat
    }

    fn artwork(&self, track_id: Option<u64>, _album_id: Option<u64>) -> Option<Arc<RgbaImage>> {
        if track_id.is_some() && track_id == self.snapshot.track_id {
            self.art.image()
        } else {
            None
        }
    }
}

impl CommandSink for SystemSession {
    fn execute(&mut self, command: ServiceCommand) -> Result<()> {
        let session = current_session().map_err(session_error)?;
        let accepted = match command {
            ServiceCommand::TogglePause => {
                block_on_operation(session.TryTogglePlayPauseAsync().map_err(session_error)?)
            }
            ServiceCommand::Next => {
                block_on_operation(session.TrySkipNextAsync().map_err(session_error)?)
            }
            ServiceCommand::Previous => {
                block_on_operation(session.TrySkipPreviousAsync().map_err(session_error)?)
            }
            ServiceCommand::CycleShuffle => {
                let active = self.snapshot.shuffle.cycled() != ShuffleMode::None;
                block_on_operation(
                    session
                        .TryChangeShuffleActiveAsync(active)
                        .map_err(session_error)?,
                )
            }
            ServiceCommand::CycleRepeat => {
                let mode = match self.snapshot.repeat.cycled() {
                    RepeatMode::Off => MediaPlaybackAutoRepeatMode::None,
                    RepeatMode::Current => MediaPlaybackAutoRepeatMode::Track,
                    RepeatMode::All => MediaPlaybackAutoRepeatMode::List,
                };
                block_on_operation(
                    session
                        .TryChangeAutoRepeatModeAsync(mode)
                        .map_err(session_error)?,
                )
            }
        }
        .map_err(session_error)?;

        if !accepted {
            return Err(WidgetError::CommandRejected(command.action_name()));
        }
        self.refresh()?;
        Ok(())
    }
}
