use std::sync::Arc;

use image::RgbaImage;

use crate::{
    actions::link_buttons,
    config::MessagesConfig,
    playback::{PlaybackSnapshot, RepeatMode, ShuffleMode, StorageState},
    resources::WidgetResources,
    view::{Drawable, ViewId, Visibility, WidgetView},
};

pub const PROGRESS_MAX: u16 = 1000;

/// Reason the widget shows a message instead of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorState {
    StorageBusy,
    StorageMissing,
    EmptyPlaylist,
}

impl ErrorState {
    /// First matching condition wins: storage problems hide the playlist
    /// state entirely.
    pub fn detect(storage: StorageState, snapshot: &PlaybackSnapshot) -> Option<Self> {
        match storage {
            StorageState::Shared | StorageState::Unmounted => Some(ErrorState::StorageBusy),
            StorageState::Removed => Some(ErrorState::StorageMissing),
            StorageState::Mounted | StorageState::Other if snapshot.title.is_none() => {
                Some(ErrorState::EmptyPlaylist)
            }
            StorageState::Mounted | StorageState::Other => None,
        }
    }

    pub fn message(self, messages: &MessagesConfig) -> &str {
        match self {
            ErrorState::StorageBusy => &messages.storage_busy,
            ErrorState::StorageMissing => &messages.storage_missing,
            ErrorState::EmptyPlaylist => &messages.empty_playlist,
        }
    }
}

pub fn play_icon(playing: bool) -> Drawable {
    if playing {
        Drawable::PauseButton
    } else {
        Drawable::PlayButton
    }
}

pub fn shuffle_icon(mode: ShuffleMode) -> Drawable {
    match mode {
        ShuffleMode::None => Drawable::ShuffleOff,
        ShuffleMode::Auto => Drawable::PartyShuffle,
        ShuffleMode::On => Drawable::ShuffleOn,
    }
}

pub fn repeat_icon(mode: RepeatMode) -> Drawable {
    match mode {
        RepeatMode::All => Drawable::RepeatAll,
        RepeatMode::Current => Drawable::RepeatOnce,
        RepeatMode::Off => Drawable::RepeatOff,
    }
}

/// Renders the complete widget for `snapshot`.
///
/// `artwork` is only consulted when a track is shown; a `None` answer falls
/// back to the default image.
pub fn render_full<F>(
    snapshot: &PlaybackSnapshot,
    storage: StorageState,
    resources: &WidgetResources,
    artwork: F,
) -> WidgetView
where
    F: FnOnce(&PlaybackSnapshot) -> Option<Arc<RgbaImage>>,
{
    let mut view = WidgetView::new();

    match ErrorState::detect(storage, snapshot) {
        Some(error) => {
            tracing::debug!("Rendering error state {error:?}");
            view.set_visibility(ViewId::Title, Visibility::Gone);
            view.set_visibility(ViewId::AlbumName, Visibility::Gone);
            view.set_text(ViewId::Artist, error.message(&resources.messages));
            set_fallback_art(&mut view, resources);
        }
        None => {
            view.set_visibility(ViewId::Title, Visibility::Visible);
            view.set_text(ViewId::Title, snapshot.title.clone().unwrap_or_default());
            view.set_text(ViewId::AlbumName, snapshot.album.clone().unwrap_or_default());
            view.set_text(ViewId::Artist, snapshot.artist.clone().unwrap_or_default());
            set_progress(&mut view, snapshot);
            match artwork(snapshot) {
                Some(art) => {
                    let reflection = resources.reflect(&art);
                    view.set_image_bitmap(ViewId::AlbumArt, art);
                    view.set_image_bitmap(ViewId::AlbumArtReflection, reflection);
                }
                None => {
                    tracing::debug!(
                        "No artwork for track {:?} album {:?}",
                        snapshot.track_id,
                        snapshot.album_id
                    );
                    set_fallback_art(&mut view, resources);
                }
            }
        }
    }

    view.set_image_drawable(ViewId::ControlPlay, play_icon(snapshot.playing));
    view.set_image_drawable(ViewId::Shuffle, shuffle_icon(snapshot.shuffle));
    view.set_image_drawable(ViewId::Repeat, repeat_icon(snapshot.repeat));

    link_buttons(&mut view, snapshot.playing);
    view
}

/// Renders only the progress bar, as a partial update.
pub fn render_progress(snapshot: &PlaybackSnapshot) -> WidgetView {
    let mut view = WidgetView::partial();
    set_progress(&mut view, snapshot);
    view
}

/// View shown when widgets are first placed, before the service has
/// answered: empty-playlist message and idle controls.
pub fn render_default(resources: &WidgetResources) -> WidgetView {
    let mut view = WidgetView::new();
    view.set_visibility(ViewId::Title, Visibility::Gone);
    view.set_text(ViewId::Artist, resources.messages.empty_playlist.clone());
    set_fallback_art(&mut view, resources);
    link_buttons(&mut view, false);
    view
}

fn set_fallback_art(view: &mut WidgetView, resources: &WidgetResources) {
    view.set_image_bitmap(ViewId::AlbumArt, resources.no_art());
    view.set_image_bitmap(ViewId::AlbumArtReflection, resources.no_art_reflection());
}

fn set_progress(view: &mut WidgetView, snapshot: &PlaybackSnapshot) {
    match snapshot.progress_permille() {
        Some(value) => view.set_progress(ViewId::Progress, PROGRESS_MAX, value),
        None => tracing::debug!("Skipping progress: track duration is unknown"),
    }
}
