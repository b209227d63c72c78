//! Now-playing home-screen widget.
//!
//! The crate projects the playback state of a media service onto a remote
//! view descriptor that a host shell applies to every placed widget
//! instance, and binds the widget's buttons to deferred actions that the
//! host routes back to the service.
//!
//! Nothing here keeps global state: a [`WidgetProvider`] is built by the
//! caller and handed to every entry point that needs it.

pub mod actions;
pub mod config;
pub mod demo;
pub mod error;
pub mod host;
pub mod playback;
pub mod provider;
pub mod reflection;
pub mod render;
pub mod resources;
#[cfg(windows)]
pub mod session;
pub mod view;

pub use actions::{CommandSink, PendingAction, Screen, ServiceCommand};
pub use config::Config;
pub use error::{Result, WidgetError};
pub use host::{InMemoryHost, InstanceId, WidgetHost, WidgetKind};
pub use playback::{
    ChangeCategory, MediaService, PlaybackSnapshot, RepeatMode, ShuffleMode, StorageState,
};
pub use provider::{UpdateRequest, WidgetProvider};
pub use resources::{ArtworkCache, WidgetResources};
pub use view::{Drawable, UpdateMode, ViewId, Visibility, WidgetState, WidgetView};
