use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the widget's configuration and resources.
///
/// Rendering itself never fails: storage and playlist problems are shown to
/// the user as text in the widget instead.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to decode artwork bytes: {0}")]
    ArtworkDecode(#[source] image::ImageError),

    #[error("{0} command was rejected by the media session")]
    CommandRejected(&'static str),

    #[error("Media session error: {0}")]
    MediaSession(String),
}

pub type Result<T> = std::result::Result<T, WidgetError>;
