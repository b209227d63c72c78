use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    path::Path,
    sync::Arc,
};

use image::{Rgba, RgbaImage};

use crate::{
    config::{Config, MessagesConfig},
    error::{Result, WidgetError},
    reflection::{render_reflection, ReflectionOptions},
};

const PLACEHOLDER_SIZE: u32 = 256;

/// Strings and images the renderer needs on every update.
///
/// The default artwork and its reflection are decoded once and shared by
/// every view that falls back to them.
#[derive(Debug, Clone)]
pub struct WidgetResources {
    pub messages: MessagesConfig,
    pub reflection: ReflectionOptions,
    no_art: Arc<RgbaImage>,
    no_art_reflection: Arc<RgbaImage>,
}

impl Default for WidgetResources {
    fn default() -> Self {
        Self::new(
            MessagesConfig::default(),
            ReflectionOptions::default(),
            placeholder_art(PLACEHOLDER_SIZE),
        )
    }
}

impl WidgetResources {
    pub fn new(messages: MessagesConfig, reflection: ReflectionOptions, no_art: RgbaImage) -> Self {
        let no_art_reflection = Arc::new(render_reflection(&no_art, &reflection));
        Self {
            messages,
            reflection,
            no_art: Arc::new(no_art),
            no_art_reflection,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let no_art = match &config.artwork.no_art {
            Some(path) => load_artwork(path)?,
            None => placeholder_art(PLACEHOLDER_SIZE),
        };
        Ok(Self::new(
            config.messages.clone(),
            ReflectionOptions::from_config(&config.artwork),
            no_art,
        ))
    }

    pub fn no_art(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.no_art)
    }

    pub fn no_art_reflection(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.no_art_reflection)
    }

    pub fn reflect(&self, art: &RgbaImage) -> Arc<RgbaImage> {
        Arc::new(render_reflection(art, &self.reflection))
    }
}

pub fn load_artwork(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path).map_err(|source| WidgetError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}

pub fn decode_artwork(bytes: &[u8]) -> Result<RgbaImage> {
    let image = image::load_from_memory(bytes).map_err(WidgetError::ArtworkDecode)?;
    Ok(image.to_rgba8())
}

fn hash_bytes(data: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

/// Last artwork received as encoded bytes, decoded once per distinct
/// payload.
#[derive(Debug, Clone, Default)]
pub struct ArtworkCache {
    hash: Option<u64>,
    image: Option<Arc<RgbaImage>>,
}

impl ArtworkCache {
    /// Records the latest bytes and returns whether the artwork changed.
    /// Bytes that fail to decode leave the cache without an image.
    pub fn update(&mut self, bytes: Option<&[u8]>) -> bool {
        let hash = bytes.map(hash_bytes);
        if hash == self.hash {
            return false;
        }
        self.hash = hash;
        self.image = bytes.and_then(|bytes| match decode_artwork(bytes) {
            Ok(image) => Some(Arc::new(image)),
            Err(err) => {
                tracing::warn!("{err}");
                None
            }
        });
        true
    }

    pub fn image(&self) -> Option<Arc<RgbaImage>> {
        self.image.clone()
    }
}

/// Dark square with a lighter disc, shown when no artwork is available.
pub fn placeholder_art(size: u32) -> RgbaImage {
    let center = size as f32 / 2.0;
    let disc = center * 0.72;
    let label = center * 0.24;
    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - center;
        let dy = y as f32 + 0.5 - center;
        let r = (dx * dx + dy * dy).sqrt();
        if r <= label {
            Rgba([150, 150, 150, 255])
        } else if r <= disc {
            Rgba([72, 72, 72, 255])
        } else {
            Rgba([40, 40, 40, 255])
        }
    })
}
