//! Decoded sound cache.
//!
//! Maps a logical sound name to at most one live [`Sound`]. Themed sounds are
//! resolved relative to a theme directory and are dropped when the theme
//! changes; fixed sounds loaded from an explicit path survive theme switches.
//!
//! Two concurrent misses for the same name both fetch and decode; the later
//! insert replaces the earlier entry. The duplicate work is accepted in
//! exchange for never holding a lock across a fetch.

use std::collections::HashMap;
use std::sync::Arc;

use boardsound_common::{capitalize, SoundResult, Theme};
use parking_lot::RwLock;
use tracing::debug;

use crate::fetch::{AssetFetcher, AssetResolver};
use crate::manager::AudioContextManager;
use crate::sound::Sound;

/// File extension appended to every asset path before fetching.
pub const ASSET_EXTENSION: &str = "mp3";

/// Cache of decoded sounds keyed by logical name.
pub struct SoundCache {
    contexts: Arc<AudioContextManager>,
    fetcher: Arc<dyn AssetFetcher>,
    resolver: Arc<dyn AssetResolver>,
    sounds: RwLock<HashMap<String, Arc<Sound>>>,
}

impl std::fmt::Debug for SoundCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundCache")
            .field("sounds", &self.len())
            .field("themed", &self.themed_count())
            .finish_non_exhaustive()
    }
}

impl SoundCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(
        contexts: Arc<AudioContextManager>,
        fetcher: Arc<dyn AssetFetcher>,
        resolver: Arc<dyn AssetResolver>,
    ) -> Self {
        Self {
            contexts,
            fetcher,
            resolver,
            sounds: RwLock::new(HashMap::new()),
        }
    }

    /// The context manager sounds are decoded against.
    #[must_use]
    pub fn contexts(&self) -> &Arc<AudioContextManager> {
        &self.contexts
    }

    /// Asset path of `name` within `theme`: `<base>/<theme>/<CapitalizedName>`.
    #[must_use]
    pub fn theme_path(&self, name: &str, theme: &Theme) -> String {
        self.resolver.resolve(&format!("{}/{}", theme, capitalize(name)))
    }

    /// Fetches `<path>.mp3`, decodes it and stores the result under `name`.
    pub async fn load(&self, name: &str, path: &str, themed: bool) -> SoundResult<Arc<Sound>> {
        let url = format!("{path}.{ASSET_EXTENSION}");
        let encoded = self.fetcher.fetch(&url).await?;

        let context = self.contexts.reconcile()?;
        let buffer = context.decode(encoded).await?;

        let sound = Arc::new(Sound::new(name, buffer, self.contexts.create_gain(), themed));
        self.sounds.write().insert(name.to_string(), Arc::clone(&sound));

        debug!(
            "Loaded sound '{}' from {} ({:.0} ms, themed: {})",
            name,
            url,
            sound.duration().as_secs_f64() * 1000.0,
            themed
        );
        Ok(sound)
    }

    /// Returns the cached sound for `name`, loading it from `theme` on a miss.
    pub async fn cache(&self, name: &str, theme: &Theme) -> SoundResult<Arc<Sound>> {
        if let Some(sound) = self.get(name) {
            return Ok(sound);
        }

        let path = self.theme_path(name, theme);
        self.load(name, &path, true).await
    }

    /// Returns the cached sound for `name` without loading.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Sound>> {
        self.sounds.read().get(name).cloned()
    }

    /// Whether `name` is cached.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.sounds.read().contains_key(name)
    }

    /// Number of cached sounds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sounds.read().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sounds.read().is_empty()
    }

    /// Number of cached themed sounds.
    #[must_use]
    pub fn themed_count(&self) -> usize {
        self.sounds.read().values().filter(|s| s.is_themed()).count()
    }

    /// Removes and disconnects every themed sound. Returns how many were
    /// evicted.
    pub fn evict_themed(&self) -> usize {
        let mut sounds = self.sounds.write();
        let before = sounds.len();

        sounds.retain(|name, sound| {
            if sound.is_themed() {
                sound.detach();
                debug!("Evicted themed sound '{}'", name);
                false
            } else {
                true
            }
        });

        before - sounds.len()
    }
}
