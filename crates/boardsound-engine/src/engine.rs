//! The sound engine service object.
//!
//! # Architecture
//!
//! ```text
//!   ┌──────────────────────────── SoundEngine ────────────────────────────┐
//!   │                                                                      │
//!   │  ThemeController ◀── SoundSettings ◀── KeyValueStore                 │
//!   │        │    └──────────▶ ThemeBus / AmbientHook                      │
//!   │        ▼                                                             │
//!   │  PlaybackCoordinator ──▶ SoundCache ──▶ AudioContextManager          │
//!   │        ▲     ▲                │               │                      │
//!   │        │     │                ▼               ▼                      │
//!   │  Countdown  SpeechNarrator  AssetFetcher   ContextFactory            │
//!   │  Sequencer       │                                                   │
//!   │                  ▼                                                   │
//!   │             SpeechSynth / Microphone                                 │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Build one engine at startup and share it. Every collaborator has a default
//! suited to a desktop client; hosts replace the ones they provide.

use std::sync::Arc;

use tracing::info;

use boardsound_common::{SoundResult, Theme};
use boardsound_kernel::{
    AssetFetcher, AssetResolver, AudioContextManager, ContextFactory, HttpFetcher, RodioContextFactory, SoundCache,
    StaticAssetResolver,
};

use crate::bus::{EventBus, ThemeBus};
use crate::config::EngineConfig;
use crate::countdown::CountdownSequencer;
use crate::notation::{ChessRoles, RoleLookup};
use crate::platform::{AmbientHook, AutoplayNotice, LoggingNotice, Microphone, Platform, StaticPlatform};
use crate::playback::PlaybackCoordinator;
use crate::settings::SoundSettings;
use crate::speech::{SayOptions, SpeechNarrator, SpeechSynth, TracingSynth};
use crate::store::{KeyValueStore, MemoryStore};
use crate::theme::ThemeController;

/// Builder for [`SoundEngine`].
pub struct SoundEngineBuilder {
    config: EngineConfig,
    store: Arc<dyn KeyValueStore>,
    bus: Arc<dyn ThemeBus>,
    platform: Arc<dyn Platform>,
    notice: Arc<dyn AutoplayNotice>,
    synth: Arc<dyn SpeechSynth>,
    microphone: Option<Arc<dyn Microphone>>,
    roles: Arc<dyn RoleLookup>,
    ambient: Option<Arc<dyn AmbientHook>>,
    fetcher: Arc<dyn AssetFetcher>,
    resolver: Option<Arc<dyn AssetResolver>>,
    contexts: Arc<dyn ContextFactory>,
}

impl SoundEngineBuilder {
    /// Starts from `config` and default collaborators.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let platform = Arc::new(StaticPlatform::new(config.speech_lang.clone()));
        Self {
            config,
            store: Arc::new(MemoryStore::new()),
            bus: Arc::new(EventBus::new()),
            platform,
            notice: Arc::new(LoggingNotice::new()),
            synth: Arc::new(TracingSynth),
            microphone: None,
            roles: Arc::new(ChessRoles),
            ambient: None,
            fetcher: Arc::new(HttpFetcher::new()),
            resolver: None,
            contexts: Arc::new(RodioContextFactory),
        }
    }

    /// Preference storage.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = store;
        self
    }

    /// Theme change bus.
    #[must_use]
    pub fn bus(mut self, bus: Arc<dyn ThemeBus>) -> Self {
        self.bus = bus;
        self
    }

    /// Host platform facts.
    #[must_use]
    pub fn platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = platform;
        self
    }

    /// Autoplay prompt.
    #[must_use]
    pub fn notice(mut self, notice: Arc<dyn AutoplayNotice>) -> Self {
        self.notice = notice;
        self
    }

    /// Text-to-speech.
    #[must_use]
    pub fn synth(mut self, synth: Arc<dyn SpeechSynth>) -> Self {
        self.synth = synth;
        self
    }

    /// Microphone paused while speaking.
    #[must_use]
    pub fn microphone(mut self, microphone: Arc<dyn Microphone>) -> Self {
        self.microphone = Some(microphone);
        self
    }

    /// Piece letter lookup for notation.
    #[must_use]
    pub fn roles(mut self, roles: Arc<dyn RoleLookup>) -> Self {
        self.roles = roles;
        self
    }

    /// Hook re-triggered after theme changes.
    #[must_use]
    pub fn ambient(mut self, hook: Arc<dyn AmbientHook>) -> Self {
        self.ambient = Some(hook);
        self
    }

    /// Asset downloads.
    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Asset URL resolution. Defaults to the configured base URL and version.
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn AssetResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Output contexts.
    #[must_use]
    pub fn contexts(mut self, contexts: Arc<dyn ContextFactory>) -> Self {
        self.contexts = contexts;
        self
    }

    /// Opens the first context and wires every component.
    ///
    /// # Errors
    ///
    /// [`SoundError::ContextUnavailable`](boardsound_common::SoundError::ContextUnavailable)
    /// when no output context can be created.
    pub fn build(self) -> SoundResult<SoundEngine> {
        let mut config = self.config;
        config.validate();

        let resolver: Arc<dyn AssetResolver> = match self.resolver {
            Some(resolver) => resolver,
            None => {
                let resolver = StaticAssetResolver::new(config.asset_base_url.clone());
                Arc::new(match &config.asset_version {
                    Some(version) => resolver.with_version(version.clone()),
                    None => resolver,
                })
            },
        };

        let contexts = Arc::new(AudioContextManager::new(self.contexts)?);
        let cache = Arc::new(SoundCache::new(contexts, self.fetcher, resolver));

        let settings = SoundSettings::new(self.store);
        let initial = settings.stored_theme().unwrap_or_else(|| config.theme.clone());
        let mut themes = ThemeController::new(initial, settings.clone(), Arc::clone(&cache), self.bus);
        if let Some(hook) = self.ambient {
            themes = themes.with_ambient(hook);
        }
        let themes = Arc::new(themes);

        let playback = Arc::new(
            PlaybackCoordinator::new(
                Arc::clone(&themes),
                Arc::clone(&cache),
                self.notice,
                Arc::clone(&self.platform),
            )
            .with_grace(config.autoplay_grace())
            .with_debounce(config.play_once_debounce()),
        );

        let countdown = CountdownSequencer::new(Arc::clone(&playback), Arc::clone(&cache));

        let mut narrator = SpeechNarrator::new(self.synth, settings, self.platform, self.roles, Arc::clone(&playback))
            .with_default_lang(config.speech_lang.clone());
        if let Some(microphone) = self.microphone {
            narrator = narrator.with_microphone(microphone);
        }

        info!("Sound engine ready (theme '{}')", themes.theme());

        Ok(SoundEngine {
            config,
            cache,
            themes,
            playback,
            countdown,
            narrator,
        })
    }
}

/// Board-game sound engine.
pub struct SoundEngine {
    config: EngineConfig,
    cache: Arc<SoundCache>,
    themes: Arc<ThemeController>,
    playback: Arc<PlaybackCoordinator>,
    countdown: CountdownSequencer,
    narrator: SpeechNarrator,
}

impl std::fmt::Debug for SoundEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundEngine")
            .field("themes", &self.themes)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl SoundEngine {
    /// Starts a builder from `config`.
    #[must_use]
    pub fn builder(config: EngineConfig) -> SoundEngineBuilder {
        SoundEngineBuilder::new(config)
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decoded sound cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<SoundCache> {
        &self.cache
    }

    /// Theme controller.
    #[must_use]
    pub fn themes(&self) -> &Arc<ThemeController> {
        &self.themes
    }

    /// Playback coordinator.
    #[must_use]
    pub fn playback(&self) -> &Arc<PlaybackCoordinator> {
        &self.playback
    }

    /// Narrator.
    #[must_use]
    pub const fn narrator(&self) -> &SpeechNarrator {
        &self.narrator
    }

    // ========================================================================
    // Preferences
    // ========================================================================

    /// Active theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.themes.theme()
    }

    /// Whether sounds play at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.themes.is_enabled()
    }

    /// Switches theme. Returns the number of evicted sounds.
    pub fn change_set(&self, theme: impl Into<Theme>) -> usize {
        self.themes.change_set(theme.into())
    }

    /// Master volume.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.themes.volume()
    }

    /// Stores the master volume.
    pub fn set_volume(&self, volume: f32) {
        self.themes.settings().set_volume(volume);
    }

    /// Whether speech is enabled.
    #[must_use]
    pub fn speech(&self) -> bool {
        self.themes.speech()
    }

    /// Stores the speech flag.
    pub fn set_speech(&self, enabled: bool) {
        self.themes.settings().set_speech(enabled);
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Plays `name`. See [`PlaybackCoordinator::play`].
    ///
    /// # Errors
    ///
    /// Fetch, decode, autoplay and context failures.
    pub async fn play(&self, name: &str, volume: f32) -> SoundResult<()> {
        self.playback.play(name, volume).await
    }

    /// Plays `name` once across clients sharing the store.
    ///
    /// # Errors
    ///
    /// As [`play`](Self::play).
    pub async fn play_once(&self, name: &str) -> SoundResult<bool> {
        self.playback.play_once(name).await
    }

    /// Caches the configured board sounds for the active theme.
    pub async fn preload_board_sounds(&self) -> usize {
        self.playback.preload(&self.config.board_sounds).await
    }

    /// Loads a sound from an explicit path, kept across theme switches.
    ///
    /// # Errors
    ///
    /// Fetch and decode failures.
    pub async fn load_fixed(&self, name: &str, path: &str) -> SoundResult<()> {
        self.playback.load_fixed(name, path).await
    }

    /// Resumes audio output. Call from a user gesture handler.
    ///
    /// # Errors
    ///
    /// Context failures.
    pub async fn on_user_gesture(&self) -> SoundResult<()> {
        self.playback.prime().await
    }

    /// Counts down from `count` at the configured interval. Returns whether
    /// the countdown completed.
    pub async fn countdown(&self, count: u32) -> bool {
        self.countdown.run(count, self.config.countdown_interval()).await
    }

    // ========================================================================
    // Speech
    // ========================================================================

    /// Speaks `text`. Returns whether an utterance was queued.
    pub fn say(&self, text: &str, options: SayOptions) -> bool {
        self.narrator.say(text, options)
    }

    /// Speaks a move, or the game-start phrase for `None`.
    pub fn say_san(&self, san: Option<&str>, cut: bool) -> bool {
        self.narrator.say_san(san, cut)
    }

    /// Speaks `text`, or plays `name` when nothing was queued.
    ///
    /// # Errors
    ///
    /// Playback failures of the fallback sound.
    pub async fn say_or_play(&self, name: &str, text: &str) -> SoundResult<()> {
        self.narrator.say_or_play(name, text).await
    }
}
