//! Active theme and the preferences read on every play decision.
//!
//! `change_set` is the only way the theme moves. Switching drops every themed
//! sound from the cache so the next play reloads it from the new theme
//! directory; fixed sounds stay.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use boardsound_common::Theme;
use boardsound_kernel::SoundCache;

use crate::bus::{ThemeBus, ThemeEvent};
use crate::platform::AmbientHook;
use crate::settings::SoundSettings;

/// Owner of the active theme.
pub struct ThemeController {
    theme: RwLock<Theme>,
    settings: SoundSettings,
    cache: Arc<SoundCache>,
    bus: Arc<dyn ThemeBus>,
    ambient: Option<Arc<dyn AmbientHook>>,
}

impl std::fmt::Debug for ThemeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeController")
            .field("theme", &*self.theme.read())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ThemeController {
    /// Starts on `initial`.
    #[must_use]
    pub fn new(initial: Theme, settings: SoundSettings, cache: Arc<SoundCache>, bus: Arc<dyn ThemeBus>) -> Self {
        Self {
            theme: RwLock::new(initial),
            settings,
            cache,
            bus,
            ambient: None,
        }
    }

    /// Adds the ambient hook re-triggered after each switch.
    #[must_use]
    pub fn with_ambient(mut self, hook: Arc<dyn AmbientHook>) -> Self {
        self.ambient = Some(hook);
        self
    }

    /// Active theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme.read().clone()
    }

    /// Whether sounds play at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.theme.read().is_silent()
    }

    /// Persisted preferences.
    #[must_use]
    pub const fn settings(&self) -> &SoundSettings {
        &self.settings
    }

    /// Master volume.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.settings.volume()
    }

    /// Whether speech is enabled.
    #[must_use]
    pub fn speech(&self) -> bool {
        self.settings.speech()
    }

    /// Switches to `theme`, evicting themed sounds and broadcasting the
    /// change. Switching to the active theme does nothing. Returns the number
    /// of evicted sounds.
    pub fn change_set(&self, theme: Theme) -> usize {
        let evicted = {
            let mut current = self.theme.write();
            if *current == theme {
                debug!("Theme already '{}'", theme);
                return 0;
            }

            let evicted = self.cache.evict_themed();
            *current = theme.clone();
            evicted
        };

        self.settings.store_theme(&theme);
        info!("Sound theme changed to '{}' ({} sounds evicted)", theme, evicted);

        self.bus.emit(ThemeEvent::ThemeChanged(theme.clone()));
        if let Some(hook) = &self.ambient {
            hook.theme_applied(&theme);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::store::MemoryStore;
    use boardsound_kernel::testing::{FakeContextFactory, FakeFetcher};
    use boardsound_kernel::{AudioContextManager, StaticAssetResolver};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingHook {
        applied: Mutex<Vec<Theme>>,
    }

    impl AmbientHook for RecordingHook {
        fn theme_applied(&self, theme: &Theme) {
            self.applied.lock().push(theme.clone());
        }
    }

    struct Fixture {
        fetcher: Arc<FakeFetcher>,
        cache: Arc<SoundCache>,
        bus: Arc<EventBus>,
        hook: Arc<RecordingHook>,
        themes: ThemeController,
    }

    fn fixture() -> Fixture {
        let contexts = Arc::new(
            AudioContextManager::new(Arc::new(FakeContextFactory::new())).expect("fake factory never fails"),
        );
        let fetcher = Arc::new(FakeFetcher::new());
        let cache = Arc::new(SoundCache::new(
            contexts,
            Arc::clone(&fetcher) as _,
            Arc::new(StaticAssetResolver::new("https://cdn.test/sound")),
        ));
        let bus = Arc::new(EventBus::new());
        let hook = Arc::new(RecordingHook::default());
        let themes = ThemeController::new(
            Theme::standard(),
            SoundSettings::new(Arc::new(MemoryStore::new())),
            Arc::clone(&cache),
            Arc::clone(&bus) as Arc<dyn ThemeBus>,
        )
        .with_ambient(Arc::clone(&hook) as Arc<dyn AmbientHook>);

        Fixture {
            fetcher,
            cache,
            bus,
            hook,
            themes,
        }
    }

    #[tokio::test]
    async fn test_change_set_evicts_themed_only() {
        let fx = fixture();
        let (_, events) = fx.bus.subscribe();
        fx.cache.cache("move", &Theme::standard()).await.expect("load");
        fx.cache
            .load("click", "https://cdn.test/ui/Click", false)
            .await
            .expect("load");

        let evicted = fx.themes.change_set(Theme::new("robot"));

        assert_eq!(evicted, 1);
        assert!(fx.cache.contains("click"));
        assert!(!fx.cache.contains("move"));
        assert_eq!(fx.themes.theme(), Theme::new("robot"));
        assert_eq!(fx.themes.settings().stored_theme(), Some(Theme::new("robot")));
        assert_eq!(events.try_recv().ok(), Some(ThemeEvent::ThemeChanged(Theme::new("robot"))));
        assert_eq!(*fx.hook.applied.lock(), vec![Theme::new("robot")]);

        fx.cache.cache("move", &fx.themes.theme()).await.expect("reload");
        assert_eq!(fx.fetcher.fetch_count("https://cdn.test/sound/robot/Move.mp3"), 1);
    }

    #[tokio::test]
    async fn test_change_set_same_theme_is_noop() {
        let fx = fixture();
        let (_, events) = fx.bus.subscribe();
        fx.cache.cache("move", &Theme::standard()).await.expect("load");

        assert_eq!(fx.themes.change_set(Theme::standard()), 0);

        assert!(fx.cache.contains("move"));
        assert!(events.try_recv().is_err());
        assert!(fx.hook.applied.lock().is_empty());
        assert_eq!(fx.themes.settings().stored_theme(), None);
    }

    #[test]
    fn test_silent_disables() {
        let fx = fixture();
        assert!(fx.themes.is_enabled());
        fx.themes.change_set(Theme::silent());
        assert!(!fx.themes.is_enabled());
    }
}
