//! Play policy and emission.
//!
//! ```text
//!   play(name, volume)
//!        │
//!        ▼
//!   ┌──────────┐  silent          ┌────────┐
//!   │  decide  │ ───────────────▶ │ Ok(()) │
//!   └────┬─────┘  music/speech +  └────────┘
//!        │        board event          ▲
//!        ▼                             │
//!   SoundCache::cache ──▶ grace window ──▶ Sound::play
//!                            │ timeout
//!                            ▼
//!                   notice + AutoplayBlocked
//! ```
//!
//! The grace window bounds how long a play waits for a suspended context. The
//! resume itself runs on its own task and is never aborted, so a gesture that
//! arrives late still leaves the context running for the next play.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use boardsound_common::{is_board_event, SoundError, SoundResult, Theme};
use boardsound_kernel::{AudioContext, SoundCache};

use crate::platform::{AutoplayNotice, Platform};
use crate::theme::ThemeController;

/// Default wait for a suspended context.
pub const DEFAULT_AUTOPLAY_GRACE: Duration = Duration::from_millis(400);

/// Default window in which `play_once` suppresses repeats.
pub const DEFAULT_PLAY_ONCE_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Smallest delay an unfocused client waits before `play_once`.
const UNFOCUSED_DELAY_MIN_MS: u64 = 10;

/// Spread of the random delay added on top of the minimum.
const UNFOCUSED_DELAY_SPREAD_MS: u64 = 500;

/// Outcome of the play policy for one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayDecision {
    /// Sounds are disabled.
    Silent,
    /// Board event muted by music mode or speech.
    Suppressed,
    /// Play from this theme.
    Play(Theme),
}

/// Decides whether and how a named sound plays, then plays it.
pub struct PlaybackCoordinator {
    themes: Arc<ThemeController>,
    cache: Arc<SoundCache>,
    notice: Arc<dyn AutoplayNotice>,
    platform: Arc<dyn Platform>,
    grace: Duration,
    debounce: Duration,
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("grace", &self.grace)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

impl PlaybackCoordinator {
    /// Creates a coordinator with the default grace and debounce windows.
    #[must_use]
    pub fn new(
        themes: Arc<ThemeController>,
        cache: Arc<SoundCache>,
        notice: Arc<dyn AutoplayNotice>,
        platform: Arc<dyn Platform>,
    ) -> Self {
        Self {
            themes,
            cache,
            notice,
            platform,
            grace: DEFAULT_AUTOPLAY_GRACE,
            debounce: DEFAULT_PLAY_ONCE_DEBOUNCE,
        }
    }

    /// Sets the autoplay grace window.
    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Sets the `play_once` debounce window.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Theme controller consulted on every decision.
    #[must_use]
    pub fn themes(&self) -> &Arc<ThemeController> {
        &self.themes
    }

    /// Whether sounds play at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.themes.is_enabled()
    }

    /// Applies the play policy to `name` under the current theme and
    /// preferences.
    #[must_use]
    pub fn decide(&self, name: &str) -> PlayDecision {
        let theme = self.themes.theme();
        if theme.is_silent() {
            return PlayDecision::Silent;
        }

        if theme.is_music() || self.themes.speech() {
            if is_board_event(name) {
                return PlayDecision::Suppressed;
            }
            return PlayDecision::Play(Theme::standard());
        }

        PlayDecision::Play(theme)
    }

    /// Theme `name` would be loaded from, or `None` when it would not play.
    #[must_use]
    pub fn effective_theme(&self, name: &str) -> Option<Theme> {
        match self.decide(name) {
            PlayDecision::Play(theme) => Some(theme),
            PlayDecision::Silent | PlayDecision::Suppressed => None,
        }
    }

    /// Plays `name` at `volume` times the master volume.
    ///
    /// Completes when the clip ends, or at once when policy mutes it.
    ///
    /// # Errors
    ///
    /// Fetch and decode failures, [`SoundError::AutoplayBlocked`] when the
    /// context stays suspended past the grace window, and context failures.
    pub async fn play(&self, name: &str, volume: f32) -> SoundResult<()> {
        let theme = match self.decide(name) {
            PlayDecision::Play(theme) => theme,
            decision => {
                debug!("Not playing '{}': {:?}", name, decision);
                return Ok(());
            },
        };

        let sound = self.cache.cache(name, &theme).await?;
        let context = self.running_context().await?;

        let level = self.themes.volume() * volume;
        sound.play(context.as_ref(), level).await
    }

    /// Returns a running context, waiting at most the grace window for a
    /// suspended one to resume.
    ///
    /// # Errors
    ///
    /// [`SoundError::AutoplayBlocked`] on timeout; context failures otherwise.
    pub async fn running_context(&self) -> SoundResult<Arc<dyn AudioContext>> {
        let contexts = Arc::clone(self.cache.contexts());
        let context = contexts.reconcile()?;
        if context.state().is_running() {
            self.notice.hide();
            return Ok(context);
        }

        let resume = tokio::spawn(async move { contexts.ensure_running().await });
        match tokio::time::timeout(self.grace, resume).await {
            Ok(Ok(result)) => {
                let context = result?;
                self.notice.hide();
                Ok(context)
            },
            Ok(Err(e)) => Err(SoundError::ContextUnavailable(format!("resume task failed: {e}"))),
            Err(_) => {
                let grace_ms = u64::try_from(self.grace.as_millis()).unwrap_or(u64::MAX);
                warn!("Audio context still suspended after {} ms", grace_ms);
                self.notice.show();
                Err(SoundError::AutoplayBlocked { grace_ms })
            },
        }
    }

    /// Plays `name` unless any client sharing the store played a `play_once`
    /// sound within the debounce window. Returns whether it played.
    ///
    /// An unfocused client first waits a short random delay so that the
    /// focused one usually wins.
    ///
    /// # Errors
    ///
    /// As [`play`](Self::play).
    pub async fn play_once(&self, name: &str) -> SoundResult<bool> {
        if !self.platform.has_focus() {
            let delay = UNFOCUSED_DELAY_MIN_MS + fastrand::u64(0..UNFOCUSED_DELAY_SPREAD_MS);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let settings = self.themes.settings();
        let now = unix_millis();
        let window = u64::try_from(self.debounce.as_millis()).unwrap_or(u64::MAX);
        if let Some(last) = settings.last_played() {
            if now.saturating_sub(last) < window {
                debug!("Skipping '{}': played {} ms ago", name, now.saturating_sub(last));
                return Ok(false);
            }
        }

        settings.mark_played(now);
        self.play(name, 1.0).await?;
        Ok(true)
    }

    /// Caches every name in `names` that would currently play. Failures are
    /// logged. Returns how many are cached afterwards.
    pub async fn preload(&self, names: &[String]) -> usize {
        let mut loaded = 0;
        for name in names {
            let Some(theme) = self.effective_theme(name) else {
                continue;
            };
            match self.cache.cache(name, &theme).await {
                Ok(_) => loaded += 1,
                Err(e) => warn!("Failed to preload '{}': {}", name, e),
            }
        }
        debug!("Preloaded {}/{} sounds", loaded, names.len());
        loaded
    }

    /// Loads a sound from an explicit path, outside any theme.
    ///
    /// # Errors
    ///
    /// Fetch and decode failures.
    pub async fn load_fixed(&self, name: &str, path: &str) -> SoundResult<()> {
        self.cache.load(name, path, false).await.map(|_| ())
    }

    /// Resumes the context. Call from a user gesture.
    ///
    /// # Errors
    ///
    /// Context failures.
    pub async fn prime(&self) -> SoundResult<()> {
        self.cache.contexts().ensure_running().await?;
        self.notice.hide();
        Ok(())
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::platform::{LoggingNotice, StaticPlatform};
    use crate::settings::SoundSettings;
    use crate::store::{KeyValueStore, MemoryStore};
    use boardsound_kernel::testing::{FakeContextFactory, FakeFetcher, ResumeBehavior};
    use boardsound_kernel::{AudioContextManager, ContextState, StaticAssetResolver};

    struct Fixture {
        factory: Arc<FakeContextFactory>,
        fetcher: Arc<FakeFetcher>,
        cache: Arc<SoundCache>,
        notice: Arc<LoggingNotice>,
        platform: Arc<StaticPlatform>,
        playback: PlaybackCoordinator,
    }

    fn fixture_with(factory: FakeContextFactory, store: Arc<dyn KeyValueStore>) -> Fixture {
        let factory = Arc::new(factory);
        let contexts = Arc::new(AudioContextManager::new(Arc::clone(&factory) as _).expect("fake factory never fails"));
        let fetcher = Arc::new(FakeFetcher::new());
        let cache = Arc::new(SoundCache::new(
            contexts,
            Arc::clone(&fetcher) as _,
            Arc::new(StaticAssetResolver::new("https://cdn.test/sound")),
        ));
        let themes = Arc::new(ThemeController::new(
            Theme::standard(),
            SoundSettings::new(store),
            Arc::clone(&cache),
            Arc::new(EventBus::new()),
        ));
        let notice = Arc::new(LoggingNotice::new());
        let platform = Arc::new(StaticPlatform::default());
        let playback = PlaybackCoordinator::new(
            themes,
            Arc::clone(&cache),
            Arc::clone(&notice) as _,
            Arc::clone(&platform) as _,
        );
        Fixture {
            factory,
            fetcher,
            cache,
            notice,
            platform,
            playback,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(FakeContextFactory::new(), Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_decide_standard() {
        let fx = fixture();
        assert_eq!(fx.playback.decide("move"), PlayDecision::Play(Theme::standard()));
        fx.playback.themes().change_set(Theme::new("robot"));
        assert_eq!(fx.playback.decide("capture"), PlayDecision::Play(Theme::new("robot")));
    }

    #[test]
    fn test_decide_music_mode() {
        let fx = fixture();
        fx.playback.themes().change_set(Theme::music());

        assert_eq!(fx.playback.decide("move"), PlayDecision::Suppressed);
        assert_eq!(fx.playback.decide("check"), PlayDecision::Suppressed);
        assert_eq!(fx.playback.decide("genericNotify"), PlayDecision::Play(Theme::standard()));
    }

    #[test]
    fn test_decide_speech_mode() {
        let fx = fixture();
        fx.playback.themes().change_set(Theme::new("robot"));
        fx.playback.themes().settings().set_speech(true);

        assert_eq!(fx.playback.decide("capture"), PlayDecision::Suppressed);
        assert_eq!(fx.playback.effective_theme("countDown3"), Some(Theme::standard()));
    }

    #[tokio::test]
    async fn test_silent_plays_nothing() {
        let fx = fixture();
        fx.playback.themes().change_set(Theme::silent());

        fx.playback.play("genericNotify", 1.0).await.expect("silent play resolves");

        assert_eq!(fx.fetcher.total_fetches(), 0);
        assert!(fx.factory.plays().is_empty());
    }

    #[tokio::test]
    async fn test_music_mode_suppresses_board_events() {
        let fx = fixture();
        fx.playback.themes().change_set(Theme::music());

        fx.playback.play("move", 1.0).await.expect("suppressed");
        fx.playback.play("genericNotify", 1.0).await.expect("play");

        assert_eq!(
            fx.factory.play_labels(),
            vec!["https://cdn.test/sound/standard/GenericNotify.mp3"]
        );
    }

    #[tokio::test]
    async fn test_play_scales_by_master_volume() {
        let fx = fixture();
        fx.playback.themes().settings().set_volume(0.5);

        fx.playback.play("move", 0.5).await.expect("play");

        let plays = fx.factory.plays();
        assert_eq!(plays.len(), 1);
        assert!((plays[0].gain - 0.25).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_fetch_failure_rejects() {
        let fx = fixture();
        fx.fetcher.fail_with_status("https://cdn.test/sound/standard/Move.mp3", 404);

        let err = fx.playback.play("move", 1.0).await.expect_err("404");
        assert!(err.is_fetch());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autoplay_blocked_after_grace() {
        let fx = fixture_with(
            FakeContextFactory::new()
                .with_initial_state(ContextState::Suspended)
                .with_resume(ResumeBehavior::Never),
            Arc::new(MemoryStore::new()),
        );

        let started = tokio::time::Instant::now();
        let err = fx.playback.play("move", 1.0).await.expect_err("blocked");

        assert!(matches!(err, SoundError::AutoplayBlocked { grace_ms: 400 }));
        assert!(started.elapsed() >= DEFAULT_AUTOPLAY_GRACE);
        assert!(fx.notice.is_shown());
        assert!(fx.factory.plays().is_empty());
    }

    #[tokio::test]
    async fn test_suspended_context_resumes_and_hides_notice() {
        let fx = fixture_with(
            FakeContextFactory::new().with_initial_state(ContextState::Suspended),
            Arc::new(MemoryStore::new()),
        );
        fx.notice.show();

        fx.playback.play("check", 1.0).await.expect("play");

        assert!(!fx.notice.is_shown());
        assert_eq!(fx.factory.plays().len(), 1);
        let context = fx.factory.latest().expect("context");
        assert_eq!(context.resume_calls(), 1);
    }

    #[tokio::test]
    async fn test_play_replaces_closed_context() {
        let fx = fixture();
        fx.playback.play("move", 1.0).await.expect("play");
        fx.factory.latest().expect("context").set_state(ContextState::Closed);

        fx.playback.play("move", 1.0).await.expect("play again");

        let plays = fx.factory.plays();
        assert_eq!(fx.factory.created_count(), 2);
        assert_ne!(plays[0].context, plays[1].context);
        assert_eq!(fx.fetcher.total_fetches(), 1);
    }

    #[tokio::test]
    async fn test_play_once_across_clients() {
        let shared: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let first = fixture_with(FakeContextFactory::new(), Arc::clone(&shared));
        let second = fixture_with(FakeContextFactory::new(), Arc::clone(&shared));

        assert!(first.playback.play_once("genericNotify").await.expect("play"));
        assert!(!second.playback.play_once("genericNotify").await.expect("skip"));

        assert_eq!(first.factory.plays().len(), 1);
        assert!(second.factory.plays().is_empty());
    }

    #[tokio::test]
    async fn test_play_once_after_window() {
        let store = Arc::new(MemoryStore::new());
        store.set(crate::settings::JUST_PLAYED_KEY, &(unix_millis() - 5_000).to_string());
        let fx = fixture_with(FakeContextFactory::new(), store);

        assert!(fx.playback.play_once("genericNotify").await.expect("play"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_once_unfocused_waits() {
        let fx = fixture();
        fx.platform.set_focus(false);

        let started = tokio::time::Instant::now();
        assert!(fx.playback.play_once("genericNotify").await.expect("play"));
        assert!(started.elapsed() >= Duration::from_millis(UNFOCUSED_DELAY_MIN_MS));
    }

    #[tokio::test]
    async fn test_preload_skips_muted_and_logs_failures() {
        let fx = fixture();
        fx.playback.themes().settings().set_speech(true);
        fx.fetcher.fail_with_status("https://cdn.test/sound/standard/GenericNotify.mp3", 500);

        let names: Vec<String> = ["move", "capture", "genericNotify", "countDown1"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let loaded = fx.playback.preload(&names).await;

        assert_eq!(loaded, 1);
        assert_eq!(fx.fetcher.total_fetches(), 2);
    }

    #[tokio::test]
    async fn test_load_fixed_survives_theme_change() {
        let fx = fixture();
        fx.playback
            .load_fixed("click", "https://cdn.test/ui/Click")
            .await
            .expect("load");

        fx.playback.themes().change_set(Theme::new("robot"));
        fx.playback.play("click", 1.0).await.expect("play");

        assert_eq!(fx.factory.play_labels(), vec!["https://cdn.test/ui/Click.mp3"]);
    }

    #[tokio::test]
    async fn test_prime_resumes() {
        let fx = fixture_with(
            FakeContextFactory::new().with_initial_state(ContextState::Suspended),
            Arc::new(MemoryStore::new()),
        );
        fx.playback.prime().await.expect("resume");
        assert_eq!(fx.factory.latest().expect("context").state(), ContextState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_plays_of_one_sound() {
        let fx = fixture_with(
            FakeContextFactory::new().with_play_duration(Duration::from_millis(300)),
            Arc::new(MemoryStore::new()),
        );
        fx.playback.themes().settings().set_volume(1.0);

        let started = tokio::time::Instant::now();
        let (first, second) = tokio::join!(fx.playback.play("move", 0.3), fx.playback.play("move", 0.9));
        first.expect("first play");
        second.expect("second play");

        let plays = fx.factory.plays();
        assert_eq!(plays.len(), 2);
        assert!(started.elapsed() < Duration::from_millis(600));
        let sound = fx.cache.get("move").expect("cached");
        assert!((sound.gain().value() - 0.9).abs() < f32::EPSILON);
        assert!(fx.fetcher.fetch_count("https://cdn.test/sound/standard/Move.mp3") <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_resume_still_completes() {
        let fx = fixture_with(
            FakeContextFactory::new()
                .with_initial_state(ContextState::Suspended)
                .with_resume(ResumeBehavior::After(Duration::from_millis(1000))),
            Arc::new(MemoryStore::new()),
        );

        let err = fx.playback.play("move", 1.0).await.expect_err("blocked");
        assert!(matches!(err, SoundError::AutoplayBlocked { .. }));
        assert!(fx.notice.is_shown());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let context = fx.factory.latest().expect("context");
        assert_eq!(context.state(), ContextState::Running);

        fx.playback.play("move", 1.0).await.expect("plays once resumed");
        assert_eq!(fx.factory.plays().len(), 1);
        assert!(!fx.notice.is_shown());
        assert_eq!(fx.factory.created_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_during_grace_window_is_silent() {
        let fx = fixture_with(
            FakeContextFactory::new()
                .with_initial_state(ContextState::Suspended)
                .with_resume(ResumeBehavior::After(Duration::from_millis(200))),
            Arc::new(MemoryStore::new()),
        );

        let switch = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            fx.playback.themes().change_set(Theme::new("robot"))
        };
        let (played, evicted) = tokio::join!(fx.playback.play("move", 1.0), switch);

        played.expect("evicted sound completes silently");
        assert_eq!(evicted, 1);
        assert!(fx.factory.plays().is_empty());
    }
}
