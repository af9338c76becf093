//! Timed countdown cues.
//!
//! Each tick waits the interval, plays the current count and prefetches the
//! next count at the same time, advancing once all three finish. After the
//! last tick a generic notification plays. Failures end the sequence early
//! and are logged rather than returned.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

use boardsound_common::{countdown_name, SoundError, SoundResult, GENERIC_NOTIFY};
use boardsound_kernel::SoundCache;

use crate::playback::PlaybackCoordinator;

/// Default spacing between ticks.
pub const DEFAULT_COUNTDOWN_INTERVAL: Duration = Duration::from_millis(500);

/// Position in a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    /// Count still to play.
    Counting(u32),
    /// Every count has played.
    Done,
}

impl CountdownState {
    /// State for a countdown from `count`.
    #[must_use]
    pub const fn start(count: u32) -> Self {
        if count == 0 {
            Self::Done
        } else {
            Self::Counting(count)
        }
    }

    /// State after the current count has played.
    #[must_use]
    pub const fn advance(self) -> Self {
        match self {
            Self::Counting(n) if n > 1 => Self::Counting(n - 1),
            Self::Counting(_) | Self::Done => Self::Done,
        }
    }
}

/// Plays countdown cues.
#[derive(Debug)]
pub struct CountdownSequencer {
    playback: Arc<PlaybackCoordinator>,
    cache: Arc<SoundCache>,
}

impl CountdownSequencer {
    /// Creates a sequencer playing through `playback`.
    #[must_use]
    pub fn new(playback: Arc<PlaybackCoordinator>, cache: Arc<SoundCache>) -> Self {
        Self { playback, cache }
    }

    /// Counts down from `count`, one tick per `interval`, then plays the
    /// generic notification. Returns whether the sequence completed.
    pub async fn run(&self, count: u32, interval: Duration) -> bool {
        if !self.playback.is_enabled() {
            debug!("Countdown skipped: sounds disabled");
            return false;
        }

        match self.sequence(count, interval).await {
            Ok(()) => true,
            Err(e) => {
                error!("Countdown aborted: {}", e);
                false
            },
        }
    }

    async fn sequence(&self, count: u32, interval: Duration) -> SoundResult<()> {
        self.playback.running_context().await?;

        let mut state = CountdownState::start(count);
        while let CountdownState::Counting(n) = state {
            let next = state.advance();

            let wait = async {
                tokio::time::sleep(interval).await;
                Ok::<(), SoundError>(())
            };
            let current_name = countdown_name(n);
            let current = self.playback.play(&current_name, 1.0);
            let prefetch = async {
                match next {
                    CountdownState::Counting(m) => self.prefetch(&countdown_name(m)).await,
                    CountdownState::Done => Ok(()),
                }
            };
            tokio::try_join!(wait, current, prefetch)?;

            state = next;
        }

        self.playback.play(GENERIC_NOTIFY, 1.0).await
    }

    async fn prefetch(&self, name: &str) -> SoundResult<()> {
        if let Some(theme) = self.playback.effective_theme(name) {
            self.cache.cache(name, &theme).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::platform::{LoggingNotice, StaticPlatform};
    use crate::settings::SoundSettings;
    use crate::store::MemoryStore;
    use crate::theme::ThemeController;
    use boardsound_common::Theme;
    use boardsound_kernel::testing::{FakeContextFactory, FakeFetcher};
    use boardsound_kernel::{AudioContextManager, StaticAssetResolver};

    struct Fixture {
        factory: Arc<FakeContextFactory>,
        fetcher: Arc<FakeFetcher>,
        playback: Arc<PlaybackCoordinator>,
        countdown: CountdownSequencer,
    }

    fn fixture() -> Fixture {
        let factory = Arc::new(FakeContextFactory::new());
        let contexts = Arc::new(AudioContextManager::new(Arc::clone(&factory) as _).expect("fake factory never fails"));
        let fetcher = Arc::new(FakeFetcher::new());
        let cache = Arc::new(SoundCache::new(
            contexts,
            Arc::clone(&fetcher) as _,
            Arc::new(StaticAssetResolver::new("https://cdn.test/sound")),
        ));
        let themes = Arc::new(ThemeController::new(
            Theme::standard(),
            SoundSettings::new(Arc::new(MemoryStore::new())),
            Arc::clone(&cache),
            Arc::new(EventBus::new()),
        ));
        let playback = Arc::new(PlaybackCoordinator::new(
            themes,
            Arc::clone(&cache),
            Arc::new(LoggingNotice::new()),
            Arc::new(StaticPlatform::default()),
        ));
        let countdown = CountdownSequencer::new(Arc::clone(&playback), cache);
        Fixture {
            factory,
            fetcher,
            playback,
            countdown,
        }
    }

    fn url(file: &str) -> String {
        format!("https://cdn.test/sound/standard/{file}.mp3")
    }

    #[test]
    fn test_state_machine() {
        assert_eq!(CountdownState::start(0), CountdownState::Done);
        assert_eq!(CountdownState::start(2), CountdownState::Counting(2));
        assert_eq!(CountdownState::Counting(2).advance(), CountdownState::Counting(1));
        assert_eq!(CountdownState::Counting(1).advance(), CountdownState::Done);
        assert_eq!(CountdownState::Done.advance(), CountdownState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_order_and_timing() {
        let fx = fixture();

        let started = tokio::time::Instant::now();
        assert!(fx.countdown.run(3, DEFAULT_COUNTDOWN_INTERVAL).await);

        assert_eq!(
            fx.factory.play_labels(),
            vec![
                url("CountDown3"),
                url("CountDown2"),
                url("CountDown1"),
                url("GenericNotify"),
            ]
        );
        assert_eq!(
            fx.fetcher.fetched(),
            vec![
                url("CountDown3"),
                url("CountDown2"),
                url("CountDown1"),
                url("GenericNotify"),
            ]
        );

        let plays = fx.factory.plays();
        for (tick, play) in (0u32..).zip(plays.iter()) {
            let offset = play.started - started;
            let expected = DEFAULT_COUNTDOWN_INTERVAL * tick;
            assert!(offset >= expected, "tick {tick} started early: {offset:?}");
            assert!(offset < expected + Duration::from_millis(5), "tick {tick} started late: {offset:?}");
        }
        assert!(started.elapsed() >= DEFAULT_COUNTDOWN_INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_zero_only_notifies() {
        let fx = fixture();
        assert!(fx.countdown.run(0, DEFAULT_COUNTDOWN_INTERVAL).await);
        assert_eq!(fx.factory.play_labels(), vec![url("GenericNotify")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_stops_on_error() {
        let fx = fixture();
        fx.fetcher.fail_with_status(&url("CountDown1"), 404);

        assert!(!fx.countdown.run(3, DEFAULT_COUNTDOWN_INTERVAL).await);

        let labels = fx.factory.play_labels();
        assert!(!labels.contains(&url("GenericNotify")));
        assert!(!labels.contains(&url("CountDown1")));
    }

    #[tokio::test]
    async fn test_countdown_silent_does_nothing() {
        let fx = fixture();
        fx.playback.themes().change_set(Theme::silent());

        assert!(!fx.countdown.run(3, DEFAULT_COUNTDOWN_INTERVAL).await);
        assert_eq!(fx.fetcher.total_fetches(), 0);
    }
}
