//! A decoded clip paired with its persistent gain node.

use std::sync::Arc;
use std::time::Duration;

use boardsound_common::SoundResult;
use tracing::debug;

use crate::context::{AudioBuffer, AudioContext, GainNode};

/// A cached, ready-to-play sound.
#[derive(Debug)]
pub struct Sound {
    name: String,
    buffer: AudioBuffer,
    gain: Arc<GainNode>,
    themed: bool,
}

impl Sound {
    /// Wraps a decoded buffer and its gain node.
    #[must_use]
    pub fn new(name: impl Into<String>, buffer: AudioBuffer, gain: Arc<GainNode>, themed: bool) -> Self {
        Self {
            name: name.into(),
            buffer,
            gain,
            themed,
        }
    }

    /// Logical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded samples.
    #[must_use]
    pub const fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    /// The persistent gain node shared by every play of this sound.
    #[must_use]
    pub fn gain(&self) -> &Arc<GainNode> {
        &self.gain
    }

    /// Whether the sound was resolved against a theme and is evicted on theme
    /// change.
    #[must_use]
    pub const fn is_themed(&self) -> bool {
        self.themed
    }

    /// Clip length.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.buffer.duration()
    }

    /// Plays the clip once at `volume`, completing when it ends.
    ///
    /// The gain is set at the context's current time; overlapping plays of the
    /// same sound share it. A sound evicted while the play was pending has a
    /// detached gain and completes silently.
    pub async fn play(&self, context: &dyn AudioContext, volume: f32) -> SoundResult<()> {
        if self.gain.destination().is_none() {
            debug!("Skipping '{}': evicted", self.name);
            return Ok(());
        }
        self.gain.set_value_at_time(volume, context.current_time());
        debug!("Playing '{}' at volume {:.2} on {}", self.name, volume, context.id());
        context.play_one_shot(&self.buffer, Arc::clone(&self.gain)).await
    }

    /// Disconnects the gain node from its context.
    pub(crate) fn detach(&self) {
        self.gain.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextFactory;
    use crate::testing::FakeContextFactory;
    use boardsound_common::SoundError;

    fn sound_on(context: &Arc<dyn AudioContext>, themed: bool) -> Sound {
        let gain = Arc::new(GainNode::new());
        gain.connect(context.id());
        Sound::new("move", AudioBuffer::new(vec![0.0; 441], 44100, 1), gain, themed)
    }

    #[tokio::test]
    async fn test_play_sets_gain_and_records() {
        let factory = FakeContextFactory::new();
        let context = factory.create().expect("context");
        let sound = sound_on(&context, true);

        sound.play(context.as_ref(), 0.42).await.expect("play");

        assert!((sound.gain().value() - 0.42).abs() < f32::EPSILON);
        let plays = factory.plays();
        assert_eq!(plays.len(), 1);
        assert!((plays[0].gain - 0.42).abs() < f32::EPSILON);
        assert_eq!(plays[0].context, context.id());
    }

    #[tokio::test]
    async fn test_play_on_foreign_context_is_stale() {
        let factory = FakeContextFactory::new();
        let first = factory.create().expect("context");
        let second = factory.create().expect("context");
        let sound = sound_on(&first, false);

        let err = sound.play(second.as_ref(), 1.0).await.expect_err("stale");
        assert!(matches!(err, SoundError::StaleContext));
    }

    #[test]
    fn test_detach() {
        let factory = FakeContextFactory::new();
        let context = factory.create().expect("context");
        let sound = sound_on(&context, true);
        assert!(sound.is_themed());

        sound.detach();
        assert_eq!(sound.gain().destination(), None);
        assert!((sound.duration().as_secs_f64() - 0.01).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_play_after_detach_is_silent() {
        let factory = FakeContextFactory::new();
        let context = factory.create().expect("context");
        let sound = sound_on(&context, true);
        sound.detach();

        sound.play(context.as_ref(), 1.0).await.expect("silent");
        assert!(factory.plays().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_plays_share_gain() {
        let factory = FakeContextFactory::new().with_play_duration(Duration::from_millis(100));
        let context = factory.create().expect("context");
        let sound = sound_on(&context, false);

        let started = tokio::time::Instant::now();
        let (quiet, loud) = tokio::join!(sound.play(context.as_ref(), 0.2), sound.play(context.as_ref(), 0.6));
        quiet.expect("first play");
        loud.expect("second play");

        let plays = factory.plays();
        assert_eq!(plays.len(), 2);
        assert!((plays[0].gain - 0.2).abs() < f32::EPSILON);
        assert!((plays[1].gain - 0.6).abs() < f32::EPSILON);
        assert!((sound.gain().value() - 0.6).abs() < f32::EPSILON);
        assert!(started.elapsed() < Duration::from_millis(200));
    }
}
