//! Spoken narration.
//!
//! [`SpeechNarrator`] decides whether to speak, builds the [`Utterance`] and
//! hands it to the host's [`SpeechSynth`]. Speech never fails the caller:
//! synth errors are logged and reported as "nothing queued".

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};

use boardsound_common::SoundResult;

use crate::notation::{san_to_words, RoleLookup};
use crate::platform::{Microphone, Platform};
use crate::playback::PlaybackCoordinator;
use crate::settings::SoundSettings;

/// Language of untranslated utterances.
pub const DEFAULT_SPEECH_LANG: &str = "en-US";

/// Phrase spoken when a game starts.
pub const GAME_START_PHRASE: &str = "Game start";

type Callback = Box<dyn FnOnce() + Send>;

/// One phrase for the synthesizer.
pub struct Utterance {
    /// Text to speak.
    pub text: String,
    /// Volume, `0.0..=1.0`.
    pub volume: f32,
    /// BCP 47 language tag.
    pub lang: String,
    on_start: Option<Callback>,
    on_finish: Option<Callback>,
}

impl fmt::Debug for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Utterance")
            .field("text", &self.text)
            .field("volume", &self.volume)
            .field("lang", &self.lang)
            .finish_non_exhaustive()
    }
}

impl Utterance {
    /// Creates an utterance without lifecycle callbacks.
    #[must_use]
    pub fn new(text: impl Into<String>, volume: f32, lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            volume,
            lang: lang.into(),
            on_start: None,
            on_finish: None,
        }
    }

    /// Runs `callback` when speaking starts.
    #[must_use]
    pub fn on_start(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_start = Some(Box::new(callback));
        self
    }

    /// Runs `callback` when speaking ends or fails.
    #[must_use]
    pub fn on_finish(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(callback));
        self
    }

    /// Signals that speaking started. Synths call this once.
    pub fn started(&mut self) {
        if let Some(callback) = self.on_start.take() {
            callback();
        }
    }

    /// Signals that speaking ended or failed. Synths call this once.
    pub fn finished(&mut self) {
        if let Some(callback) = self.on_finish.take() {
            callback();
        }
    }
}

/// Host text-to-speech.
pub trait SpeechSynth: Send + Sync {
    /// Drops any queued or in-flight utterance.
    fn cancel(&self) -> SoundResult<()>;

    /// Queues `utterance`, taking over its callbacks.
    fn speak(&self, utterance: Utterance) -> SoundResult<()>;
}

/// Synth that writes utterances to the log and completes them at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSynth;

impl SpeechSynth for TracingSynth {
    fn cancel(&self) -> SoundResult<()> {
        Ok(())
    }

    fn speak(&self, mut utterance: Utterance) -> SoundResult<()> {
        utterance.started();
        info!("Speaking [{}] \"{}\"", utterance.lang, utterance.text);
        utterance.finished();
        Ok(())
    }
}

/// Options for [`SpeechNarrator::say`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SayOptions {
    /// Cancel whatever is being spoken first.
    pub cut: bool,
    /// Speak even when speech is disabled.
    pub force: bool,
    /// Speak in the page language instead of the default.
    pub translated: bool,
}

impl SayOptions {
    /// Interrupting the current utterance.
    #[must_use]
    pub const fn cut() -> Self {
        Self {
            cut: true,
            force: false,
            translated: false,
        }
    }

    /// Ignoring the speech preference.
    #[must_use]
    pub const fn forced() -> Self {
        Self {
            cut: false,
            force: true,
            translated: false,
        }
    }

    /// In the page language.
    #[must_use]
    pub const fn translated(mut self) -> Self {
        self.translated = true;
        self
    }
}

/// Narrates text and moves.
pub struct SpeechNarrator {
    synth: Arc<dyn SpeechSynth>,
    settings: SoundSettings,
    platform: Arc<dyn Platform>,
    microphone: Option<Arc<dyn Microphone>>,
    roles: Arc<dyn RoleLookup>,
    playback: Arc<PlaybackCoordinator>,
    default_lang: String,
}

impl fmt::Debug for SpeechNarrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechNarrator")
            .field("default_lang", &self.default_lang)
            .field("microphone", &self.microphone.is_some())
            .finish_non_exhaustive()
    }
}

impl SpeechNarrator {
    /// Creates a narrator speaking [`DEFAULT_SPEECH_LANG`].
    #[must_use]
    pub fn new(
        synth: Arc<dyn SpeechSynth>,
        settings: SoundSettings,
        platform: Arc<dyn Platform>,
        roles: Arc<dyn RoleLookup>,
        playback: Arc<PlaybackCoordinator>,
    ) -> Self {
        Self {
            synth,
            settings,
            platform,
            microphone: None,
            roles,
            playback,
            default_lang: DEFAULT_SPEECH_LANG.to_string(),
        }
    }

    /// Pauses `microphone` while speaking.
    #[must_use]
    pub fn with_microphone(mut self, microphone: Arc<dyn Microphone>) -> Self {
        self.microphone = Some(microphone);
        self
    }

    /// Language of untranslated utterances.
    #[must_use]
    pub fn with_default_lang(mut self, lang: impl Into<String>) -> Self {
        self.default_lang = lang.into();
        self
    }

    /// Speaks `text`. Returns whether an utterance was queued.
    pub fn say(&self, text: &str, options: SayOptions) -> bool {
        match self.try_say(text, options) {
            Ok(queued) => queued,
            Err(e) => {
                error!("Speech failed for \"{}\": {}", text, e);
                false
            },
        }
    }

    fn try_say(&self, text: &str, options: SayOptions) -> SoundResult<bool> {
        if options.cut {
            self.synth.cancel()?;
        }
        if !options.force && !self.settings.speech() {
            return Ok(false);
        }

        let lang = if options.translated {
            self.platform.page_language()
        } else {
            self.default_lang.clone()
        };
        let mut utterance = Utterance::new(text, self.settings.volume(), lang);

        // iOS lifecycle events are unreliable and the platform manages focus.
        if !self.platform.is_ios() {
            if let Some(microphone) = &self.microphone {
                let paused = Arc::clone(microphone);
                let resumed = Arc::clone(microphone);
                utterance = utterance
                    .on_start(move || paused.pause())
                    .on_finish(move || resumed.resume());
            }
        }

        debug!("Queueing utterance \"{}\"", text);
        self.synth.speak(utterance)?;
        Ok(true)
    }

    /// Speaks a move in algebraic notation, or the game-start phrase when
    /// `san` is `None`.
    pub fn say_san(&self, san: Option<&str>, cut: bool) -> bool {
        let text = san.map_or_else(|| GAME_START_PHRASE.to_string(), |san| san_to_words(san, self.roles.as_ref()));
        self.say(
            &text,
            SayOptions {
                cut,
                ..SayOptions::default()
            },
        )
    }

    /// Speaks `text`, or plays `name` when nothing was queued.
    ///
    /// # Errors
    ///
    /// Playback failures of the fallback sound.
    pub async fn say_or_play(&self, name: &str, text: &str) -> SoundResult<()> {
        if self.say(text, SayOptions::default()) {
            return Ok(());
        }
        self.playback.play(name, 1.0).await
    }
}
