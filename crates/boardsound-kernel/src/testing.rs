//! Deterministic in-memory backends for tests.
//!
//! `FakeContext` decodes only bytes produced by [`clip_bytes`], recording the
//! label back on every play so tests can assert which asset was emitted.
//! `FakeFetcher` answers every URL with `clip_bytes(url)` unless told
//! otherwise, so the label of a played clip is the URL it was fetched from.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use boardsound_common::{ContextId, SoundError, SoundResult};
use parking_lot::Mutex;

use crate::context::{AudioBuffer, AudioContext, ContextFactory, ContextState, GainNode};
use crate::fetch::AssetFetcher;

/// Prefix marking bytes the fake context can decode.
pub const CLIP_MAGIC: &[u8] = b"clip:";

/// Sample rate of fake clips.
pub const FAKE_SAMPLE_RATE: u32 = 1000;

/// Encodes `label` as a clip the fake context can decode.
#[must_use]
pub fn clip_bytes(label: &str) -> Vec<u8> {
    let mut bytes = CLIP_MAGIC.to_vec();
    bytes.extend_from_slice(label.as_bytes());
    bytes
}

fn decode_clip(encoded: &[u8]) -> SoundResult<AudioBuffer> {
    let body = encoded
        .strip_prefix(CLIP_MAGIC)
        .ok_or_else(|| SoundError::Decode("missing clip header".to_string()))?;
    let samples = body.iter().map(|b| f32::from(*b)).collect();
    Ok(AudioBuffer::new(samples, FAKE_SAMPLE_RATE, 1))
}

fn label_of(buffer: &AudioBuffer) -> String {
    buffer.samples().iter().map(|s| char::from(*s as u8)).collect()
}

/// One recorded emission.
#[derive(Debug, Clone)]
pub struct PlayRecord {
    /// Context that played the clip.
    pub context: ContextId,
    /// Clip label (the fetched URL for `FakeFetcher` assets).
    pub label: String,
    /// Gain value at start.
    pub gain: f32,
    /// Start time on the tokio clock.
    pub started: tokio::time::Instant,
}

/// How a fake context answers `resume()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeBehavior {
    /// Resume succeeds at once.
    Immediate,
    /// Resume never completes (no user gesture).
    Never,
    /// Resume fails.
    Fail,
    /// Resume succeeds once the delay has passed (a late user gesture).
    After(Duration),
}

/// Scriptable output context.
#[derive(Debug)]
pub struct FakeContext {
    id: ContextId,
    state: Mutex<ContextState>,
    resume: Mutex<ResumeBehavior>,
    closed: AtomicBool,
    resumes: AtomicUsize,
    play_duration: Duration,
    plays: Arc<Mutex<Vec<PlayRecord>>>,
    opened: std::time::Instant,
}

impl FakeContext {
    /// Forces the lifecycle state.
    pub fn set_state(&self, state: ContextState) {
        *self.state.lock() = state;
    }

    /// Changes how later resumes behave.
    pub fn set_resume(&self, behavior: ResumeBehavior) {
        *self.resume.lock() = behavior;
    }

    fn mark_running(&self) -> SoundResult<()> {
        let mut state = self.state.lock();
        if *state == ContextState::Closed {
            return Err(SoundError::ContextUnavailable("context closed".to_string()));
        }
        *state = ContextState::Running;
        Ok(())
    }

    /// Whether `close()` was called.
    #[must_use]
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Number of `resume()` calls.
    #[must_use]
    pub fn resume_calls(&self) -> usize {
        self.resumes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AudioContext for FakeContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn state(&self) -> ContextState {
        self.state.lock().clone()
    }

    fn current_time(&self) -> f64 {
        self.opened.elapsed().as_secs_f64()
    }

    async fn resume(&self) -> SoundResult<()> {
        self.resumes.fetch_add(1, Ordering::Relaxed);
        let behavior = *self.resume.lock();
        match behavior {
            ResumeBehavior::Immediate => self.mark_running(),
            ResumeBehavior::After(delay) => {
                tokio::time::sleep(delay).await;
                self.mark_running()
            },
            ResumeBehavior::Never => {
                std::future::pending::<()>().await;
                Ok(())
            },
            ResumeBehavior::Fail => Err(SoundError::ContextUnavailable("resume rejected".to_string())),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        self.set_state(ContextState::Closed);
    }

    async fn decode(&self, encoded: Vec<u8>) -> SoundResult<AudioBuffer> {
        decode_clip(&encoded)
    }

    async fn play_one_shot(&self, buffer: &AudioBuffer, gain: Arc<GainNode>) -> SoundResult<()> {
        if !gain.is_connected_to(self.id) {
            return Err(SoundError::StaleContext);
        }

        self.plays.lock().push(PlayRecord {
            context: self.id,
            label: label_of(buffer),
            gain: gain.value(),
            started: tokio::time::Instant::now(),
        });

        if !self.play_duration.is_zero() {
            tokio::time::sleep(self.play_duration).await;
        }
        Ok(())
    }
}

/// Factory producing [`FakeContext`]s that share one play log.
#[derive(Debug)]
pub struct FakeContextFactory {
    initial_state: Mutex<ContextState>,
    resume: Mutex<ResumeBehavior>,
    play_duration: Duration,
    plays: Arc<Mutex<Vec<PlayRecord>>>,
    created: Mutex<Vec<Arc<FakeContext>>>,
}

impl Default for FakeContextFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeContextFactory {
    /// Running contexts, immediate resume, zero-length playback.
    #[must_use]
    pub fn new() -> Self {
        Self {
            initial_state: Mutex::new(ContextState::Running),
            resume: Mutex::new(ResumeBehavior::Immediate),
            play_duration: Duration::ZERO,
            plays: Arc::new(Mutex::new(Vec::new())),
            created: Mutex::new(Vec::new()),
        }
    }

    /// State of newly created contexts.
    #[must_use]
    pub fn with_initial_state(self, state: ContextState) -> Self {
        *self.initial_state.lock() = state;
        self
    }

    /// Resume behaviour of newly created contexts.
    #[must_use]
    pub fn with_resume(self, behavior: ResumeBehavior) -> Self {
        *self.resume.lock() = behavior;
        self
    }

    /// How long every play takes.
    #[must_use]
    pub fn with_play_duration(mut self, duration: Duration) -> Self {
        self.play_duration = duration;
        self
    }

    /// Changes the state of contexts created from now on.
    pub fn set_initial_state(&self, state: ContextState) {
        *self.initial_state.lock() = state;
    }

    /// Number of contexts created.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Most recently created context.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<FakeContext>> {
        self.created.lock().last().cloned()
    }

    /// Every recorded play, in start order.
    #[must_use]
    pub fn plays(&self) -> Vec<PlayRecord> {
        self.plays.lock().clone()
    }

    /// Labels of every recorded play, in start order.
    #[must_use]
    pub fn play_labels(&self) -> Vec<String> {
        self.plays.lock().iter().map(|p| p.label.clone()).collect()
    }
}

impl ContextFactory for FakeContextFactory {
    fn create(&self) -> SoundResult<Arc<dyn AudioContext>> {
        let context = Arc::new(FakeContext {
            id: ContextId::next(),
            state: Mutex::new(self.initial_state.lock().clone()),
            resume: Mutex::new(*self.resume.lock()),
            closed: AtomicBool::new(false),
            resumes: AtomicUsize::new(0),
            play_duration: self.play_duration,
            plays: Arc::clone(&self.plays),
            opened: std::time::Instant::now(),
        });
        self.created.lock().push(Arc::clone(&context));
        Ok(context)
    }
}

#[derive(Debug, Clone)]
enum FakeResponse {
    Status(u16),
    Body(Vec<u8>),
}

/// Fetcher answering from memory and logging every request.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, FakeResponse>>,
    log: Mutex<Vec<String>>,
    delay: Duration,
}

impl FakeFetcher {
    /// Every URL answers with `clip_bytes(url)`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answers `url` with a non-success status.
    pub fn fail_with_status(&self, url: &str, status: u16) {
        self.responses
            .lock()
            .insert(url.to_string(), FakeResponse::Status(status));
    }

    /// Answers `url` with the given body.
    pub fn respond_with(&self, url: &str, body: Vec<u8>) {
        self.responses
            .lock()
            .insert(url.to_string(), FakeResponse::Body(body));
    }

    /// Number of requests for `url`.
    #[must_use]
    pub fn fetch_count(&self, url: &str) -> usize {
        self.log.lock().iter().filter(|u| u.as_str() == url).count()
    }

    /// Total number of requests.
    #[must_use]
    pub fn total_fetches(&self) -> usize {
        self.log.lock().len()
    }

    /// Every requested URL, in order.
    #[must_use]
    pub fn fetched(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl AssetFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> SoundResult<Vec<u8>> {
        self.log.lock().push(url.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let response = self.responses.lock().get(url).cloned();
        match response {
            Some(FakeResponse::Status(status)) => Err(SoundError::Fetch {
                url: url.to_string(),
                status,
            }),
            Some(FakeResponse::Body(body)) => Ok(body),
            None => Ok(clip_bytes(url)),
        }
    }
}
