//! Rodio-backed output context.
//!
//! rodio's `OutputStream` must stay alive for audio to play but cannot move
//! between threads, so each context parks a dedicated thread that owns the
//! stream and keeps only the `Send + Sync` handle. Closing the context wakes
//! the thread, which drops the stream.
//!
//! Desktop outputs have no autoplay gate, so contexts open `Running`. A sink
//! that can no longer be created means the device went away; the context then
//! reports `Closed` and the manager replaces it on the next reconcile.

use std::io::Cursor;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use boardsound_common::{ContextId, SoundError, SoundResult};
use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, info, warn};

use crate::context::{AudioBuffer, AudioContext, ContextFactory, ContextState, GainNode};

/// How often a playing source re-reads its gain node.
pub const GAIN_POLL_PERIOD: Duration = Duration::from_millis(5);

/// Output context on the default rodio device.
pub struct RodioContext {
    id: ContextId,
    handle: OutputStreamHandle,
    state: Mutex<ContextState>,
    shutdown: Mutex<Option<Sender<()>>>,
    opened: Instant,
}

impl std::fmt::Debug for RodioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioContext")
            .field("id", &self.id)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl RodioContext {
    /// Opens the default output device.
    pub fn open() -> SoundResult<Self> {
        let (ready_tx, ready_rx) = bounded::<Result<OutputStreamHandle, String>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        thread::Builder::new()
            .name("boardsound-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    if ready_tx.send(Ok(handle)).is_err() {
                        return;
                    }
                    // Returns on close() or when the context is dropped.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                },
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                },
            })
            .map_err(|e| SoundError::ContextUnavailable(e.to_string()))?;

        let handle = ready_rx
            .recv()
            .map_err(|e| SoundError::ContextUnavailable(e.to_string()))?
            .map_err(SoundError::ContextUnavailable)?;

        let id = ContextId::next();
        info!("Audio output {} opened on default device", id);

        Ok(Self {
            id,
            handle,
            state: Mutex::new(ContextState::Running),
            shutdown: Mutex::new(Some(shutdown_tx)),
            opened: Instant::now(),
        })
    }

    fn mark_closed(&self) {
        *self.state.lock() = ContextState::Closed;
    }
}

impl Drop for RodioContext {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.lock().take() {
            let _ = shutdown.send(());
        }
    }
}

#[async_trait]
impl AudioContext for RodioContext {
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
        let mut state = self.state.lock();
        match *state {
            ContextState::Closed => Err(SoundError::ContextUnavailable(format!(
                "audio output {} is closed",
                self.id
            ))),
            _ => {
                *state = ContextState::Running;
                Ok(())
            },
        }
    }

    fn close(&self) {
        self.mark_closed();
        if let Some(shutdown) = self.shutdown.lock().take() {
            let _ = shutdown.send(());
            debug!("Audio output {} closed", self.id);
        }
    }

    async fn decode(&self, encoded: Vec<u8>) -> SoundResult<AudioBuffer> {
        decode_on_blocking_pool(encoded).await
    }

    async fn play_one_shot(&self, buffer: &AudioBuffer, gain: Arc<GainNode>) -> SoundResult<()> {
        if !gain.is_connected_to(self.id) {
            return Err(SoundError::StaleContext);
        }

        let sink = Sink::try_new(&self.handle).map_err(|e| {
            warn!("Audio output {} lost its device: {}", self.id, e);
            self.mark_closed();
            SoundError::ContextUnavailable(e.to_string())
        })?;

        let source = SamplesBuffer::new(buffer.channels(), buffer.sample_rate(), buffer.samples().to_vec());
        let node = Arc::clone(&gain);
        sink.append(
            source
                .amplify(gain.value())
                .periodic_access(GAIN_POLL_PERIOD, move |amp| amp.set_factor(node.value())),
        );

        // The sink is the transient source node; dropping it disconnects.
        tokio::task::spawn_blocking(move || sink.sleep_until_end())
            .await
            .map_err(|e| SoundError::ContextUnavailable(format!("playback task failed: {e}")))
    }
}

/// Decodes an encoded clip with rodio on the blocking pool. Needs no output
/// device.
async fn decode_on_blocking_pool(encoded: Vec<u8>) -> SoundResult<AudioBuffer> {
    tokio::task::spawn_blocking(move || {
        let decoder = Decoder::new(Cursor::new(encoded)).map_err(|e| SoundError::Decode(e.to_string()))?;

        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();

        if samples.is_empty() {
            return Err(SoundError::Decode("stream contains no samples".to_string()));
        }
        Ok(AudioBuffer::new(samples, sample_rate, channels))
    })
    .await
    .map_err(|e| SoundError::Decode(format!("decode task failed: {e}")))?
}

/// Opens a [`RodioContext`] on the default device for every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RodioContextFactory;

impl ContextFactory for RodioContextFactory {
    fn create(&self) -> SoundResult<Arc<dyn AudioContext>> {
        Ok(Arc::new(RodioContext::open()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Opening a device needs audio hardware; decoding does not.

    fn wav_bytes(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let data_len = u32::try_from(samples.len() * 2).expect("small clip");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    #[tokio::test]
    async fn test_decode_rejects_garbage() {
        let err = decode_on_blocking_pool(b"definitely not audio".to_vec())
            .await
            .expect_err("garbage");
        assert!(matches!(err, SoundError::Decode(_)));
    }

    #[tokio::test]
    async fn test_decode_pcm_wav() {
        let samples: Vec<i16> = (0..800).map(|i| if i % 2 == 0 { 1000 } else { -1000 }).collect();

        let buffer = decode_on_blocking_pool(wav_bytes(8000, &samples)).await.expect("wav");

        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.sample_rate(), 8000);
        assert_eq!(buffer.frames(), 800);
        assert!((buffer.duration().as_secs_f64() - 0.1).abs() < 1e-6);
    }
}
