// Playback transport state.
//
// The controller does not own a clock: position advances either through
// `sync_to` (observing the real audio transport) or through caller-driven
// `tick` calls when no transport is available. Every change fans out a
// snapshot to subscribers, which drive the transcript cursor and the
// "comment at current time" affordance.

use std::time::Duration;

use log::debug;
use serde::Serialize;
use tokio::sync::mpsc;

const SKIP_STEP_SECONDS: f64 = 5.0;

/// Snapshot emitted to subscribers on every transport change.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PlaybackEvent {
    pub position: f64,
    pub playing: bool,
    pub rate: f32,
}

#[derive(Debug)]
pub struct PlaybackController {
    position: f64,
    rate: f32,
    playing: bool,
    /// Recording length in seconds, unknown until the upload is probed
    duration: Option<f64>,
    subscribers: Vec<mpsc::UnboundedSender<PlaybackEvent>>,
}

impl PlaybackController {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            position: 0.0,
            rate: 1.0,
            playing: false,
            duration,
            subscribers: Vec::new(),
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Register a listener; events arrive on an unbounded channel so the
    /// transport never blocks on a slow consumer.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<PlaybackEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Seed the listener with the current state
        let _ = tx.send(self.snapshot());
        self.subscribers.push(tx);
        rx
    }

    pub fn play(&mut self) {
        if !self.playing {
            self.playing = true;
            self.emit();
        }
    }

    pub fn pause(&mut self) {
        if self.playing {
            self.playing = false;
            self.emit();
        }
    }

    pub fn toggle(&mut self) {
        self.playing = !self.playing;
        self.emit();
    }

    /// Jump to an absolute position, clamped to `[0, duration]`.
    pub fn seek(&mut self, time: f64) {
        self.position = self.clamp_position(time);
        self.emit();
    }

    /// Seek relative to the current position (arrow-key style).
    pub fn skip(&mut self, delta: f64) {
        self.seek(self.position + delta);
    }

    pub fn skip_back(&mut self) {
        self.skip(-SKIP_STEP_SECONDS);
    }

    pub fn skip_forward(&mut self) {
        self.skip(SKIP_STEP_SECONDS);
    }

    pub fn set_rate(&mut self, rate: f32) {
        if rate > 0.0 {
            self.rate = rate;
            self.emit();
        }
    }

    /// Advance the position by `elapsed` of wall-clock time scaled by the
    /// playback rate. No-op while paused. Reaching the end of a known
    /// duration pauses the transport.
    pub fn tick(&mut self, elapsed: Duration) {
        if !self.playing {
            return;
        }

        self.position = self.clamp_position(self.position + elapsed.as_secs_f64() * self.rate as f64);

        if let Some(duration) = self.duration {
            if self.position >= duration {
                debug!("Playback reached end at {:.1}s", duration);
                self.playing = false;
            }
        }

        self.emit();
    }

    /// Adopt the position reported by the real audio transport.
    pub fn sync_to(&mut self, media_time: f64) {
        self.position = self.clamp_position(media_time);
        self.emit();
    }

    fn clamp_position(&self, time: f64) -> f64 {
        let upper = self.duration.unwrap_or(f64::INFINITY);
        time.clamp(0.0, upper)
    }

    fn snapshot(&self) -> PlaybackEvent {
        PlaybackEvent {
            position: self.position,
            playing: self.playing,
            rate: self.rate,
        }
    }

    fn emit(&mut self) {
        let event = self.snapshot();
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}
