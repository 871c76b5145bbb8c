//! Replay of recorded note events with their original relative timing.
//!
//! A run is polled from the host loop and never blocks.  Event *k+1* becomes
//! due `timestamp[k+1] - timestamp[k]` after event *k* was due, so a run can
//! start at any wall-clock time and reproduces the same spacing every time.
//! After the last event a fixed tail delay elapses, then the run asks for a
//! final release.
//!
//! Every run owns a [`CancelToken`].  The token is checked before an event
//! fires and again before the next one is scheduled, so a cancelled run
//! never produces another action.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Result, ToneError};
use crate::recording::RecordedEvent;

// ════════════════════════════════════════════════════════════════════════════
// CancelToken
// ════════════════════════════════════════════════════════════════════════════

/// Shared, idempotent cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst); }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

// ════════════════════════════════════════════════════════════════════════════
// PlaybackAction / PlaybackRun
// ════════════════════════════════════════════════════════════════════════════

/// What a run asks its caller to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackAction {
    /// Sound this event (attack when silent, glide otherwise).
    Fire(RecordedEvent),
    /// Tail delay elapsed: release and end.
    Finish,
}

/// One pass over an ordered list of events.
#[derive(Debug)]
pub struct PlaybackRun {
    events:        Vec<RecordedEvent>,
    next:          usize,
    next_due_ms:   f64,
    tail_delay_ms: f64,
    finished:      bool,
    token:         CancelToken,
}

impl PlaybackRun {
    /// The first event is due at `start_ms`.
    pub fn new(events: Vec<RecordedEvent>, start_ms: f64, tail_delay_ms: f64) -> Self {
        Self {
            events,
            next: 0,
            next_due_ms: start_ms,
            tail_delay_ms,
            finished: false,
            token: CancelToken::new(),
        }
    }

    pub fn token(&self) -> CancelToken { self.token.clone() }

    /// `(fired, total)` events.
    pub fn progress(&self) -> (usize, usize) { (self.next, self.events.len()) }

    pub fn is_done(&self) -> bool { self.finished || self.token.is_cancelled() }

    /// When the next action becomes due, if any.
    pub fn next_due_ms(&self) -> Option<f64> {
        if self.is_done() { None } else { Some(self.next_due_ms) }
    }

    /// Emit every action due at `now_ms` into `out`.  Returns false once the
    /// run is over (finished or cancelled).
    pub fn poll(&mut self, now_ms: f64, out: &mut Vec<PlaybackAction>) -> bool {
        loop {
            if self.is_done() {
                return false;
            }
            if now_ms < self.next_due_ms {
                return true;
            }

            let Some(&event) = self.events.get(self.next) else {
                out.push(PlaybackAction::Finish);
                self.finished = true;
                return false;
            };

            out.push(PlaybackAction::Fire(event));
            self.next += 1;

            if self.token.is_cancelled() {
                return false;
            }
            let gap = match self.events.get(self.next) {
                Some(following) => following.timestamp_ms - event.timestamp_ms,
                None            => self.tail_delay_ms,
            };
            self.next_due_ms += gap.max(0.0);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PlaybackScheduler
// ════════════════════════════════════════════════════════════════════════════

/// Outcome of [`PlaybackScheduler::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackToggle {
    Started { events: usize },
    Stopped,
}

/// Holds at most one active run.
#[derive(Debug)]
pub struct PlaybackScheduler {
    run:           Option<PlaybackRun>,
    tail_delay_ms: f64,
}

impl PlaybackScheduler {
    pub fn new(tail_delay_ms: f64) -> Self {
        Self { run: None, tail_delay_ms }
    }

    pub fn is_active(&self) -> bool {
        self.run.as_ref().is_some_and(|r| !r.is_done())
    }

    /// True while a run is held, including one cancelled through its token
    /// that has not been polled or stopped since.
    pub fn has_run(&self) -> bool { self.run.is_some() }

    pub fn progress(&self) -> Option<(usize, usize)> {
        self.run.as_ref().filter(|r| !r.is_done()).map(PlaybackRun::progress)
    }

    /// Token of the active run, so another party can cancel it.
    pub fn token(&self) -> Option<CancelToken> {
        self.run.as_ref().map(PlaybackRun::token)
    }

    /// Start a run over `events`, or stop the active one.
    ///
    /// An empty list with nothing active is [`ToneError::EmptySelection`].
    pub fn toggle(&mut self, events: Vec<RecordedEvent>, now_ms: f64) -> Result<PlaybackToggle> {
        if self.stop() {
            return Ok(PlaybackToggle::Stopped);
        }
        if events.is_empty() {
            return Err(ToneError::EmptySelection);
        }
        let count = events.len();
        self.run = Some(PlaybackRun::new(events, now_ms, self.tail_delay_ms));
        info!(events = count, "playback started");
        Ok(PlaybackToggle::Started { events: count })
    }

    /// Cancel the active run.  Returns whether one was active; calling it
    /// again is harmless.
    pub fn stop(&mut self) -> bool {
        match self.run.take() {
            Some(run) => {
                let was_active = !run.is_done();
                run.token.cancel();
                if was_active {
                    info!("playback stopped");
                }
                was_active
            }
            None => false,
        }
    }

    /// Advance the active run to `now_ms` and return what it wants done.
    pub fn poll(&mut self, now_ms: f64) -> Vec<PlaybackAction> {
        let mut actions = Vec::new();
        if let Some(run) = self.run.as_mut() {
            if !run.poll(now_ms, &mut actions) {
                debug!(finished = run.finished, "playback run ended");
                self.run = None;
            }
        }
        actions
    }
}
