//! Macro playback on a worker thread
//!
//! Each pass walks the macro in order: wait the event's delay (scaled by the
//! speed), then inject it. A stop request wakes the wait immediately, so
//! cancellation latency is bounded by one injection, not by the delays.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::events::{Action, Event, Macro};
use crate::platform::InputSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// Loop until stopped
    Forever,
    Times(u32),
}

impl Repeat {
    /// `<= 0` means forever
    pub fn from_count(count: i32) -> Self {
        match u32::try_from(count) {
            Ok(n) if n > 0 => Repeat::Times(n),
            _ => Repeat::Forever,
        }
    }

    fn allows(self, passes_done: u64) -> bool {
        match self {
            Repeat::Forever => true,
            Repeat::Times(n) => passes_done < u64::from(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    pub repeat: Repeat,
    /// Delay divisor: 2.0 plays twice as fast
    pub speed: f64,
}

impl PlayOptions {
    pub fn once() -> Self {
        Self {
            repeat: Repeat::Times(1),
            speed: 1.0,
        }
    }

    pub fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self::once()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    /// Events processed, including skipped ones
    pub events: u64,
    pub passes: u64,
    pub moves: u64,
    pub clicks: u64,
    pub scrolls: u64,
    pub keys: u64,
    pub skipped: u64,
    pub cancelled: bool,
}

struct Session {
    cancel: Sender<()>,
    finished: Receiver<()>,
    worker: JoinHandle<ReplayStats>,
}

pub struct Player {
    sink: Arc<dyn InputSink>,
    playing: Arc<AtomicBool>,
    session: Mutex<Option<Session>>,
}

impl Player {
    pub fn new(sink: Arc<dyn InputSink>) -> Self {
        Self {
            sink,
            playing: Arc::new(AtomicBool::new(false)),
            session: Mutex::new(None),
        }
    }

    /// Start replaying `m` and return immediately
    pub fn play(&self, m: &Macro, options: PlayOptions) -> Result<()> {
        let mut session = self.session.lock();
        if self.playing.load(Ordering::SeqCst) {
            return Err(Error::AlreadyPlaying);
        }
        if m.is_empty() {
            return Err(Error::EmptyMacro);
        }
        if let Some(done) = session.take() {
            join(done.worker);
        }

        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        let (finished_tx, finished_rx) = bounded::<()>(0);
        let events = m.events().to_vec();
        let sink = self.sink.clone();
        let guard = PlayingGuard {
            playing: self.playing.clone(),
            _finished: finished_tx,
        };

        self.playing.store(true, Ordering::SeqCst);
        info!(events = events.len(), ?options, "playback started");
        let spawned = thread::Builder::new()
            .name("pilot-player".into())
            .spawn(move || {
                let _guard = guard;
                run(sink.as_ref(), &events, options, &cancel_rx)
            });

        match spawned {
            Ok(worker) => {
                *session = Some(Session {
                    cancel: cancel_tx,
                    finished: finished_rx,
                    worker,
                });
                Ok(())
            }
            Err(e) => {
                self.playing.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Cancel the running playback and wait for the worker to exit
    ///
    /// Returns `None` when nothing is playing. A run that already ended on
    /// its own is left for [`Player::wait`].
    pub fn stop(&self) -> Option<ReplayStats> {
        let session = {
            let mut session = self.session.lock();
            if !self.playing.load(Ordering::SeqCst) {
                return None;
            }
            session.take()?
        };
        drop(session.cancel);
        let stats = join(session.worker)?;
        info!(?stats, "playback stopped");
        Some(stats)
    }

    /// Block until the current playback ends on its own
    pub fn wait(&self) -> Option<ReplayStats> {
        let finished = self.session.lock().as_ref()?.finished.clone();
        // Never sent on, disconnects when the worker exits
        let _ = finished.recv();

        let mut session = self.session.lock();
        if self.playing.load(Ordering::SeqCst) {
            // another playback started in the meantime
            return None;
        }
        join(session.take()?.worker)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

struct PlayingGuard {
    playing: Arc<AtomicBool>,
    _finished: Sender<()>,
}

impl Drop for PlayingGuard {
    fn drop(&mut self) {
        // flag first, the finished sender is dropped right after
        self.playing.store(false, Ordering::SeqCst);
    }
}

fn join(worker: JoinHandle<ReplayStats>) -> Option<ReplayStats> {
    match worker.join() {
        Ok(stats) => Some(stats),
        Err(_) => {
            error!("playback thread panicked");
            None
        }
    }
}

/// True once a stop was requested; waits at most `wait`
fn cancelled(cancel: &Receiver<()>, wait: Duration) -> bool {
    if wait.is_zero() {
        return cancel.try_recv().map_or_else(|e| e.is_disconnected(), |_| true);
    }
    cancel
        .recv_timeout(wait)
        .map_or_else(|e| e.is_disconnected(), |_| true)
}

fn run(
    sink: &dyn InputSink,
    events: &[Event],
    options: PlayOptions,
    cancel: &Receiver<()>,
) -> ReplayStats {
    let mut stats = ReplayStats::default();

    'passes: while options.repeat.allows(stats.passes) {
        for event in events {
            if cancelled(cancel, event.wait(options.speed)) {
                stats.cancelled = true;
                break 'passes;
            }
            dispatch(sink, &event.action, &mut stats);
            if cancelled(cancel, Duration::ZERO) {
                stats.cancelled = true;
                break 'passes;
            }
        }
        stats.passes += 1;
        debug!(pass = stats.passes, "pass complete");
    }

    info!(
        events = stats.events,
        passes = stats.passes,
        skipped = stats.skipped,
        cancelled = stats.cancelled,
        "playback finished"
    );
    stats
}

fn dispatch(sink: &dyn InputSink, action: &Action, stats: &mut ReplayStats) {
    stats.events += 1;
    let result = match action {
        Action::Move { x, y } => sink.move_to(*x, *y),
        Action::Click { x, y, button, pressed } => sink
            .move_to(*x, *y)
            .and_then(|_| sink.button(*button, *pressed)),
        Action::Scroll { x, y, dx, dy } => {
            sink.move_to(*x, *y).and_then(|_| sink.scroll(*dx, *dy))
        }
        Action::KeyPress { key } => sink.key(key, true),
        Action::KeyRelease { key } => sink.key(key, false),
    };

    match result {
        Ok(()) => match action {
            Action::Move { .. } => stats.moves += 1,
            Action::Click { .. } => stats.clicks += 1,
            Action::Scroll { .. } => stats.scrolls += 1,
            Action::KeyPress { .. } | Action::KeyRelease { .. } => stats.keys += 1,
        },
        Err(e) => {
            stats.skipped += 1;
            warn!(kind = action.kind(), error = %e, "skipping event");
        }
    }
}
