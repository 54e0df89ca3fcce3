//! Input recorder
//!
//! While recording, every pointer and keyboard notification from the
//! [`InputSource`] becomes one [`Event`] whose delay is the time elapsed since
//! the previous captured event (or since `start()` for the first one).

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::events::{Action, Event, Macro};
use crate::keys::KeyToken;
use crate::platform::{InputSource, KeyInput, PointerInput, Subscription};

/// Recorder configuration
#[derive(Debug, Clone, Default)]
pub struct RecorderConfig {
    /// Minimum pointer travel in pixels before a new move is captured,
    /// 0 captures every notification
    pub move_threshold: f64,
    /// Keys that are never captured
    pub ignored_keys: HashSet<KeyToken>,
}

struct Capture {
    events: Vec<Event>,
    last: Instant,
    last_move: Option<(i32, i32)>,
}

impl Capture {
    fn push(&mut self, action: Action) {
        let now = Instant::now();
        let delay = now.duration_since(self.last);
        self.last = now;
        debug!(kind = action.kind(), ?delay, "captured");
        self.events.push(Event::after(delay, action));
    }
}

// Dropping the session releases both subscriptions
struct Session {
    _pointer: Subscription,
    _keyboard: Subscription,
}

pub struct Recorder {
    source: Arc<dyn InputSource>,
    // shared with the key handler, so ignored keys apply mid-recording
    config: Arc<Mutex<RecorderConfig>>,
    capture: Arc<Mutex<Capture>>,
    session: Mutex<Option<Session>>,
}

impl Recorder {
    pub fn new(source: Arc<dyn InputSource>) -> Self {
        Self::with_config(source, RecorderConfig::default())
    }

    pub fn with_config(source: Arc<dyn InputSource>, config: RecorderConfig) -> Self {
        Self {
            source,
            config: Arc::new(Mutex::new(config)),
            capture: Arc::new(Mutex::new(Capture {
                events: Vec::new(),
                last: Instant::now(),
                last_move: None,
            })),
            session: Mutex::new(None),
        }
    }

    /// Replace the ignored keys, effective immediately even while recording
    pub fn set_ignored_keys(&self, keys: impl IntoIterator<Item = KeyToken>) {
        self.config.lock().ignored_keys = keys
            .into_iter()
            .map(|k| k.canonical().unwrap_or(k))
            .collect();
    }

    pub fn config(&self) -> RecorderConfig {
        self.config.lock().clone()
    }

    pub fn start(&self) -> Result<()> {
        let mut session = self.session.lock();
        if session.is_some() {
            return Err(Error::AlreadyRecording);
        }

        {
            let mut capture = self.capture.lock();
            capture.events.clear();
            capture.last = Instant::now();
            capture.last_move = None;
        }

        let threshold = self.config.lock().move_threshold;
        let pointer = self
            .source
            .subscribe_pointer(pointer_handler(self.capture.clone(), threshold))?;
        // On error `pointer` is dropped here, which releases it
        let keyboard = self
            .source
            .subscribe_keyboard(key_handler(self.capture.clone(), self.config.clone()))?;

        *session = Some(Session {
            _pointer: pointer,
            _keyboard: keyboard,
        });
        info!("recording started");
        Ok(())
    }

    /// Stop capturing and return the recording, `None` if not recording
    ///
    /// No handler runs once this returns.
    pub fn stop(&self) -> Option<Macro> {
        let session = self.session.lock().take()?;
        drop(session);

        let m = Macro::from(self.capture.lock().events.clone());
        info!(events = m.len(), duration = ?m.duration(), "recording stopped");
        Some(m)
    }

    /// Copy of the events captured so far
    pub fn snapshot(&self) -> Macro {
        Macro::from(self.capture.lock().events.clone())
    }

    pub fn is_recording(&self) -> bool {
        self.session.lock().is_some()
    }
}

fn pointer_handler(
    capture: Arc<Mutex<Capture>>,
    threshold: f64,
) -> Box<dyn FnMut(&PointerInput) + Send> {
    Box::new(move |input| {
        let mut c = capture.lock();
        let action = match *input {
            PointerInput::Moved { x, y } => {
                if let Some((lx, ly)) = c.last_move {
                    let (dx, dy) = (f64::from(x - lx), f64::from(y - ly));
                    if threshold > 0.0 && dx.hypot(dy) < threshold {
                        return;
                    }
                }
                c.last_move = Some((x, y));
                Action::Move { x, y }
            }
            PointerInput::Button { x, y, button, pressed } => {
                Action::Click { x, y, button, pressed }
            }
            PointerInput::Wheel { x, y, dx, dy } => Action::Scroll { x, y, dx, dy },
        };
        c.push(action);
    })
}

fn key_handler(
    capture: Arc<Mutex<Capture>>,
    config: Arc<Mutex<RecorderConfig>>,
) -> Box<dyn FnMut(&KeyInput) + Send> {
    Box::new(move |input| {
        {
            let config = config.lock();
            if !config.ignored_keys.is_empty() {
                let key = input.key.canonical().unwrap_or_else(|| input.key.clone());
                if config.ignored_keys.contains(&key) {
                    return;
                }
            }
        }
        let key = input.key.clone();
        capture.lock().push(if input.pressed {
            Action::KeyPress { key }
        } else {
            Action::KeyRelease { key }
        });
    })
}
