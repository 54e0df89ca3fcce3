//! Recorded input events
//!
//! A [`Macro`] is a flat timeline: every [`Event`] carries the delay since the
//! previous one, so a macro replays identically on every repeat pass.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::keys::KeyToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// What happened, without timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Move {
        x: i32,
        y: i32,
    },
    Click {
        x: i32,
        y: i32,
        button: MouseButton,
        pressed: bool,
    },
    Scroll {
        x: i32,
        y: i32,
        dx: i32,
        dy: i32,
    },
    KeyPress {
        key: KeyToken,
    },
    KeyRelease {
        key: KeyToken,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Move { .. } => "move",
            Action::Click { .. } => "click",
            Action::Scroll { .. } => "scroll",
            Action::KeyPress { .. } => "key_press",
            Action::KeyRelease { .. } => "key_release",
        }
    }
}

/// Longest delay an event may carry, one day
pub const MAX_DELAY: f64 = 86_400.0;

/// Single recorded action and the delay that precedes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredEvent")]
pub struct Event {
    /// Seconds since the previous event, in `0..=MAX_DELAY`
    delay: f64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Deserialize)]
struct StoredEvent {
    delay: f64,
    #[serde(flatten)]
    action: Action,
}

impl TryFrom<StoredEvent> for Event {
    type Error = String;

    fn try_from(e: StoredEvent) -> Result<Self, String> {
        if !(e.delay.is_finite() && (0.0..=MAX_DELAY).contains(&e.delay)) {
            return Err(format!(
                "delay must be between 0 and {MAX_DELAY} seconds, got {}",
                e.delay
            ));
        }
        Ok(Self {
            delay: e.delay,
            action: e.action,
        })
    }
}

impl Event {
    /// Negative or non-finite delays become zero, long ones `MAX_DELAY`
    pub fn new(delay: f64, action: Action) -> Self {
        let delay = if delay.is_finite() && delay > 0.0 {
            delay.min(MAX_DELAY)
        } else {
            0.0
        };
        Self { delay, action }
    }

    pub fn after(delay: Duration, action: Action) -> Self {
        Self::new(delay.as_secs_f64(), action)
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// Wait before this event at the given playback speed (non-positive
    /// speeds count as 1.0)
    pub fn wait(&self, speed: f64) -> Duration {
        let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
        saturating_secs(self.delay / speed)
    }
}

fn saturating_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

/// Ordered event sequence: insertion order is replay order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Macro {
    events: Vec<Event>,
}

impl Macro {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Sum of all delays, the duration of one pass at speed 1.0
    pub fn duration(&self) -> Duration {
        saturating_secs(self.events.iter().map(Event::delay).sum())
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl From<Vec<Event>> for Macro {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}

impl FromIterator<Event> for Macro {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Macro {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
