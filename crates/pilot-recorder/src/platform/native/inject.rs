//! Input injection with `rdev::simulate`

use rdev::EventType;
use std::thread;
use std::time::Duration;

use super::keymap::{button_to_rdev, key_from_token};
use crate::error::{Error, Result};
use crate::events::MouseButton;
use crate::keys::KeyToken;
use crate::platform::InputSink;

// macOS drops synthetic events posted back to back
#[cfg(target_os = "macos")]
const DEFAULT_SETTLE: Duration = Duration::from_millis(20);
#[cfg(not(target_os = "macos"))]
const DEFAULT_SETTLE: Duration = Duration::ZERO;

pub struct NativeSink {
    settle: Duration,
}

impl NativeSink {
    pub fn new() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
        }
    }

    /// Pause after every injected event
    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    fn send(&self, event: EventType) -> Result<()> {
        rdev::simulate(&event)
            .map_err(|e| Error::Platform(format!("could not inject {event:?}: {e:?}")))?;
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
        Ok(())
    }
}

impl Default for NativeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSink for NativeSink {
    fn move_to(&self, x: i32, y: i32) -> Result<()> {
        self.send(EventType::MouseMove {
            x: f64::from(x),
            y: f64::from(y),
        })
    }

    fn button(&self, button: MouseButton, pressed: bool) -> Result<()> {
        let button = button_to_rdev(button);
        self.send(if pressed {
            EventType::ButtonPress(button)
        } else {
            EventType::ButtonRelease(button)
        })
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<()> {
        self.send(EventType::Wheel {
            delta_x: i64::from(dx),
            delta_y: i64::from(dy),
        })
    }

    fn key(&self, key: &KeyToken, pressed: bool) -> Result<()> {
        let k = key_from_token(key).ok_or_else(|| Error::UnresolvedKey(key.clone()))?;
        self.send(if pressed {
            EventType::KeyPress(k)
        } else {
            EventType::KeyRelease(k)
        })
    }
}
