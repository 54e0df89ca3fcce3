//! User options shared by the engine and its front-end

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::keys::{Hotkey, KeyToken};
use crate::player::Repeat;

pub const MIN_SPEED: f64 = 0.05;
pub const MAX_SPEED: f64 = 20.0;

/// What a global hotkey triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotkeyAction {
    ToggleRecord,
    TogglePlay,
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HotkeyAction::ToggleRecord => "record",
            HotkeyAction::TogglePlay => "play",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub always_on_top: bool,
    /// Passes per play, `<= 0` loops until stopped
    pub repeat_count: i32,
    pub record_hotkey: Hotkey,
    pub play_hotkey: Hotkey,
    pub playback_speed: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            always_on_top: false,
            repeat_count: 1,
            record_hotkey: Hotkey::new(KeyToken::named("f10")),
            play_hotkey: Hotkey::new(KeyToken::named("f6")),
            playback_speed: 1.0,
        }
    }
}

impl Settings {
    pub fn repeat(&self) -> Repeat {
        Repeat::from_count(self.repeat_count)
    }

    /// Playback speed clamped to the supported range
    pub fn speed(&self) -> f64 {
        clamp_speed(self.playback_speed)
    }

    pub fn hotkey(&self, action: HotkeyAction) -> &Hotkey {
        match action {
            HotkeyAction::ToggleRecord => &self.record_hotkey,
            HotkeyAction::TogglePlay => &self.play_hotkey,
        }
    }
}

pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        return 1.0;
    }
    speed.clamp(MIN_SPEED, MAX_SPEED)
}
